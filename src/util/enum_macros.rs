/// Generates an enumeration over a BACnet numeric code space.
///
/// Every standard value gets a named variant. Values that fall inside the
/// vendor-proprietary range decode to `Custom`, anything else that is not
/// named decodes to `Reserved`. Decoding is therefore total: every wire value
/// maps to exactly one variant and encodes back to the same number.
///
/// # Arguments
///
/// * `$name` - name of the generated enum.
/// * `$variant = $value` - named standard values.
/// * `$unit` - the wire integer type (`u8`, `u16`, `u32`).
/// * `$custom_range` - the proprietary range, e.g. `128..=1023`.
///
/// # Example
///
/// ```rust
/// use bacnet_device::generate_custom_enum;
///
/// generate_custom_enum! {
///     Fan {
///         Off = 0,
///         Low = 1,
///         High = 2,
///     },
///     u16,
///     64..=65535
/// }
///
/// assert_eq!(u16::from(Fan::High), 2);
/// assert_eq!(Fan::from(1u16), Fan::Low);
/// assert!(matches!(Fan::from(100u16), Fan::Custom(v) if v.value() == 100));
/// assert!(matches!(Fan::from(7u16), Fan::Reserved(v) if v.value() == 7));
/// assert_eq!(Fan::Off.to_string(), "Off");
/// ```
///
/// The enum derives `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq` and `Hash`,
/// and implements `Display` plus `From` in both directions.
#[macro_export]
macro_rules! generate_custom_enum {
    ($(#[$doc:meta])* $name:ident { $($variant:ident = $value:literal,)+ }, $unit:ident, $custom_range:expr) => {
        pastey::paste! {
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum $name {
                $($variant,)*
                Custom( [<$name Value>] ),
                Reserved( [<$name Value>] ),
            }

            /// Raw value carried by an unnamed variant.
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct [<$name Value>] { value: $unit }

            impl [<$name Value>] {
                fn new(value: $unit) -> Self {
                    Self { value }
                }

                pub fn value(&self) -> $unit {
                    self.value
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    match self {
                        $($name::$variant => f.write_str(stringify!($variant)),)*
                        $name::Custom( value ) => write!(f, "Custom({})", value.value()),
                        $name::Reserved( value ) => write!(f, "Reserved({})", value.value()),
                    }
                }
            }

            impl From<$name> for $unit {
                fn from(value: $name) -> Self {
                    match value {
                        $($name::$variant => $value,)*
                        $name::Custom( value ) | $name::Reserved( value ) => value.value(),
                    }
                }
            }

            impl From<$unit> for $name {
                fn from(value: $unit) -> Self {
                    match value {
                        $($value => $name::$variant,)*
                        v if ($custom_range).contains(&v) => {
                            $name::Custom( [<$name Value>]::new(v) )
                        }
                        v => $name::Reserved( [<$name Value>]::new(v) ),
                    }
                }
            }
        }
    };
}
