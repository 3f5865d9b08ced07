//! BACnet network addresses.
//!
//! An [`Address`] is a network number plus a variable-length station address
//! (the MAC of the device on that network). Network 0 is the local network,
//! 65535 is the global broadcast network, and an empty station address means
//! "every station on that network".

use std::fmt;

use super::{NetworkError, Result};

/// Longest station address carried in an NPDU.
pub const MAX_MAC_LEN: usize = 7;

/// Network number meaning "this network".
pub const LOCAL_NETWORK: u16 = 0;

/// Network number meaning "every network".
pub const GLOBAL_BROADCAST_NETWORK: u16 = 0xFFFF;

/// Network number and station address.
///
/// Only the first `len` octets are meaningful. Equality compares the network
/// number, the length and the occupied octets, so stale bytes past the length
/// never make two addresses differ.
#[derive(Clone, Copy, Default)]
pub struct Address {
    /// Network number (0 = local, 65535 = global broadcast)
    pub network: u16,
    len: u8,
    octets: [u8; MAX_MAC_LEN],
}

impl Address {
    /// Build an address from a network number and station address.
    pub fn new(network: u16, mac: &[u8]) -> Result<Self> {
        if mac.len() > MAX_MAC_LEN {
            return Err(NetworkError::InvalidAddress(mac.len()));
        }
        let mut octets = [0u8; MAX_MAC_LEN];
        octets[..mac.len()].copy_from_slice(mac);
        Ok(Self {
            network,
            len: mac.len() as u8,
            octets,
        })
    }

    /// A station on the local network.
    pub fn local(mac: &[u8]) -> Result<Self> {
        Self::new(LOCAL_NETWORK, mac)
    }

    /// A station on a remote network.
    pub fn remote(network: u16, mac: &[u8]) -> Result<Self> {
        Self::new(network, mac)
    }

    /// Every station on every network.
    pub fn global_broadcast() -> Self {
        Self {
            network: GLOBAL_BROADCAST_NETWORK,
            ..Self::default()
        }
    }

    /// Every station on the given network.
    pub fn network_broadcast(network: u16) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// The occupied station address octets.
    pub fn mac(&self) -> &[u8] {
        &self.octets[..self.len as usize]
    }

    pub fn mac_len(&self) -> usize {
        self.len as usize
    }

    /// Zero-length station address: addressed to all stations of the network.
    pub fn is_broadcast(&self) -> bool {
        self.len == 0
    }

    pub fn is_global_broadcast(&self) -> bool {
        self.network == GLOBAL_BROADCAST_NETWORK
    }

    /// No network number, i.e. not routed.
    pub fn is_local(&self) -> bool {
        self.network == LOCAL_NETWORK
    }

    /// Reset to the local broadcast address.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Replace the station address in place.
    pub(crate) fn set_mac(&mut self, mac: &[u8]) -> Result<()> {
        if mac.len() > MAX_MAC_LEN {
            return Err(NetworkError::InvalidAddress(mac.len()));
        }
        self.octets = [0u8; MAX_MAC_LEN];
        self.octets[..mac.len()].copy_from_slice(mac);
        self.len = mac.len() as u8;
        Ok(())
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.network == other.network && self.mac() == other.mac()
    }
}

impl Eq for Address {}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Address")
            .field("network", &self.network)
            .field("mac", &hex::encode(self.mac()))
            .finish()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_broadcast() {
            write!(f, "{}:*", self.network)
        } else {
            write!(f, "{}:{}", self.network, hex::encode(self.mac()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_unused_octets() {
        let a = Address::remote(5, &[0x0A, 0x0B]).unwrap();
        let mut b = Address::remote(5, &[0x0A, 0x0B, 0x0C]).unwrap();
        assert_ne!(a, b);

        b.set_mac(&[0x0A, 0x0B]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, Address::remote(6, &[0x0A, 0x0B]).unwrap());
    }

    #[test]
    fn test_broadcast_forms() {
        let global = Address::global_broadcast();
        assert!(global.is_global_broadcast());
        assert!(global.is_broadcast());
        assert!(!global.is_local());

        let net = Address::network_broadcast(12);
        assert!(net.is_broadcast());
        assert!(!net.is_global_broadcast());

        let station = Address::local(&[0x7F]).unwrap();
        assert!(station.is_local());
        assert!(!station.is_broadcast());
        assert_eq!(station.mac(), &[0x7F]);
    }

    #[test]
    fn test_too_long_mac_rejected() {
        let err = Address::local(&[0u8; MAX_MAC_LEN + 1]).unwrap_err();
        assert_eq!(err, NetworkError::InvalidAddress(MAX_MAC_LEN + 1));
        assert!(Address::local(&[0u8; MAX_MAC_LEN]).is_ok());
    }

    #[test]
    fn test_clear() {
        let mut addr = Address::remote(100, &[1, 2, 3]).unwrap();
        addr.clear();
        assert_eq!(addr, Address::default());
        assert_eq!(addr.mac_len(), 0);
        assert_eq!(addr.to_string(), "0:*");
    }
}
