//! ReinitializeDevice service (ASHRAE 135 clause 16.4)

use crate::encoding;
use crate::generate_custom_enum;

use super::{starts_with_context, Result, ServiceError};

generate_custom_enum!(
    /// Reinitialized state of device (BACnetReinitializedStateOfDevice)
    ReinitializedState {
        Coldstart = 0,
        Warmstart = 1,
        StartBackup = 2,
        EndBackup = 3,
        StartRestore = 4,
        EndRestore = 5,
        AbortRestore = 6,
    },
    u32,
    64..=255
);

/// Reinitialize Device request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReinitializeDeviceRequest {
    pub state: ReinitializedState,
    pub password: Option<String>,
}

impl ReinitializeDeviceRequest {
    pub fn new(state: ReinitializedState) -> Self {
        Self {
            state,
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> encoding::Result<()> {
        encoding::encode_context_enumerated(buffer, 0, self.state.into())?;
        if let Some(password) = &self.password {
            encoding::encode_context_character_string(buffer, 1, password)?;
        }
        Ok(())
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(ServiceError::MissingRequiredParameter);
        }
        let (state, mut pos) = encoding::decode_context_enumerated(data, 0)?;
        let state = ReinitializedState::from(state);
        if matches!(state, ReinitializedState::Reserved(_)) {
            return Err(ServiceError::ParameterOutOfRange);
        }

        let password = if starts_with_context(&data[pos..], 1) {
            let (password, consumed) = encoding::decode_context_character_string(&data[pos..], 1)?;
            pos += consumed;
            Some(password)
        } else {
            None
        };

        if pos != data.len() {
            return Err(ServiceError::InvalidTag);
        }
        Ok(Self { state, password })
    }
}
