//! # Snapshot Format
//!
//! Binary serialization for [`WizardState`].
//!
//! Format: Header (5 bytes) + postcard-serialized state.
//! - 4 bytes: Magic ("VWIZ")
//! - 1 byte: Version
//!
//! Snapshots may come from disk or from a client, so size and header are
//! checked before the payload is decoded.

use crate::controller::WizardState;
use crate::{WizardError, primitives};

/// Maximum accepted snapshot size.
///
/// A wizard state is a few hundred bytes; anything near this limit is not
/// a snapshot.
pub const MAX_SNAPSHOT_SIZE: usize = 64 * 1024;

const HEADER_LEN: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The header preceding every snapshot payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), WizardError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(WizardError::DeserializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(WizardError::DeserializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WizardError> {
        let Some(header) = bytes.get(..HEADER_LEN) else {
            return Err(WizardError::DeserializationError(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[..4]);
        Ok(Self {
            magic,
            version: header[4],
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION
// =============================================================================

/// Encode a wizard state (header + payload).
pub fn state_to_bytes(state: &WizardState) -> Result<Vec<u8>, WizardError> {
    let payload =
        postcard::to_stdvec(state).map_err(|e| WizardError::SerializationError(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&SnapshotHeader::new().to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode a wizard state.
///
/// Only the encoding is checked here. Whether the state fits a machine
/// table is decided by `WizardController::restore`.
pub fn state_from_bytes(bytes: &[u8]) -> Result<WizardState, WizardError> {
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(WizardError::DeserializationError(format!(
            "Snapshot of {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    SnapshotHeader::from_bytes(bytes)?.validate()?;

    postcard::from_bytes(&bytes[HEADER_LEN..]).map_err(|e| {
        WizardError::DeserializationError(format!("Failed to decode wizard state: {}", e))
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Feature, FlowParams, MachineRegistry, WizardController};
    use std::sync::Arc;

    fn walked_state() -> WizardState {
        let registry = MachineRegistry::builtin().expect("builtin machines validate");
        let mut wizard = WizardController::new(Arc::new(registry));
        wizard.restart_guide();
        wizard.save_features(&[Feature::Secrets, Feature::Tools]);
        wizard.send_feature(&crate::Event::CONTINUE, None);
        wizard.send_feature(&crate::Event::CONTINUE, Some(FlowParams::mount("kv")));
        wizard.state().clone()
    }

    #[test]
    fn header_layout() {
        let bytes = SnapshotHeader::new().to_bytes();
        assert_eq!(&bytes[..4], b"VWIZ");
        assert_eq!(bytes[4], primitives::FORMAT_VERSION);
    }

    #[test]
    fn encoding_is_bit_exact_across_decode() {
        let state = walked_state();
        let first = state_to_bytes(&state).expect("encode");
        let decoded = state_from_bytes(&first).expect("decode");
        let second = state_to_bytes(&decoded).expect("re-encode");

        assert_eq!(decoded, state);
        assert_eq!(first, second);
    }

    #[test]
    fn wrong_magic_rejected() {
        let mut bytes = state_to_bytes(&walked_state()).expect("encode");
        bytes[..4].copy_from_slice(b"KREM");
        assert!(matches!(
            state_from_bytes(&bytes),
            Err(WizardError::DeserializationError(_))
        ));
    }

    #[test]
    fn future_version_rejected() {
        let mut bytes = state_to_bytes(&walked_state()).expect("encode");
        bytes[4] = primitives::FORMAT_VERSION + 1;
        assert!(state_from_bytes(&bytes).is_err());
    }

    #[test]
    fn truncated_and_oversized_input_rejected() {
        assert!(state_from_bytes(b"VWI").is_err());
        assert!(state_from_bytes(&vec![0u8; MAX_SNAPSHOT_SIZE + 1]).is_err());

        let bytes = state_to_bytes(&walked_state()).expect("encode");
        assert!(state_from_bytes(&bytes[..bytes.len() - 3]).is_err());
    }
}
