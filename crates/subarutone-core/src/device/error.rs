//! Device error types

use thiserror::Error;

/// Errors of microphone discovery and acquisition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// No audio input device exists
    #[error("No audio input device found")]
    NotFound,

    /// The platform refused microphone access
    #[error("Microphone permission denied: {0}")]
    PermissionDenied(String),

    /// A stream could not be opened or started
    #[error("Failed to acquire microphone stream: {0}")]
    AcquisitionFailed(String),
}

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

impl DeviceError {
    /// Classify a backend error message
    ///
    /// Backends report permission problems as plain text, so this looks for
    /// the usual wording.
    pub fn from_backend_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let denied = ["permission", "denied", "not authorized", "not allowed"]
            .iter()
            .any(|needle| lower.contains(needle));
        if denied {
            DeviceError::PermissionDenied(message)
        } else {
            DeviceError::AcquisitionFailed(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_permission_messages() {
        assert!(matches!(
            DeviceError::from_backend_message("Permission denied (os error 13)"),
            DeviceError::PermissionDenied(_)
        ));
        assert!(matches!(
            DeviceError::from_backend_message("App is not authorized to record"),
            DeviceError::PermissionDenied(_)
        ));
        assert_eq!(
            DeviceError::from_backend_message("device busy"),
            DeviceError::AcquisitionFailed("device busy".to_string())
        );
    }
}
