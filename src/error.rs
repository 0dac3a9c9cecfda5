//! Error types for `RelayPanel`
//!
//! This module defines all error types used throughout the application,
//! providing clear error messages and proper error propagation.
//!
//! Error variants use `#[source]` to preserve error chains for better
//! observability and debugging.

use std::path::PathBuf;
use thiserror::Error;

/// Simple error type for wrapping string messages while implementing `std::error::Error`
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StringError(pub String);

impl StringError {
    /// Create a new `StringError` from a string message
    pub fn new(msg: impl Into<String>) -> Box<Self> {
        Box::new(Self(msg.into()))
    }
}

/// Main error type for `RelayPanel`
#[derive(Debug, Error)]
pub enum RelayPanelError {
    /// The vendor shared library is missing or could not be loaded
    #[error("Failed to load relay library {}: {source}", .path.display())]
    LibraryLoadFailed {
        /// Path that was attempted
        path: PathBuf,
        /// Loader error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// `usb_relay_init` returned a nonzero code
    #[error("Relay library initialization failed with code {0}")]
    LibraryInitFailed(i32),

    /// A required symbol is not exported by the library
    #[error("Missing relay library export: {0}")]
    MissingExport(&'static str),

    /// The driver reported an identifier that is not a 5-character serial
    #[error("Invalid device identifier {0:?}: expected 5 characters")]
    InvalidDeviceId(String),

    /// The identifier is not part of the current enumeration
    #[error("Device {0} is not enumerated")]
    DeviceNotFound(String),

    /// The driver returned a null handle on open
    #[error("Cannot open device {0}")]
    DeviceOpenFailed(String),

    /// Another session on this device is still alive (e.g. a pulse is running)
    #[error("Device {0} is busy")]
    DeviceBusy(String),

    /// The device reported a channel count outside 1-8
    #[error("Bad number of channels on device {device}: {count} (can be 1-8)")]
    BadChannelCount {
        /// Device identifier
        device: String,
        /// Reported count
        count: i32,
    },

    /// Channel index outside the board's channel range
    #[error("Channel {channel} out of range for device {device} ({count} channels)")]
    ChannelOutOfRange {
        /// Device identifier
        device: String,
        /// Requested channel
        channel: u8,
        /// Channels on the board
        count: u8,
    },

    /// The driver rejected a channel open/close
    #[error("Failed to {action} channel {channel} on device {device} (code {code})")]
    ChannelOperationFailed {
        /// "open", "close" or "close all"
        action: &'static str,
        /// Device identifier
        device: String,
        /// Channel index (0 for all channels)
        channel: u8,
        /// Driver return code
        code: i32,
    },

    /// The status bitmap read returned a negative value
    #[error("Bad status bitmask from device {0}")]
    StatusReadFailed(String),

    /// Operator entered something that is not a usable duration
    #[error("Invalid duration {0:?}")]
    InvalidDuration(String),

    /// Unit selector text is not one of s, ms, μs
    #[error("Unknown time unit {0:?}")]
    UnknownTimeUnit(String),

    /// A pulse is already running on this channel
    #[error("A pulse is already running on {0}")]
    PulseInProgress(String),

    /// The window icon could not be decoded
    #[error("Failed to decode icon {}: {source}", .path.display())]
    IconLoadFailed {
        /// Icon file
        path: PathBuf,
        /// Decoder error
        #[source]
        source: image::ImageError,
    },

    /// GUI referred to a row that does not exist
    #[error("No relay row at index {0}")]
    NoSuchRow(usize),

    /// Configuration error
    /// Preserves the underlying error source for full error chain transparency
    #[error("Configuration error: {0}")]
    ConfigError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Duration store encoding/decoding error
    #[error("Store encoding error: {0}")]
    StoreEncodingError(#[from] bincode::Error),
}

/// Result type alias for `RelayPanel` operations
pub type Result<T> = std::result::Result<T, RelayPanelError>;

/// Status line text for a recoverable failure
pub fn operation_failed(error: &RelayPanelError) -> String {
    format!("operation failed: {error}")
}

/// Convert an error to a user-friendly message
///
/// This function takes a `RelayPanelError` and returns a message suitable
/// for displaying to end users in error dialogs.
pub fn get_user_friendly_error(error: &RelayPanelError) -> String {
    match error {
        RelayPanelError::LibraryLoadFailed { path, .. } => {
            format!(
                "Could not load the relay driver library:\n\n{}\n\n\
                 Please ensure:\n\
                 - The library file exists in the configured library directory\n\
                 - It matches this program's architecture (32/64-bit)",
                path.display()
            )
        }
        RelayPanelError::LibraryInitFailed(code) => format!(
            "The relay driver library failed to initialize (code {code}).\n\n\
             Try reconnecting the relay boards and restarting."
        ),
        RelayPanelError::MissingExport(name) => format!(
            "The relay driver library is missing the function {name}.\n\n\
             The installed library version is not supported."
        ),
        RelayPanelError::DeviceOpenFailed(id) | RelayPanelError::DeviceNotFound(id) => {
            format!(
                "Cannot open relay board {id}.\n\n\
                 Check that it is still connected."
            )
        }
        RelayPanelError::DeviceBusy(id) => format!(
            "Relay board {id} is busy.\n\n\
             Wait for the running pulse to finish or cancel it."
        ),
        RelayPanelError::InvalidDuration(text) => format!(
            "{text:?} is not a valid duration.\n\n\
             Enter a non-negative number."
        ),
        RelayPanelError::ConfigError(_) => "Failed to load or save configuration.\n\n\
             Your settings may not persist.\n\
             Check that you have write permissions to the configuration directory."
            .to_string(),
        RelayPanelError::IoError(e) => {
            format!(
                "A file system error occurred:\n\n{e}\n\n\
                 Please check file permissions and disk space."
            )
        }
        RelayPanelError::JsonError(e) => {
            format!(
                "A settings file is corrupted:\n\n{e}\n\n\
                 The application will use default settings."
            )
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = RelayPanelError::DeviceOpenFailed("AB12C".to_string());
        assert_eq!(error.to_string(), "Cannot open device AB12C");
    }

    #[test]
    fn test_operation_failed_prefix() {
        let error = RelayPanelError::InvalidDuration("abc".to_string());
        assert_eq!(
            operation_failed(&error),
            "operation failed: Invalid duration \"abc\""
        );
    }

    #[test]
    fn test_bad_channel_count_display() {
        let error = RelayPanelError::BadChannelCount {
            device: "AB12C".to_string(),
            count: 9,
        };
        assert!(error.to_string().contains("can be 1-8"));
    }

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: RelayPanelError = io_error.into();
        assert!(matches!(error, RelayPanelError::IoError(_)));
    }

    #[test]
    fn test_library_load_user_friendly() {
        let error = RelayPanelError::LibraryLoadFailed {
            path: PathBuf::from("./usb_relay_device.so"),
            source: StringError::new("not found"),
        };
        let message = get_user_friendly_error(&error);
        assert!(message.contains("usb_relay_device.so"));
        assert!(message.contains("architecture"));
    }

    #[test]
    fn test_user_friendly_falls_back_to_display() {
        let error = RelayPanelError::PulseInProgress("AB12C1".to_string());
        assert_eq!(
            get_user_friendly_error(&error),
            "A pulse is already running on AB12C1"
        );
    }
}
