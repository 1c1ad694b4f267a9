//! Error types for DRM output operations

use thiserror::Error;

/// Errors that can occur while driving the DRM output
#[derive(Error, Debug)]
pub enum DrmError {
    /// The display is disconnected
    ///
    /// Reported once per unplug by [`DrmOutput::open`](crate::DrmOutput::open);
    /// every other operation short-circuits silently until reconnect.
    #[error("Display is not plugged")]
    Unplugged,

    /// Device, sysfs or ioctl I/O failure
    #[error("DRM I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required DRM capability is missing on this device
    #[error("{0} is not supported by the DRM device")]
    CapabilityMissing(&'static str),

    /// No usable connector was found for the configured port
    #[error("No appropriate connector for port {0}")]
    NoConnector(String),

    /// No page-flip event arrived within the configured timeout
    #[error("Device timeout while waiting VSync")]
    VsyncTimeout,

    /// Operation called in the wrong lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),
}

/// Result type for DRM operations
pub type Result<T> = std::result::Result<T, DrmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(DrmError::Unplugged.to_string(), "Display is not plugged");
        assert!(DrmError::NoConnector("HDMI-A-1".into())
            .to_string()
            .contains("HDMI-A-1"));
    }
}
