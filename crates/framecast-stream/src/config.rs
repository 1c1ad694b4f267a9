//! Stream configuration
//!
//! Options recognized by the capture/encode pipeline, with a builder for
//! ergonomic construction.
//!
//! # Examples
//!
//! ```rust
//! use framecast_stream::StreamConfig;
//!
//! let config = StreamConfig::builder()
//!     .slowdown(true)
//!     .last_as_blank(2)
//!     .exit_on_no_clients(30.0)
//!     .build();
//! ```

/// Configuration for the streaming pipeline
///
/// Use [`StreamConfig::builder()`] or struct literal syntax with
/// [`Default::default()`].
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Stall the loop while no client is connected anywhere (default: false)
    ///
    /// Sleeps in 100 ms steps up to 1 s between grabs; the first frame after
    /// a slowdown is encoded as an H.264 keyframe so a late subscriber can
    /// start decoding immediately.
    pub slowdown: bool,

    /// What to publish after the capture goes offline (default: -1)
    ///
    /// - `< 0`: switch to the blank frame immediately
    /// - `0`: keep showing the last live frame forever
    /// - `> 0`: keep the last live frame for that many seconds, then blank
    pub last_as_blank: i32,

    /// Seconds to sleep between failed init attempts (default: 1.0)
    pub error_delay: f64,

    /// Self-terminate after this many seconds without any client
    /// (default: 0.0 = disabled)
    pub exit_on_no_clients: f64,

    /// H.264 target bitrate in kbit/s (default: 5000)
    pub h264_bitrate: u32,

    /// H.264 GOP length in frames (default: 30)
    pub h264_gop: u32,

    /// V4L2 M2M device path for the H.264 encoder (default: None)
    pub h264_m2m_path: Option<String>,

    /// Raw-frame shared-memory sink path (default: None)
    pub raw_sink_path: Option<String>,

    /// JPEG shared-memory sink path (default: None)
    pub jpeg_sink_path: Option<String>,

    /// H.264 shared-memory sink path (default: None)
    pub h264_sink_path: Option<String>,

    /// Blank geometry before the first successful open (default: 640x480)
    ///
    /// Once the device has been opened, its run geometry is authoritative.
    pub fallback_size: (u32, u32),
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            slowdown: false,
            last_as_blank: -1,
            error_delay: 1.0,
            exit_on_no_clients: 0.0,
            h264_bitrate: 5000,
            h264_gop: 30,
            h264_m2m_path: None,
            raw_sink_path: None,
            jpeg_sink_path: None,
            h264_sink_path: None,
            fallback_size: (640, 480),
        }
    }
}

impl StreamConfig {
    /// Create a configuration builder
    #[must_use]
    pub fn builder() -> StreamConfigBuilder {
        StreamConfigBuilder::default()
    }

    /// Validate configuration and return any issues
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut issues = Vec::new();

        if self.error_delay <= 0.0 {
            issues.push("error_delay must be positive".to_string());
        }

        if self.exit_on_no_clients < 0.0 {
            issues.push("exit_on_no_clients cannot be negative".to_string());
        }

        if self.h264_bitrate == 0 {
            issues.push("h264_bitrate must be at least 1 kbit/s".to_string());
        }

        if self.h264_gop == 0 {
            issues.push("h264_gop must be at least 1".to_string());
        }

        let (width, height) = self.fallback_size;
        if width == 0 || height == 0 {
            issues.push("fallback_size must be non-zero".to_string());
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}

/// Builder for [`StreamConfig`]
#[derive(Debug, Clone, Default)]
pub struct StreamConfigBuilder {
    slowdown: Option<bool>,
    last_as_blank: Option<i32>,
    error_delay: Option<f64>,
    exit_on_no_clients: Option<f64>,
    h264_bitrate: Option<u32>,
    h264_gop: Option<u32>,
    h264_m2m_path: Option<String>,
    raw_sink_path: Option<String>,
    jpeg_sink_path: Option<String>,
    h264_sink_path: Option<String>,
    fallback_size: Option<(u32, u32)>,
}

impl StreamConfigBuilder {
    /// Enable the no-clients slowdown
    #[must_use]
    pub fn slowdown(mut self, enable: bool) -> Self {
        self.slowdown = Some(enable);
        self
    }

    /// Set the offline last-frame policy
    #[must_use]
    pub fn last_as_blank(mut self, seconds: i32) -> Self {
        self.last_as_blank = Some(seconds);
        self
    }

    /// Set the init retry delay in seconds
    #[must_use]
    pub fn error_delay(mut self, seconds: f64) -> Self {
        self.error_delay = Some(seconds);
        self
    }

    /// Set the no-clients self-termination window in seconds
    #[must_use]
    pub fn exit_on_no_clients(mut self, seconds: f64) -> Self {
        self.exit_on_no_clients = Some(seconds);
        self
    }

    /// Set the H.264 bitrate in kbit/s
    #[must_use]
    pub fn h264_bitrate(mut self, kbps: u32) -> Self {
        self.h264_bitrate = Some(kbps);
        self
    }

    /// Set the H.264 GOP length
    #[must_use]
    pub fn h264_gop(mut self, gop: u32) -> Self {
        self.h264_gop = Some(gop);
        self
    }

    /// Set the H.264 M2M encoder device path
    #[must_use]
    pub fn h264_m2m_path(mut self, path: impl Into<String>) -> Self {
        self.h264_m2m_path = Some(path.into());
        self
    }

    /// Set the raw-frame sink path
    #[must_use]
    pub fn raw_sink_path(mut self, path: impl Into<String>) -> Self {
        self.raw_sink_path = Some(path.into());
        self
    }

    /// Set the JPEG sink path
    #[must_use]
    pub fn jpeg_sink_path(mut self, path: impl Into<String>) -> Self {
        self.jpeg_sink_path = Some(path.into());
        self
    }

    /// Set the H.264 sink path
    #[must_use]
    pub fn h264_sink_path(mut self, path: impl Into<String>) -> Self {
        self.h264_sink_path = Some(path.into());
        self
    }

    /// Set the pre-open blank geometry
    #[must_use]
    pub fn fallback_size(mut self, width: u32, height: u32) -> Self {
        self.fallback_size = Some((width, height));
        self
    }

    /// Build the configuration, falling back to defaults for unset fields
    #[must_use]
    pub fn build(self) -> StreamConfig {
        let defaults = StreamConfig::default();
        StreamConfig {
            slowdown: self.slowdown.unwrap_or(defaults.slowdown),
            last_as_blank: self.last_as_blank.unwrap_or(defaults.last_as_blank),
            error_delay: self.error_delay.unwrap_or(defaults.error_delay),
            exit_on_no_clients: self
                .exit_on_no_clients
                .unwrap_or(defaults.exit_on_no_clients),
            h264_bitrate: self.h264_bitrate.unwrap_or(defaults.h264_bitrate),
            h264_gop: self.h264_gop.unwrap_or(defaults.h264_gop),
            h264_m2m_path: self.h264_m2m_path,
            raw_sink_path: self.raw_sink_path,
            jpeg_sink_path: self.jpeg_sink_path,
            h264_sink_path: self.h264_sink_path,
            fallback_size: self.fallback_size.unwrap_or(defaults.fallback_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StreamConfig::default();
        assert!(!config.slowdown);
        assert_eq!(config.last_as_blank, -1);
        assert_eq!(config.error_delay, 1.0);
        assert_eq!(config.exit_on_no_clients, 0.0);
        assert_eq!(config.h264_bitrate, 5000);
        assert_eq!(config.h264_gop, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = StreamConfig::builder()
            .slowdown(true)
            .last_as_blank(5)
            .error_delay(2.0)
            .h264_bitrate(8000)
            .jpeg_sink_path("/run/framecast/jpeg")
            .build();
        assert!(config.slowdown);
        assert_eq!(config.last_as_blank, 5);
        assert_eq!(config.error_delay, 2.0);
        assert_eq!(config.h264_bitrate, 8000);
        assert_eq!(config.jpeg_sink_path.as_deref(), Some("/run/framecast/jpeg"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = StreamConfig {
            error_delay: 0.0,
            h264_gop: 0,
            ..Default::default()
        };
        let issues = config.validate().expect_err("invalid");
        assert_eq!(issues.len(), 2);
    }
}
