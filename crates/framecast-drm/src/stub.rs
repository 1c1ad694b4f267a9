//! Stub screen catalog
//!
//! When the output cannot mirror the capture (no device, wrong format,
//! unsupported resolution, busy) it shows a rasterized placeholder instead.
//! The texts are fixed and user-visible.

use framecast_stream::DeviceRuntime;

/// Which placeholder the stub path should draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubKind {
    /// Opened without a capture device at all
    User,

    /// Capture geometry has no acceptable display mode
    BadResolution,

    /// Capture pixel format cannot be scanned out
    BadFormat,

    /// Capture is offline
    NoSignal,

    /// Another consumer owns the capture
    Busy,
}

/// The placeholder text for a stub kind
///
/// `BadResolution` interpolates the capture geometry when available.
pub fn stub_text(kind: StubKind, dev: Option<&DeviceRuntime>) -> String {
    match kind {
        StubKind::BadResolution => {
            let (width, height, hz) = dev
                .map(|run| (run.width, run.height, run.hz))
                .unwrap_or((0, 0, 0.0));
            format!(
                "=== PiKVM ===\
                \n \n< UNSUPPORTED RESOLUTION >\
                \n \n< {width}x{height}p{hz:.2} >\
                \n \nby this display"
            )
        }
        StubKind::BadFormat => "=== PiKVM ===\
            \n \n< UNSUPPORTED CAPTURE FORMAT >\
            \n \nIt shouldn't happen ever.\
            \n \nPlease check the logs and report a bug:\
            \n \n- https://github.com/pikvm/pikvm -"
            .to_string(),
        StubKind::NoSignal => "=== PiKVM ===\n \n< NO SIGNAL >".to_string(),
        StubKind::Busy => "=== PiKVM ===\n \n< ONLINE IS ACTIVE >".to_string(),
        StubKind::User => "=== PiKVM ===\n \n< ??? >".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framecast_stream::FourCC;

    fn runtime() -> DeviceRuntime {
        DeviceRuntime {
            width: 1920,
            height: 1200,
            hz: 60.0,
            format: FourCC::RGB24,
            stride: 1920 * 3,
            n_bufs: 4,
            dma_fds: vec![None; 4],
        }
    }

    #[test]
    fn test_bad_resolution_interpolates_geometry() {
        let run = runtime();
        let text = stub_text(StubKind::BadResolution, Some(&run));
        assert!(text.contains("< UNSUPPORTED RESOLUTION >"));
        assert!(text.contains("< 1920x1200p60.00 >"));
        assert!(text.starts_with("=== PiKVM ==="));
    }

    #[test]
    fn test_fixed_texts() {
        assert_eq!(
            stub_text(StubKind::NoSignal, None),
            "=== PiKVM ===\n \n< NO SIGNAL >"
        );
        assert_eq!(
            stub_text(StubKind::Busy, None),
            "=== PiKVM ===\n \n< ONLINE IS ACTIVE >"
        );
        assert!(stub_text(StubKind::BadFormat, None).contains("UNSUPPORTED CAPTURE FORMAT"));
    }
}
