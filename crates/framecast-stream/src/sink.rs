//! Downstream sink contracts and fan-out helpers
//!
//! Sinks are optional shared-memory consumers attached to the pipeline:
//! a raw-frame sink, a JPEG sink and an H.264 pipeline. Failures inside a
//! sink are the sink's own concern; the stream loop only asks "would you
//! accept this frame" and moves on.

use std::sync::Arc;

use crate::frame::Frame;

/// Shared-memory frame sink collaborator
pub trait MemSink: Send + Sync {
    /// Whether the sink would accept this frame right now
    fn check(&self, frame: &Frame) -> bool;

    /// Publish a frame; `key_requested` is an out-flag some clients set to
    /// ask the producer for a keyframe (ignored by the MJPEG paths)
    fn put(&self, frame: &Frame, key_requested: &mut bool);

    /// Whether any client is currently attached
    fn has_clients(&self) -> bool;
}

/// H.264 pipeline collaborator
///
/// Consumes raw frames, encodes and forwards to its own sink.
pub trait H264Stream: Send + Sync {
    /// Feed one raw frame; `force_key` requests an IDR frame so a late
    /// subscriber can start decoding
    fn process(&self, frame: &Frame, force_key: bool);

    /// Whether the H.264 sink has any client attached
    fn has_clients(&self) -> bool;
}

/// Conditional sink put: only if the sink exists and accepts the frame
pub(crate) fn sink_put(sink: Option<&Arc<dyn MemSink>>, frame: &Frame) {
    if let Some(sink) = sink {
        if sink.check(frame) {
            let mut key_requested = false; // Unused by the stream
            sink.put(frame, &mut key_requested);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct CountingSink {
        accept: AtomicBool,
        puts: AtomicUsize,
    }

    impl MemSink for CountingSink {
        fn check(&self, _frame: &Frame) -> bool {
            self.accept.load(Ordering::Relaxed)
        }

        fn put(&self, _frame: &Frame, _key_requested: &mut bool) {
            self.puts.fetch_add(1, Ordering::Relaxed);
        }

        fn has_clients(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_sink_put_respects_check() {
        let sink: Arc<CountingSink> = Arc::new(CountingSink {
            accept: AtomicBool::new(false),
            puts: AtomicUsize::new(0),
        });
        let dyn_sink: Arc<dyn MemSink> = sink.clone();
        let frame = Frame::new();

        sink_put(Some(&dyn_sink), &frame);
        assert_eq!(sink.puts.load(Ordering::Relaxed), 0);

        sink.accept.store(true, Ordering::Relaxed);
        sink_put(Some(&dyn_sink), &frame);
        assert_eq!(sink.puts.load(Ordering::Relaxed), 1);

        // Absent sink is a no-op
        sink_put(None, &frame);
    }
}
