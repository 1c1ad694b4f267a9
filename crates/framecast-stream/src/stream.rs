//! Capture/encode pipeline loop
//!
//! [`Stream`] orchestrates the capture device, the encoder worker pool, the
//! HTTP JPEG ring and the optional sinks:
//!
//! ```text
//! ┌──────────────┐   grab    ┌────────────┐  assign  ┌──────────────┐
//! │ capture dev  │ ────────▶ │ stream loop│ ───────▶ │ worker pool  │
//! └──────┬───────┘           └─────┬──────┘          └──────┬───────┘
//!        ▲                         │ raw fan-out            │ JPEG
//!        │ release (per-index      ▼                        ▼
//!        │ depth-1 mailboxes)  raw sink,              HTTP JPEG ring,
//!        └──────────────────── H.264 pipeline         JPEG sink
//! ```
//!
//! The loop runs on the caller's thread; `n_bufs` releaser threads return
//! hardware buffers to the driver so a slow release ioctl never stalls the
//! grab path. Two stop flags shut the machinery down in lockstep: `stop` is
//! user-initiated, `release_stop` is raised by the release path (and by
//! teardown) so the loop and the releasers never block on each other.
//!
//! While the device is unavailable the loop stays in its init phase,
//! publishing a "< NO SIGNAL >" blank and probing the device node once per
//! `error_delay`. A device error mid-run tears the pipeline down and
//! re-enters init; the consumer-facing contract is a live frame, a frozen
//! last frame or the blank — never a stall.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use nix::unistd::{access, AccessFlags};
use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

use crate::blank::{Blank, NO_SIGNAL_TEXT};
use crate::clock;
use crate::config::StreamConfig;
use crate::device::{CaptureDevice, GrabError, HwFrame};
use crate::encoder::Encoder;
use crate::error::{Result, StreamError};
use crate::frame::Frame;
use crate::queue::{GetError, Queue};
use crate::ring::Ring;
use crate::sink::{sink_put, H264Stream, MemSink};
use crate::workers::WorkerPool;

/// Slots in the HTTP JPEG ring
const HTTP_RING_SLOTS: usize = 4;

/// Releaser poll interval and ring-full retry granularity
const RETRY_TIMEOUT: Duration = Duration::from_millis(100);

/// Loop-visible counters for the HTTP collaborator
///
/// The HTTP server flips `http_has_clients` and touches the last-request
/// timestamp; the loop publishes the per-second captured FPS.
pub struct StreamStats {
    http_has_clients: AtomicBool,
    http_last_request_ts: AtomicU64,
    captured_fps: AtomicU32,
}

impl StreamStats {
    fn new() -> Self {
        Self {
            http_has_clients: AtomicBool::new(false),
            http_last_request_ts: AtomicU64::new(0.0f64.to_bits()),
            captured_fps: AtomicU32::new(0),
        }
    }

    /// Record whether any HTTP client is connected
    pub fn set_http_clients(&self, has_clients: bool) {
        self.http_has_clients.store(has_clients, Ordering::Release);
    }

    /// Whether any HTTP client is connected
    pub fn http_has_clients(&self) -> bool {
        self.http_has_clients.load(Ordering::Acquire)
    }

    /// Mark an HTTP request as just-received
    pub fn touch_http_request(&self) {
        self.set_http_last_request_ts(clock::now_monotonic());
    }

    /// Monotonic timestamp of the last HTTP request, in seconds
    pub fn http_last_request_ts(&self) -> f64 {
        f64::from_bits(self.http_last_request_ts.load(Ordering::Acquire))
    }

    fn set_http_last_request_ts(&self, ts: f64) {
        self.http_last_request_ts.store(ts.to_bits(), Ordering::Release);
    }

    /// Frames captured during the last whole monotonic second
    pub fn captured_fps(&self) -> u32 {
        self.captured_fps.load(Ordering::Relaxed)
    }
}

/// What the exposure decided to publish
enum Publish {
    Alive,
    Blank,
    Dead,
}

/// Per-run mutable state owned by the loop thread
struct RunState {
    blank: Blank,
    last_online: bool,
    last_as_blank_ts: f64,
}

struct Releaser {
    queue: Arc<Queue<HwFrame>>,
    thread: JoinHandle<()>,
}

/// The capture/encode pipeline
pub struct Stream<D, E> {
    config: StreamConfig,
    dev: Arc<D>,
    enc: Arc<E>,
    raw_sink: Option<Arc<dyn MemSink>>,
    jpeg_sink: Option<Arc<dyn MemSink>>,
    h264: Option<Arc<dyn H264Stream>>,
    on_no_clients: Option<Box<dyn Fn() + Send + Sync>>,
    ring: Arc<Ring<Frame>>,
    stats: Arc<StreamStats>,
    stop: Arc<AtomicBool>,
    release_stop: Arc<AtomicBool>,
    release_guard: Arc<Mutex<()>>,
}

impl<D, E> Stream<D, E>
where
    D: CaptureDevice + 'static,
    E: Encoder,
{
    /// Create a pipeline over borrowed device and encoder collaborators
    pub fn new(config: StreamConfig, dev: Arc<D>, enc: Arc<E>) -> Result<Self> {
        config
            .validate()
            .map_err(|issues| StreamError::InvalidConfig(issues.join(", ")))?;
        Ok(Self {
            config,
            dev,
            enc,
            raw_sink: None,
            jpeg_sink: None,
            h264: None,
            on_no_clients: None,
            ring: Arc::new(Ring::with_slots(HTTP_RING_SLOTS, Frame::new)),
            stats: Arc::new(StreamStats::new()),
            stop: Arc::new(AtomicBool::new(false)),
            release_stop: Arc::new(AtomicBool::new(false)),
            release_guard: Arc::new(Mutex::new(())),
        })
    }

    /// Attach a raw-frame sink
    #[must_use]
    pub fn with_raw_sink(mut self, sink: Arc<dyn MemSink>) -> Self {
        self.raw_sink = Some(sink);
        self
    }

    /// Attach a JPEG sink
    #[must_use]
    pub fn with_jpeg_sink(mut self, sink: Arc<dyn MemSink>) -> Self {
        self.jpeg_sink = Some(sink);
        self
    }

    /// Attach an H.264 pipeline
    #[must_use]
    pub fn with_h264(mut self, h264: Arc<dyn H264Stream>) -> Self {
        self.h264 = Some(h264);
        self
    }

    /// Install the host's no-clients termination hook
    ///
    /// Called when `exit_on_no_clients` elapses without any client; the
    /// host decides how to terminate the process.
    #[must_use]
    pub fn with_on_no_clients(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_no_clients = Some(Box::new(hook));
        self
    }

    /// The HTTP JPEG ring (consumed by the HTTP server collaborator)
    pub fn jpeg_ring(&self) -> Arc<Ring<Frame>> {
        self.ring.clone()
    }

    /// Loop counters for the HTTP collaborator
    pub fn stats(&self) -> Arc<StreamStats> {
        self.stats.clone()
    }

    /// Request loop termination; idempotent and safe from any thread
    pub fn break_loop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Run the pipeline until [`break_loop`](Self::break_loop)
    ///
    /// Alternates between the init phase (device unavailable, blank
    /// published) and the running phase. Transient device and encoder
    /// errors are absorbed by re-initializing.
    pub fn run(&self) -> Result<()> {
        info!("Using capture device: {}", self.dev.path());
        info!("Using desired FPS: {}", self.dev.desired_fps());

        self.stats.touch_http_request();

        let mut state = RunState {
            blank: Blank::new(),
            last_online: false,
            last_as_blank_ts: 0.0,
        };

        while let Some(mut pool) = self.init_loop(&mut state)? {
            let n_bufs = match self.dev.runtime() {
                Some(run) => run.n_bufs,
                None => {
                    warn!("Device opened without a runtime, reinitializing");
                    self.dev.close();
                    continue;
                }
            };
            let releasers = self.spawn_releasers(n_bufs)?;

            self.running_loop(&mut state, &mut pool, &releasers);

            self.release_stop.store(true, Ordering::Release);
            for releaser in releasers {
                releaser.queue.close();
                if releaser.thread.join().is_err() {
                    warn!("Releaser thread panicked during join");
                }
            }
            pool.join();
            self.enc.close();
            self.dev.close();
            self.release_stop.store(false, Ordering::Release);
        }
        Ok(())
    }

    fn running_loop(&self, state: &mut RunState, pool: &mut WorkerPool, releasers: &[Releaser]) {
        let mut grab_after = 0.0f64;
        let mut fluency_passed = 0u32;
        let mut captured_fps_accum = 0u32;
        let mut captured_fps_ts = -1i64;
        let mut pending = None;

        info!("Capturing ...");

        while !self.is_stopped() && !self.release_stop.load(Ordering::Acquire) {
            let ready = match pending.take() {
                Some(worker) => worker,
                None => {
                    let mut worker = match pool.wait() {
                        Ok(worker) => worker,
                        Err(_) => {
                            warn!("Worker pool disconnected, reinitializing");
                            return;
                        }
                    };
                    if let Some(hw) = worker.take_hw() {
                        self.release_buffer(releasers, hw);
                        if worker.job_failed {
                            // Suppressed; the device will deliver a fresh frame
                        } else if worker.job_timely {
                            self.expose_frame(state, Some(worker.dest()));
                            trace!(
                                "Encoded JPEG exposed; worker=enc-{}, latency={:.3}",
                                worker.index,
                                clock::now_monotonic() - worker.dest().grab_ts
                            );
                        } else {
                            debug!("Encoded JPEG dropped; worker=enc-{}", worker.index);
                        }
                    }
                    worker
                }
            };

            let h264_force_key = self.slowdown();
            if self.is_stopped() {
                return;
            }

            let hw = match self.dev.grab_buffer() {
                Ok(hw) => hw,
                Err(GrabError::Broken) => {
                    debug!("Broken frame, grabbing again");
                    pending = Some(ready);
                    continue;
                }
                Err(err @ (GrabError::PersistentTimeout | GrabError::Device(_))) => {
                    warn!("Can't grab buffer ({err}), reinitializing");
                    return;
                }
            };

            let now_ts = clock::now_monotonic();
            if now_ts < grab_after {
                fluency_passed += 1;
                trace!(
                    "Passed {fluency_passed} frames for fluency: now={now_ts:.3}, grab_after={grab_after:.3}"
                );
                self.release_buffer(releasers, hw);
                pending = Some(ready);
                continue;
            }
            fluency_passed = 0;

            let now_sec_ts = clock::floor_seconds(now_ts);
            if now_sec_ts != captured_fps_ts {
                trace!("A new second has come; captured_fps={captured_fps_accum}");
                self.stats
                    .captured_fps
                    .store(captured_fps_accum, Ordering::Relaxed);
                captured_fps_accum = 0;
                captured_fps_ts = now_sec_ts;
            }
            captured_fps_accum += 1;

            let fluency_delay = pool.fluency_delay(&ready);
            grab_after = now_ts + fluency_delay;
            trace!("Fluency: delay={fluency_delay:.3}, grab_after={grab_after:.3}");

            sink_put(self.raw_sink.as_ref(), &hw.raw);
            if let Some(h264) = &self.h264 {
                h264.process(&hw.raw, h264_force_key);
            }

            let buf_index = hw.index;
            if pool.assign(ready, hw).is_err() {
                warn!("Worker pool disconnected during assign, reinitializing");
                return;
            }
            debug!("Assigned new frame in buffer={buf_index} to worker");
        }
    }

    /// Submit a hardware buffer to its per-index release mailbox
    fn release_buffer(&self, releasers: &[Releaser], hw: HwFrame) {
        let index = hw.index;
        if index >= releasers.len() {
            error!("Buffer index={index} outside the releaser table");
            return;
        }
        if releasers[index].queue.put(hw, Duration::ZERO).is_err() {
            // The depth-1 mailbox cannot overflow: a buffer is never grabbed
            // again before its previous release completed.
            debug_assert!(false, "release mailbox overflow for buffer={index}");
            error!("Release mailbox overflow for buffer={index}");
        }
    }

    fn spawn_releasers(&self, n_bufs: usize) -> Result<Vec<Releaser>> {
        let mut releasers = Vec::with_capacity(n_bufs);
        for index in 0..n_bufs {
            let queue = Arc::new(Queue::with_capacity(1));
            let thread_queue = queue.clone();
            let dev = self.dev.clone();
            let guard = self.release_guard.clone();
            let stop = self.release_stop.clone();
            let thread = std::thread::Builder::new()
                .name(format!("releaser-{index}"))
                .spawn(move || {
                    while !stop.load(Ordering::Acquire) {
                        match thread_queue.get(RETRY_TIMEOUT) {
                            Ok(hw) => {
                                let released = {
                                    // Serializes the release ioctl against
                                    // the other releasers.
                                    let _guard = guard.lock();
                                    dev.release_buffer(hw)
                                };
                                if let Err(err) = released {
                                    error!("Can't release buffer={index}: {err}");
                                    break;
                                }
                            }
                            Err(GetError::Empty) => continue,
                            Err(GetError::Closed) => break,
                        }
                    }
                    // Stop all the other releasers too
                    stop.store(true, Ordering::Release);
                })?;
            releasers.push(Releaser { queue, thread });
        }
        Ok(releasers)
    }

    /// Observed stop condition, also driving the no-clients self-exit timer
    fn is_stopped(&self) -> bool {
        if self.stop.load(Ordering::Acquire) {
            return true;
        }
        if self.config.exit_on_no_clients > 0.0 {
            let now_ts = clock::now_monotonic();
            let last_request_ts = self.stats.http_last_request_ts();
            if self.has_any_clients() {
                self.stats.set_http_last_request_ts(now_ts);
            } else if last_request_ts + self.config.exit_on_no_clients < now_ts {
                info!(
                    "No requests or HTTP/sink clients found in last {} seconds, exiting ...",
                    self.config.exit_on_no_clients
                );
                if let Some(hook) = &self.on_no_clients {
                    hook();
                }
                self.stats.set_http_last_request_ts(now_ts);
            }
        }
        false
    }

    fn has_any_clients(&self) -> bool {
        // Sink client counters are not updated in real time; this is a
        // monitoring check, not a synchronization point.
        self.stats.http_has_clients()
            || self
                .jpeg_sink
                .as_ref()
                .is_some_and(|sink| sink.has_clients())
            || self.h264.as_ref().is_some_and(|h264| h264.has_clients())
    }

    /// Idle stall while nobody is watching
    ///
    /// Returns true after a full stall, which forces the next H.264 frame
    /// to be a keyframe so a late subscriber can decode from it.
    fn slowdown(&self) -> bool {
        if !self.config.slowdown {
            return false;
        }
        let mut count = 0;
        while count < 10 && !self.is_stopped() && !self.has_any_clients() {
            std::thread::sleep(Duration::from_millis(100));
            count += 1;
        }
        count >= 10
    }

    fn init_loop(&self, state: &mut RunState) -> Result<Option<WorkerPool>> {
        let mut access_errno: Option<nix::errno::Errno> = None;
        while !self.is_stopped() {
            let (mut width, mut height) = self
                .dev
                .runtime()
                .map(|run| (run.width, run.height))
                .unwrap_or((0, 0));
            if width == 0 || height == 0 {
                (width, height) = self.config.fallback_size;
            }
            if let Err(err) = state.blank.draw(NO_SIGNAL_TEXT, width, height) {
                warn!("Can't draw blank frame: {err}");
            }

            self.stats.captured_fps.store(0, Ordering::Relaxed);
            self.expose_frame(state, None);

            sink_put(self.raw_sink.as_ref(), state.blank.raw());
            if let Some(h264) = &self.h264 {
                h264.process(state.blank.raw(), false);
            }

            match access(self.dev.path(), AccessFlags::R_OK | AccessFlags::W_OK) {
                Err(errno) => {
                    // Log only on errno transitions to avoid spamming once
                    // per error_delay while the device stays missing.
                    if access_errno != Some(errno) {
                        warn!("Can't access device: {errno}");
                        info!("Waiting for the device access ...");
                        access_errno = Some(errno);
                    }
                }
                Ok(()) => {
                    access_errno = None;
                    let dma_export = self.enc.kind().is_m2m() || self.h264.is_some();
                    self.dev.set_dma_export(dma_export);
                    match self.dev.open() {
                        Ok(()) => match self.enc.open(self.dev.as_ref()) {
                            Ok(workers) => {
                                return Ok(Some(WorkerPool::new(
                                    workers,
                                    self.dev.desired_fps(),
                                )?));
                            }
                            Err(err) => {
                                warn!("Can't open encoder: {err}");
                                self.dev.close();
                            }
                        },
                        Err(err) => warn!("Can't open device: {err}"),
                    }
                    info!(
                        "Sleeping {} seconds before new stream init ...",
                        self.config.error_delay
                    );
                }
            }
            std::thread::sleep(Duration::from_secs_f64(self.config.error_delay));
        }
        Ok(None)
    }

    /// Publish a frame (or its absence) to the JPEG ring and JPEG sink
    ///
    /// `None` runs the offline state machine: depending on `last_as_blank`
    /// the ring gets the blank immediately, after a timer, or never (the
    /// last live frame stays on screen). Retries while the ring is full
    /// until a slot frees up or the stream is stopped.
    fn expose_frame(&self, state: &mut RunState, frame: Option<&Frame>) {
        let publish = match frame {
            Some(_) => {
                state.last_as_blank_ts = 0.0;
                debug!("Exposed ALIVE video frame");
                Publish::Alive
            }
            None => {
                let mut publish = Publish::Dead;
                if state.last_online {
                    // Transitioning online -> offline
                    if self.config.last_as_blank < 0 {
                        publish = Publish::Blank;
                        info!("Changed video frame to BLANK");
                    } else if self.config.last_as_blank > 0 {
                        state.last_as_blank_ts =
                            clock::now_monotonic() + self.config.last_as_blank as f64;
                        info!(
                            "Freezed last ALIVE video frame for {} seconds",
                            self.config.last_as_blank
                        );
                    } else {
                        info!("Freezed last ALIVE video frame forever");
                    }
                } else if self.config.last_as_blank < 0 {
                    publish = Publish::Blank;
                }

                // Already offline with an armed timer that just expired
                if self.config.last_as_blank > 0
                    && state.last_as_blank_ts != 0.0
                    && state.last_as_blank_ts < clock::now_monotonic()
                {
                    publish = Publish::Blank;
                    state.last_as_blank_ts = 0.0;
                    info!("Changed last ALIVE video frame to BLANK");
                }
                publish
            }
        };

        let mut lease = None;
        while !self.is_stopped() {
            match self.ring.producer_acquire(RETRY_TIMEOUT) {
                Some(slot) => {
                    lease = Some(slot);
                    break;
                }
                None => error!("Can't push JPEG to HTTP ring (no free slots)"),
            }
        }
        let Some(mut slot) = lease else {
            return;
        };

        match publish {
            Publish::Alive => {
                if let Some(frame) = frame {
                    slot.copy_from(frame);
                    slot.online = true;
                }
            }
            Publish::Blank => {
                slot.copy_from(state.blank.jpeg());
                slot.online = true;
            }
            Publish::Dead => {
                slot.clear();
                slot.online = false;
            }
        }
        drop(slot);
        state.last_online = frame.is_some();

        sink_put(
            self.jpeg_sink.as_ref(),
            frame.unwrap_or_else(|| state.blank.jpeg()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceError, DeviceRuntime};
    use crate::encoder::{EncodeError, EncodeWorker, EncoderKind};
    use crate::frame::FourCC;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    // ---------------------------------------------------------------------
    // Mock collaborators
    // ---------------------------------------------------------------------

    enum GrabStep {
        Frame,
        Broken,
        Timeout,
    }

    struct MockDevice {
        path: String,
        script: Mutex<VecDeque<GrabStep>>,
        released: Mutex<Vec<usize>>,
        grabbed: Mutex<Vec<usize>>,
        next_index: AtomicUsize,
        opened: AtomicBool,
        opens: AtomicUsize,
        dma_export: AtomicBool,
        n_bufs: usize,
        stop_when_done: Arc<AtomicBool>,
    }

    impl MockDevice {
        fn new(path: &str, steps: Vec<GrabStep>, stop_when_done: Arc<AtomicBool>) -> Self {
            Self {
                path: path.to_string(),
                script: Mutex::new(steps.into()),
                released: Mutex::new(Vec::new()),
                grabbed: Mutex::new(Vec::new()),
                next_index: AtomicUsize::new(0),
                opened: AtomicBool::new(false),
                opens: AtomicUsize::new(0),
                dma_export: AtomicBool::new(false),
                n_bufs: 4,
                stop_when_done,
            }
        }
    }

    impl CaptureDevice for MockDevice {
        fn path(&self) -> &str {
            &self.path
        }

        fn desired_fps(&self) -> u32 {
            0
        }

        fn set_dma_export(&self, enabled: bool) {
            self.dma_export.store(enabled, Ordering::Relaxed);
        }

        fn open(&self) -> std::result::Result<(), DeviceError> {
            self.opened.store(true, Ordering::Release);
            self.opens.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn close(&self) {
            self.opened.store(false, Ordering::Release);
        }

        fn runtime(&self) -> Option<DeviceRuntime> {
            if !self.opened.load(Ordering::Acquire) {
                return None;
            }
            Some(DeviceRuntime {
                width: 64,
                height: 48,
                hz: 30.0,
                format: FourCC::RGB24,
                stride: 64 * 3,
                n_bufs: self.n_bufs,
                dma_fds: vec![None; self.n_bufs],
            })
        }

        fn grab_buffer(&self) -> std::result::Result<HwFrame, GrabError> {
            let step = self.script.lock().pop_front();
            match step {
                Some(GrabStep::Frame) => {
                    let index =
                        self.next_index.fetch_add(1, Ordering::Relaxed) % self.n_bufs;
                    let mut raw = Frame::new();
                    raw.set_payload(b"frame-payload");
                    raw.width = 64;
                    raw.height = 48;
                    raw.format = FourCC::RGB24;
                    raw.grab_ts = clock::now_monotonic();
                    raw.online = true;
                    self.grabbed.lock().push(index);
                    Ok(HwFrame {
                        index,
                        dma_fd: None,
                        raw,
                    })
                }
                Some(GrabStep::Broken) => Err(GrabError::Broken),
                Some(GrabStep::Timeout) => Err(GrabError::PersistentTimeout),
                None => {
                    self.stop_when_done.store(true, Ordering::Release);
                    Err(GrabError::Device("script exhausted".into()))
                }
            }
        }

        fn release_buffer(&self, hw: HwFrame) -> std::result::Result<(), DeviceError> {
            self.released.lock().push(hw.index);
            Ok(())
        }
    }

    struct PassWorker;

    impl EncodeWorker for PassWorker {
        fn encode(
            &mut self,
            hw: &HwFrame,
            dest: &mut Frame,
        ) -> std::result::Result<(), EncodeError> {
            dest.set_payload(hw.raw.payload());
            dest.width = hw.raw.width;
            dest.height = hw.raw.height;
            dest.format = FourCC::JPEG;
            Ok(())
        }
    }

    struct MockEncoder {
        opens: AtomicUsize,
        closes: AtomicUsize,
    }

    impl MockEncoder {
        fn new() -> Self {
            Self {
                opens: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
            }
        }
    }

    impl Encoder for MockEncoder {
        fn kind(&self) -> EncoderKind {
            EncoderKind::Cpu
        }

        fn open(
            &self,
            _dev: &dyn CaptureDevice,
        ) -> std::result::Result<Vec<Box<dyn EncodeWorker>>, EncodeError> {
            self.opens.fetch_add(1, Ordering::Relaxed);
            Ok(vec![Box::new(PassWorker)])
        }

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        frames: Mutex<Vec<(usize, bool)>>,
        clients: AtomicBool,
    }

    impl MemSink for RecordingSink {
        fn check(&self, _frame: &Frame) -> bool {
            true
        }

        fn put(&self, frame: &Frame, _key_requested: &mut bool) {
            self.frames.lock().push((frame.used(), frame.online));
        }

        fn has_clients(&self) -> bool {
            self.clients.load(Ordering::Relaxed)
        }
    }

    #[derive(Default)]
    struct RecordingH264 {
        frames: Mutex<Vec<(usize, bool)>>,
        clients: AtomicBool,
    }

    impl H264Stream for RecordingH264 {
        fn process(&self, frame: &Frame, force_key: bool) {
            self.frames.lock().push((frame.used(), force_key));
        }

        fn has_clients(&self) -> bool {
            self.clients.load(Ordering::Relaxed)
        }
    }

    fn quick_config() -> StreamConfig {
        StreamConfig {
            error_delay: 0.02,
            ..Default::default()
        }
    }

    fn stream_over(
        config: StreamConfig,
        dev: Arc<MockDevice>,
    ) -> (Stream<MockDevice, MockEncoder>, Arc<MockEncoder>) {
        let enc = Arc::new(MockEncoder::new());
        let stream = Stream::new(config, dev, enc.clone()).expect("stream");
        (stream, enc)
    }

    // ---------------------------------------------------------------------
    // expose_frame state machine
    // ---------------------------------------------------------------------

    fn alive_frame() -> Frame {
        let mut frame = Frame::new();
        frame.set_payload(b"alive-jpeg");
        frame.online = true;
        frame
    }

    fn fresh_state() -> RunState {
        let mut state = RunState {
            blank: Blank::new(),
            last_online: false,
            last_as_blank_ts: 0.0,
        };
        state.blank.draw(NO_SIGNAL_TEXT, 64, 48).expect("blank");
        state
    }

    #[test]
    fn test_expose_alive_then_blank_immediately() {
        let stop = Arc::new(AtomicBool::new(false));
        let dev = Arc::new(MockDevice::new("/dev/null", vec![], stop));
        let (stream, _enc) = stream_over(quick_config(), dev); // last_as_blank = -1
        let mut state = fresh_state();

        stream.expose_frame(&mut state, Some(&alive_frame()));
        {
            let slot = stream.ring.consumer_acquire(Duration::ZERO).expect("slot");
            assert!(slot.online);
            assert_eq!(slot.payload(), b"alive-jpeg");
        }
        assert!(state.last_online);

        stream.expose_frame(&mut state, None);
        {
            let slot = stream.ring.consumer_acquire(Duration::ZERO).expect("slot");
            assert!(slot.online);
            assert_eq!(slot.payload(), state.blank.jpeg().payload());
        }
        assert!(!state.last_online);
    }

    #[test]
    fn test_expose_freeze_forever() {
        let stop = Arc::new(AtomicBool::new(false));
        let dev = Arc::new(MockDevice::new("/dev/null", vec![], stop));
        let config = StreamConfig {
            last_as_blank: 0,
            ..quick_config()
        };
        let (stream, _enc) = stream_over(config, dev);
        let mut state = fresh_state();

        stream.expose_frame(&mut state, Some(&alive_frame()));
        stream.ring.consumer_acquire(Duration::ZERO).expect("slot");

        // Offline: nothing new is published (dead frame, used=0)
        for _ in 0..2 {
            stream.expose_frame(&mut state, None);
            let slot = stream.ring.consumer_acquire(Duration::ZERO).expect("slot");
            assert!(!slot.online);
            assert_eq!(slot.used(), 0);
        }
    }

    #[test]
    fn test_expose_last_as_blank_timer() {
        let stop = Arc::new(AtomicBool::new(false));
        let dev = Arc::new(MockDevice::new("/dev/null", vec![], stop));
        let config = StreamConfig {
            last_as_blank: 1,
            ..quick_config()
        };
        let (stream, _enc) = stream_over(config, dev);
        let mut state = fresh_state();

        stream.expose_frame(&mut state, Some(&alive_frame()));
        stream.ring.consumer_acquire(Duration::ZERO).expect("slot");

        // Going offline arms the timer; the last frame stays (dead publish)
        stream.expose_frame(&mut state, None);
        {
            let slot = stream.ring.consumer_acquire(Duration::ZERO).expect("slot");
            assert!(!slot.online);
            assert_eq!(slot.used(), 0);
        }
        assert!(state.last_as_blank_ts > 0.0);

        // Before expiry: still no blank
        stream.expose_frame(&mut state, None);
        {
            let slot = stream.ring.consumer_acquire(Duration::ZERO).expect("slot");
            assert_eq!(slot.used(), 0);
        }

        std::thread::sleep(Duration::from_millis(1100));
        stream.expose_frame(&mut state, None);
        {
            let slot = stream.ring.consumer_acquire(Duration::ZERO).expect("slot");
            assert!(slot.online);
            assert_eq!(slot.payload(), state.blank.jpeg().payload());
        }
        assert_eq!(state.last_as_blank_ts, 0.0);
    }

    #[test]
    fn test_expose_retries_on_full_ring_and_honors_stop() {
        let stop = Arc::new(AtomicBool::new(false));
        let dev = Arc::new(MockDevice::new("/dev/null", vec![], stop));
        let (stream, _enc) = stream_over(quick_config(), dev);
        let stream = Arc::new(stream);
        let mut state = fresh_state();

        // Saturate the ring (no consumer)
        for _ in 0..HTTP_RING_SLOTS {
            stream.expose_frame(&mut state, Some(&alive_frame()));
        }

        // A further expose retries; consuming one slot lets it through
        let exposer = stream.clone();
        let handle = std::thread::spawn(move || {
            let mut state = fresh_state();
            state.last_online = true;
            exposer.expose_frame(&mut state, Some(&alive_frame()));
        });
        std::thread::sleep(Duration::from_millis(150));
        drop(stream.ring.consumer_acquire(Duration::ZERO).expect("slot"));
        handle.join().expect("exposer thread");

        // Saturate again and verify stop unblocks the retry loop
        while stream
            .ring
            .producer_acquire(Duration::ZERO)
            .map(drop)
            .is_some()
        {}
        let exposer = stream.clone();
        let handle = std::thread::spawn(move || {
            let mut state = fresh_state();
            exposer.expose_frame(&mut state, Some(&alive_frame()));
        });
        std::thread::sleep(Duration::from_millis(100));
        stream.break_loop();
        handle.join().expect("exposer thread unblocked by stop");
    }

    // ---------------------------------------------------------------------
    // End-to-end loop scenarios
    // ---------------------------------------------------------------------

    #[test]
    fn test_init_publishes_blank_when_device_missing() {
        let stop = Arc::new(AtomicBool::new(false));
        let dev = Arc::new(MockDevice::new(
            "/definitely/not/a/device",
            vec![],
            stop,
        ));
        let (stream, _enc) = stream_over(quick_config(), dev.clone());
        let stream = Arc::new(stream);

        let runner = stream.clone();
        let handle = std::thread::spawn(move || runner.run());

        std::thread::sleep(Duration::from_millis(100));
        stream.break_loop();
        handle.join().expect("loop thread").expect("clean run");

        // The ring carries the blank (last_as_blank default: blank at once)
        let slot = stream.ring.consumer_acquire(Duration::ZERO).expect("slot");
        assert!(slot.online);
        assert_eq!(&slot.payload()[..2], &[0xFF, 0xD8]);
        // Never opened: the access check kept failing
        assert_eq!(dev.opens.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_capture_roundtrip_releases_every_grab() {
        let stop = Arc::new(AtomicBool::new(false));
        let steps = (0..8).map(|_| GrabStep::Frame).collect();
        let dev = Arc::new(MockDevice::new("/dev/null", steps, stop.clone()));
        let raw_sink = Arc::new(RecordingSink::default());
        let h264 = Arc::new(RecordingH264::default());

        let (stream, enc) = stream_over(quick_config(), dev.clone());
        let stream = Arc::new(
            stream
                .with_raw_sink(raw_sink.clone() as Arc<dyn MemSink>)
                .with_h264(h264.clone() as Arc<dyn H264Stream>),
        );

        // Drain the ring so exposure never blocks
        let ring = stream.jpeg_ring();
        let drainer_stop = stop.clone();
        let drainer = std::thread::spawn(move || {
            while !drainer_stop.load(Ordering::Acquire) {
                let _ = ring.consumer_acquire(Duration::from_millis(10));
            }
        });

        let runner = stream.clone();
        let handle = std::thread::spawn(move || runner.run());

        // The device script stops the loop once exhausted
        while !stop.load(Ordering::Acquire) {
            std::thread::sleep(Duration::from_millis(10));
        }
        stream.break_loop();
        handle.join().expect("loop thread").expect("clean run");
        drainer.join().expect("drainer");

        let grabbed = dev.grabbed.lock().clone();
        let released = dev.released.lock().clone();
        assert_eq!(grabbed.len(), 8);
        // Every released index was grabbed first, and at most one frame may
        // still be in flight with a worker when teardown cuts in
        for index in &released {
            assert!(grabbed.contains(index));
        }
        assert!(released.len() >= grabbed.len() - 1);

        // Raw fan-out saw live frames (plus blanks from init phases)
        assert!(raw_sink.frames.lock().iter().any(|(used, _)| *used > 0));
        assert!(!h264.frames.lock().is_empty());
        // DMA export only when M2M or H.264 is attached; H.264 is attached
        assert!(dev.dma_export.load(Ordering::Relaxed));
        assert!(enc.opens.load(Ordering::Relaxed) >= 1);
        assert!(enc.closes.load(Ordering::Relaxed) >= 1);
    }

    #[test]
    fn test_slowdown_forces_keyframe() {
        let stop = Arc::new(AtomicBool::new(false));
        let steps = vec![GrabStep::Frame, GrabStep::Frame];
        let dev = Arc::new(MockDevice::new("/dev/null", steps, stop.clone()));
        let h264 = Arc::new(RecordingH264::default());
        let config = StreamConfig {
            slowdown: true,
            ..quick_config()
        };
        let (stream, _enc) = stream_over(config, dev);
        let stream = Arc::new(stream.with_h264(h264.clone() as Arc<dyn H264Stream>));

        let ring = stream.jpeg_ring();
        let drainer_stop = stop.clone();
        let drainer = std::thread::spawn(move || {
            while !drainer_stop.load(Ordering::Acquire) {
                let _ = ring.consumer_acquire(Duration::from_millis(10));
            }
        });

        let runner = stream.clone();
        let handle = std::thread::spawn(move || runner.run());
        while !stop.load(Ordering::Acquire) {
            std::thread::sleep(Duration::from_millis(20));
        }
        stream.break_loop();
        handle.join().expect("loop thread").expect("clean run");
        drainer.join().expect("drainer");

        // With no clients anywhere the slowdown ran its full second, so the
        // first live H.264 frame carries force_key
        let frames = h264.frames.lock();
        let first_live = frames
            .iter()
            .find(|(used, _)| *used == b"frame-payload".len())
            .expect("live frame reached the H.264 pipeline");
        assert!(first_live.1);
    }

    #[test]
    fn test_teardown_and_reinit_on_persistent_timeout() {
        let stop = Arc::new(AtomicBool::new(false));
        let steps = vec![GrabStep::Frame, GrabStep::Timeout, GrabStep::Frame];
        let dev = Arc::new(MockDevice::new("/dev/null", steps, stop.clone()));
        let (stream, enc) = stream_over(quick_config(), dev.clone());
        let stream = Arc::new(stream);

        let ring = stream.jpeg_ring();
        let drainer_stop = stop.clone();
        let drainer = std::thread::spawn(move || {
            while !drainer_stop.load(Ordering::Acquire) {
                let _ = ring.consumer_acquire(Duration::from_millis(10));
            }
        });

        let runner = stream.clone();
        let handle = std::thread::spawn(move || runner.run());
        while !stop.load(Ordering::Acquire) {
            std::thread::sleep(Duration::from_millis(10));
        }
        stream.break_loop();
        handle.join().expect("loop thread").expect("clean run");
        drainer.join().expect("drainer");

        // The timeout forced one teardown + re-init cycle
        assert!(dev.opens.load(Ordering::Relaxed) >= 2);
        assert!(enc.closes.load(Ordering::Relaxed) >= 2);
    }

    #[test]
    fn test_broken_frame_is_skipped() {
        let stop = Arc::new(AtomicBool::new(false));
        let steps = vec![GrabStep::Broken, GrabStep::Frame, GrabStep::Broken];
        let dev = Arc::new(MockDevice::new("/dev/null", steps, stop.clone()));
        let (stream, _enc) = stream_over(quick_config(), dev.clone());
        let stream = Arc::new(stream);

        let ring = stream.jpeg_ring();
        let drainer_stop = stop.clone();
        let drainer = std::thread::spawn(move || {
            while !drainer_stop.load(Ordering::Acquire) {
                let _ = ring.consumer_acquire(Duration::from_millis(10));
            }
        });

        let runner = stream.clone();
        let handle = std::thread::spawn(move || runner.run());
        while !stop.load(Ordering::Acquire) {
            std::thread::sleep(Duration::from_millis(10));
        }
        stream.break_loop();
        handle.join().expect("loop thread").expect("clean run");
        drainer.join().expect("drainer");

        // Only one real frame was grabbed and released; broken ones were
        // skipped without teardown (single device open)
        assert_eq!(dev.grabbed.lock().len(), 1);
        assert_eq!(dev.released.lock().len(), 1);
        assert_eq!(dev.opens.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_exit_on_no_clients_invokes_hook() {
        let stop = Arc::new(AtomicBool::new(false));
        let dev = Arc::new(MockDevice::new(
            "/definitely/not/a/device",
            vec![],
            stop,
        ));
        let config = StreamConfig {
            exit_on_no_clients: 0.15,
            ..quick_config()
        };
        let fired = Arc::new(AtomicBool::new(false));
        let (stream, _enc) = stream_over(config, dev);
        let hook_fired = fired.clone();
        let stream = Arc::new(stream.with_on_no_clients(move || {
            hook_fired.store(true, Ordering::Release);
        }));

        let ring = stream.jpeg_ring();
        let drain_flag = Arc::new(AtomicBool::new(false));
        let drainer_stop = drain_flag.clone();
        let drainer = std::thread::spawn(move || {
            while !drainer_stop.load(Ordering::Acquire) {
                let _ = ring.consumer_acquire(Duration::from_millis(10));
            }
        });

        let runner = stream.clone();
        let handle = std::thread::spawn(move || runner.run());
        std::thread::sleep(Duration::from_millis(400));
        stream.break_loop();
        handle.join().expect("loop thread").expect("clean run");
        drain_flag.store(true, Ordering::Release);
        drainer.join().expect("drainer");

        assert!(fired.load(Ordering::Acquire));
    }

    #[test]
    fn test_break_loop_is_idempotent() {
        let stop = Arc::new(AtomicBool::new(false));
        let dev = Arc::new(MockDevice::new("/dev/null", vec![], stop));
        let (stream, _enc) = stream_over(quick_config(), dev);
        stream.break_loop();
        stream.break_loop();
        assert!(stream.is_stopped());
    }
}
