//! ALSA capture and Opus encoding pipeline
//!
//! Two threads connected by bounded rings:
//!
//! ```text
//! ALSA period reads ──▶ PCM ring ──▶ resample to 48 kHz ──▶ 20 ms frames
//!   (capture thread)    drop-oldest     (encoder thread)        │
//!                                                               ▼
//!                        get_encoded() ◀── encoded ring ◀── Opus encode
//!                        (RTP sender)       drop-newest       PTS += 960
//! ```
//!
//! Overflow policy: the PCM ring evicts its oldest chunk so capture latency
//! stays bounded; the encoded ring drops the incoming packet so the
//! already-queued stream stays contiguous.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use alsa::pcm::{Access, Format, Frames, HwParams, PCM};
use alsa::{Direction, ValueOr};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::resample::Resampler48k;

/// Capture channel count
const CHANNELS: usize = 2;

/// Opus frame length at 48 kHz: 20 ms
const OPUS_FRAME_FRAMES: usize = 960;

/// Opus target bitrate in bit/s
const OPUS_BITRATE: i32 = 128_000;

/// Bounded ring depths (chunks / packets)
const PCM_RING_DEPTH: usize = 64;
const ENCODED_RING_DEPTH: usize = 64;

/// One Opus packet with its presentation timestamp
///
/// `pts` counts samples at 48 kHz and wraps at 32 bits, advancing by 960
/// per 20 ms frame.
#[derive(Debug, Clone)]
pub struct EncodedPacket {
    /// Opus payload
    pub data: Vec<u8>,

    /// Presentation timestamp in 48 kHz samples
    pub pts: u32,
}

/// Accumulates interleaved PCM until whole encoder frames are available
struct FrameAccumulator {
    buf: Vec<i16>,
    frame_samples: usize,
}

impl FrameAccumulator {
    fn new(frame_frames: usize, channels: usize) -> Self {
        Self {
            buf: Vec::new(),
            frame_samples: frame_frames * channels,
        }
    }

    fn push(&mut self, samples: &[i16]) {
        self.buf.extend_from_slice(samples);
    }

    fn pop_frame(&mut self) -> Option<Vec<i16>> {
        if self.buf.len() < self.frame_samples {
            return None;
        }
        let frame = self.buf[..self.frame_samples].to_vec();
        self.buf.drain(..self.frame_samples);
        Some(frame)
    }
}

/// The audio capture/encode pipeline
///
/// Threads start on construction and run until drop;
/// [`get_encoded`](Self::get_encoded) is the non-blocking consumer meant
/// for periodic polling by an RTP sender.
pub struct AudioCapture {
    stop: Arc<AtomicBool>,
    encoded_rx: Receiver<EncodedPacket>,
    pcm_thread: Option<JoinHandle<()>>,
    encoder_thread: Option<JoinHandle<()>>,
}

impl AudioCapture {
    /// Check that `name` can be opened at the target capture format
    ///
    /// No side effects beyond a transient open.
    pub fn probe(name: &str) -> bool {
        match open_pcm(name, 48_000) {
            Ok(_) => {
                info!("Audio device {name} is available");
                true
            }
            Err(err) => {
                warn!("Audio device {name} is not available: {err}");
                false
            }
        }
    }

    /// Open `name` and start the capture and encoder threads
    ///
    /// `pcm_hz` is the requested capture rate; the hardware may negotiate a
    /// different one, in which case the encoder thread resamples to 48 kHz.
    pub fn new(name: &str, pcm_hz: u32) -> Result<Self> {
        let (pcm, rate, period_frames) = open_pcm(name, pcm_hz)?;
        info!("Audio capture opened: device={name}, rate={rate}, period={period_frames}");

        let resampler = if rate != 48_000 {
            debug!("Resampling {rate} -> 48000");
            Some(Resampler48k::new(rate, CHANNELS)?)
        } else {
            None
        };
        let mut encoder = opus::Encoder::new(
            48_000,
            opus::Channels::Stereo,
            opus::Application::Audio,
        )?;
        encoder.set_bitrate(opus::Bitrate::Bits(OPUS_BITRATE))?;

        let stop = Arc::new(AtomicBool::new(false));
        let (pcm_tx, pcm_rx) = bounded::<Vec<i16>>(PCM_RING_DEPTH);
        let (encoded_tx, encoded_rx) = bounded::<EncodedPacket>(ENCODED_RING_DEPTH);

        let pcm_thread = std::thread::Builder::new().name("audio-pcm".to_string()).spawn({
            let stop = stop.clone();
            let pcm_rx = pcm_rx.clone();
            move || pcm_thread_main(&pcm, period_frames, &pcm_tx, &pcm_rx, &stop)
        })?;

        let encoder_thread = std::thread::Builder::new().name("audio-enc".to_string()).spawn({
            let stop = stop.clone();
            move || encoder_thread_main(resampler, &mut encoder, &pcm_rx, &encoded_tx, &stop)
        })?;

        Ok(Self {
            stop,
            encoded_rx,
            pcm_thread: Some(pcm_thread),
            encoder_thread: Some(encoder_thread),
        })
    }

    /// Take one encoded packet, if any is ready
    pub fn get_encoded(&self) -> Option<EncodedPacket> {
        self.encoded_rx.try_recv().ok()
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        // The encoder drains first so the PCM source outlives its consumer
        if let Some(thread) = self.encoder_thread.take() {
            if thread.join().is_err() {
                warn!("Audio encoder thread panicked during join");
            }
        }
        if let Some(thread) = self.pcm_thread.take() {
            if thread.join().is_err() {
                warn!("Audio capture thread panicked during join");
            }
        }
    }
}

/// Open and configure the PCM device; returns (pcm, actual_rate, period_frames)
fn open_pcm(name: &str, pcm_hz: u32) -> Result<(PCM, u32, usize)> {
    let pcm = PCM::new(name, Direction::Capture, false)?;
    let (rate, period_frames) = {
        let hwp = HwParams::any(&pcm)?;
        hwp.set_access(Access::RWInterleaved)?;
        hwp.set_format(Format::s16())?;
        hwp.set_channels(CHANNELS as u32)?;
        hwp.set_rate(pcm_hz, ValueOr::Nearest)?;
        // One period per 20 ms frame keeps the rings shallow
        let period = hwp.set_period_size_near((pcm_hz / 50) as Frames, ValueOr::Nearest)?;
        pcm.hw_params(&hwp)?;
        (hwp.get_rate()?, period as usize)
    };
    Ok((pcm, rate, period_frames))
}

fn pcm_thread_main(
    pcm: &PCM,
    period_frames: usize,
    pcm_tx: &Sender<Vec<i16>>,
    pcm_rx: &Receiver<Vec<i16>>,
    stop: &AtomicBool,
) {
    let io = match pcm.io_i16() {
        Ok(io) => io,
        Err(err) => {
            warn!("Can't map PCM I/O: {err}");
            return;
        }
    };
    let mut buf = vec![0i16; period_frames * CHANNELS];

    while !stop.load(Ordering::Acquire) {
        match io.readi(&mut buf) {
            Ok(frames) => {
                let chunk = buf[..frames * CHANNELS].to_vec();
                if pcm_tx.try_send(chunk).is_err() {
                    // Ring full: evict the oldest chunk to bound latency
                    let _ = pcm_rx.try_recv();
                    let chunk = buf[..frames * CHANNELS].to_vec();
                    if pcm_tx.try_send(chunk).is_err() {
                        debug!("PCM ring overflow, chunk dropped");
                    }
                }
            }
            Err(err) => {
                warn!("PCM read failed: {err}, recovering ...");
                if let Err(err) = pcm.prepare() {
                    warn!("Can't recover PCM capture: {err}");
                    break;
                }
            }
        }
    }
    debug!("Audio capture thread finished");
}

fn encoder_thread_main(
    mut resampler: Option<Resampler48k>,
    encoder: &mut opus::Encoder,
    pcm_rx: &Receiver<Vec<i16>>,
    encoded_tx: &Sender<EncodedPacket>,
    stop: &AtomicBool,
) {
    let mut accumulator = FrameAccumulator::new(OPUS_FRAME_FRAMES, CHANNELS);
    let mut resampled = Vec::new();
    let mut out_buf = vec![0u8; 4096];
    let mut pts: u32 = 0;

    while !stop.load(Ordering::Acquire) {
        let chunk = match pcm_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(chunk) => chunk,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        match resampler.as_mut() {
            Some(resampler) => {
                resampled.clear();
                if let Err(err) = resampler.push(&chunk, &mut resampled) {
                    warn!("Resampling failed: {err}");
                    continue;
                }
                accumulator.push(&resampled);
            }
            None => accumulator.push(&chunk),
        }

        while let Some(frame) = accumulator.pop_frame() {
            match encoder.encode(&frame, &mut out_buf) {
                Ok(size) => {
                    let packet = EncodedPacket {
                        data: out_buf[..size].to_vec(),
                        pts,
                    };
                    if encoded_tx.try_send(packet).is_err() {
                        // Ring full: drop the incoming packet, keep the
                        // queued stream contiguous
                        debug!("Encoded ring overflow, packet dropped");
                    }
                    pts = pts.wrapping_add(OPUS_FRAME_FRAMES as u32);
                }
                Err(err) => warn!("Opus encoding failed: {err}"),
            }
        }
    }
    debug!("Audio encoder thread finished");
}
