//! Encoder worker pool
//!
//! N identical workers, each owning one [`EncodeWorker`] on its own OS
//! thread. The dispatcher blocks in [`WorkerPool::wait`] until some worker
//! is idle or has completed, consumes the previous job's result, then
//! [`WorkerPool::assign`]s the next hardware buffer to that worker.
//!
//! The pool keeps two statistics per completed job: a per-worker EMA of
//! encode latency (feeding the fluency pacing hint) and a pool-wide
//! watermark of the newest exposed capture timestamp. A job finishing
//! behind that watermark is marked untimely and dropped by the dispatcher,
//! which keeps exposure monotonic even when parallel workers finish out of
//! order.

use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::clock;
use crate::device::HwFrame;
use crate::encoder::EncodeWorker;
use crate::error::{Result, StreamError};
use crate::frame::Frame;

/// Smoothing factor for the per-worker latency EMA
const LATENCY_EMA_ALPHA: f64 = 0.1;

struct Job {
    hw: HwFrame,
    dest: Frame,
}

struct JobResult {
    index: usize,
    failed: bool,
    job_time: f64,
    hw: Option<HwFrame>,
    dest: Frame,
}

/// A worker handed back by [`WorkerPool::wait`]
///
/// Carries the previous job's outcome: the consumed hardware buffer (to be
/// released by the caller) and the produced destination frame. Pass the
/// handle back to [`WorkerPool::assign`] to schedule the next job on the
/// same worker.
pub struct ReadyWorker {
    /// Worker slot index (stable for the pool's lifetime)
    pub index: usize,

    /// Whether the previous job failed (result must be suppressed)
    pub job_failed: bool,

    /// Whether the previous job finished in capture order
    pub job_timely: bool,

    hw: Option<HwFrame>,
    dest: Frame,
}

impl ReadyWorker {
    /// Take the hardware buffer consumed by the previous job, if any
    pub fn take_hw(&mut self) -> Option<HwFrame> {
        self.hw.take()
    }

    /// The destination frame produced by the previous job
    pub fn dest(&self) -> &Frame {
        &self.dest
    }
}

/// Pool of encoder workers
pub struct WorkerPool {
    job_txs: Vec<Sender<Job>>,
    ready_rx: Receiver<JobResult>,
    threads: Vec<JoinHandle<()>>,
    job_time_ema: Vec<f64>,
    last_timely_ts: f64,
    desired_fps: u32,
}

impl WorkerPool {
    /// Spawn one thread per supplied encode worker
    ///
    /// Every worker immediately announces itself idle, so the first
    /// [`wait`](Self::wait) calls return without blocking.
    pub fn new(workers: Vec<Box<dyn EncodeWorker>>, desired_fps: u32) -> Result<Self> {
        let n_workers = workers.len();
        let (ready_tx, ready_rx) = unbounded::<JobResult>();
        let mut job_txs = Vec::with_capacity(n_workers);
        let mut threads = Vec::with_capacity(n_workers);

        for (index, mut worker) in workers.into_iter().enumerate() {
            let (job_tx, job_rx) = bounded::<Job>(1);
            let ready = ready_tx.clone();
            let thread = std::thread::Builder::new()
                .name(format!("enc-{index}"))
                .spawn(move || {
                    // Announce idle so the dispatcher can assign the first job
                    let idle = JobResult {
                        index,
                        failed: false,
                        job_time: 0.0,
                        hw: None,
                        dest: Frame::new(),
                    };
                    if ready.send(idle).is_err() {
                        return;
                    }
                    for mut job in job_rx.iter() {
                        let start = clock::now_monotonic();
                        let failed = match worker.encode(&job.hw, &mut job.dest) {
                            Ok(()) => {
                                job.dest.grab_ts = job.hw.raw.grab_ts;
                                job.dest.online = true;
                                false
                            }
                            Err(err) => {
                                warn!("Worker enc-{index} job failed: {err}");
                                true
                            }
                        };
                        let result = JobResult {
                            index,
                            failed,
                            job_time: clock::now_monotonic() - start,
                            hw: Some(job.hw),
                            dest: job.dest,
                        };
                        if ready.send(result).is_err() {
                            break;
                        }
                    }
                    debug!("Worker enc-{index} finished");
                })?;
            job_txs.push(job_tx);
            threads.push(thread);
        }

        Ok(Self {
            job_txs,
            ready_rx,
            threads,
            job_time_ema: vec![0.0; n_workers],
            last_timely_ts: 0.0,
            desired_fps,
        })
    }

    /// Number of workers
    pub fn n_workers(&self) -> usize {
        self.job_txs.len()
    }

    /// Block until a worker is idle or has completed its job
    pub fn wait(&mut self) -> Result<ReadyWorker> {
        let result = self
            .ready_rx
            .recv()
            .map_err(|_| StreamError::WorkersGone)?;

        let mut timely = false;
        if result.hw.is_some() && !result.failed {
            if result.dest.grab_ts >= self.last_timely_ts {
                self.last_timely_ts = result.dest.grab_ts;
                timely = true;
            }
            let ema = &mut self.job_time_ema[result.index];
            *ema = if *ema == 0.0 {
                result.job_time
            } else {
                *ema * (1.0 - LATENCY_EMA_ALPHA) + result.job_time * LATENCY_EMA_ALPHA
            };
        }

        Ok(ReadyWorker {
            index: result.index,
            job_failed: result.failed,
            job_timely: timely,
            hw: result.hw,
            dest: result.dest,
        })
    }

    /// Schedule the next buffer on a ready worker
    pub fn assign(&self, worker: ReadyWorker, hw: HwFrame) -> Result<()> {
        let job = Job {
            hw,
            dest: worker.dest,
        };
        self.job_txs[worker.index]
            .send(job)
            .map_err(|_| StreamError::WorkersGone)
    }

    /// Pacing hint for the next grab, in seconds
    ///
    /// The worker's smoothed encode latency divided across the pool,
    /// floored at the desired-FPS frame interval. Matching the grab cadence
    /// to this keeps the camera's natural rhythm aligned with what the
    /// encoders can actually sustain.
    pub fn fluency_delay(&self, worker: &ReadyWorker) -> f64 {
        let min_delay = if self.desired_fps > 0 {
            1.0 / self.desired_fps as f64
        } else {
            0.0
        };
        let spread = self.job_time_ema[worker.index] / self.n_workers() as f64;
        spread.max(min_delay)
    }

    /// Stop all workers and join their threads
    ///
    /// In-flight jobs finish first; their results are discarded.
    pub fn join(mut self) {
        self.job_txs.clear();
        for thread in self.threads.drain(..) {
            if thread.join().is_err() {
                warn!("Worker thread panicked during join");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.job_txs.clear();
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}
