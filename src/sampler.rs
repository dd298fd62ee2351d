use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::provider::{MetricsProvider, capture_snapshot};
use crate::snapshot::{CpuSnapshot, SampleBuffer};

/// Lifecycle of the background sampling thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
	Idle,
	Running,
}

/// Handles to a running sampling thread
struct Worker {
	stop_tx: mpsc::Sender<()>,
	samples_rx: mpsc::Receiver<CpuSnapshot>,
	handle: JoinHandle<()>,
}

/// Periodically captures CPU snapshots on a dedicated thread
///
/// Snapshots flow over a single-producer channel that is only drained after
/// the thread has been joined, so the last capture is always visible to the
/// caller of [`Sampler::stop`].
pub struct Sampler {
	provider: Box<dyn MetricsProvider>,
	interval: Duration,
	worker: Option<Worker>,
}

impl Sampler {
	/// Creates an idle sampler; each run samples through a fresh copy of `provider`
	pub fn new(provider: Box<dyn MetricsProvider>, interval: Duration) -> Self {
		Self {
			provider,
			interval,
			worker: None,
		}
	}

	pub fn state(&self) -> SamplerState {
		if self.worker.is_some() {
			SamplerState::Running
		} else {
			SamplerState::Idle
		}
	}

	/// Starts the sampling thread with an empty buffer
	pub fn start(&mut self) -> Result<()> {
		if self.worker.is_some() {
			return Err(Error::SamplerActive);
		}

		let (stop_tx, stop_rx) = mpsc::channel::<()>();
		let (samples_tx, samples_rx) = mpsc::channel::<CpuSnapshot>();
		let provider = self.provider.clone_box();
		let interval = self.interval;

		let handle = thread::Builder::new()
			.name("cpu-sampler".to_string())
			.spawn(move || sample_loop(provider, interval, stop_rx, samples_tx))?;

		debug!("Sampler started ({} ms period)", interval.as_millis());

		self.worker = Some(Worker {
			stop_tx,
			samples_rx,
			handle,
		});

		Ok(())
	}

	/// Stops and joins the sampling thread, returning everything it captured
	///
	/// Stopping an idle sampler returns an empty buffer.
	pub fn stop(&mut self) -> Result<SampleBuffer> {
		let Some(worker) = self.worker.take() else {
			return Ok(SampleBuffer::new());
		};

		// The thread may already have exited if the receiver went away
		let _ = worker.stop_tx.send(());
		let joined = worker.handle.join();

		let buffer: SampleBuffer = worker.samples_rx.try_iter().collect();
		debug!("Sampler stopped with {} snapshots", buffer.len());

		joined.map_err(|_| Error::SamplerPanicked)?;
		Ok(buffer)
	}
}

impl Drop for Sampler {
	fn drop(&mut self) {
		if self.worker.is_some() {
			let _ = self.stop();
		}
	}
}

fn sample_loop(
	mut provider: Box<dyn MetricsProvider>,
	interval: Duration,
	stop_rx: mpsc::Receiver<()>,
	samples_tx: mpsc::Sender<CpuSnapshot>,
) {
	// Prime the utilization counters so the first tick covers a full period
	if let Err(e) = provider.per_core_utilization() {
		warn!("Initial CPU utilization read failed: {}", e);
	}

	loop {
		match stop_rx.recv_timeout(interval) {
			Err(RecvTimeoutError::Timeout) => {},
			Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
		}

		match capture_snapshot(provider.as_mut()) {
			Ok(snapshot) => {
				if samples_tx.send(snapshot).is_err() {
					break;
				}
			},
			Err(e) => warn!("Skipping CPU sample: {}", e),
		}
	}
}
