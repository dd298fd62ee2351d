use std::io;

use thiserror::Error;

use crate::client::ClientError;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of a single measurement run
///
/// None of these are fatal to continuous mode; the driver reports them and
/// waits for the next iteration.
#[derive(Debug, Error)]
pub enum Error {
	#[error("inference server at {url} is unreachable: {reason}")]
	ServerUnreachable { url: String, reason: String },

	#[error("measurement failed: {0}")]
	InferenceCallFailed(#[source] ClientError),

	#[error("sampler already active")]
	SamplerActive,

	#[error("sampler thread panicked")]
	SamplerPanicked,

	#[error("all {0} speed tests failed")]
	SuiteFailed(usize),

	#[error("configuration error: {0}")]
	Config(String),

	#[error("IO error: {0}")]
	Io(#[from] io::Error),
}
