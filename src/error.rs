use thiserror::Error;

/// Errors raised by the shared observer and its backends
///
/// Registration bookkeeping itself never fails: removing an unknown pair,
/// adding a duplicate pair and receiving events for untracked targets are all
/// defined as no-ops. Errors come from backends (a watch that cannot be
/// established) and from construction.
#[derive(Error, Debug)]
pub enum ObserverError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Notify error: {0}")]
	Notify(#[from] notify::Error),

	#[error("JSON serialization error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Backend error: {operation} failed on {target} - {cause}")]
	Backend {
		operation: String,
		target: String,
		cause: String,
	},

	#[error("Configuration error: {parameter} - {reason}")]
	ConfigurationError { parameter: String, reason: String },

	#[error("No tokio runtime available to drive dispatch")]
	NoRuntime,
}

impl ObserverError {
	/// Get error category for logging
	pub fn category(&self) -> &'static str {
		match self {
			ObserverError::Io(_) => "io",
			ObserverError::Notify(_) => "notify",
			ObserverError::Json(_) => "serialization",
			ObserverError::Backend { .. } => "backend",
			ObserverError::ConfigurationError { .. } => "configuration",
			ObserverError::NoRuntime => "initialization",
		}
	}

	/// Check if this error is related to configuration issues
	pub fn is_configuration_error(&self) -> bool {
		matches!(self, ObserverError::ConfigurationError { .. })
	}

	/// Create a backend error for an operation on a target
	pub fn backend(operation: &str, target: impl std::fmt::Debug, cause: &str) -> Self {
		ObserverError::Backend {
			operation: operation.to_string(),
			target: format!("{target:?}"),
			cause: cause.to_string(),
		}
	}

	/// Create a configuration error
	pub fn configuration_error(parameter: &str, reason: &str) -> Self {
		ObserverError::ConfigurationError {
			parameter: parameter.to_string(),
			reason: reason.to_string(),
		}
	}
}

pub type Result<T> = std::result::Result<T, ObserverError>;
