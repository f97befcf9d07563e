//! Instrumentation hooks for token fetches and signed partner calls.
//!
//! Nothing here is mandatory. Build with `tracing` to get one `dax_client.operation` span
//! per call (fields `operation` and `stage`) and a warning for every scheduled retry; build
//! with `metrics` to feed `dax_client_operation_total`, labelled `operation` and `outcome`.
//! With both features off the hooks are empty and optimize away.
//!
//! [`Operation`] bundles the span with the counter so a retry loop reports its attempts,
//! retries and final outcome through a single value.

mod counter;
mod span;

pub use counter::record_operation_outcome;
pub use span::{OperationSpan, SpannedFuture};

// self
use crate::_prelude::*;

/// What the client was doing when an observation was recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Password grant against the token endpoint.
	TokenFetch,
	/// Signed request against a partner resource.
	SignedCall,
}
impl OperationKind {
	/// Label used for the `operation` field and metric label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::TokenFetch => "token_fetch",
			Self::SignedCall => "signed_call",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Value of the `outcome` metric label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// A request went out.
	Attempt,
	/// The caller received a result.
	Success,
	/// The caller received an error.
	Failure,
	/// An error was swallowed and another attempt was scheduled.
	Retry,
}
impl OperationOutcome {
	/// Label used for the `outcome` metric label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Attempt => "attempt",
			Self::Success => "success",
			Self::Failure => "failure",
			Self::Retry => "retry",
		}
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One logical call, from its first attempt to the result handed back to the caller.
#[derive(Clone, Debug)]
pub struct Operation {
	kind: OperationKind,
	span: OperationSpan,
	attempts: u32,
}
impl Operation {
	/// Opens the span for a new operation; nothing is counted until [`attempt`](Self::attempt).
	pub fn start(kind: OperationKind, stage: &'static str) -> Self {
		Self { kind, span: OperationSpan::new(kind, stage), attempts: 0 }
	}

	/// Span covering the whole operation.
	pub fn span(&self) -> &OperationSpan {
		&self.span
	}

	/// Number of attempts made so far.
	pub fn attempts(&self) -> u32 {
		self.attempts
	}

	/// Counts a new attempt and returns its 1-based number.
	pub fn attempt(&mut self) -> u32 {
		self.attempts = self.attempts.saturating_add(1);

		record_operation_outcome(self.kind, OperationOutcome::Attempt);

		self.attempts
	}

	/// Reports that `error` will be retried after `delay_ms` milliseconds.
	pub fn retry(&self, delay_ms: i64, error: &Error) {
		record_operation_outcome(self.kind, OperationOutcome::Retry);
		span::retry_event(self.kind, self.attempts, delay_ms, error);
	}

	/// Counts the final outcome and hands `result` back unchanged.
	pub fn finish<T>(&self, result: Result<T>) -> Result<T> {
		let outcome =
			if result.is_ok() { OperationOutcome::Success } else { OperationOutcome::Failure };

		record_operation_outcome(self.kind, outcome);

		result
	}
}
