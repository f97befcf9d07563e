// self
use crate::obs::{OperationKind, OperationOutcome};

/// Bumps `dax_client_operation_total{operation, outcome}` on the installed recorder.
pub fn record_operation_outcome(kind: OperationKind, outcome: OperationOutcome) {
	#[cfg(feature = "metrics")]
	{
		let counter = metrics::counter!(
			"dax_client_operation_total",
			"operation" => kind.as_str(),
			"outcome" => outcome.as_str()
		);

		counter.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}
