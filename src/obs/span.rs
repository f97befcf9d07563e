// self
use crate::{_prelude::*, obs::OperationKind};

/// Future returned by [`OperationSpan::instrument`]; the future itself without `tracing`.
#[cfg(feature = "tracing")]
pub type SpannedFuture<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`OperationSpan::instrument`]; the future itself without `tracing`.
#[cfg(not(feature = "tracing"))]
pub type SpannedFuture<F> = F;

/// `dax_client.operation` span; zero-sized when `tracing` is off.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	inner: tracing::Span,
}
impl OperationSpan {
	/// Opens a span for `kind`; `stage` names the entry point (e.g. `credential`).
	pub fn new(kind: OperationKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			Self {
				inner: tracing::info_span!(
					"dax_client.operation",
					operation = kind.as_str(),
					stage
				),
			}
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Runs `fut` inside the span; no guard is held across `.await`.
	pub fn instrument<F>(&self, fut: F) -> SpannedFuture<F>
	where
		F: Future,
	{
		#[cfg(feature = "tracing")]
		{
			tracing::Instrument::instrument(fut, self.inner.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

pub(super) fn retry_event(kind: OperationKind, attempt: u32, delay_ms: i64, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(operation = kind.as_str(), attempt, delay_ms, %error, "scheduling retry");
	}
	#[cfg(not(feature = "tracing"))]
	let _ = (kind, attempt, delay_ms, error);
}
