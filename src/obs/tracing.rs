// self
use crate::{_prelude::*, auth::TenantId, obs::RefreshPath};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span wrapping one `get_access_token` call.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a span tagged with the tenant and call site; `path` is recorded later.
	pub fn new(stage: &'static str, tenant: &TenantId) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"oauth2_refresh_coordinator.refresh",
				tenant = %tenant,
				stage,
				path = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (stage, tenant);

			Self {}
		}
	}

	/// Records which branch the call took.
	pub fn record_path(&self, path: RefreshPath) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("path", path.as_str());
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = path;
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a `tracing` event when the feature is enabled; expands to nothing otherwise.
macro_rules! flow_event {
	($level:ident, $($arg:tt)+) => {{
		#[cfg(feature = "tracing")]
		{
			::tracing::$level!($($arg)+);
		}
	}};
}
pub(crate) use flow_event;
