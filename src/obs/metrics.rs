// self
use crate::obs::{FlowOutcome, RefreshPath};

/// Records a refresh outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(path: RefreshPath, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth2_refresh_coordinator_total",
			"path" => path.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (path, outcome);
	}
}
