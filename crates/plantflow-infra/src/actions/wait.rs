use std::time::Duration;

use plantflow_core::action::{ActionContext, ActionError, ActionParams, WorkflowActionHandler};
use plantflow_types::variables::VariableUpdates;
use tokio_util::sync::CancellationToken;

/// Sleeps for `ms` milliseconds or `seconds` seconds, stopping early on
/// cancellation.
#[derive(Debug, Clone, Copy)]
pub struct WaitHandler {
    /// Upper bound for a single wait.
    pub max: Duration,
}

impl WaitHandler {
    pub const NAME: &'static str = "wait";
}

impl Default for WaitHandler {
    fn default() -> Self {
        Self {
            max: Duration::from_secs(3600),
        }
    }
}

fn parse_duration(params: &ActionParams) -> Result<Duration, ActionError> {
    let invalid = |name: &str, reason: String| ActionError::InvalidParam {
        name: name.to_string(),
        reason,
    };
    if let Some(ms) = params.get("ms") {
        let ms: u64 = ms
            .trim()
            .parse()
            .map_err(|e| invalid("ms", format!("{e}")))?;
        return Ok(Duration::from_millis(ms));
    }
    if let Some(secs) = params.get("seconds") {
        let secs: f64 = secs
            .trim()
            .parse()
            .map_err(|e| invalid("seconds", format!("{e}")))?;
        return Duration::try_from_secs_f64(secs).map_err(|e| invalid("seconds", format!("{e}")));
    }
    Err(invalid("ms", "either 'ms' or 'seconds' is required".to_string()))
}

impl WorkflowActionHandler for WaitHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn handle(
        &self,
        _ctx: &ActionContext,
        params: &ActionParams,
        cancel: CancellationToken,
    ) -> Result<Option<VariableUpdates>, ActionError> {
        let duration = parse_duration(params)?.min(self.max);
        tokio::select! {
            () = cancel.cancelled() => Err(ActionError::Cancelled),
            () = tokio::time::sleep(duration) => Ok(None),
        }
    }
}
