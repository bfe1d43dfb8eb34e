use plantflow_core::action::{ActionContext, ActionError, ActionParams, WorkflowActionHandler};
use plantflow_types::variables::VariableUpdates;
use tokio_util::sync::CancellationToken;

/// Emits a tracing event from a workflow.
///
/// Without a `message` param, the remaining params are logged as
/// `key=value` pairs. `level` is one of `debug`, `info` (default), `warn`,
/// `error`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHandler;

impl LogHandler {
    pub const NAME: &'static str = "log";
}

impl WorkflowActionHandler for LogHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn handle(
        &self,
        ctx: &ActionContext,
        params: &ActionParams,
        _cancel: CancellationToken,
    ) -> Result<Option<VariableUpdates>, ActionError> {
        let message = match params.get("message") {
            Some(message) => message.clone(),
            None => params
                .iter()
                .filter(|(k, _)| k.as_str() != "level")
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(" "),
        };
        let workflow_id = ctx.workflow_id.as_str();
        let node_id = ctx.node.id.as_str();

        match params.get("level").map(|l| l.trim().to_ascii_lowercase()).as_deref() {
            None | Some("info") => tracing::info!(workflow_id, node_id, "{message}"),
            Some("debug") => tracing::debug!(workflow_id, node_id, "{message}"),
            Some("warn") => tracing::warn!(workflow_id, node_id, "{message}"),
            Some("error") => tracing::error!(workflow_id, node_id, "{message}"),
            Some(other) => {
                return Err(ActionError::InvalidParam {
                    name: "level".to_string(),
                    reason: format!("unknown level '{other}'"),
                });
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_context as ctx;

    #[tokio::test]
    async fn logs_without_updates() {
        let params: ActionParams = [("message".to_string(), "hello".to_string())].into_iter().collect();
        let result = LogHandler.handle(&ctx(), &params, CancellationToken::new()).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn unknown_level_is_invalid() {
        let params: ActionParams = [("level".to_string(), "loud".to_string())].into_iter().collect();
        let result = LogHandler.handle(&ctx(), &params, CancellationToken::new()).await;
        assert!(matches!(result, Err(ActionError::InvalidParam { ref name, .. }) if name == "level"));
    }
}
