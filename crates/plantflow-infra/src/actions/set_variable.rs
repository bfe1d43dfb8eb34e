use plantflow_core::action::{ActionContext, ActionError, ActionParams, WorkflowActionHandler};
use plantflow_types::variables::VariableUpdates;
use tokio_util::sync::CancellationToken;

/// Writes instance variables.
///
/// `{"name": "city", "value": "Oslo"}` sets one variable. Any other
/// parameter set is written key by key.
#[derive(Debug, Default, Clone, Copy)]
pub struct SetVariableHandler;

impl SetVariableHandler {
    pub const NAME: &'static str = "set_variable";
}

impl WorkflowActionHandler for SetVariableHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn handle(
        &self,
        _ctx: &ActionContext,
        params: &ActionParams,
        _cancel: CancellationToken,
    ) -> Result<Option<VariableUpdates>, ActionError> {
        let named = params.len() == 2 && params.contains_key("name") && params.contains_key("value");
        let updates: VariableUpdates = if named {
            let name = params["name"].trim();
            if name.is_empty() {
                return Err(ActionError::InvalidParam {
                    name: "name".to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
            [(name.to_string(), params["value"].clone())].into_iter().collect()
        } else {
            params.clone()
        };
        Ok(Some(updates))
    }
}
