use async_trait::async_trait;
use chrono::Local;
use serde_json::{json, Value};

use super::{Tool, ToolError};

/// Reports the server's local date and time.
pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &'static str {
        "current_time"
    }

    fn description(&self) -> &'static str {
        "Get the current local date and time."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
        })
    }

    async fn invoke(&self, _args: &Value) -> Result<String, ToolError> {
        Ok(Local::now().format("%Y-%m-%d %H:%M:%S %Z").to_string())
    }
}
