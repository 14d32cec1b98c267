pub mod commands;
pub mod files;
pub mod markdown;
pub mod search;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::client::RestClient;
use crate::error::BridgeError;

pub type ToolResult = std::result::Result<String, BridgeError>;

/// A single operation exposed to the agent runtime.
///
/// Tools are stored as `dyn Tool` in the [`ToolRegistry`] and looked up by name.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema of the `arguments` object.
    fn input_schema(&self) -> Value;
    async fn run(&self, args: Value) -> ToolResult;
}

/// Outcome of a tool call as seen by the agent: always text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Every tool, sharing one client.
    pub fn new(client: Arc<RestClient>) -> Self {
        let mut tools: Vec<Box<dyn Tool>> = Vec::new();
        tools.extend(files::tools(&client));
        tools.extend(search::tools(&client));
        tools.extend(commands::tools(&client));
        tools.extend(markdown::tools(&client));
        Self { tools }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|tool| tool.name() == name)
            .map(|tool| &**tool)
    }

    pub fn definitions(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "inputSchema": tool.input_schema(),
                })
            })
            .collect()
    }

    /// Run a tool by name. Never fails: errors come back as text.
    pub async fn call(&self, name: &str, args: Value) -> ToolOutput {
        let Some(tool) = self.get(name) else {
            return ToolOutput {
                text: format!("Error: unknown tool '{}'", name),
                is_error: true,
            };
        };

        match tool.run(args).await {
            Ok(text) => ToolOutput {
                text,
                is_error: false,
            },
            Err(e) => {
                match e.status() {
                    Some(status) => log::warn!("{} failed with HTTP {}: {}", name, status, e),
                    None => log::warn!("{} failed: {}", name, e),
                }
                ToolOutput {
                    text: e.to_string(),
                    is_error: true,
                }
            }
        }
    }
}

/// Deserialize tool arguments, treating a missing object as empty.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, BridgeError> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| BridgeError::InvalidArguments(e.to_string()))
}

/// API path of a vault document, percent-encoding each segment.
///
/// `.` and `..` segments are rejected: the URL would be normalized to an
/// endpoint outside `vault/`.
pub(crate) fn vault_path(filepath: &str) -> Result<String, BridgeError> {
    let mut encoded = Vec::new();
    for segment in filepath.trim_matches('/').split('/') {
        match segment {
            "" => continue,
            "." | ".." => {
                return Err(BridgeError::InvalidArguments(format!(
                    "path '{}' must not contain '.' or '..' segments",
                    filepath
                )));
            }
            _ => encoded.push(urlencoding::encode(segment).into_owned()),
        }
    }
    Ok(format!("vault/{}", encoded.join("/")))
}

/// Status line for a write: the server's reply, or `fallback` when it sent none.
pub(crate) fn status_text(reply: String, fallback: impl Into<String>) -> String {
    if reply.trim().is_empty() {
        fallback.into()
    } else {
        reply
    }
}
