use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_args, status_text, Tool, ToolResult};
use crate::client::{ContentKind, Method, RestClient};

pub(super) fn tools(client: &Arc<RestClient>) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(ListCommands(client.clone())),
        Box::new(ExecuteCommand(client.clone())),
    ]
}

#[derive(Debug, Deserialize)]
struct CommandList {
    commands: Vec<CommandInfo>,
}

#[derive(Debug, Deserialize)]
struct CommandInfo {
    id: String,
    name: String,
}

pub struct ListCommands(Arc<RestClient>);

#[async_trait::async_trait]
impl Tool for ListCommands {
    fn name(&self) -> &str {
        "list_commands"
    }

    fn description(&self) -> &str {
        "Lists all available Obsidian commands."
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn run(&self, _args: Value) -> ToolResult {
        let reply = self.0.get("commands/").await?;
        match serde_json::from_str::<CommandList>(&reply) {
            Ok(list) => Ok(list
                .commands
                .iter()
                .map(|c| format!("{}: {}", c.id, c.name))
                .collect::<Vec<_>>()
                .join("\n")),
            Err(_) => Ok(reply),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExecuteArgs {
    command_id: String,
}

pub struct ExecuteCommand(Arc<RestClient>);

#[async_trait::async_trait]
impl Tool for ExecuteCommand {
    fn name(&self) -> &str {
        "execute_command"
    }

    fn description(&self) -> &str {
        "Executes an Obsidian command by its ID."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command_id": { "type": "string", "description": "Command id as returned by list_commands" }
            },
            "required": ["command_id"]
        })
    }

    async fn run(&self, args: Value) -> ToolResult {
        let args: ExecuteArgs = parse_args(args)?;
        let endpoint = format!("commands/{}/", urlencoding::encode(&args.command_id));
        let reply = self
            .0
            .request(Method::Post, &endpoint, None, ContentKind::Json)
            .await?;
        Ok(status_text(reply, format!("Success: executed {}", args.command_id)))
    }
}
