use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_args, Tool, ToolResult};
use crate::client::{ContentKind, Method, RestClient};

pub(super) fn tools(client: &Arc<RestClient>) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(SearchNotes(client.clone())),
        Box::new(GetBacklinks(client.clone())),
        Box::new(ListTags(client.clone())),
    ]
}

/// Run the app's simple full-text search and return its raw result.
async fn simple_search(client: &RestClient, query: &str) -> ToolResult {
    let endpoint = format!("search/simple/?query={}", urlencoding::encode(query));
    client
        .request(Method::Post, &endpoint, None, ContentKind::Json)
        .await
}

#[derive(Debug, Deserialize)]
struct QueryArgs {
    query: String,
}

#[derive(Debug, Deserialize)]
struct PathArgs {
    filepath: String,
}

pub struct SearchNotes(Arc<RestClient>);

#[async_trait::async_trait]
impl Tool for SearchNotes {
    fn name(&self) -> &str {
        "search_notes"
    }

    fn description(&self) -> &str {
        "Searches for notes containing the query string using Obsidian's search."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Text to search for" }
            },
            "required": ["query"]
        })
    }

    async fn run(&self, args: Value) -> ToolResult {
        let args: QueryArgs = parse_args(args)?;
        simple_search(&self.0, &args.query).await
    }
}

/// Notes mentioning a file, approximated by searching for its quoted path.
pub struct GetBacklinks(Arc<RestClient>);

#[async_trait::async_trait]
impl Tool for GetBacklinks {
    fn name(&self) -> &str {
        "get_backlinks"
    }

    fn description(&self) -> &str {
        "Finds all notes that link to the specified file."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filepath": { "type": "string", "description": "Path of the linked-to note" }
            },
            "required": ["filepath"]
        })
    }

    async fn run(&self, args: Value) -> ToolResult {
        let args: PathArgs = parse_args(args)?;
        simple_search(&self.0, &format!("\"{}\"", args.filepath)).await
    }
}

/// Best effort: the API has no tag index, so this searches for `#`.
pub struct ListTags(Arc<RestClient>);

#[async_trait::async_trait]
impl Tool for ListTags {
    fn name(&self) -> &str {
        "list_tags"
    }

    fn description(&self) -> &str {
        "Lists tags used in the vault (best effort search for '#')."
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn run(&self, _args: Value) -> ToolResult {
        simple_search(&self.0, "#").await
    }
}
