use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_args, status_text, vault_path, Tool, ToolResult};
use crate::client::{ContentKind, Method, RestClient};

pub(super) fn tools(client: &Arc<RestClient>) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(ListFiles(client.clone())),
        Box::new(GetFileContent(client.clone())),
        Box::new(CreateOrUpdateFile(client.clone())),
        Box::new(AppendToFile(client.clone())),
        Box::new(DeleteFile(client.clone())),
        Box::new(GetActiveFile(client.clone())),
        Box::new(GetDailyNote(client.clone())),
    ]
}

#[derive(Debug, Deserialize)]
struct FolderArgs {
    #[serde(default = "root_folder")]
    folder: String,
}

fn root_folder() -> String {
    "/".to_string()
}

#[derive(Debug, Deserialize)]
struct PathArgs {
    filepath: String,
}

#[derive(Debug, Deserialize)]
struct WriteArgs {
    filepath: String,
    content: String,
}

fn path_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "filepath": { "type": "string", "description": "Path relative to the vault root, e.g. 'Projects/Plan.md'" }
        },
        "required": ["filepath"]
    })
}

fn write_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "filepath": { "type": "string", "description": "Path relative to the vault root" },
            "content": { "type": "string", "description": "Markdown content" }
        },
        "required": ["filepath", "content"]
    })
}

fn no_args_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// Lists files in the vault root or a folder.
pub struct ListFiles(Arc<RestClient>);

#[derive(Debug, Deserialize)]
struct FileListing {
    files: Vec<String>,
}

#[async_trait::async_trait]
impl Tool for ListFiles {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "Lists files in the vault. Use folder path to list subdirectories."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "folder": { "type": "string", "description": "Folder relative to the vault root (default '/')" }
            }
        })
    }

    async fn run(&self, args: Value) -> ToolResult {
        let args: FolderArgs = parse_args(args)?;
        let folder = args.folder.trim_matches('/');
        let endpoint = if folder.is_empty() {
            "vault/".to_string()
        } else {
            format!("{}/", vault_path(folder)?)
        };

        let reply = self.0.get(&endpoint).await?;
        // Fall back to the raw reply when the listing has an unexpected shape.
        match serde_json::from_str::<FileListing>(&reply) {
            Ok(listing) => Ok(listing.files.join("\n")),
            Err(_) => Ok(reply),
        }
    }
}

pub struct GetFileContent(Arc<RestClient>);

#[async_trait::async_trait]
impl Tool for GetFileContent {
    fn name(&self) -> &str {
        "get_file_content"
    }

    fn description(&self) -> &str {
        "Reads the content of a markdown file. Filepath should be relative to vault root."
    }

    fn input_schema(&self) -> Value {
        path_schema()
    }

    async fn run(&self, args: Value) -> ToolResult {
        let args: PathArgs = parse_args(args)?;
        self.0.get(&vault_path(&args.filepath)?).await
    }
}

pub struct CreateOrUpdateFile(Arc<RestClient>);

#[async_trait::async_trait]
impl Tool for CreateOrUpdateFile {
    fn name(&self) -> &str {
        "create_or_update_file"
    }

    fn description(&self) -> &str {
        "Creates or updates a file with the given content. Overwrites existing content."
    }

    fn input_schema(&self) -> Value {
        write_schema()
    }

    async fn run(&self, args: Value) -> ToolResult {
        let args: WriteArgs = parse_args(args)?;
        let reply = self
            .0
            .request(
                Method::Put,
                &vault_path(&args.filepath)?,
                Some(args.content),
                ContentKind::Markdown,
            )
            .await?;
        Ok(status_text(reply, format!("Success: wrote {}", args.filepath)))
    }
}

pub struct AppendToFile(Arc<RestClient>);

#[async_trait::async_trait]
impl Tool for AppendToFile {
    fn name(&self) -> &str {
        "append_to_file"
    }

    fn description(&self) -> &str {
        "Appends content to the end of an existing file."
    }

    fn input_schema(&self) -> Value {
        write_schema()
    }

    async fn run(&self, args: Value) -> ToolResult {
        let args: WriteArgs = parse_args(args)?;
        let reply = self
            .0
            .request(
                Method::Post,
                &vault_path(&args.filepath)?,
                Some(args.content),
                ContentKind::Markdown,
            )
            .await?;
        Ok(status_text(reply, format!("Success: appended to {}", args.filepath)))
    }
}

pub struct DeleteFile(Arc<RestClient>);

#[async_trait::async_trait]
impl Tool for DeleteFile {
    fn name(&self) -> &str {
        "delete_file"
    }

    fn description(&self) -> &str {
        "Deletes a file from the vault."
    }

    fn input_schema(&self) -> Value {
        path_schema()
    }

    async fn run(&self, args: Value) -> ToolResult {
        let args: PathArgs = parse_args(args)?;
        let reply = self
            .0
            .request(Method::Delete, &vault_path(&args.filepath)?, None, ContentKind::Json)
            .await?;
        Ok(status_text(reply, format!("Success: deleted {}", args.filepath)))
    }
}

pub struct GetActiveFile(Arc<RestClient>);

#[async_trait::async_trait]
impl Tool for GetActiveFile {
    fn name(&self) -> &str {
        "get_active_file"
    }

    fn description(&self) -> &str {
        "Gets the content of the currently active file in Obsidian."
    }

    fn input_schema(&self) -> Value {
        no_args_schema()
    }

    async fn run(&self, _args: Value) -> ToolResult {
        self.0.get("active/").await
    }
}

pub struct GetDailyNote(Arc<RestClient>);

#[async_trait::async_trait]
impl Tool for GetDailyNote {
    fn name(&self) -> &str {
        "get_daily_note"
    }

    fn description(&self) -> &str {
        "Gets the content of today's daily note. Creates it if it doesn't exist."
    }

    fn input_schema(&self) -> Value {
        no_args_schema()
    }

    async fn run(&self, _args: Value) -> ToolResult {
        self.0.get("periodic/daily/").await
    }
}
