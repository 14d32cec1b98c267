use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_args, status_text, vault_path, Tool, ToolResult};
use crate::client::{ContentKind, Method, RestClient};
use crate::document;

pub(super) fn tools(client: &Arc<RestClient>) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(AppendToHeading(client.clone())),
        Box::new(GetFrontmatter(client.clone())),
        Box::new(UpdateFrontmatter(client.clone())),
    ]
}

// No version check between the read and the write: concurrent edits to one note can lose an update.
async fn write_note(client: &RestClient, filepath: &str, content: String) -> ToolResult {
    client
        .request(
            Method::Put,
            &vault_path(filepath)?,
            Some(content),
            ContentKind::Markdown,
        )
        .await
}

#[derive(Debug, Deserialize)]
struct HeadingArgs {
    filepath: String,
    heading: String,
    content: String,
}

pub struct AppendToHeading(Arc<RestClient>);

#[async_trait::async_trait]
impl Tool for AppendToHeading {
    fn name(&self) -> &str {
        "append_to_heading"
    }

    fn description(&self) -> &str {
        "Appends content under a specific heading in a note. Creates the heading if it doesn't exist (appended to end)."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filepath": { "type": "string", "description": "Path relative to the vault root" },
                "heading": { "type": "string", "description": "Heading text, with or without leading '#'" },
                "content": { "type": "string", "description": "Markdown to insert at the end of the section" }
            },
            "required": ["filepath", "heading", "content"]
        })
    }

    async fn run(&self, args: Value) -> ToolResult {
        let args: HeadingArgs = parse_args(args)?;
        let current = self.0.get(&vault_path(&args.filepath)?).await?;
        let updated = document::append_under_heading(&current, &args.heading, &args.content);
        let reply = write_note(&self.0, &args.filepath, updated).await?;
        Ok(status_text(
            reply,
            format!("Success: appended under '{}' in {}", args.heading, args.filepath),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct PathArgs {
    filepath: String,
}

pub struct GetFrontmatter(Arc<RestClient>);

#[async_trait::async_trait]
impl Tool for GetFrontmatter {
    fn name(&self) -> &str {
        "get_frontmatter"
    }

    fn description(&self) -> &str {
        "Gets the YAML frontmatter of a note."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filepath": { "type": "string", "description": "Path relative to the vault root" }
            },
            "required": ["filepath"]
        })
    }

    async fn run(&self, args: Value) -> ToolResult {
        let args: PathArgs = parse_args(args)?;
        let content = self.0.get(&vault_path(&args.filepath)?).await?;
        Ok(document::read_frontmatter_raw(&content))
    }
}

#[derive(Debug, Deserialize)]
struct FrontmatterArgs {
    filepath: String,
    key: String,
    value: String,
}

pub struct UpdateFrontmatter(Arc<RestClient>);

#[async_trait::async_trait]
impl Tool for UpdateFrontmatter {
    fn name(&self) -> &str {
        "update_frontmatter"
    }

    fn description(&self) -> &str {
        "Updates a key in the YAML frontmatter. Creates frontmatter if missing."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filepath": { "type": "string", "description": "Path relative to the vault root" },
                "key": { "type": "string", "description": "Frontmatter key" },
                "value": { "type": "string", "description": "Value written verbatim after 'key: '" }
            },
            "required": ["filepath", "key", "value"]
        })
    }

    async fn run(&self, args: Value) -> ToolResult {
        let args: FrontmatterArgs = parse_args(args)?;
        let current = self.0.get(&vault_path(&args.filepath)?).await?;
        let updated = document::upsert_metadata_key(&current, &args.key, &args.value);
        let reply = write_note(&self.0, &args.filepath, updated).await?;
        Ok(status_text(
            reply,
            format!("Success: set {} in {}", args.key.trim(), args.filepath),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::ToolRegistry;
    use crate::client::tests::{client_with, configured, FakeTransport};
    use crate::client::{ContentKind, Method};
    use crate::document::NO_FRONTMATTER;
    use serde_json::json;
    use std::sync::Arc;

    fn registry(transport: &Arc<FakeTransport>) -> ToolRegistry {
        ToolRegistry::new(Arc::new(client_with(&configured(), transport.clone())))
    }

    #[tokio::test]
    async fn test_append_to_heading_reads_then_writes() {
        let transport = Arc::new(
            FakeTransport::new(Some(200))
                .reply(200, "# Title\n## Tasks\n- a\n## Notes\nfoo")
                .reply(204, ""),
        );
        let out = registry(&transport)
            .call(
                "append_to_heading",
                json!({"filepath": "Plan.md", "heading": "Tasks", "content": "- b"}),
            )
            .await;

        assert!(!out.is_error, "{}", out.text);
        assert_eq!(out.text, "Success: appended under 'Tasks' in Plan.md");
        let sent = transport.requests();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].method, Method::Get);
        assert_eq!(sent[1].method, Method::Put);
        assert_eq!(sent[1].content_kind, ContentKind::Markdown);
        assert_eq!(
            sent[1].body.as_deref(),
            Some("# Title\n## Tasks\n- a\n\n- b\n\n## Notes\nfoo")
        );
    }

    #[tokio::test]
    async fn test_append_to_heading_on_missing_note_does_not_write() {
        let transport = Arc::new(FakeTransport::new(Some(200)).reply(404, ""));
        let out = registry(&transport)
            .call(
                "append_to_heading",
                json!({"filepath": "Nope.md", "heading": "Tasks", "content": "- b"}),
            )
            .await;

        assert!(out.is_error);
        assert_eq!(out.text, "Error: Resource not found.");
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_get_frontmatter() {
        let transport = Arc::new(
            FakeTransport::new(Some(200))
                .reply(200, "---\nstatus: draft\n---\nbody")
                .reply(200, "plain body"),
        );
        let registry = registry(&transport);

        let found = registry
            .call("get_frontmatter", json!({"filepath": "a.md"}))
            .await;
        assert_eq!(found.text, "---\nstatus: draft\n---");

        let missing = registry
            .call("get_frontmatter", json!({"filepath": "b.md"}))
            .await;
        assert!(!missing.is_error);
        assert_eq!(missing.text, NO_FRONTMATTER);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_update_frontmatter_writes_upserted_note() {
        let transport = Arc::new(
            FakeTransport::new(Some(200))
                .reply(200, "---\nstatus: draft\n---\nbody")
                .reply(204, ""),
        );
        let out = registry(&transport)
            .call(
                "update_frontmatter",
                json!({"filepath": "a.md", "key": "status", "value": "done"}),
            )
            .await;

        assert_eq!(out.text, "Success: set status in a.md");
        assert_eq!(
            transport.requests()[1].body.as_deref(),
            Some("---\nstatus: done\n---\nbody")
        );
    }

    #[tokio::test]
    async fn test_update_frontmatter_requires_value() {
        let transport = Arc::new(FakeTransport::new(Some(200)));
        let out = registry(&transport)
            .call("update_frontmatter", json!({"filepath": "a.md", "key": "k"}))
            .await;

        assert!(out.is_error);
        assert!(transport.requests().is_empty());
    }
}
