//! Newline-delimited JSON-RPC 2.0 over stdin/stdout.

use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::tools::ToolRegistry;

const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "obsidian-bridge";

pub struct StdioServer {
    registry: Arc<ToolRegistry>,
}

impl StdioServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Serve the process's stdin/stdout until stdin closes.
    pub async fn run(&self) -> Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        self.serve(reader, tokio::io::stdout()).await?;
        Ok(())
    }

    /// Serve any line reader/writer pair; returns the writer once every
    /// request has been answered.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<W>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Value>();

        let writer_task = tokio::spawn(async move {
            while let Some(reply) = rx.recv().await {
                let mut bytes = serde_json::to_vec(&reply)?;
                bytes.push(b'\n');
                writer.write_all(&bytes).await?;
                writer.flush().await?;
            }
            Ok::<W, anyhow::Error>(writer)
        });

        log::info!("stdio server started");
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let message: Value = match serde_json::from_str(line) {
                Ok(message) => message,
                Err(e) => {
                    log::warn!("Discarding unparseable message: {}", e);
                    let reply = error_response(Value::Null, -32700, &format!("Parse error: {}", e));
                    let _ = tx.send(reply);
                    continue;
                }
            };

            let registry = self.registry.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(reply) = handle_message(&registry, message).await {
                    let _ = tx.send(reply);
                }
            });
        }

        drop(tx);
        let writer = writer_task.await??;
        log::info!("stdio server stopped");
        Ok(writer)
    }
}

/// Build the reply for one message, or `None` for notifications.
async fn handle_message(registry: &ToolRegistry, message: Value) -> Option<Value> {
    let id = message.get("id").cloned()?;
    let method = message.get("method").and_then(Value::as_str).unwrap_or("");
    let params = message.get("params").cloned().unwrap_or_else(|| json!({}));

    let reply = match method {
        "initialize" => {
            let version = params
                .get("protocolVersion")
                .cloned()
                .unwrap_or_else(|| json!(DEFAULT_PROTOCOL_VERSION));
            success_response(
                id,
                json!({
                    "protocolVersion": version,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            )
        }
        "ping" => success_response(id, json!({})),
        "tools/list" => success_response(id, json!({ "tools": registry.definitions() })),
        "tools/call" => {
            let Some(name) = params.get("name").and_then(Value::as_str) else {
                return Some(error_response(id, -32602, "Missing tool name"));
            };
            let args = params.get("arguments").cloned().unwrap_or(Value::Null);
            log::debug!("tools/call {}", name);
            let output = registry.call(name, args).await;
            success_response(
                id,
                json!({
                    "content": [{ "type": "text", "text": output.text }],
                    "isError": output.is_error
                }),
            )
        }
        "resources/list" => success_response(id, json!({ "resources": [] })),
        "prompts/list" => success_response(id, json!({ "prompts": [] })),
        _ => error_response(id, -32601, &format!("Method not found: {}", method)),
    };
    Some(reply)
}

fn success_response(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    })
}
