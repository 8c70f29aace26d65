//! Manifest renderer seam and the two provided implementations.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use crate::error::{Result, SourceError};
use crate::repository::manifest_files;

/// Turns a checked-out rendered-source directory into fully resolved
/// object documents.
///
/// Templating and overlay-patch languages are this collaborator's problem;
/// the engine only consumes its output.
#[async_trait]
pub trait ManifestRenderer: Send + Sync {
    /// Renders the directory into object documents.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::RenderError` carrying the renderer's raw
    /// diagnostic output when rendering fails.
    async fn render(&self, dir: &Path) -> Result<Vec<Value>>;

    /// Renderer name for logging and error payloads.
    fn name(&self) -> &str;
}

/// Subprocess-backed renderer: invokes an external command with the
/// source directory as its final argument and parses its stdout.
///
/// The command's stdout may be a single JSON document, a JSON array, or
/// NDJSON (one document per line). A non-zero exit surfaces the captured
/// stderr verbatim as `RenderError`.
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandRenderer {
    /// Creates a renderer invoking `program` with `args`.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl ManifestRenderer for CommandRenderer {
    async fn render(&self, dir: &Path) -> Result<Vec<Value>> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| SourceError::render(&self.program, format!("failed to spawn: {e}")))?;

        if !output.status.success() {
            let mut diagnostic = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if diagnostic.is_empty() {
                diagnostic = format!("exited with {}", output.status);
            }
            return Err(SourceError::render(&self.program, diagnostic));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_documents(&stdout, &self.program)
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Renderer for pre-rendered sources: reads `.json` and `.ndjson` files
/// from the directory directly, in name order.
#[derive(Debug, Default)]
pub struct PassthroughRenderer;

impl PassthroughRenderer {
    /// Creates a passthrough renderer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ManifestRenderer for PassthroughRenderer {
    async fn render(&self, dir: &Path) -> Result<Vec<Value>> {
        let files = manifest_files(dir)
            .await
            .map_err(|e| SourceError::render("passthrough", format!("{}: {e}", dir.display())))?;

        let mut documents = Vec::new();
        for file in files {
            let text = tokio::fs::read_to_string(&file).await.map_err(|e| {
                SourceError::render("passthrough", format!("{}: {e}", file.display()))
            })?;
            let origin = file.display().to_string();
            documents.extend(parse_documents(&text, &origin)?);
        }
        Ok(documents)
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}

/// Parses renderer output: a JSON array, a single document, or NDJSON.
fn parse_documents(text: &str, origin: &str) -> Result<Vec<Value>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(match value {
            Value::Array(items) => items,
            doc => vec![doc],
        });
    }

    // NDJSON fallback: one document per non-empty line.
    let mut documents = Vec::new();
    for (lineno, line) in trimmed.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let doc: Value = serde_json::from_str(line).map_err(|e| {
            SourceError::render(origin, format!("line {}: {e}", lineno + 1))
        })?;
        documents.push(doc);
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single_document() {
        let docs = parse_documents(r#"{"kind": "Workload"}"#, "test").unwrap();
        assert_eq!(docs, vec![json!({"kind": "Workload"})]);
    }

    #[test]
    fn test_parse_array() {
        let docs = parse_documents(r#"[{"a": 1}, {"b": 2}]"#, "test").unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_parse_ndjson() {
        let docs = parse_documents("{\"a\": 1}\n{\"b\": 2}\n", "test").unwrap();
        assert_eq!(docs, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_documents("", "test").unwrap().is_empty());
        assert!(parse_documents("  \n ", "test").unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage_is_render_error() {
        let err = parse_documents("{\"a\": 1}\nnot json\n", "overlay").unwrap_err();
        match err {
            SourceError::RenderError { renderer, .. } => assert_eq!(renderer, "overlay"),
            other => panic!("expected RenderError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_passthrough_reads_directory() {
        let dir = tempfile::tempdir().expect("tmp dir");
        tokio::fs::write(
            dir.path().join("10-ns.json"),
            r#"{"kind": "Namespace", "metadata": {"name": "prod"}}"#,
        )
        .await
        .unwrap();
        tokio::fs::write(
            dir.path().join("20-api.ndjson"),
            "{\"kind\": \"Workload\", \"metadata\": {\"name\": \"api\"}}\n",
        )
        .await
        .unwrap();

        let docs = PassthroughRenderer::new().render(dir.path()).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["kind"], "Namespace");
        assert_eq!(docs[1]["kind"], "Workload");
    }

    #[tokio::test]
    async fn test_command_renderer_nonzero_exit_keeps_stderr() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let renderer = CommandRenderer::new(
            "sh",
            vec![
                "-c".into(),
                "echo 'template error: bad overlay' >&2; exit 3".into(),
                "sh".into(),
            ],
        );
        let err = renderer.render(dir.path()).await.unwrap_err();
        match err {
            SourceError::RenderError { diagnostic, .. } => {
                assert!(diagnostic.contains("template error: bad overlay"));
            }
            other => panic!("expected RenderError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_command_renderer_parses_stdout() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let renderer = CommandRenderer::new(
            "sh",
            vec![
                "-c".into(),
                r#"echo '[{"kind": "Workload", "metadata": {"name": "api"}}]'"#.into(),
                "sh".into(),
            ],
        );
        let docs = renderer.render(dir.path()).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["metadata"]["name"], "api");
    }
}
