//! Minimal filesystem `Tool` implementations. These exist to exercise the
//! registry end-to-end in tests and examples; the domain-specific tool
//! bodies (weather, imagery, emission calculators) are out of scope and
//! left to callers.

use async_trait::async_trait;
use serde_json::Value;

use super::registry::Tool;
use super::schema::{ParameterKind, ToolParameter, ToolSchema};
use crate::{Result, ToolingError};

/// Reads a UTF-8 file and returns its contents.
pub struct FileReadTool;

#[async_trait]
impl Tool for FileReadTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new("file_read", "read a UTF-8 text file")
            .with_parameters(vec![ToolParameter::new("path", ParameterKind::String)
                .required()
                .with_description("filesystem path to read")])
            .with_returns("the file's text contents")
            .with_category("filesystem")
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let path = args["path"]
            .as_str()
            .ok_or_else(|| ToolingError::General("path must be a string".into()))?;
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(ToolingError::Io)?;
        Ok(Value::String(contents))
    }
}

/// Writes (overwriting) a UTF-8 file.
pub struct FileWriteTool;

#[async_trait]
impl Tool for FileWriteTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new("file_write", "write a UTF-8 text file, overwriting any existing content")
            .with_parameters(vec![
                ToolParameter::new("path", ParameterKind::String).required(),
                ToolParameter::new("content", ParameterKind::String).required(),
            ])
            .with_returns("null on success")
            .with_category("filesystem")
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let path = args["path"]
            .as_str()
            .ok_or_else(|| ToolingError::General("path must be a string".into()))?;
        let content = args["content"]
            .as_str()
            .ok_or_else(|| ToolingError::General("content must be a string".into()))?;
        tokio::fs::write(path, content).await.map_err(ToolingError::Io)?;
        Ok(Value::Null)
    }
}

/// Lists entries of a directory, non-recursively.
pub struct FsListTool;

#[async_trait]
impl Tool for FsListTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new("fs_list", "list entries of a directory")
            .with_parameters(vec![ToolParameter::new("path", ParameterKind::String).required()])
            .with_returns("array of entry names")
            .with_category("filesystem")
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let path = args["path"]
            .as_str()
            .ok_or_else(|| ToolingError::General("path must be a string".into()))?;
        let mut entries = tokio::fs::read_dir(path).await.map_err(ToolingError::Io)?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(ToolingError::Io)? {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        Ok(serde_json::json!(names))
    }
}

/// Greps a file's lines for a literal substring.
pub struct GrepTool;

#[async_trait]
impl Tool for GrepTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new("grep", "find lines in a file containing a literal substring")
            .with_parameters(vec![
                ToolParameter::new("path", ParameterKind::String).required(),
                ToolParameter::new("pattern", ParameterKind::String).required(),
            ])
            .with_returns("array of matching lines")
            .with_category("filesystem")
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let path = args["path"]
            .as_str()
            .ok_or_else(|| ToolingError::General("path must be a string".into()))?;
        let pattern = args["pattern"]
            .as_str()
            .ok_or_else(|| ToolingError::General("pattern must be a string".into()))?;
        let contents = tokio::fs::read_to_string(path).await.map_err(ToolingError::Io)?;
        let matches: Vec<&str> = contents.lines().filter(|l| l.contains(pattern)).collect();
        Ok(serde_json::json!(matches))
    }
}
