//! File tools: read, write and list local files.

use crate::{SharedStore, log_call};
use async_trait::async_trait;
use runtime::tools::{optional_string, required_string};
use runtime::{Arguments, Tool, ToolError};
use serde_json::{Value, json};
use std::path::Path;
use tokio::fs;
use tracing::debug;

pub struct ReadFile {
    store: SharedStore,
}

impl ReadFile {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ReadFile {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "读取文件内容"
    }

    async fn call(&self, arguments: Arguments) -> Result<Value, ToolError> {
        log_call(&self.store, self.name(), &arguments);
        let file_path = required_string(&arguments, "file_path")?;

        let content = fs::read_to_string(&file_path)
            .await
            .map_err(|e| ToolError::Execution(format!("读取文件失败 {file_path}: {e}")))?;
        debug!(path = %file_path, bytes = content.len(), "read file");

        Ok(json!({
            "status": "success",
            "file_path": file_path,
            "content": content,
        }))
    }
}

/// Writes text to a file, creating parent directories as needed.
pub struct WriteFile {
    store: SharedStore,
}

impl WriteFile {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for WriteFile {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "将内容写入文件，目录不存在时会自动创建"
    }

    async fn call(&self, arguments: Arguments) -> Result<Value, ToolError> {
        // The file body is not copied into the call log.
        let logged: Arguments = arguments
            .iter()
            .filter(|(key, _)| key.as_str() == "file_path")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        log_call(&self.store, self.name(), &logged);

        let file_path = required_string(&arguments, "file_path")?;
        // Empty content is a valid write.
        let content = optional_string(&arguments, "content")
            .ok_or_else(|| ToolError::InvalidInput("missing argument: content".into()))?;

        let write_failed =
            |e: std::io::Error| ToolError::Execution(format!("写入文件失败 {file_path}: {e}"));
        let parent = Path::new(&file_path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            fs::create_dir_all(parent).await.map_err(write_failed)?;
        }
        fs::write(&file_path, &content).await.map_err(write_failed)?;
        debug!(path = %file_path, bytes = content.len(), "wrote file");

        Ok(json!({
            "status": "success",
            "message": format!("已写入文件: {file_path}"),
            "file_path": file_path,
        }))
    }
}

/// Lists a directory's entries, split into files and directories.
pub struct ListDirectory {
    store: SharedStore,
}

impl ListDirectory {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListDirectory {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "列出目录内容，默认为当前目录"
    }

    async fn call(&self, arguments: Arguments) -> Result<Value, ToolError> {
        log_call(&self.store, self.name(), &arguments);
        let directory = optional_string(&arguments, "directory_path")
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| ".".to_string());

        let list_failed =
            |e: std::io::Error| ToolError::Execution(format!("列出目录失败 {directory}: {e}"));
        let mut entries = fs::read_dir(&directory).await.map_err(list_failed)?;

        let mut files = Vec::new();
        let mut directories = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(list_failed)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await.map_err(list_failed)?.is_dir() {
                directories.push(name);
            } else {
                files.push(name);
            }
        }
        files.sort();
        directories.sort();

        Ok(json!({
            "status": "success",
            "directory_path": directory,
            "files": files,
            "directories": directories,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared;
    use storage::RecordStore;

    fn store() -> SharedStore {
        shared(RecordStore::in_memory().unwrap())
    }

    fn args(pairs: &[(&str, &str)]) -> Arguments {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[tokio::test]
    async fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes").join("today.txt");
        let path = path.to_str().unwrap();
        let store = store();

        let written = WriteFile::new(store.clone())
            .call(args(&[("file_path", path), ("content", "吃了蛋糕")]))
            .await
            .unwrap();
        assert_eq!(written["status"], "success");

        let read = ReadFile::new(store.clone())
            .call(args(&[("file_path", path)]))
            .await
            .unwrap();
        assert_eq!(read["content"], "吃了蛋糕");

        let counts = store.lock().unwrap().call_counts().unwrap();
        assert_eq!(counts["write_file"], 1);
        assert_eq!(counts["read_file"], 1);
    }

    #[tokio::test]
    async fn write_logs_only_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        let path = path.to_str().unwrap();
        let store = store();

        WriteFile::new(store.clone())
            .call(args(&[("file_path", path), ("content", "很长的文件内容")]))
            .await
            .unwrap();

        let calls = store.lock().unwrap().recent_calls(1).unwrap();
        assert_eq!(calls[0].function_name, "write_file");
        assert_eq!(calls[0].arguments, json!({ "file_path": path }));
    }

    #[tokio::test]
    async fn missing_file_is_an_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");

        let err = ReadFile::new(store())
            .call(args(&[("file_path", path.to_str().unwrap())]))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Execution(_)));
    }

    #[tokio::test]
    async fn write_requires_content() {
        let err = WriteFile::new(store())
            .call(args(&[("file_path", "out.txt")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn list_splits_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let listing = ListDirectory::new(store())
            .call(args(&[("directory_path", dir.path().to_str().unwrap())]))
            .await
            .unwrap();

        assert_eq!(listing["files"], json!(["a.txt", "b.txt"]));
        assert_eq!(listing["directories"], json!(["sub"]));
    }

    #[tokio::test]
    async fn list_defaults_to_current_directory() {
        let listing = ListDirectory::new(store())
            .call(Arguments::new())
            .await
            .unwrap();
        assert_eq!(listing["directory_path"], ".");
    }
}
