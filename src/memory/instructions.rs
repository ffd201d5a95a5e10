//! 任务说明存储：调用方提供的一段自定义说明文本
//!
//! 构建 Agent 时读取一次，拼入 system 提示词。

use std::path::{Path, PathBuf};

/// 单文件文本存储
#[derive(Debug, Clone)]
pub struct TaskInstructions {
    path: PathBuf,
}

impl TaskInstructions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取说明；文件不存在或读取失败时返回 None
    pub fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => {
                tracing::info!(path = %self.path.display(), "task instructions loaded");
                Some(text)
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "task instruction file not found");
                None
            }
        }
    }

    /// 覆盖写入说明（必要时创建父目录）
    pub fn store(&self, instructions: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, instructions)?;
        tracing::info!(path = %self.path.display(), "task instructions updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskInstructions::new(dir.path().join("missing.txt"));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_store_overwrites_and_loads() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskInstructions::new(dir.path().join("nested/task_instructions.txt"));
        store.store("go to youtube.com directly").unwrap();
        store.store("1. use duckduckgo").unwrap();
        assert_eq!(store.load().as_deref(), Some("1. use duckduckgo"));
    }
}
