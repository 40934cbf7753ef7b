use crate::models::payload::Payload;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 队列目录中的一个待提交载荷
#[derive(Debug, Clone)]
pub struct QueuedPayload {
    pub payload: Payload,
    pub file_path: PathBuf,
}

/// 从 JSON 文件加载单个载荷
pub async fn load_payload_file(path: &Path) -> Result<QueuedPayload> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取载荷文件: {}", path.display()))?;

    let payload: Payload = serde_json::from_str(&content)
        .with_context(|| format!("无法解析载荷文件: {}", path.display()))?;

    Ok(QueuedPayload {
        payload,
        file_path: path.to_path_buf(),
    })
}

/// 从文件夹中加载所有 JSON 载荷（按文件名排序）
pub async fn load_all_payload_files(folder_path: &str) -> Result<Vec<QueuedPayload>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut payloads = Vec::new();
    for path in paths {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );
        match load_payload_file(&path).await {
            Ok(queued) => payloads.push(queued),
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {:#}", path.display(), e);
            }
        }
    }

    Ok(payloads)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_payload_file_keeps_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("S1.json");
        std::fs::write(&path, r#"{"submissionID": "S1", "builder": "Acme"}"#).unwrap();

        let queued = tokio_test::block_on(load_payload_file(&path)).unwrap();

        assert_eq!(queued.file_path, path);
        assert_eq!(
            crate::models::payload::submission_id(&queued.payload).as_deref(),
            Some("S1")
        );
    }

    #[test]
    fn test_missing_folder_is_an_error() {
        let result = tokio_test::block_on(load_all_payload_files("/definitely/not/here"));
        assert!(result.is_err());
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        assert!(tokio_test::block_on(load_payload_file(&path)).is_err());
    }
}
