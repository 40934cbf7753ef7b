//! 提交记录 - 外部持久化协作方
//!
//! 核心只通过三个写操作更新记录，从不查询。
//! `InMemoryRecordStore` 供命令行驱动和测试使用。

use crate::error::StoreError;
use crate::models::{Payload, SubmissionOutcome, SubmissionStatus};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// 持久化协作方
#[async_trait]
pub trait SubmissionRecorder: Send + Sync {
    /// 新建待处理记录；提交 ID 已存在时返回 `StoreError::Duplicate`
    async fn record_pending(&self, submission_id: &str, payload: &Payload) -> Result<(), StoreError>;

    /// 写入最终结果
    async fn record_outcome(
        &self,
        submission_id: &str,
        outcome: &SubmissionOutcome,
    ) -> Result<(), StoreError>;

    /// 重试次数加一，返回新的次数
    async fn increment_retry_count(&self, submission_id: &str) -> Result<u32, StoreError>;
}

/// 提交记录
#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    pub submission_id: String,
    pub status: SubmissionStatus,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub confirmation_token: Option<String>,
    pub payload: Payload,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

/// 内存记录存储
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<HashMap<String, SubmissionRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, submission_id: &str) -> Option<SubmissionRecord> {
        self.records.lock().await.get(submission_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl SubmissionRecorder for InMemoryRecordStore {
    async fn record_pending(&self, submission_id: &str, payload: &Payload) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        if records.contains_key(submission_id) {
            return Err(StoreError::Duplicate {
                submission_id: submission_id.to_string(),
            });
        }

        let now = Local::now();
        records.insert(
            submission_id.to_string(),
            SubmissionRecord {
                submission_id: submission_id.to_string(),
                status: SubmissionStatus::Pending,
                retry_count: 0,
                last_error: None,
                confirmation_token: None,
                payload: payload.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        debug!("记录已创建: {}", submission_id);
        Ok(())
    }

    async fn record_outcome(
        &self,
        submission_id: &str,
        outcome: &SubmissionOutcome,
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(submission_id)
            .ok_or_else(|| StoreError::NotFound {
                submission_id: submission_id.to_string(),
            })?;

        record.status = outcome.status();
        record.confirmation_token =
            Some(outcome.confirmation_token.clone()).filter(|t| !t.is_empty());
        record.last_error = Some(outcome.error_detail.clone()).filter(|e| !e.is_empty());
        record.updated_at = Local::now();
        debug!("记录已更新: {} → {}", submission_id, record.status.as_str());
        Ok(())
    }

    async fn increment_retry_count(&self, submission_id: &str) -> Result<u32, StoreError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(submission_id)
            .ok_or_else(|| StoreError::NotFound {
                submission_id: submission_id.to_string(),
            })?;
        record.retry_count += 1;
        record.updated_at = Local::now();
        Ok(record.retry_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_pending_is_rejected() {
        let store = InMemoryRecordStore::new();
        let payload = Payload::new();
        store.record_pending("S1", &payload).await.unwrap();

        let second = store.record_pending("S1", &payload).await;
        assert!(matches!(second, Err(StoreError::Duplicate { .. })));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_outcome_and_retry_updates() {
        let store = InMemoryRecordStore::new();
        store.record_pending("S1", &Payload::new()).await.unwrap();

        assert_eq!(store.increment_retry_count("S1").await.unwrap(), 1);
        store
            .record_outcome("S1", &SubmissionOutcome::failure("Plan Name is required"))
            .await
            .unwrap();

        let record = store.get("S1").await.unwrap();
        assert_eq!(record.status, SubmissionStatus::Failed);
        assert_eq!(record.retry_count, 1);
        assert_eq!(record.last_error.as_deref(), Some("Plan Name is required"));
        assert!(record.confirmation_token.is_none());
    }

    #[tokio::test]
    async fn test_unknown_record_is_not_found() {
        let store = InMemoryRecordStore::new();
        let result = store
            .record_outcome("missing", &SubmissionOutcome::success(None))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }
}
