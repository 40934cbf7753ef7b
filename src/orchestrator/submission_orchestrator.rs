//! 提交编排器 - 编排层
//!
//! 对外的调用契约：`submit(payload) -> SubmissionOutcome`。
//!
//! 流程：读取提交ID → 取映射快照 → 转换 → 登记待处理记录 →
//! 第一次尝试 → （被拒绝且允许重试时）重试一次 → 写入最终结果。
//!
//! 策略层的错误在策略内部已转换为失败结果；
//! 只有映射错误、缺少提交ID和重复提交会以 `Err` 返回。

use crate::error::{AppResult, BusinessError};
use crate::models::payload::submission_id;
use crate::models::{Classification, Payload, SubmissionOutcome};
use crate::services::{transform, MappingStore, SubmissionRecorder};
use crate::strategy::SubmissionStrategy;
use crate::workflow::{AttemptRecord, SubmissionCtx, SubmissionFlow};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 提交编排器
pub struct SubmissionOrchestrator {
    mapping: Arc<MappingStore>,
    flow: SubmissionFlow,
    recorder: Arc<dyn SubmissionRecorder>,
    max_retries: u32,
}

impl SubmissionOrchestrator {
    pub fn new(
        mapping: Arc<MappingStore>,
        strategy: Arc<dyn SubmissionStrategy>,
        recorder: Arc<dyn SubmissionRecorder>,
        max_retries: u32,
    ) -> Self {
        Self {
            mapping,
            flow: SubmissionFlow::new(strategy),
            recorder,
            max_retries,
        }
    }

    /// 提交一个新的载荷
    pub async fn submit(&self, payload: &Payload) -> AppResult<SubmissionOutcome> {
        let id = submission_id(payload).ok_or(BusinessError::MissingSubmissionId)?;
        let ctx = SubmissionCtx::new(&id);

        // 一次提交只使用一份快照
        let spec = self.mapping.snapshot();
        let fields = transform(payload, &spec)?;

        self.recorder.record_pending(&id, payload).await?;

        let mut history = vec![self.flow.run(&fields, &ctx).await];

        if should_retry(&history[0].outcome) && self.max_retries >= 1 {
            self.bump_retry_count(&ctx).await;
            let retry_ctx = ctx.next_attempt();
            info!("{} 🔁 上次被拒绝，重试一次", retry_ctx);
            history.push(self.flow.run(&fields, &retry_ctx).await);
        }

        log_history(&ctx, &history);

        let outcome = history
            .pop()
            .map(|record| record.outcome)
            .unwrap_or_else(|| SubmissionOutcome::failure("没有执行任何尝试"));
        self.finish(&ctx, &outcome).await;
        Ok(outcome)
    }

    /// 手动重试一个之前失败的提交
    ///
    /// 不新建待处理记录；`retries_so_far` 已达上限时拒绝
    pub async fn retry(&self, payload: &Payload, retries_so_far: u32) -> AppResult<SubmissionOutcome> {
        let id = submission_id(payload).ok_or(BusinessError::MissingSubmissionId)?;
        if retries_so_far >= self.max_retries {
            return Err(BusinessError::RetryLimitReached {
                submission_id: id,
                max_retries: self.max_retries,
            }
            .into());
        }

        let ctx = SubmissionCtx {
            submission_id: id,
            attempt: retries_so_far + 2,
        };

        let spec = self.mapping.snapshot();
        let fields = transform(payload, &spec)?;

        info!("{} 🔁 手动重试 (已重试 {}/{})", ctx, retries_so_far, self.max_retries);
        let outcome = self.flow.run(&fields, &ctx).await.outcome;

        if !outcome.succeeded {
            self.bump_retry_count(&ctx).await;
        }
        self.finish(&ctx, &outcome).await;
        Ok(outcome)
    }

    async fn bump_retry_count(&self, ctx: &SubmissionCtx) {
        if let Err(e) = self.recorder.increment_retry_count(&ctx.submission_id).await {
            error!("{} ❌ 无法更新重试次数: {}", ctx, e);
        }
    }

    /// 提交已经发生，记录失败不能改变返回给调用方的结果
    async fn finish(&self, ctx: &SubmissionCtx, outcome: &SubmissionOutcome) {
        if let Err(e) = self.recorder.record_outcome(&ctx.submission_id, outcome).await {
            error!("{} ❌ 无法写入提交结果: {}", ctx, e);
        }
    }
}

/// 只有目标明确拒绝（或网络失败）才重试；无法判定的结果可能已经提交成功
fn should_retry(outcome: &SubmissionOutcome) -> bool {
    !outcome.succeeded && outcome.classification == Classification::Failure
}

fn log_history(ctx: &SubmissionCtx, history: &[AttemptRecord]) {
    if history.len() < 2 {
        return;
    }
    for record in history {
        warn!(
            "{} 尝试 #{}: {} ({} ms)",
            ctx, record.attempt, record.outcome, record.elapsed_ms
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, StoreError};
    use crate::models::{MappingSpecification, SubmissionStatus, TargetFieldMap};
    use crate::services::InMemoryRecordStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// 按顺序返回预设结果，并记下收到的字段
    struct ScriptedStrategy {
        outcomes: Mutex<VecDeque<SubmissionOutcome>>,
        seen: Mutex<Vec<TargetFieldMap>>,
    }

    impl ScriptedStrategy {
        fn new(outcomes: Vec<SubmissionOutcome>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SubmissionStrategy for ScriptedStrategy {
        async fn submit(&self, fields: &TargetFieldMap) -> SubmissionOutcome {
            self.seen.lock().unwrap().push(fields.clone());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| SubmissionOutcome::failure("no scripted outcome"))
        }
    }

    fn mapping() -> Arc<MappingStore> {
        let spec: MappingSpecification = serde_json::from_value(json!({
            "mappings": [
                {"source_field": "builder", "target_field": "ctl00_cphBody_txtBuilderName", "transform_kind": "direct"},
                {"source_field": "plan", "target_field": "ctl00_cphBody_txtPlanName", "transform_kind": "direct"},
                {"source_field": "roof", "target_field": "ctl00_cphBody_ddlRoofType", "transform_kind": "value_lookup",
                 "value_lookup_table": {"TRUSS": "NOTES", "RAFTER": "R"}, "display_label": "Roof"}
            ]
        }))
        .unwrap();
        Arc::new(MappingStore::new(spec).unwrap())
    }

    fn payload(id: &str) -> Payload {
        json!({"submission_id": id, "builder": "Acme", "plan": "PlanA", "roof": "TRUSS"})
            .as_object()
            .unwrap()
            .clone()
    }

    fn orchestrator(
        strategy: Arc<ScriptedStrategy>,
        store: Arc<InMemoryRecordStore>,
        max_retries: u32,
    ) -> SubmissionOrchestrator {
        SubmissionOrchestrator::new(mapping(), strategy, store, max_retries)
    }

    #[tokio::test]
    async fn test_fail_then_succeed_records_one_retry() {
        let strategy = ScriptedStrategy::new(vec![
            SubmissionOutcome::failure("Network error: connection reset"),
            SubmissionOutcome::success(None),
        ]);
        let store = Arc::new(InMemoryRecordStore::new());
        let orch = orchestrator(strategy.clone(), store.clone(), 2);

        let outcome = orch.submit(&payload("S1")).await.unwrap();

        assert!(outcome.succeeded);
        assert_eq!(strategy.calls(), 2);
        let record = store.get("S1").await.unwrap();
        assert_eq!(record.retry_count, 1);
        assert_eq!(record.status, SubmissionStatus::Success);
    }

    #[tokio::test]
    async fn test_retries_at_most_once() {
        let strategy = ScriptedStrategy::new(vec![
            SubmissionOutcome::failure("Plan Name is required"),
            SubmissionOutcome::failure("Plan Name is required"),
            SubmissionOutcome::success(None),
        ]);
        let store = Arc::new(InMemoryRecordStore::new());
        let orch = orchestrator(strategy.clone(), store.clone(), 5);

        let outcome = orch.submit(&payload("S1")).await.unwrap();

        assert!(!outcome.succeeded);
        assert_eq!(outcome.error_detail, "Plan Name is required");
        assert_eq!(strategy.calls(), 2);
        let record = store.get("S1").await.unwrap();
        assert_eq!(record.status, SubmissionStatus::Failed);
        assert_eq!(record.last_error.as_deref(), Some("Plan Name is required"));
    }

    #[tokio::test]
    async fn test_zero_max_retries_never_retries() {
        let strategy = ScriptedStrategy::new(vec![SubmissionOutcome::failure("nope")]);
        let store = Arc::new(InMemoryRecordStore::new());
        let orch = orchestrator(strategy.clone(), store.clone(), 0);

        let outcome = orch.submit(&payload("S1")).await.unwrap();

        assert!(!outcome.succeeded);
        assert_eq!(strategy.calls(), 1);
        assert_eq!(store.get("S1").await.unwrap().retry_count, 0);
    }

    #[tokio::test]
    async fn test_inconclusive_is_not_retried() {
        let strategy = ScriptedStrategy::new(vec![SubmissionOutcome::inconclusive(true)]);
        let store = Arc::new(InMemoryRecordStore::new());
        let orch = orchestrator(strategy.clone(), store.clone(), 2);

        let outcome = orch.submit(&payload("S1")).await.unwrap();

        assert!(outcome.succeeded);
        assert!(outcome.needs_review());
        assert_eq!(strategy.calls(), 1);
        let record = store.get("S1").await.unwrap();
        assert_eq!(record.confirmation_token.as_deref(), Some("VERIFY_MANUALLY"));
    }

    #[tokio::test]
    async fn test_duplicate_submission_is_a_conflict() {
        let strategy = ScriptedStrategy::new(vec![
            SubmissionOutcome::success(None),
            SubmissionOutcome::success(None),
        ]);
        let store = Arc::new(InMemoryRecordStore::new());
        let orch = orchestrator(strategy.clone(), store.clone(), 2);

        orch.submit(&payload("S1")).await.unwrap();
        let second = orch.submit(&payload("S1")).await;

        assert!(matches!(
            second,
            Err(AppError::Store(StoreError::Duplicate { .. }))
        ));
        assert_eq!(strategy.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_submission_id_is_rejected() {
        let strategy = ScriptedStrategy::new(vec![]);
        let store = Arc::new(InMemoryRecordStore::new());
        let orch = orchestrator(strategy.clone(), store.clone(), 2);

        let mut p = payload("S1");
        p.remove("submission_id");
        let result = orch.submit(&p).await;

        assert!(matches!(
            result,
            Err(AppError::Business(BusinessError::MissingSubmissionId))
        ));
        assert_eq!(strategy.calls(), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_end_to_end_fields_reach_strategy() {
        let strategy = ScriptedStrategy::new(vec![SubmissionOutcome::success(None)]);
        let store = Arc::new(InMemoryRecordStore::new());
        let orch = orchestrator(strategy.clone(), store.clone(), 2);

        orch.submit(&payload("S1")).await.unwrap();

        let seen = strategy.seen.lock().unwrap();
        let fields = &seen[0];
        assert_eq!(fields.get("ctl00_cphBody_txtBuilderName"), Some("Acme"));
        assert_eq!(fields.get("ctl00_cphBody_txtPlanName"), Some("PlanA"));
        assert_eq!(fields.get("ctl00_cphBody_ddlRoofType"), None);
        assert!(fields.notes().unwrap_or_default().contains("Roof: TRUSS"));
    }

    #[tokio::test]
    async fn test_manual_retry_respects_limit() {
        let strategy = ScriptedStrategy::new(vec![SubmissionOutcome::failure("still broken")]);
        let store = Arc::new(InMemoryRecordStore::new());
        store.record_pending("S1", &payload("S1")).await.unwrap();
        let orch = orchestrator(strategy.clone(), store.clone(), 2);

        let refused = orch.retry(&payload("S1"), 2).await;
        assert!(matches!(
            refused,
            Err(AppError::Business(BusinessError::RetryLimitReached { max_retries: 2, .. }))
        ));
        assert_eq!(strategy.calls(), 0);

        let outcome = orch.retry(&payload("S1"), 1).await.unwrap();
        assert!(!outcome.succeeded);
        assert_eq!(strategy.calls(), 1);
        let record = store.get("S1").await.unwrap();
        assert_eq!(record.retry_count, 1);
        assert_eq!(record.status, SubmissionStatus::Failed);
    }
}
