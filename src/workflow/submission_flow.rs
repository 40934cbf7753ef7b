//! 单次提交流程 - 流程层
//!
//! 核心职责：定义"一次尝试"的完整过程
//!
//! 流程顺序：
//! 1. 记录本次尝试要发送的字段
//! 2. 交给提交策略执行
//! 3. 记录判定结果

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::models::{Classification, SubmissionOutcome, TargetFieldMap};
use crate::strategy::SubmissionStrategy;
use crate::utils::truncate_text;
use crate::workflow::submission_ctx::SubmissionCtx;

/// 一次尝试的记录
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub outcome: SubmissionOutcome,
    pub elapsed_ms: u128,
}

/// 单次提交流程
///
/// - 不持有会话资源，会话由策略按次创建
/// - 不决定是否重试
pub struct SubmissionFlow {
    strategy: Arc<dyn SubmissionStrategy>,
}

impl SubmissionFlow {
    pub fn new(strategy: Arc<dyn SubmissionStrategy>) -> Self {
        Self { strategy }
    }

    pub async fn run(&self, fields: &TargetFieldMap, ctx: &SubmissionCtx) -> AttemptRecord {
        info!("{} 📤 开始提交 ({} 个字段)", ctx, fields.len());
        for (name, value) in fields.target_fields() {
            debug!("{}   {} = {}", ctx, name, truncate_text(value, 80));
        }

        let started = Instant::now();
        let outcome = self.strategy.submit(fields).await;
        let elapsed_ms = started.elapsed().as_millis();

        match outcome.classification {
            Classification::Success => info!("{} ✅ {} ({} ms)", ctx, outcome, elapsed_ms),
            Classification::Inconclusive => warn!("{} 🔎 {} ({} ms)", ctx, outcome, elapsed_ms),
            Classification::Failure => warn!("{} ❌ {} ({} ms)", ctx, outcome, elapsed_ms),
        }

        AttemptRecord {
            attempt: ctx.attempt,
            outcome,
            elapsed_ms,
        }
    }
}
