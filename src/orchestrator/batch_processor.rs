//! 批量提交处理器 - 编排层
//!
//! ## 职责
//!
//! 命令行程序的入口，负责队列目录中全部载荷的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：写日志头、加载映射、构建提交策略、检查门户连通性
//! 2. **批量加载**：扫描并加载所有待提交的载荷（`Vec<QueuedPayload>`）
//! 3. **并发控制**：使用 Semaphore 限制并发数量
//! 4. **分批处理**：每批开始前重新加载映射，每批完成后再开始下一批
//! 5. **结果落地**：成功的载荷文件被删除，失败或需核实的写入核实日志
//! 6. **全局统计**：汇总所有提交的处理结果

use crate::config::Config;
use crate::models::payload::submission_id;
use crate::models::{load_all_payload_files, QueuedPayload, SubmissionOutcome};
use crate::orchestrator::SubmissionOrchestrator;
use crate::services::{InMemoryRecordStore, MappingStore, OutcomeWriter};
use crate::strategy::{build_strategy, HttpFormStrategy};
use crate::utils::logging::{
    init_log_file, log_batch_complete, log_batch_start, log_payloads_loaded, log_startup,
    print_final_stats,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    mapping: Arc<MappingStore>,
    orchestrator: Arc<SubmissionOrchestrator>,
    review_writer: Arc<OutcomeWriter>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)?;

        log_startup(
            &config.strategy.to_string(),
            config.max_concurrent_submissions,
            &config.target_url,
        );

        let mapping = Arc::new(
            MappingStore::from_file(&config.mapping_file)
                .await
                .with_context(|| format!("无法加载映射文件: {}", config.mapping_file))?,
        );

        // 连通性检查失败不终止运行
        match HttpFormStrategy::new(&config).test_connection().await {
            Ok(()) => info!("🌐 目标门户可访问"),
            Err(e) => warn!("⚠️ 目标门户连通性检查失败: {}", e),
        }

        let orchestrator = Arc::new(SubmissionOrchestrator::new(
            mapping.clone(),
            build_strategy(&config),
            Arc::new(InMemoryRecordStore::new()),
            config.max_retries,
        ));
        let review_writer = Arc::new(OutcomeWriter::with_path(config.review_log_file.clone()));

        Ok(Self {
            config,
            mapping,
            orchestrator,
            review_writer,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        info!("\n📁 正在扫描待提交的载荷...");
        let all_payloads = load_all_payload_files(&self.config.payload_folder).await?;

        if all_payloads.is_empty() {
            warn!("⚠️ 没有找到待提交的JSON文件，程序结束");
            return Ok(());
        }

        log_payloads_loaded(all_payloads.len(), self.batch_size());

        let stats = self.process_all(all_payloads).await?;

        print_final_stats(
            stats.success,
            stats.needs_review,
            stats.failed,
            stats.total,
            &self.config.output_log_file,
        );

        Ok(())
    }

    fn batch_size(&self) -> usize {
        self.config.max_concurrent_submissions.max(1)
    }

    /// 处理所有载荷
    async fn process_all(&self, all_payloads: Vec<QueuedPayload>) -> Result<ProcessingStats> {
        let batch_size = self.batch_size();
        let semaphore = Arc::new(Semaphore::new(batch_size));
        let total = all_payloads.len();
        let total_batches = total.div_ceil(batch_size);
        let mut stats = ProcessingStats {
            total,
            ..Default::default()
        };

        for (batch_idx, batch) in all_payloads.chunks(batch_size).enumerate() {
            let batch_start = batch_idx * batch_size;
            log_batch_start(
                batch_idx + 1,
                total_batches,
                batch_start + 1,
                batch_start + batch.len(),
                total,
            );

            // 失败时 reload 内部已记录警告并保留旧快照
            let _ = self.mapping.reload().await;

            let batch_result = self.process_batch(batch, semaphore.clone()).await?;

            stats.success += batch_result.success;
            stats.needs_review += batch_result.needs_review;
            stats.failed += batch_result.failed;

            log_batch_complete(batch_idx + 1, batch_result.success, batch.len());
        }

        Ok(stats)
    }

    /// 处理单个批次
    async fn process_batch(
        &self,
        batch: &[QueuedPayload],
        semaphore: Arc<Semaphore>,
    ) -> Result<BatchResult> {
        let mut handles = Vec::new();

        for queued in batch {
            let permit = semaphore.clone().acquire_owned().await?;
            let orchestrator = self.orchestrator.clone();
            let review_writer = self.review_writer.clone();
            let queued = queued.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                process_one(&orchestrator, &review_writer, queued).await
            });
            handles.push(handle);
        }

        let mut result = BatchResult::default();
        for handle in handles {
            match handle.await {
                Ok(TaskResult::Success) => result.success += 1,
                Ok(TaskResult::NeedsReview) => {
                    result.success += 1;
                    result.needs_review += 1;
                }
                Ok(TaskResult::Failed) => result.failed += 1,
                Err(e) => {
                    error!("任务执行失败: {}", e);
                    result.failed += 1;
                }
            }
        }

        Ok(result)
    }
}

/// 提交单个载荷并落地结果
async fn process_one(
    orchestrator: &SubmissionOrchestrator,
    review_writer: &OutcomeWriter,
    queued: QueuedPayload,
) -> TaskResult {
    let source = queued
        .file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let id = submission_id(&queued.payload).unwrap_or_else(|| "-".to_string());

    let outcome = match orchestrator.submit(&queued.payload).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("[提交 {}] ❌ 无法提交 {}: {}", id, source, e);
            SubmissionOutcome::failure(e.to_string())
        }
    };

    if outcome.needs_review() {
        if let Err(e) = review_writer.write(&id, &source, &outcome).await {
            error!("[提交 {}] ❌ 写入核实日志失败: {}", id, e);
        }
    }

    if !outcome.succeeded {
        return TaskResult::Failed;
    }

    if let Err(e) = tokio::fs::remove_file(&queued.file_path).await {
        warn!(
            "[提交 {}] ⚠️ 删除已提交的载荷文件失败 {}: {}",
            id,
            queued.file_path.display(),
            e
        );
    }

    if outcome.needs_review() {
        TaskResult::NeedsReview
    } else {
        TaskResult::Success
    }
}

/// 单个任务的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskResult {
    Success,
    NeedsReview,
    Failed,
}

/// 处理统计
#[derive(Debug, Default)]
struct ProcessingStats {
    success: usize,
    needs_review: usize,
    failed: usize,
    total: usize,
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    success: usize,
    needs_review: usize,
    failed: usize,
}
