//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `submission_orchestrator` - 单个提交的编排
//! - 对外契约 `submit(payload)` / `retry(payload, retries_so_far)`
//! - 重试策略与提交记录的更新
//!
//! ### `batch_processor` - 队列目录批量处理
//! - 管理应用生命周期（初始化、运行）
//! - 控制并发数量（Semaphore）与映射热加载
//! - 输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<QueuedPayload>)
//!     ↓
//! submission_orchestrator (处理单个 Payload：转换 → 尝试 → 重试 → 记录)
//!     ↓
//! workflow::SubmissionFlow (处理单次尝试)
//!     ↓
//! strategy (HTTP 表单 / 浏览器自动化)
//!     ↓
//! services + infrastructure (令牌、判定 / HttpSession、PageSession)
//! ```

pub mod batch_processor;
pub mod submission_orchestrator;

pub use batch_processor::App;
pub use submission_orchestrator::SubmissionOrchestrator;
