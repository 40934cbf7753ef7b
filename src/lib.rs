//! # Portal Submit
//!
//! 将外部系统的表单载荷按映射规则转换，并提交到第三方门户表单
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有会话资源，只暴露能力
//! - `HttpSession` - 带 Cookie 的 HTTP 会话，所有请求都有超时
//! - `PageSession` - 独立的无头浏览器会话，用完即关闭
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个提交
//! - `transform` - 载荷 → 目标字段 + 汇总备注
//! - `ResultClassifier` - 根据响应页面判定成功 / 失败 / 无法判定
//! - `TokenHarvester` - 获取表单隐藏状态令牌
//! - `MappingStore` - 可热加载的映射快照
//! - `SubmissionRecorder` - 提交记录（外部持久化协作方）
//! - `OutcomeWriter` - 写人工核实日志
//!
//! ### ③ 提交策略（Strategy）
//! - `SubmissionStrategy` - 只有一个 `submit` 方法的能力接口
//! - `HttpFormStrategy` / `BrowserFormStrategy` - 配置时二选一
//!
//! ### ④ 流程层（Workflow）
//! - `SubmissionCtx` - 上下文封装（submission_id + attempt）
//! - `SubmissionFlow` - 单次尝试
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/submission_orchestrator` - 转换、重试、记录
//! - `orchestrator/batch_processor` - 队列目录批量处理，管理并发
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod strategy;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{HttpSession, PageSession};
pub use models::{MappingSpecification, Payload, SubmissionOutcome, TargetFieldMap};
pub use orchestrator::{App, SubmissionOrchestrator};
pub use services::{transform, MappingStore, ResultClassifier, SubmissionRecorder};
pub use strategy::{build_strategy, StrategyKind, SubmissionStrategy};
pub use workflow::{SubmissionCtx, SubmissionFlow};
