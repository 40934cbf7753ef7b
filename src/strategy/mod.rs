//! 提交策略层
//!
//! 两种可互换的提交方式，实现同一个只有 `submit` 的能力接口：
//!
//! - `http_strategy::HttpFormStrategy` - 采集隐藏令牌后直接 POST 表单
//! - `browser_strategy::BrowserFormStrategy` - 驱动无头浏览器填写并提交
//!
//! 策略在配置阶段静态选定，两者之间不会自动切换。
//! 策略内部的任何错误都转换为 `succeeded = false` 的结果，不会向上抛出。

pub mod browser_strategy;
pub mod form_fields;
pub mod http_strategy;

use crate::config::Config;
use crate::models::{SubmissionOutcome, TargetFieldMap};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use browser_strategy::BrowserFormStrategy;
pub use http_strategy::HttpFormStrategy;

/// 提交能力
#[async_trait]
pub trait SubmissionStrategy: Send + Sync {
    /// 提交一次，返回判定后的结果
    async fn submit(&self, fields: &TargetFieldMap) -> SubmissionOutcome;
}

/// 策略类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Http,
    Browser,
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(StrategyKind::Http),
            "browser" => Ok(StrategyKind::Browser),
            other => Err(format!("未知的提交策略: {}", other)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Http => write!(f, "http"),
            StrategyKind::Browser => write!(f, "browser"),
        }
    }
}

/// 按配置创建策略
pub fn build_strategy(config: &Config) -> Arc<dyn SubmissionStrategy> {
    match config.strategy {
        StrategyKind::Http => Arc::new(HttpFormStrategy::new(config)),
        StrategyKind::Browser => Arc::new(BrowserFormStrategy::new(config)),
    }
}
