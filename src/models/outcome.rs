//! 提交结果

use serde::{Deserialize, Serialize};
use std::fmt;

/// 无法判定结果时的确认号，表示需要人工核实
pub const MANUAL_VERIFICATION_TOKEN: &str = "VERIFY_MANUALLY";

/// 结果分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Success,
    Failure,
    Inconclusive,
}

/// 单次尝试（或最终）的提交结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub succeeded: bool,
    /// 确认号；为空表示没有
    pub confirmation_token: String,
    /// 错误详情；为空表示没有
    pub error_detail: String,
    pub classification: Classification,
}

impl SubmissionOutcome {
    pub fn success(confirmation_token: Option<String>) -> Self {
        Self {
            succeeded: true,
            confirmation_token: confirmation_token.unwrap_or_default(),
            error_detail: String::new(),
            classification: Classification::Success,
        }
    }

    pub fn failure(error_detail: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            confirmation_token: String::new(),
            error_detail: error_detail.into(),
            classification: Classification::Failure,
        }
    }

    /// 无法判定；是否视为成功由调用方的策略决定
    pub fn inconclusive(succeeded: bool) -> Self {
        Self {
            succeeded,
            confirmation_token: if succeeded {
                MANUAL_VERIFICATION_TOKEN.to_string()
            } else {
                String::new()
            },
            error_detail: if succeeded {
                String::new()
            } else {
                "目标页面没有成功或失败标志，需人工核实".to_string()
            },
            classification: Classification::Inconclusive,
        }
    }

    /// 是否需要人工复核
    pub fn needs_review(&self) -> bool {
        !self.succeeded || self.classification == Classification::Inconclusive
    }

    /// 对应的记录状态
    pub fn status(&self) -> SubmissionStatus {
        if self.succeeded {
            SubmissionStatus::Success
        } else {
            SubmissionStatus::Failed
        }
    }
}

impl fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.classification {
            Classification::Success => write!(f, "成功 (确认号: {:?})", self.confirmation_token),
            Classification::Failure => write!(f, "失败: {}", self.error_detail),
            Classification::Inconclusive => write!(
                f,
                "无法判定 (succeeded={}, 确认号: {:?})",
                self.succeeded, self.confirmation_token
            ),
        }
    }
}

/// 提交记录状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Success,
    Failed,
}

impl SubmissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Success => "success",
            SubmissionStatus::Failed => "failed",
        }
    }
}
