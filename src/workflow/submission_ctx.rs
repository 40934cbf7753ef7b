//! 提交上下文
//!
//! 封装"我正在处理哪个提交的第几次尝试"这一信息

use std::fmt::Display;

/// 提交上下文
#[derive(Debug, Clone)]
pub struct SubmissionCtx {
    /// 提交ID
    pub submission_id: String,

    /// 尝试序号（从1开始）
    pub attempt: u32,
}

impl SubmissionCtx {
    pub fn new(submission_id: impl Into<String>) -> Self {
        Self {
            submission_id: submission_id.into(),
            attempt: 1,
        }
    }

    /// 下一次尝试的上下文
    pub fn next_attempt(&self) -> Self {
        Self {
            submission_id: self.submission_id.clone(),
            attempt: self.attempt + 1,
        }
    }
}

impl Display for SubmissionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[提交 {} #{}]", self.submission_id, self.attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_next_attempt() {
        let ctx = SubmissionCtx::new("TEST_1");
        assert_eq!(ctx.to_string(), "[提交 TEST_1 #1]");
        assert_eq!(ctx.next_attempt().to_string(), "[提交 TEST_1 #2]");
    }
}
