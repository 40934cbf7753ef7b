//! 结果写入服务 - 业务能力层
//!
//! 只负责"写人工核实日志"能力，不关心流程

use crate::models::SubmissionOutcome;
use anyhow::Result;
use chrono::Local;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// 结果写入服务
///
/// 职责：
/// - 将失败或需要人工核实的提交追加到核实日志
/// - 只处理单个提交
pub struct OutcomeWriter {
    log_file_path: String,
}

impl OutcomeWriter {
    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            log_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.log_file_path
    }

    /// 追加一行记录
    ///
    /// # 参数
    /// - `submission_id`: 提交ID
    /// - `source`: 载荷来源（文件名）
    /// - `outcome`: 提交结果
    pub async fn write(
        &self,
        submission_id: &str,
        source: &str,
        outcome: &SubmissionOutcome,
    ) -> Result<()> {
        debug!("写入核实日志: 提交 {} | {}", submission_id, outcome.status().as_str());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)
            .await?;

        file.write_all(format_line(submission_id, source, outcome).as_bytes())
            .await?;

        Ok(())
    }
}

fn format_line(submission_id: &str, source: &str, outcome: &SubmissionOutcome) -> String {
    format!(
        "{} | 提交 {} | 来源 {} | {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        submission_id,
        source,
        outcome
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("review.log");
        let writer = OutcomeWriter::with_path(path.to_string_lossy().to_string());

        writer
            .write("S1", "s1.json", &SubmissionOutcome::failure("Plan Name is required"))
            .await
            .unwrap();
        writer
            .write("S2", "s2.json", &SubmissionOutcome::inconclusive(true))
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("提交 S1"));
        assert!(lines[0].contains("Plan Name is required"));
        assert!(lines[1].contains("提交 S2"));
    }
}
