//! HTTP 表单回发策略
//!
//! 1. GET 表单页，采集隐藏令牌
//! 2. 令牌 + 目标字段（内部键除外）合并，补齐截止日期与必填默认值
//! 3. POST（跟随重定向），判定响应正文
//!
//! 本策略内不做重试，重试由编排层负责

use crate::config::{Config, FormFieldNames};
use crate::error::AppResult;
use crate::infrastructure::HttpSession;
use crate::models::{SubmissionOutcome, TargetFieldMap};
use crate::services::classifier::ResultClassifier;
use crate::services::token_harvester::TokenHarvester;
use crate::strategy::form_fields::compose_outgoing;
use crate::strategy::SubmissionStrategy;
use async_trait::async_trait;
use chrono::Local;
use std::collections::BTreeMap;
use tracing::{debug, error, info};

/// HTTP 表单回发策略
pub struct HttpFormStrategy {
    target_url: String,
    timeout_secs: u64,
    form: FormFieldNames,
    notes_field: Option<String>,
    classifier: ResultClassifier,
}

impl HttpFormStrategy {
    pub fn new(config: &Config) -> Self {
        Self {
            target_url: config.target_url.clone(),
            timeout_secs: config.request_timeout_secs,
            form: config.form.clone(),
            notes_field: config.notes_field.clone(),
            classifier: ResultClassifier::new(config.inconclusive_policy),
        }
    }

    /// 连通性检查
    pub async fn test_connection(&self) -> AppResult<()> {
        let session = HttpSession::new(self.timeout_secs)?;
        TokenHarvester::new(&session, &self.target_url).check_reachable().await
    }

    async fn run(&self, fields: &TargetFieldMap) -> AppResult<SubmissionOutcome> {
        // 字段先组装完成，失败时不会发出任何请求
        let outgoing = compose_outgoing(
            fields,
            &self.form,
            self.notes_field.as_deref(),
            Local::now(),
        )?;

        // 每次提交独占一个会话
        let session = HttpSession::new(self.timeout_secs)?;

        let tokens = TokenHarvester::new(&session, &self.target_url).harvest().await;

        let form_data = merge_form_data(tokens, outgoing);
        debug!("表单数据已准备: {} 个字段", form_data.len());

        let body = session.post_form(&self.target_url, &form_data).await?;
        Ok(self.classifier.classify(&body))
    }
}

/// 隐藏令牌与映射字段合并为表单数据
fn merge_form_data(
    tokens: BTreeMap<String, String>,
    outgoing: BTreeMap<String, String>,
) -> Vec<(String, String)> {
    let mut merged = tokens;
    merged.extend(outgoing);
    merged.into_iter().collect()
}

#[async_trait]
impl SubmissionStrategy for HttpFormStrategy {
    async fn submit(&self, fields: &TargetFieldMap) -> SubmissionOutcome {
        info!("[提交 {}] 📤 HTTP 回发到目标门户...", fields.submission_id());

        match self.run(fields).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_transport() => {
                error!("[提交 {}] ❌ 提交到目标门户时网络错误: {}", fields.submission_id(), e);
                SubmissionOutcome::failure(format!("Network error: {}", e))
            }
            Err(e) => {
                error!("[提交 {}] ❌ 无法组装提交数据: {}", fields.submission_id(), e);
                SubmissionOutcome::failure(format!("Submission error: {}", e))
            }
        }
    }
}
