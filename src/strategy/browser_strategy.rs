//! 浏览器自动化策略
//!
//! 目标表单的回发机制无法用原始 HTTP 可靠模拟时使用：
//! 启动独立的无头浏览器 → 打开表单 → 等待锚点元素 → 逐个填写 →
//! 截图 → 点击提交 → 等待服务端处理 → 截图 → 判定页面内容。
//! 无论成功失败，浏览器会话都会被关闭。

use crate::config::{BrowserSettings, Config, FormFieldNames};
use crate::error::AppResult;
use crate::infrastructure::PageSession;
use crate::models::{SubmissionOutcome, TargetFieldMap};
use crate::services::classifier::ResultClassifier;
use crate::strategy::form_fields::compose_outgoing;
use crate::strategy::SubmissionStrategy;
use crate::utils::sanitize_filename;
use async_trait::async_trait;
use chrono::Local;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// 单个字段的填写结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStatus {
    /// 已填写
    Filled,
    /// 下拉框使用了默认值
    Fallback,
    /// 当前表单版本没有此字段
    Missing,
    /// 下拉框既没有目标值也没有默认值
    NoOption,
}

impl FillStatus {
    fn parse(raw: &str) -> Self {
        match raw {
            "filled" => FillStatus::Filled,
            "fallback" => FillStatus::Fallback,
            "no_option" => FillStatus::NoOption,
            _ => FillStatus::Missing,
        }
    }
}

/// 浏览器策略用到的页面能力
#[async_trait]
pub trait FormPage: Send + Sync {
    async fn goto(&self, url: &str) -> AppResult<()>;
    async fn wait_for(&self, selector: &str, wait_secs: u64) -> AppResult<()>;
    /// 执行脚本，返回字符串结果
    async fn run_script(&self, js_code: String) -> AppResult<String>;
    async fn click(&self, selector: &str) -> AppResult<()>;
    async fn content(&self) -> AppResult<String>;
    async fn screenshot(&self, path: &Path) -> AppResult<()>;
    /// 关闭会话；每条退出路径都必须调用
    async fn shutdown(self);
}

#[async_trait]
impl FormPage for PageSession {
    async fn goto(&self, url: &str) -> AppResult<()> {
        PageSession::goto(self, url).await
    }

    async fn wait_for(&self, selector: &str, wait_secs: u64) -> AppResult<()> {
        PageSession::wait_for(self, selector, wait_secs).await
    }

    async fn run_script(&self, js_code: String) -> AppResult<String> {
        self.eval_as(js_code).await
    }

    async fn click(&self, selector: &str) -> AppResult<()> {
        PageSession::click(self, selector).await
    }

    async fn content(&self) -> AppResult<String> {
        PageSession::content(self).await
    }

    async fn screenshot(&self, path: &Path) -> AppResult<()> {
        PageSession::screenshot(self, path).await
    }

    async fn shutdown(self) {
        self.close().await
    }
}

/// 浏览器自动化策略
pub struct BrowserFormStrategy {
    target_url: String,
    timeout_secs: u64,
    settings: BrowserSettings,
    form: FormFieldNames,
    notes_field: Option<String>,
    classifier: ResultClassifier,
}

impl BrowserFormStrategy {
    pub fn new(config: &Config) -> Self {
        Self {
            target_url: config.target_url.clone(),
            timeout_secs: config.request_timeout_secs,
            settings: config.browser.clone(),
            form: config.form.clone(),
            notes_field: config.notes_field.clone(),
            classifier: ResultClassifier::new(config.inconclusive_policy),
        }
    }

    /// 在给定页面上执行一次提交，结束后关闭页面
    async fn run_and_close<P: FormPage>(
        &self,
        page: P,
        submission_id: &str,
        outgoing: &BTreeMap<String, String>,
    ) -> SubmissionOutcome {
        let result = self.drive(&page, submission_id, outgoing).await;
        page.shutdown().await;

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("[提交 {}] ❌ 浏览器提交失败: {}", submission_id, e);
                SubmissionOutcome::failure(format!("Browser error: {}", e))
            }
        }
    }

    async fn drive<P: FormPage>(
        &self,
        page: &P,
        id: &str,
        outgoing: &BTreeMap<String, String>,
    ) -> AppResult<SubmissionOutcome> {
        page.goto(&self.target_url).await?;
        page.wait_for(&self.settings.anchor_selector, self.settings.anchor_timeout_secs)
            .await?;
        debug!("[提交 {}] 表单已可交互", id);

        for (field, value) in outgoing {
            let fallback = (field == &self.form.province_field).then_some(self.form.default_province.as_str());
            let raw = page.run_script(build_fill_script(field, value, fallback)).await?;
            match FillStatus::parse(&raw) {
                FillStatus::Filled => debug!("[提交 {}] 已填写 {}", id, field),
                FillStatus::Fallback => {
                    warn!("[提交 {}] ⚠️ {} 没有选项 {:?}，使用默认值 {:?}", id, field, value, fallback)
                }
                FillStatus::Missing => warn!("[提交 {}] ⚠️ 表单上没有字段 {}，跳过", id, field),
                FillStatus::NoOption => warn!("[提交 {}] ⚠️ {} 没有可用选项 {:?}，跳过", id, field, value),
            }
        }

        self.capture(page, id, "before").await;

        info!("[提交 {}] 🖱️ 点击提交按钮", id);
        page.click(&self.settings.submit_selector).await?;
        sleep(Duration::from_millis(self.settings.settle_millis)).await;

        self.capture(page, id, "after").await;

        let content = page.content().await?;
        Ok(self.classifier.classify(&content))
    }

    /// 截图仅用于事后排查，失败只记录日志
    async fn capture<P: FormPage>(&self, page: &P, submission_id: &str, stage: &str) {
        let path = self.screenshot_path(submission_id, stage);
        if let Err(e) = page.screenshot(&path).await {
            warn!("[提交 {}] ⚠️ 截图失败 ({}): {}", submission_id, stage, e);
        }
    }

    fn screenshot_path(&self, submission_id: &str, stage: &str) -> PathBuf {
        let name = format!(
            "{}_{}_{}.png",
            sanitize_filename(submission_id),
            Local::now().format("%Y%m%d_%H%M%S"),
            stage
        );
        PathBuf::from(&self.settings.screenshot_dir).join(name)
    }
}

#[async_trait]
impl SubmissionStrategy for BrowserFormStrategy {
    async fn submit(&self, fields: &TargetFieldMap) -> SubmissionOutcome {
        let id = fields.submission_id();
        info!("[提交 {}] 📤 浏览器自动化提交到目标门户...", id);

        // 字段先组装完成，失败时不会启动浏览器
        let outgoing = match compose_outgoing(
            fields,
            &self.form,
            self.notes_field.as_deref(),
            Local::now(),
        ) {
            Ok(outgoing) => outgoing,
            Err(e) => {
                error!("[提交 {}] ❌ 无法组装提交数据: {}", id, e);
                return SubmissionOutcome::failure(format!("Submission error: {}", e));
            }
        };

        let session = match PageSession::launch(&self.settings, self.timeout_secs).await {
            Ok(session) => session,
            Err(e) => {
                error!("[提交 {}] ❌ 无法启动浏览器: {}", id, e);
                return SubmissionOutcome::failure(format!("Browser error: {}", e));
            }
        };

        self.run_and_close(session, id, &outgoing).await
    }
}

/// 生成填写字段的脚本，返回 "filled" / "fallback" / "missing" / "no_option"
fn build_fill_script(field: &str, value: &str, fallback: Option<&str>) -> String {
    let field_json = serde_json::Value::from(field).to_string();
    let value_json = serde_json::Value::from(value).to_string();
    let fallback_json = fallback
        .map(|f| serde_json::Value::from(f).to_string())
        .unwrap_or_else(|| "null".to_string());

    format!(
        r#"
        (() => {{
            const field = {field};
            const wanted = {value};
            const fallback = {fallback};
            const el = document.getElementById(field)
                || document.getElementsByName(field)[0]
                || document.getElementsByName(field.replace(/_/g, "$"))[0];
            if (!el) return "missing";
            const fire = (name) => el.dispatchEvent(new Event(name, {{ bubbles: true }}));
            if (el.tagName === "SELECT") {{
                const options = Array.from(el.options);
                let chosen = options.find(o => o.value === wanted);
                if (!chosen) {{
                    const lower = String(wanted).trim().toLowerCase();
                    chosen = options.find(o => o.text.trim().toLowerCase() === lower);
                }}
                let status = "filled";
                if (!chosen && fallback !== null) {{
                    chosen = options.find(o => o.value === fallback);
                    status = "fallback";
                }}
                if (!chosen) return "no_option";
                el.value = chosen.value;
                fire("change");
                return status;
            }}
            el.value = wanted;
            fire("input");
            fire("change");
            return "filled";
        }})()
        "#,
        field = field_json,
        value = value_json,
        fallback = fallback_json,
    )
}
