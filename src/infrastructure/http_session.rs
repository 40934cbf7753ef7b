//! HTTP 会话 - 基础设施层
//!
//! 持有一个带 Cookie 的 reqwest 客户端，只暴露 GET / 表单 POST 能力

use crate::error::{AppError, AppResult, TransportError};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("portal_submit/", env!("CARGO_PKG_VERSION"));

/// HTTP 会话
///
/// 职责：
/// - 每次提交独占一个会话（Cookie 与隐藏令牌绑定，不能跨提交共享）
/// - 所有请求都受超时约束
/// - 不认识映射规则，也不判定结果
pub struct HttpSession {
    client: Client,
    timeout_secs: u64,
}

impl HttpSession {
    /// 创建新的会话
    pub fn new(timeout_secs: u64) -> AppResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(timeout_secs))
            .redirect(Policy::limited(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                AppError::Transport(TransportError::ClientBuildFailed {
                    source: Box::new(e),
                })
            })?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }

    /// GET 并返回正文；非 2xx 视为错误
    pub async fn get_text(&self, url: &str) -> AppResult<String> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_error(url, e))?;
        let response = response
            .error_for_status()
            .map_err(|e| self.map_error(url, e))?;
        response.text().await.map_err(|e| self.map_error(url, e))
    }

    /// 以 application/x-www-form-urlencoded 提交表单，跟随重定向，返回最终正文
    pub async fn post_form(&self, url: &str, fields: &[(String, String)]) -> AppResult<String> {
        debug!("POST {} ({} 个字段)", url, fields.len());
        let response = self
            .client
            .post(url)
            .form(fields)
            .send()
            .await
            .map_err(|e| self.map_error(url, e))?;
        let response = response
            .error_for_status()
            .map_err(|e| self.map_error(url, e))?;
        response.text().await.map_err(|e| self.map_error(url, e))
    }

    fn map_error(&self, url: &str, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::timeout(url, self.timeout_secs)
        } else {
            AppError::request_failed(url, err)
        }
    }
}
