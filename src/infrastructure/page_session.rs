//! 浏览器页面会话 - 基础设施层
//!
//! 持有一次提交独占的无头浏览器和页面，只暴露导航、执行 JS、点击、截图等能力

use crate::config::BrowserSettings;
use crate::error::{AppError, AppResult, BrowserError};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// 页面会话
///
/// 职责：
/// - 独占 Browser / Page 以及事件处理任务
/// - 暴露 eval()、click()、screenshot() 等能力
/// - 不认识映射规则，也不判定结果
/// - 通过 close() 释放浏览器进程，调用方必须在所有退出路径上调用
pub struct PageSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    op_timeout: Duration,
}

impl PageSession {
    /// 启动独立的浏览器实例
    pub async fn launch(settings: &BrowserSettings, op_timeout_secs: u64) -> AppResult<Self> {
        info!("🚀 启动无头浏览器...");
        let op_timeout = Duration::from_secs(op_timeout_secs);

        let mut builder = BrowserConfig::builder();
        builder = if settings.headless {
            builder.new_headless_mode()
        } else {
            builder.with_head()
        };
        if let Some(path) = &settings.chrome_executable {
            builder = builder.chrome_executable(PathBuf::from(path));
        }

        let config = builder
            .request_timeout(op_timeout)
            .args(vec![
                "--disable-gpu",
                "--no-sandbox",
                "--disable-dev-shm-usage",
            ])
            .build()
            .map_err(|message| {
                error!("配置无头浏览器失败: {}", message);
                AppError::Browser(BrowserError::ConfigurationFailed { message })
            })?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            error!("启动无头浏览器失败: {}", e);
            AppError::Browser(BrowserError::LaunchFailed {
                source: Box::new(e),
            })
        })?;
        debug!("无头浏览器启动成功");

        // 在后台处理浏览器事件
        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                error!("创建页面失败: {}", e);
                let session_err = AppError::from(e);
                // 页面没建起来也要回收浏览器进程
                let mut browser = browser;
                let _ = browser.kill().await;
                handler.abort();
                return Err(session_err);
            }
        };

        Ok(Self {
            browser,
            page,
            handler,
            op_timeout,
        })
    }

    /// 导航到指定 URL（受超时约束）
    pub async fn goto(&self, url: &str) -> AppResult<()> {
        match timeout(self.op_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {
                info!("已导航到: {}", url);
                Ok(())
            }
            Ok(Err(e)) => Err(AppError::Browser(BrowserError::NavigationFailed {
                url: url.to_string(),
                source: Box::new(e),
            })),
            Err(_) => Err(AppError::timeout(url, self.op_timeout.as_secs())),
        }
    }

    /// 等待元素出现
    pub async fn wait_for(&self, selector: &str, wait_secs: u64) -> AppResult<()> {
        let poll = async {
            loop {
                if self.page.find_element(selector).await.is_ok() {
                    return;
                }
                sleep(POLL_INTERVAL).await;
            }
        };

        timeout(Duration::from_secs(wait_secs), poll)
            .await
            .map_err(|_| {
                AppError::Browser(BrowserError::AnchorTimeout {
                    selector: selector.to_string(),
                    seconds: wait_secs,
                })
            })
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let result = timeout(self.op_timeout, self.page.evaluate(js_code.into()))
            .await
            .map_err(|_| AppError::timeout("page.evaluate", self.op_timeout.as_secs()))??;
        result.into_value().map_err(|e| {
            AppError::Browser(BrowserError::ScriptExecutionFailed {
                source: Box::new(e),
            })
        })
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        serde_json::from_value(json_value).map_err(|e| {
            AppError::Browser(BrowserError::ScriptExecutionFailed {
                source: Box::new(e),
            })
        })
    }

    /// 点击元素
    pub async fn click(&self, selector: &str) -> AppResult<()> {
        let element = self.page.find_element(selector).await?;
        element.click().await?;
        Ok(())
    }

    /// 当前页面 HTML
    pub async fn content(&self) -> AppResult<String> {
        timeout(self.op_timeout, self.page.content())
            .await
            .map_err(|_| AppError::timeout("page.content", self.op_timeout.as_secs()))?
            .map_err(AppError::from)
    }

    /// 整页截图
    pub async fn screenshot(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await?;
        debug!("截图已保存: {}", path.display());
        Ok(())
    }

    /// 关闭浏览器并回收进程
    pub async fn close(mut self) {
        let closed = matches!(
            timeout(CLOSE_TIMEOUT, self.browser.close()).await,
            Ok(Ok(_))
        );
        if closed {
            let _ = timeout(CLOSE_TIMEOUT, self.browser.wait()).await;
        } else {
            warn!("⚠️ 浏览器未正常关闭，强制结束进程");
            let _ = self.browser.kill().await;
        }
        self.handler.abort();
        debug!("浏览器会话已释放");
    }
}
