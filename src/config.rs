use crate::error::{AppError, AppResult, ConfigError};
use crate::services::classifier::InconclusivePolicy;
use crate::strategy::StrategyKind;
use std::str::FromStr;

/// 目标表单字段名配置
///
/// 字段名随门户改版可能变化，因此全部可配置
#[derive(Clone, Debug)]
pub struct FormFieldNames {
    /// 项目名称字段（必填）
    pub project_name_field: String,
    /// 建筑商名称字段（用于生成默认项目名称）
    pub builder_name_field: String,
    /// 户型名称字段（用于生成默认项目名称）
    pub plan_name_field: String,
    /// 省/州下拉框字段（必填）
    pub province_field: String,
    /// 省/州下拉框的默认值代码
    pub default_province: String,
    /// 截止日期字段
    pub due_date_field: String,
    /// 截止日期格式（chrono 格式串）
    pub due_date_format: String,
}

impl Default for FormFieldNames {
    fn default() -> Self {
        Self {
            project_name_field: "ctl00_cphBody_txtProjectName".to_string(),
            builder_name_field: "ctl00_cphBody_txtBuilderName".to_string(),
            plan_name_field: "ctl00_cphBody_txtPlanName".to_string(),
            province_field: "ctl00_cphBody_ddlProvince".to_string(),
            default_province: "GA".to_string(),
            due_date_field: "ctl00_cphBody_txtDueDate".to_string(),
            due_date_format: "%m/%d/%Y".to_string(),
        }
    }
}

/// 浏览器提交策略配置
#[derive(Clone, Debug)]
pub struct BrowserSettings {
    /// 浏览器可执行文件路径（None 表示自动查找）
    pub chrome_executable: Option<String>,
    /// 是否无头模式
    pub headless: bool,
    /// 表单可交互的锚点元素
    pub anchor_selector: String,
    /// 提交按钮
    pub submit_selector: String,
    /// 等待锚点元素的超时时间（秒）
    pub anchor_timeout_secs: u64,
    /// 点击提交后的等待时间（毫秒）
    pub settle_millis: u64,
    /// 截图保存目录
    pub screenshot_dir: String,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            chrome_executable: None,
            headless: true,
            anchor_selector: "#ctl00_cphBody_txtProjectName".to_string(),
            submit_selector: "#ctl00_cphBody_btnSubmit".to_string(),
            anchor_timeout_secs: 20,
            settle_millis: 3000,
            screenshot_dir: "screenshots".to_string(),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 目标门户表单 URL
    pub target_url: String,
    /// 所有网络操作的超时时间（秒）
    pub request_timeout_secs: u64,
    /// 最大重试次数
    pub max_retries: u32,
    /// 提交策略（静态选择，不会自动切换）
    pub strategy: StrategyKind,
    /// 映射规则文件
    pub mapping_file: String,
    /// 待提交载荷目录
    pub payload_folder: String,
    /// 同时处理的提交数量
    pub max_concurrent_submissions: usize,
    /// 输出日志文件
    pub output_log_file: String,
    /// 需要人工复核的记录文件
    pub review_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 无法判定结果时的处理策略
    pub inconclusive_policy: InconclusivePolicy,
    /// 接收汇总备注的目标字段；尚未与门户方确认，未设置时只写日志不发送
    pub notes_field: Option<String>,
    // --- 表单字段 ---
    pub form: FormFieldNames,
    // --- 浏览器 ---
    pub browser: BrowserSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: "https://www.csdportal.com/isDesignCenter/?loc=2378".to_string(),
            request_timeout_secs: 30,
            max_retries: 2,
            strategy: StrategyKind::Http,
            mapping_file: "field_mapping.json".to_string(),
            payload_folder: "pending_payloads".to_string(),
            max_concurrent_submissions: 4,
            output_log_file: "submissions.log".to_string(),
            review_log_file: "needs_review.txt".to_string(),
            verbose_logging: false,
            inconclusive_policy: InconclusivePolicy::AssumeSuccess,
            notes_field: None,
            form: FormFieldNames::default(),
            browser: BrowserSettings::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        let default = Self::default();
        let form = FormFieldNames {
            project_name_field: std::env::var("PROJECT_NAME_FIELD").unwrap_or(default.form.project_name_field),
            builder_name_field: std::env::var("BUILDER_NAME_FIELD").unwrap_or(default.form.builder_name_field),
            plan_name_field: std::env::var("PLAN_NAME_FIELD").unwrap_or(default.form.plan_name_field),
            province_field: std::env::var("PROVINCE_FIELD").unwrap_or(default.form.province_field),
            default_province: std::env::var("DEFAULT_PROVINCE").unwrap_or(default.form.default_province),
            due_date_field: std::env::var("DUE_DATE_FIELD").unwrap_or(default.form.due_date_field),
            due_date_format: std::env::var("DUE_DATE_FORMAT").unwrap_or(default.form.due_date_format),
        };
        let browser = BrowserSettings {
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(default.browser.chrome_executable),
            headless: std::env::var("BROWSER_HEADLESS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser.headless),
            anchor_selector: std::env::var("ANCHOR_SELECTOR").unwrap_or(default.browser.anchor_selector),
            submit_selector: std::env::var("SUBMIT_SELECTOR").unwrap_or(default.browser.submit_selector),
            anchor_timeout_secs: std::env::var("ANCHOR_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser.anchor_timeout_secs),
            settle_millis: std::env::var("SETTLE_MILLIS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser.settle_millis),
            screenshot_dir: std::env::var("SCREENSHOT_DIR").unwrap_or(default.browser.screenshot_dir),
        };

        Ok(Self {
            target_url: std::env::var("TARGET_URL").unwrap_or(default.target_url),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            max_retries: std::env::var("MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_retries),
            strategy: parse_env_enum("SUBMISSION_STRATEGY", default.strategy)?,
            mapping_file: std::env::var("MAPPING_FILE").unwrap_or(default.mapping_file),
            payload_folder: std::env::var("PAYLOAD_FOLDER").unwrap_or(default.payload_folder),
            max_concurrent_submissions: std::env::var("MAX_CONCURRENT_SUBMISSIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_submissions),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            review_log_file: std::env::var("REVIEW_LOG_FILE").unwrap_or(default.review_log_file),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            inconclusive_policy: parse_env_enum("INCONCLUSIVE_POLICY", default.inconclusive_policy)?,
            notes_field: std::env::var("NOTES_FIELD").ok().filter(|v| !v.trim().is_empty()),
            form,
            browser,
        })
    }
}

/// 解析枚举类环境变量；取值非法时报错而不是静默回退
fn parse_env_enum<T: FromStr>(var_name: &str, default: T) -> AppResult<T> {
    match std::env::var(var_name) {
        Ok(value) => value.parse().map_err(|_| {
            AppError::Config(ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            })
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_portal_fields() {
        let config = Config::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.strategy, StrategyKind::Http);
        assert_eq!(config.form.default_province, "GA");
        assert!(config.notes_field.is_none());
    }

    #[test]
    fn test_parse_env_enum_rejects_unknown_value() {
        std::env::set_var("PORTAL_SUBMIT_TEST_STRATEGY", "carrier-pigeon");
        let result = parse_env_enum("PORTAL_SUBMIT_TEST_STRATEGY", StrategyKind::Http);
        std::env::remove_var("PORTAL_SUBMIT_TEST_STRATEGY");
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_parse_env_enum_uses_default_when_unset() {
        let result = parse_env_enum("PORTAL_SUBMIT_TEST_UNSET_VAR", StrategyKind::Browser);
        assert_eq!(result.ok(), Some(StrategyKind::Browser));
    }
}
