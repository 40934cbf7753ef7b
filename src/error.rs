use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 映射规则错误（致命，在任何网络调用之前中止）
    Mapping(MappingError),
    /// 与目标门户通信失败
    Transport(TransportError),
    /// 浏览器相关错误
    Browser(BrowserError),
    /// 提交记录存储错误
    Store(StoreError),
    /// 文件操作错误
    File(FileError),
    /// 业务逻辑错误
    Business(BusinessError),
    /// 配置错误
    Config(ConfigError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Mapping(e) => write!(f, "映射错误: {}", e),
            AppError::Transport(e) => write!(f, "网络错误: {}", e),
            AppError::Browser(e) => write!(f, "浏览器错误: {}", e),
            AppError::Store(e) => write!(f, "存储错误: {}", e),
            AppError::File(e) => write!(f, "文件错误: {}", e),
            AppError::Business(e) => write!(f, "业务错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Mapping(e) => Some(e),
            AppError::Transport(e) => Some(e),
            AppError::Browser(e) => Some(e),
            AppError::Store(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Business(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 映射规则错误
#[derive(Debug)]
pub enum MappingError {
    /// 规则缺少源字段
    MissingSourceField {
        rule_index: usize,
    },
    /// 查表类规则缺少查找表
    MissingLookupTable {
        rule_index: usize,
        source_field: String,
    },
    /// 备注模板缺少 {notes_content} 占位符
    InvalidNotesTemplate {
        template: String,
    },
    /// 截止日期天数非法
    InvalidDueDateDays {
        days: i64,
    },
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingError::MissingSourceField { rule_index } => {
                write!(f, "第 {} 条规则缺少源字段", rule_index + 1)
            }
            MappingError::MissingLookupTable {
                rule_index,
                source_field,
            } => {
                write!(
                    f,
                    "第 {} 条规则 ({}) 需要非空的 value_mapping",
                    rule_index + 1,
                    source_field
                )
            }
            MappingError::InvalidNotesTemplate { template } => {
                write!(f, "备注模板缺少 {{notes_content}} 占位符: {}", template)
            }
            MappingError::InvalidDueDateDays { days } => {
                write!(f, "截止日期天数超出范围 (0..={}): {}", crate::models::mapping::MAX_DUE_DATE_DAYS, days)
            }
        }
    }
}

impl std::error::Error for MappingError {}

/// 网络通信错误
#[derive(Debug)]
pub enum TransportError {
    /// 请求失败（连接失败、HTTP 错误状态等）
    RequestFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 请求超时
    Timeout {
        url: String,
        seconds: u64,
    },
    /// 构建 HTTP 客户端失败
    ClientBuildFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::RequestFailed { url, source } => {
                write!(f, "请求失败 ({}): {}", url, source)
            }
            TransportError::Timeout { url, seconds } => {
                write!(f, "请求超时 ({}), 超过 {} 秒", url, seconds)
            }
            TransportError::ClientBuildFailed { source } => {
                write!(f, "创建 HTTP 客户端失败: {}", source)
            }
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::RequestFailed { source, .. }
            | TransportError::ClientBuildFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            TransportError::Timeout { .. } => None,
        }
    }
}

/// 浏览器相关错误
#[derive(Debug)]
pub enum BrowserError {
    /// 启动浏览器失败
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 等待锚点元素超时
    AnchorTimeout {
        selector: String,
        seconds: u64,
    },
    /// 执行脚本失败
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 浏览器配置失败
    ConfigurationFailed {
        message: String,
    },
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserError::LaunchFailed { source } => {
                write!(f, "启动无头浏览器失败: {}", source)
            }
            BrowserError::NavigationFailed { url, source } => {
                write!(f, "导航到 {} 失败: {}", url, source)
            }
            BrowserError::AnchorTimeout { selector, seconds } => {
                write!(f, "等待元素 {} 超时 ({} 秒)", selector, seconds)
            }
            BrowserError::ScriptExecutionFailed { source } => {
                write!(f, "执行脚本失败: {}", source)
            }
            BrowserError::ConfigurationFailed { message } => {
                write!(f, "浏览器配置失败: {}", message)
            }
        }
    }
}

impl std::error::Error for BrowserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrowserError::LaunchFailed { source }
            | BrowserError::NavigationFailed { source, .. }
            | BrowserError::ScriptExecutionFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 提交记录存储错误
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 相同的提交 ID 已存在（幂等冲突）
    #[error("提交 {submission_id} 已存在，拒绝重复提交")]
    Duplicate { submission_id: String },

    /// 记录不存在
    #[error("提交记录不存在: {submission_id}")]
    NotFound { submission_id: String },
}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 映射文件解析失败
    ParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 不支持的文件格式
    UnsupportedFormat {
        path: String,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::ReadFailed { path, source } => {
                write!(f, "读取文件失败 ({}): {}", path, source)
            }
            FileError::WriteFailed { path, source } => {
                write!(f, "写入文件失败 ({}): {}", path, source)
            }
            FileError::ParseFailed { path, source } => {
                write!(f, "解析文件失败 ({}): {}", path, source)
            }
            FileError::UnsupportedFormat { path } => {
                write!(f, "不支持的文件格式 (仅支持 .json / .toml): {}", path)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. }
            | FileError::WriteFailed { source, .. }
            | FileError::ParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            FileError::UnsupportedFormat { .. } => None,
        }
    }
}

/// 业务逻辑错误
#[derive(Debug)]
pub enum BusinessError {
    /// 载荷中没有提交 ID
    MissingSubmissionId,
    /// 已达到最大重试次数
    RetryLimitReached {
        submission_id: String,
        max_retries: u32,
    },
}

impl fmt::Display for BusinessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusinessError::MissingSubmissionId => {
                write!(f, "载荷缺少 submission_id / submissionID")
            }
            BusinessError::RetryLimitReached {
                submission_id,
                max_retries,
            } => {
                write!(
                    f,
                    "提交 {} 已达到最大重试次数 {}",
                    submission_id, max_retries
                )
            }
        }
    }
}

impl std::error::Error for BusinessError {}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 环境变量解析失败
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                    var_name, value, expected_type
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== 从常见错误类型转换 ==========

impl From<MappingError> for AppError {
    fn from(err: MappingError) -> Self {
        AppError::Mapping(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<BusinessError> for AppError {
    fn from(err: BusinessError) -> Self {
        AppError::Business(err)
    }
}

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();
        AppError::Transport(TransportError::RequestFailed {
            url,
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::File(FileError::ParseFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::ParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建网络请求失败错误
    pub fn request_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Transport(TransportError::RequestFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建网络超时错误
    pub fn timeout(url: impl Into<String>, seconds: u64) -> Self {
        AppError::Transport(TransportError::Timeout {
            url: url.into(),
            seconds,
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件解析错误
    pub fn file_parse_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ParseFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 是否为网络层错误（可重试）
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Transport(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
