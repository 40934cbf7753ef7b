use crate::error::{AppError, AppResult, FileError};
use crate::models::mapping::MappingSpecification;
use std::path::Path;
use tokio::fs;

/// 映射文档格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingFormat {
    Json,
    Toml,
}

impl MappingFormat {
    /// 按扩展名判断格式
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => Some(MappingFormat::Json),
            Some("toml") => Some(MappingFormat::Toml),
            _ => None,
        }
    }
}

/// 解析并校验映射文档
pub fn parse_mapping(content: &str, format: MappingFormat) -> AppResult<MappingSpecification> {
    let spec: MappingSpecification = match format {
        MappingFormat::Json => serde_json::from_str(content)?,
        MappingFormat::Toml => toml::from_str(content)?,
    };
    spec.validate()?;
    Ok(spec)
}

/// 从文件加载映射规范
pub async fn load_mapping_file(path: &Path) -> AppResult<MappingSpecification> {
    let display = path.display().to_string();
    let format = MappingFormat::from_path(path).ok_or_else(|| {
        AppError::File(FileError::UnsupportedFormat {
            path: display.clone(),
        })
    })?;

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(display.clone(), e))?;

    // 解析错误补上文件路径；校验错误原样返回
    let spec = parse_mapping(&content, format).map_err(|e| match e {
        AppError::File(FileError::ParseFailed { source, .. }) => {
            AppError::File(FileError::ParseFailed {
                path: display.clone(),
                source,
            })
        }
        other => other,
    })?;

    tracing::debug!("映射文件已加载: {} ({} 条规则)", path.display(), spec.mappings.len());
    Ok(spec)
}
