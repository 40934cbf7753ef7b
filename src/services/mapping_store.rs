//! 映射规范存储 - 业务能力层
//!
//! 持有当前生效的映射快照。重新加载时先完整解析、校验新文档，
//! 再一次性替换引用；进行中的提交始终持有自己拿到的那份快照。

use crate::error::AppResult;
use crate::models::loaders::load_mapping_file;
use crate::models::MappingSpecification;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

/// 映射规范存储
pub struct MappingStore {
    path: Option<PathBuf>,
    current: RwLock<Arc<MappingSpecification>>,
}

impl MappingStore {
    /// 使用内存中的规范创建（不支持从文件重新加载）
    pub fn new(spec: MappingSpecification) -> AppResult<Self> {
        spec.validate()?;
        Ok(Self {
            path: None,
            current: RwLock::new(Arc::new(spec)),
        })
    }

    /// 从文件加载
    pub async fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let spec = load_mapping_file(&path).await?;
        log_summary(&path, &spec);
        Ok(Self {
            path: Some(path),
            current: RwLock::new(Arc::new(spec)),
        })
    }

    /// 当前快照；调用方在整个提交过程中只使用这一份
    pub fn snapshot(&self) -> Arc<MappingSpecification> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 校验后整体替换
    pub fn replace(&self, spec: MappingSpecification) -> AppResult<()> {
        spec.validate()?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(spec);
        Ok(())
    }

    /// 从文件重新加载；失败时保留旧快照
    pub async fn reload(&self) -> AppResult<Arc<MappingSpecification>> {
        let Some(path) = &self.path else {
            return Ok(self.snapshot());
        };

        match load_mapping_file(path).await {
            Ok(spec) => {
                log_summary(path, &spec);
                let spec = Arc::new(spec);
                *self.current.write().unwrap_or_else(PoisonError::into_inner) = spec.clone();
                Ok(spec)
            }
            Err(e) => {
                warn!("⚠️ 重新加载映射失败，继续使用旧规则: {}", e);
                Err(e)
            }
        }
    }
}

fn log_summary(path: &Path, spec: &MappingSpecification) {
    let summary = spec.summary();
    info!(
        "📑 映射已加载: {} (版本 {}, 更新于 {}) - 共 {} 条规则, 已映射 {}, 未映射 {}, 必填 {}",
        path.display(),
        summary.version,
        summary.last_updated,
        summary.total_fields,
        summary.mapped_fields,
        summary.unmapped_fields,
        summary.required_fields
    );
}
