//! 转换结果：目标字段 + 内部条目

use crate::models::mapping::DueDatePolicy;
use serde_json::Value;
use std::collections::BTreeMap;

/// 汇总备注的内部键
pub const NOTES_KEY: &str = "_composite_notes";
/// 托梁深度偏好的内部键
pub const JOIST_DEPTH_KEY: &str = "_joist_depth_preference";
/// 文件附件的内部键
pub const FILE_ATTACHMENTS_KEY: &str = "_file_attachments";

/// 以下划线开头的键只在进程内部使用，绝不发送给目标
pub fn is_internal_key(key: &str) -> bool {
    key.starts_with('_')
}

/// 目标字段映射
///
/// - `fields`：发往目标表单的字段
/// - `internal`：供策略使用的原始值（托梁深度、附件）
/// - `notes`：本次转换拼好的唯一一份汇总备注
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetFieldMap {
    submission_id: String,
    fields: BTreeMap<String, String>,
    internal: BTreeMap<String, Value>,
    notes: Option<String>,
    due_date_policy: Option<DueDatePolicy>,
}

impl TargetFieldMap {
    pub fn new(submission_id: impl Into<String>) -> Self {
        Self {
            submission_id: submission_id.into(),
            ..Default::default()
        }
    }

    pub fn submission_id(&self) -> &str {
        &self.submission_id
    }

    /// 写入目标字段；内部键会被转存到 internal
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        if is_internal_key(&field) {
            self.internal.insert(field, Value::String(value));
        } else {
            self.fields.insert(field, value);
        }
    }

    pub fn insert_internal(&mut self, key: impl Into<String>, value: Value) {
        self.internal.insert(key.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn internal(&self, key: &str) -> Option<&Value> {
        self.internal.get(key)
    }

    /// 可发送的目标字段（不含任何内部键）
    pub fn target_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter(|(k, _)| !is_internal_key(k))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub(crate) fn set_notes(&mut self, notes: String) {
        self.notes = Some(notes);
    }

    pub fn due_date_policy(&self) -> Option<DueDatePolicy> {
        self.due_date_policy
    }

    pub(crate) fn set_due_date_policy(&mut self, policy: Option<DueDatePolicy>) {
        self.due_date_policy = policy;
    }
}
