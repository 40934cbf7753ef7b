//! 映射规则定义
//!
//! 对应 field_mapping 文档：`mappings` + `composite_notes_template` + `due_date_calculation`

use crate::error::MappingError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// 目标字段为此值时，规则的输出追加到汇总备注
pub const COMPOSITE_NOTES_TARGET: &str = "COMPOSITE_NOTES";

/// 查找表中表示"写入备注"的值
pub const NOTES_SENTINEL: &str = "NOTES";

/// 截止日期最多推后的天数
pub const MAX_DUE_DATE_DAYS: i64 = 36_500;

/// 未配置模板时使用的默认备注模板
pub const DEFAULT_NOTES_TEMPLATE: &str = "=== SUBMISSION DETAILS ===\n{notes_content}";

/// 转换类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// 原样复制
    #[default]
    Direct,
    /// 以 "标签: 值" 形式追加到备注
    AppendToNotes,
    /// 提取文件链接，逐行追加到备注
    FileLinksToNotes,
    /// 通过查找表转换
    #[serde(alias = "map_roof_type")]
    ValueLookup,
    /// 查找表命中 NOTES 时写入首选厂商备注
    #[serde(alias = "map_manufacturer")]
    ManufacturerToNotes,
    /// 托梁深度偏好，仅内部保存
    #[serde(alias = "map_to_joist_fields")]
    JoistDepthPreference,
    /// 文件附件，仅内部保存
    #[serde(alias = "upload_file")]
    FileAttachment,
}

impl TransformKind {
    /// 是否必须配置查找表
    pub fn requires_lookup(self) -> bool {
        matches!(
            self,
            TransformKind::ValueLookup | TransformKind::ManufacturerToNotes
        )
    }
}

/// 查找结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupTarget<'a> {
    /// 映射到目标值
    Value(&'a str),
    /// 映射到备注
    Notes,
}

/// 单条映射规则
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingRule {
    /// 载荷中的字段名
    #[serde(alias = "jotform_field")]
    pub source_field: String,

    /// 目标表单字段名（或 COMPOSITE_NOTES）
    #[serde(alias = "csd_field", default)]
    pub target_field: String,

    #[serde(
        alias = "transform",
        default,
        deserialize_with = "deserialize_transform"
    )]
    pub transform_kind: TransformKind,

    #[serde(alias = "value_mapping", default, skip_serializing_if = "Option::is_none")]
    pub value_lookup_table: Option<BTreeMap<String, String>>,

    /// 追加到备注时使用的标签
    #[serde(alias = "jotform_label", default, skip_serializing_if = "Option::is_none")]
    pub display_label: Option<String>,

    #[serde(default)]
    pub skip_if_empty: bool,

    /// 仅用于统计，不影响转换
    #[serde(default)]
    pub required: bool,
}

impl MappingRule {
    /// 实际生效的转换类型
    ///
    /// 目标字段为 COMPOSITE_NOTES 的规则一律按追加备注处理
    pub fn effective_kind(&self) -> TransformKind {
        if self.target_field == COMPOSITE_NOTES_TARGET {
            TransformKind::AppendToNotes
        } else {
            self.transform_kind
        }
    }

    /// 通过查找表解析值；表中不存在时返回 None
    pub fn lookup(&self, value: &str) -> Option<LookupTarget<'_>> {
        let table = self.value_lookup_table.as_ref()?;
        table.get(value).map(|mapped| {
            if mapped == NOTES_SENTINEL {
                LookupTarget::Notes
            } else {
                LookupTarget::Value(mapped.as_str())
            }
        })
    }

    /// 备注标签，未配置时退回源字段名
    pub fn label(&self) -> &str {
        self.display_label.as_deref().unwrap_or(&self.source_field)
    }
}

/// 截止日期策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DueDatePolicy {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub days_from_submission: i64,
}

/// 完整的映射规范
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingSpecification {
    /// 有序规则列表，备注按此顺序拼接
    #[serde(default)]
    pub mappings: Vec<MappingRule>,

    #[serde(alias = "notes_template", default = "default_notes_template")]
    pub composite_notes_template: String,

    #[serde(alias = "due_date_policy", default, skip_serializing_if = "Option::is_none")]
    pub due_date_calculation: Option<DueDatePolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl Default for MappingSpecification {
    fn default() -> Self {
        Self {
            mappings: Vec::new(),
            composite_notes_template: default_notes_template(),
            due_date_calculation: None,
            version: None,
            last_updated: None,
        }
    }
}

impl MappingSpecification {
    /// 校验规则，任何一处不合法都视为致命错误
    pub fn validate(&self) -> Result<(), MappingError> {
        for (rule_index, rule) in self.mappings.iter().enumerate() {
            if rule.source_field.trim().is_empty() {
                return Err(MappingError::MissingSourceField { rule_index });
            }
            let has_table = rule
                .value_lookup_table
                .as_ref()
                .map(|t| !t.is_empty())
                .unwrap_or(false);
            if rule.effective_kind().requires_lookup() && !has_table {
                return Err(MappingError::MissingLookupTable {
                    rule_index,
                    source_field: rule.source_field.clone(),
                });
            }
        }

        if !self.composite_notes_template.contains("{notes_content}") {
            return Err(MappingError::InvalidNotesTemplate {
                template: self.composite_notes_template.clone(),
            });
        }

        if let Some(policy) = &self.due_date_calculation {
            if policy.enabled && !(0..=MAX_DUE_DATE_DAYS).contains(&policy.days_from_submission) {
                return Err(MappingError::InvalidDueDateDays {
                    days: policy.days_from_submission,
                });
            }
        }

        Ok(())
    }

    /// 生效中的截止日期策略
    pub fn active_due_date(&self) -> Option<DueDatePolicy> {
        self.due_date_calculation.filter(|p| p.enabled)
    }

    /// 渲染备注模板
    pub fn render_notes(&self, notes_content: &str, submission_id: &str) -> String {
        self.composite_notes_template
            .replace("{notes_content}", notes_content)
            .replace("{submission_id}", submission_id)
    }

    /// 映射概要
    pub fn summary(&self) -> MappingSummary {
        let unmapped_fields = self
            .mappings
            .iter()
            .filter(|m| m.target_field.starts_with("PLACEHOLDER"))
            .count();
        MappingSummary {
            total_fields: self.mappings.len(),
            mapped_fields: self.mappings.len() - unmapped_fields,
            unmapped_fields,
            required_fields: self.mappings.iter().filter(|m| m.required).count(),
            version: self.version.clone().unwrap_or_else(|| "unknown".to_string()),
            last_updated: self
                .last_updated
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

/// 映射概要（用于加载时的日志）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingSummary {
    pub total_fields: usize,
    pub mapped_fields: usize,
    pub unmapped_fields: usize,
    pub required_fields: usize,
    pub version: String,
    pub last_updated: String,
}

fn default_notes_template() -> String {
    DEFAULT_NOTES_TEMPLATE.to_string()
}

// transform 允许为 null，按 direct 处理
fn deserialize_transform<'de, D>(deserializer: D) -> Result<TransformKind, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TransformKind>::deserialize(deserializer)?.unwrap_or_default())
}
