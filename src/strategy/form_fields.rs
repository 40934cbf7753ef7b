//! 发往目标表单的字段组装（两种策略共用）
//!
//! 顺序：目标字段 → 汇总备注 → 截止日期 → 必填字段默认值

use crate::config::FormFieldNames;
use crate::error::MappingError;
use crate::models::TargetFieldMap;
use chrono::{DateTime, Local, TimeDelta};
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::{debug, info, warn};

const FALLBACK_DATE_FORMAT: &str = "%m/%d/%Y";

/// 组装待提交字段（不含隐藏令牌）
///
/// 截止日期无法计算时返回错误，调用方在发出任何请求之前失败
pub fn compose_outgoing(
    fields: &TargetFieldMap,
    form: &FormFieldNames,
    notes_field: Option<&str>,
    submitted_at: DateTime<Local>,
) -> Result<BTreeMap<String, String>, MappingError> {
    let mut outgoing: BTreeMap<String, String> = fields
        .target_fields()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    if let Some(notes) = fields.notes() {
        match notes_field {
            Some(field) if !outgoing.contains_key(field) => {
                outgoing.insert(field.to_string(), notes.to_string());
            }
            Some(field) => {
                warn!("⚠️ 字段 {} 已由映射规则填写，汇总备注未写入", field);
            }
            None => {
                info!("汇总备注（未配置 NOTES_FIELD，仅记录）:\n{}", notes);
            }
        }
    }

    if let Some(policy) = fields.due_date_policy() {
        if !is_filled(&outgoing, &form.due_date_field) {
            let due = format_due_date(submitted_at, policy.days_from_submission, &form.due_date_format)
                .ok_or(MappingError::InvalidDueDateDays {
                    days: policy.days_from_submission,
                })?;
            debug!("截止日期: {}", due);
            outgoing.insert(form.due_date_field.clone(), due);
        }
    }

    apply_required_defaults(&mut outgoing, form);
    Ok(outgoing)
}

/// 补齐目标表单的必填字段
pub fn apply_required_defaults(outgoing: &mut BTreeMap<String, String>, form: &FormFieldNames) {
    if !is_filled(outgoing, &form.project_name_field) {
        let builder = filled_value(outgoing, &form.builder_name_field).unwrap_or("Unknown");
        let plan = filled_value(outgoing, &form.plan_name_field).unwrap_or("Project");
        let project_name = format!("{} - {}", builder, plan);
        debug!("使用默认项目名称: {}", project_name);
        outgoing.insert(form.project_name_field.clone(), project_name);
    }

    if !is_filled(outgoing, &form.province_field) {
        outgoing.insert(form.province_field.clone(), form.default_province.clone());
    }
}

/// 计算截止日期；格式串非法时退回 %m/%d/%Y，日期超出可表示范围时返回 None
pub fn format_due_date(submitted_at: DateTime<Local>, days: i64, format: &str) -> Option<String> {
    let due = submitted_at.checked_add_signed(TimeDelta::try_days(days)?)?;
    let mut out = String::new();
    if write!(out, "{}", due.format(format)).is_err() {
        warn!("⚠️ 非法的日期格式 {}，使用 {}", format, FALLBACK_DATE_FORMAT);
        out.clear();
        let _ = write!(out, "{}", due.format(FALLBACK_DATE_FORMAT));
    }
    Some(out)
}

fn filled_value<'a>(map: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    map.get(key).map(String::as_str).filter(|v| !v.trim().is_empty())
}

fn is_filled(map: &BTreeMap<String, String>, key: &str) -> bool {
    filled_value(map, key).is_some()
}
