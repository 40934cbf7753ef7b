//! 字段转换 - 业务能力层
//!
//! 纯函数：载荷 + 映射规范 → 目标字段 + 汇总备注，不做任何 I/O

use crate::error::MappingError;
use crate::models::field_map::{TargetFieldMap, FILE_ATTACHMENTS_KEY, JOIST_DEPTH_KEY};
use crate::models::mapping::{LookupTarget, MappingRule, MappingSpecification, TransformKind};
use crate::models::payload::{self, is_empty_value, value_to_text, Payload};
use serde_json::Value;
use tracing::debug;

/// 按规则顺序转换载荷
///
/// 备注行的顺序与规则声明顺序一致
pub fn transform(
    payload: &Payload,
    spec: &MappingSpecification,
) -> Result<TargetFieldMap, MappingError> {
    spec.validate()?;

    let submission_id = payload::submission_id(payload).unwrap_or_default();
    let mut map = TargetFieldMap::new(submission_id.clone());
    let mut notes: Vec<String> = Vec::new();

    for rule in &spec.mappings {
        let value = match payload.get(&rule.source_field) {
            Some(v) if !v.is_null() => v,
            _ => continue,
        };

        if rule.skip_if_empty && is_empty_value(value) {
            debug!("跳过空值字段: {}", rule.source_field);
            continue;
        }

        apply_rule(rule, value, &mut map, &mut notes);
    }

    if !notes.is_empty() {
        map.set_notes(spec.render_notes(&notes.join("\n"), &submission_id));
    }
    map.set_due_date_policy(spec.active_due_date());

    Ok(map)
}

fn apply_rule(rule: &MappingRule, value: &Value, map: &mut TargetFieldMap, notes: &mut Vec<String>) {
    match rule.effective_kind() {
        TransformKind::Direct => {
            if rule.target_field.is_empty() {
                debug!("规则 {} 没有目标字段，忽略", rule.source_field);
                return;
            }
            map.insert(rule.target_field.clone(), value_to_text(value));
        }
        TransformKind::AppendToNotes => {
            push_labeled(notes, rule.label(), &value_to_text(value));
        }
        TransformKind::FileLinksToNotes => {
            let links = extract_links(value);
            if !links.is_empty() {
                let mut block = format!("{}:", rule.label());
                for (i, link) in links.iter().enumerate() {
                    block.push_str(&format!("\n{}. {}", i + 1, link));
                }
                notes.push(block);
            }
        }
        TransformKind::ValueLookup => {
            let text = value_to_text(value);
            match rule.lookup(&text) {
                Some(LookupTarget::Value(mapped)) => {
                    map.insert(rule.target_field.clone(), mapped);
                }
                Some(LookupTarget::Notes) => push_labeled(notes, rule.label(), &text),
                None => map.insert(rule.target_field.clone(), text),
            }
        }
        TransformKind::ManufacturerToNotes => {
            let text = value_to_text(value);
            if rule.lookup(&text) == Some(LookupTarget::Notes) {
                notes.push(format!("Preferred Manufacturer: {}", text));
            }
        }
        TransformKind::JoistDepthPreference => {
            map.insert_internal(JOIST_DEPTH_KEY, value.clone());
        }
        TransformKind::FileAttachment => {
            map.insert_internal(FILE_ATTACHMENTS_KEY, value.clone());
        }
    }
}

fn push_labeled(notes: &mut Vec<String>, label: &str, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        notes.push(format!("{}: {}", label, text));
    }
}

/// 提取所有看起来像 URL 的条目（保持输入顺序）
///
/// 接受单个 URL 字符串、URL 字符串数组、或带 `url` 属性的对象数组
pub fn extract_links(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(link_of).collect(),
        other => link_of(other).into_iter().collect(),
    }
}

fn link_of(value: &Value) -> Option<String> {
    let candidate = match value {
        Value::String(s) => s.as_str(),
        Value::Object(obj) => obj.get("url")?.as_str()?,
        _ => return None,
    };
    let candidate = candidate.trim();
    let lower = candidate.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(candidate.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: Value) -> MappingSpecification {
        serde_json::from_value(value).unwrap()
    }

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_notes_follow_rule_order() {
        let forward = spec(json!({
            "composite_notes_template": "{notes_content}",
            "mappings": [
                {"source_field": "a", "target_field": "COMPOSITE_NOTES", "display_label": "A"},
                {"source_field": "b", "transform": "append_to_notes", "display_label": "B"}
            ]
        }));
        let mut reversed = forward.clone();
        reversed.mappings.reverse();
        let p = payload(json!({"a": "1", "b": "2"}));

        assert_eq!(transform(&p, &forward).unwrap().notes(), Some("A: 1\nB: 2"));
        assert_eq!(transform(&p, &reversed).unwrap().notes(), Some("B: 2\nA: 1"));
    }

    #[test]
    fn test_skip_if_empty_applies_to_every_kind() {
        let kinds = [
            "direct",
            "append_to_notes",
            "file_links_to_notes",
            "value_lookup",
            "manufacturer_to_notes",
            "joist_depth_preference",
            "file_attachment",
        ];
        for kind in kinds {
            for empty in [json!(""), json!("   "), json!([])] {
                let s = spec(json!({
                    "mappings": [{
                        "source_field": "f",
                        "target_field": "t",
                        "transform": kind,
                        "value_mapping": {"": "NOTES", "x": "NOTES"},
                        "skip_if_empty": true
                    }]
                }));
                let out = transform(&payload(json!({"f": empty})), &s).unwrap();
                assert!(out.is_empty(), "kind {} produced a field", kind);
                assert!(out.notes().is_none(), "kind {} produced notes", kind);
                assert!(out.internal(JOIST_DEPTH_KEY).is_none());
                assert!(out.internal(FILE_ATTACHMENTS_KEY).is_none());
            }
        }
    }

    #[test]
    fn test_missing_source_value_is_skipped() {
        let s = spec(json!({"mappings": [{"source_field": "planName", "target_field": "plan"}]}));
        let out = transform(&payload(json!({"planName": null})), &s).unwrap();
        assert!(out.get("plan").is_none());
    }

    #[test]
    fn test_file_links_extracts_urls_in_order() {
        let value = json!(["http://a", {"url": "http://b"}, "not-a-url"]);
        assert_eq!(extract_links(&value), vec!["http://a", "http://b"]);

        let s = spec(json!({
            "composite_notes_template": "{notes_content}",
            "mappings": [{"source_field": "files", "transform": "file_links_to_notes", "display_label": "Plans"}]
        }));
        let out = transform(&payload(json!({"files": value})), &s).unwrap();
        assert_eq!(out.notes(), Some("Plans:\n1. http://a\n2. http://b"));
    }

    #[test]
    fn test_file_links_single_string() {
        assert_eq!(extract_links(&json!("https://x/y.pdf")), vec!["https://x/y.pdf"]);
        assert!(extract_links(&json!("ftp://x")).is_empty());
    }

    #[test]
    fn test_value_lookup_passes_unmapped_value_through() {
        let s = spec(json!({"mappings": [{
            "source_field": "roofType", "target_field": "roof",
            "transform": "map_roof_type", "value_mapping": {"Trussed by CBC": "TRUSS"}
        }]}));
        let out = transform(&payload(json!({"roofType": "Stick Framed"})), &s).unwrap();
        assert_eq!(out.get("roof"), Some("Stick Framed"));
        let out = transform(&payload(json!({"roofType": "Trussed by CBC"})), &s).unwrap();
        assert_eq!(out.get("roof"), Some("TRUSS"));
    }

    #[test]
    fn test_manufacturer_only_writes_notes() {
        let s = spec(json!({
            "composite_notes_template": "{notes_content}",
            "mappings": [{
                "source_field": "preferredManufacturer", "target_field": "mfr",
                "transform": "map_manufacturer",
                "value_mapping": {"Boise": "NOTES", "Simpson": "SIMPSON"}
            }]
        }));
        let out = transform(&payload(json!({"preferredManufacturer": "Boise"})), &s).unwrap();
        assert_eq!(out.notes(), Some("Preferred Manufacturer: Boise"));
        assert!(out.get("mfr").is_none());

        let out = transform(&payload(json!({"preferredManufacturer": "Simpson"})), &s).unwrap();
        assert!(out.notes().is_none());
        assert!(out.get("mfr").is_none());
    }

    #[test]
    fn test_joist_and_attachments_stay_internal() {
        let s = spec(json!({"mappings": [
            {"source_field": "joistDepth", "target_field": "x", "transform": "map_to_joist_fields"},
            {"source_field": "plans", "target_field": "y", "transform": "upload_file"}
        ]}));
        let out = transform(
            &payload(json!({"joistDepth": "Per Designer", "plans": ["http://f"]})),
            &s,
        )
        .unwrap();
        assert!(out.is_empty());
        assert_eq!(out.internal(JOIST_DEPTH_KEY), Some(&json!("Per Designer")));
        assert_eq!(out.internal(FILE_ATTACHMENTS_KEY), Some(&json!(["http://f"])));
    }

    #[test]
    fn test_notes_template_gets_submission_id() {
        let s = spec(json!({
            "composite_notes_template": "JotForm #{submission_id}\n{notes_content}",
            "mappings": [{"source_field": "jobNotes", "target_field": "COMPOSITE_NOTES", "jotform_label": "Job Notes"}]
        }));
        let out = transform(&payload(json!({"submission_id": "42", "jobNotes": "rush"})), &s).unwrap();
        assert_eq!(out.notes(), Some("JotForm #42\nJob Notes: rush"));
        assert_eq!(out.submission_id(), "42");
    }

    #[test]
    fn test_blank_append_value_adds_nothing() {
        let s = spec(json!({"mappings": [{"source_field": "n", "transform": "append_to_notes"}]}));
        let out = transform(&payload(json!({"n": ["", null]})), &s).unwrap();
        assert!(out.notes().is_none());
    }

    #[test]
    fn test_due_date_policy_carried_when_enabled() {
        let s = spec(json!({"due_date_calculation": {"enabled": true, "days_from_submission": 5}}));
        let out = transform(&Payload::new(), &s).unwrap();
        assert_eq!(out.due_date_policy().map(|p| p.days_from_submission), Some(5));

        let s = spec(json!({"due_date_calculation": {"enabled": false, "days_from_submission": 5}}));
        assert!(transform(&Payload::new(), &s).unwrap().due_date_policy().is_none());
    }
}
