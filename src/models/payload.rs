//! 入站载荷
//!
//! 载荷已由上游规范化为 字段名 → 任意 JSON 值

use serde_json::{Map, Value};

/// 规范化后的提交载荷
pub type Payload = Map<String, Value>;

/// 读取提交 ID（幂等键）
pub fn submission_id(payload: &Payload) -> Option<String> {
    ["submission_id", "submissionID"]
        .iter()
        .filter_map(|key| payload.get(*key))
        .find_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// 是否为"假值"：null、false、0、空字符串、空数组、空对象
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// 是否为空值：仅空白的字符串或空数组
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

/// 转成表单可用的文本；数组以 ", " 连接并丢弃假值元素
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter(|item| !is_falsy(item))
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_submission_id_prefers_snake_case_key() {
        let payload = json!({"submission_id": "A1", "submissionID": "B2"});
        assert_eq!(submission_id(payload.as_object().unwrap()), Some("A1".to_string()));
    }

    #[test]
    fn test_submission_id_accepts_numbers_and_fallback_key() {
        let payload = json!({"submission_id": "  ", "submissionID": 5912});
        assert_eq!(submission_id(payload.as_object().unwrap()), Some("5912".to_string()));
        assert_eq!(submission_id(&Payload::new()), None);
    }

    #[test]
    fn test_value_to_text_drops_falsy_list_items() {
        let value = json!(["Sealed Engineered Layout", "", null, "Permit Drawing"]);
        assert_eq!(value_to_text(&value), "Sealed Engineered Layout, Permit Drawing");
    }

    #[test]
    fn test_is_empty_value() {
        assert!(is_empty_value(&json!("   ")));
        assert!(is_empty_value(&json!([])));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(["x"])));
    }
}
