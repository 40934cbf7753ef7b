//! 结果判定 - 业务能力层
//!
//! 目标门户不返回结构化确认，只能从页面文本推断结果。
//! 按顺序检查（先命中者生效，大小写不敏感）：
//! 1. 成功标志 → Success
//! 2. 错误标志 → Failure，并尽量提取校验信息
//! 3. 都没有 → Inconclusive，由 [`InconclusivePolicy`] 决定是否视为成功

use crate::models::outcome::SubmissionOutcome;
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

const SUCCESS_MARKERS: [&str; 3] = ["thank you", "success", "submitted"];
const ERROR_MARKERS: [&str; 3] = ["error", "invalid", "required"];
const MAX_ERROR_FRAGMENTS: usize = 5;
const GENERIC_REJECTION: &str = "目标门户拒绝了提交（页面中未找到具体错误信息）";

/// 无法判定时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InconclusivePolicy {
    /// 视为成功，确认号标记为需人工核实（兼容现有行为）
    #[default]
    AssumeSuccess,
    /// 视为失败
    TreatAsFailure,
}

impl FromStr for InconclusivePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assume_success" => Ok(InconclusivePolicy::AssumeSuccess),
            "treat_as_failure" => Ok(InconclusivePolicy::TreatAsFailure),
            other => Err(format!("未知的 INCONCLUSIVE_POLICY: {}", other)),
        }
    }
}

/// 结果判定器
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultClassifier {
    policy: InconclusivePolicy,
}

impl ResultClassifier {
    pub fn new(policy: InconclusivePolicy) -> Self {
        Self { policy }
    }

    /// 判定响应正文或页面内容
    pub fn classify(&self, text: &str) -> SubmissionOutcome {
        let lower = text.to_lowercase();

        if SUCCESS_MARKERS.iter().any(|m| lower.contains(m)) {
            return SubmissionOutcome::success(extract_confirmation_token(text));
        }

        if ERROR_MARKERS.iter().any(|m| lower.contains(m)) {
            let detail = extract_error_detail(text).unwrap_or_else(|| GENERIC_REJECTION.to_string());
            return SubmissionOutcome::failure(detail);
        }

        SubmissionOutcome::inconclusive(self.policy == InconclusivePolicy::AssumeSuccess)
    }
}

/// 使用默认策略判定
pub fn classify(text: &str) -> SubmissionOutcome {
    ResultClassifier::default().classify(text)
}

/// 从成功页面提取确认号
///
/// TODO: 拿到门户确认页面的真实样本后再实现，目前没有可靠的提取方式
pub fn extract_confirmation_token(_html: &str) -> Option<String> {
    None
}

fn error_fragment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?is)<(?:span|div|li|p|label|ul|td)\b[^>]*\bclass\s*=\s*["'][^"']*(?:error|alert|validation-summary|validator)[^"']*["'][^>]*>(.*?)</(?:span|div|li|p|label|ul|td)>"#,
        )
        .expect("error fragment regex is valid")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex is valid"))
}

/// 提取错误提示片段：最多 5 个不重复片段，以 "; " 连接
pub fn extract_error_detail(html: &str) -> Option<String> {
    let mut fragments: Vec<String> = Vec::new();

    for cap in error_fragment_regex().captures_iter(html) {
        let Some(inner) = cap.get(1) else { continue };
        let text = tag_regex().replace_all(inner.as_str(), " ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() || fragments.contains(&text) {
            continue;
        }
        fragments.push(text);
        if fragments.len() == MAX_ERROR_FRAGMENTS {
            break;
        }
    }

    if fragments.is_empty() {
        None
    } else {
        Some(fragments.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::outcome::{Classification, MANUAL_VERIFICATION_TOKEN};

    #[test]
    fn test_thank_you_is_success() {
        let outcome = classify("<h1>Thank you for your submission</h1>");
        assert_eq!(outcome.classification, Classification::Success);
        assert!(outcome.succeeded);
        assert!(outcome.confirmation_token.is_empty());
    }

    #[test]
    fn test_success_marker_wins_over_error_marker() {
        let outcome = classify("Submitted. (0 errors)");
        assert_eq!(outcome.classification, Classification::Success);
    }

    #[test]
    fn test_required_is_failure_with_detail() {
        let html = r#"<form><span class="field-validation-error">This field is required</span></form>"#;
        let outcome = classify(html);
        assert_eq!(outcome.classification, Classification::Failure);
        assert!(!outcome.succeeded);
        assert_eq!(outcome.error_detail, "This field is required");
    }

    #[test]
    fn test_failure_without_markup_uses_generic_detail() {
        let outcome = classify("Invalid postback or callback argument");
        assert_eq!(outcome.classification, Classification::Failure);
        assert_eq!(outcome.error_detail, GENERIC_REJECTION);
    }

    #[test]
    fn test_neither_marker_is_inconclusive_success() {
        let outcome = classify("<html><body>Design Center</body></html>");
        assert_eq!(outcome.classification, Classification::Inconclusive);
        assert!(outcome.succeeded);
        assert_eq!(outcome.confirmation_token, MANUAL_VERIFICATION_TOKEN);
    }

    #[test]
    fn test_strict_policy_turns_inconclusive_into_failure() {
        let outcome = ResultClassifier::new(InconclusivePolicy::TreatAsFailure).classify("Design Center");
        assert_eq!(outcome.classification, Classification::Inconclusive);
        assert!(!outcome.succeeded);
        assert!(outcome.confirmation_token.is_empty());
    }

    #[test]
    fn test_error_detail_dedupes_and_caps_fragments() {
        let mut html = String::from(r#"<div class="validation-summary-errors"><ul><li>Plan <b>Name</b> missing</li></ul></div>"#);
        html.push_str(r#"<span class="error">Plan Name missing</span>"#);
        for i in 0..8 {
            html.push_str(&format!(r#"<span class="error">E{}</span>"#, i));
        }
        let detail = extract_error_detail(&html).unwrap();
        let parts: Vec<&str> = detail.split("; ").collect();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], "Plan Name missing");
        assert_eq!(parts[1], "E0");
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("assume_success".parse(), Ok(InconclusivePolicy::AssumeSuccess));
        assert_eq!("TREAT_AS_FAILURE".parse(), Ok(InconclusivePolicy::TreatAsFailure));
        assert!("maybe".parse::<InconclusivePolicy>().is_err());
    }
}
