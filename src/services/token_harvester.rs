//! 隐藏令牌采集 - 业务能力层
//!
//! 有状态的服务端表单每次回发都需要带上页面中的隐藏状态字段

use crate::error::AppResult;
use crate::infrastructure::HttpSession;
use phf::phf_set;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// 需要回传的隐藏状态字段
pub static HIDDEN_STATE_FIELDS: phf::Set<&'static str> = phf_set! {
    "__VIEWSTATE",
    "__VIEWSTATEGENERATOR",
    "__EVENTVALIDATION",
    "__EVENTTARGET",
    "__EVENTARGUMENT",
};

/// 令牌采集器
///
/// 借用调用方的会话，保证采集到的令牌和随后的 POST 共用同一组 Cookie
pub struct TokenHarvester<'a> {
    session: &'a HttpSession,
    form_url: &'a str,
}

impl<'a> TokenHarvester<'a> {
    pub fn new(session: &'a HttpSession, form_url: &'a str) -> Self {
        Self { session, form_url }
    }

    /// 采集隐藏令牌
    ///
    /// 任何网络或解析错误都只记录日志并返回空表，由后续的结果判定报告失败
    pub async fn harvest(&self) -> BTreeMap<String, String> {
        match self.session.get_text(self.form_url).await {
            Ok(html) => {
                let tokens = parse_state_tokens(&html);
                debug!("采集到 {} 个隐藏令牌: {:?}", tokens.len(), tokens.keys());
                tokens
            }
            Err(e) => {
                warn!("⚠️ 获取表单隐藏令牌失败，继续提交: {}", e);
                BTreeMap::new()
            }
        }
    }

    /// 连通性检查
    pub async fn check_reachable(&self) -> AppResult<()> {
        self.session.get_text(self.form_url).await.map(|_| ())
    }
}

fn input_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<input\b[^>]*>").expect("input regex is valid"))
}

fn attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)\b(name|value)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("attr regex is valid")
    })
}

/// 从 HTML 中解析隐藏状态字段；缺失的字段直接省略
pub fn parse_state_tokens(html: &str) -> BTreeMap<String, String> {
    let mut tokens = BTreeMap::new();

    for tag in input_tag_regex().find_iter(html) {
        let mut name = None;
        let mut value = None;
        for cap in attr_regex().captures_iter(tag.as_str()) {
            let raw = cap.get(2).or_else(|| cap.get(3)).map(|m| m.as_str()).unwrap_or("");
            match cap[1].to_ascii_lowercase().as_str() {
                "name" => name = Some(raw),
                "value" => value = Some(raw),
                _ => {}
            }
        }

        if let Some(name) = name {
            if HIDDEN_STATE_FIELDS.contains(name) && !tokens.contains_key(name) {
                tokens.insert(name.to_string(), decode_entities(value.unwrap_or("")));
            }
        }
    }

    tokens
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORM: &str = r#"
        <form method="post" action="./?loc=2378" id="aspnetForm">
        <input type="hidden" name="__EVENTTARGET" id="__EVENTTARGET" value="" />
        <input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="/wEPDwUK+abc=" />
        <input type="hidden" name="__VIEWSTATEGENERATOR" id="__VIEWSTATEGENERATOR" value="CA0B0334" />
        <input type='hidden' value='x&amp;y' name='__EVENTVALIDATION' />
        <input name="ctl00$cphBody$txtProjectName" type="text" id="ctl00_cphBody_txtProjectName" />
    "#;

    #[test]
    fn test_parse_state_tokens() {
        let tokens = parse_state_tokens(FORM);
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens["__VIEWSTATE"], "/wEPDwUK+abc=");
        assert_eq!(tokens["__VIEWSTATEGENERATOR"], "CA0B0334");
        assert_eq!(tokens["__EVENTVALIDATION"], "x&y");
        assert_eq!(tokens["__EVENTTARGET"], "");
        assert!(!tokens.contains_key("__EVENTARGUMENT"));
        assert!(!tokens.contains_key("ctl00$cphBody$txtProjectName"));
    }

    #[test]
    fn test_parse_state_tokens_without_form() {
        assert!(parse_state_tokens("<html>maintenance</html>").is_empty());
    }
}
