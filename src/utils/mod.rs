pub mod logging;

pub use logging::truncate_text;

/// 生成安全的文件名：只保留字母数字、`-`、`_`、`.`，空白替换为 `_`
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                Some(c)
            } else {
                None
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../evil id"), "evil_id");
        assert_eq!(sanitize_filename("TEST_20250130_1200"), "TEST_20250130_1200");
        assert_eq!(sanitize_filename("a/b\\c:d"), "abcd");
    }
}
