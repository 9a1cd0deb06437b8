//! 从补全文本中恢复单个 JSON 对象
//!
//! 模型输出可能被 Markdown 代码块包裹、后跟解释文字，或在末尾被截断。
//! 先去掉代码块标记，再从第一个 `{` 起做有限状态扫描（Normal / InString / Escaped），
//! 只在字符串外计数花括号；深度回到 0 即得到完整对象。
//! 扫描到结尾仍未配平时，退回到「第一个 `{` 到最后一个 `}`」的区间。

/// 扫描状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InString,
    /// 字符串内反斜杠之后的一个字符
    Escaped,
}

/// 去掉 ```json 与 ``` 标记
fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "")
}

/// 返回最可能是单个 JSON 对象的子串；文本中没有 `{` 时原样返回
pub fn extract_json_object(text: &str) -> String {
    let clean = strip_code_fences(text);
    let Some(start) = clean.find('{') else {
        return text.to_string();
    };

    let mut state = ScanState::Normal;
    let mut depth: usize = 0;

    for (offset, c) in clean[start..].char_indices() {
        state = match (state, c) {
            (ScanState::Escaped, _) => ScanState::InString,
            (ScanState::InString, '\\') => ScanState::Escaped,
            (ScanState::InString, '"') => ScanState::Normal,
            (ScanState::InString, _) => ScanState::InString,
            (ScanState::Normal, '"') => ScanState::InString,
            (ScanState::Normal, '{') => {
                depth += 1;
                ScanState::Normal
            }
            (ScanState::Normal, '}') => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return clean[start..end].to_string();
                }
                ScanState::Normal
            }
            (ScanState::Normal, _) => ScanState::Normal,
        };
    }

    // 截断：退回最后一个 `}`
    match clean.rfind('}') {
        Some(last) if last > start => clean[start..=last].to_string(),
        _ => clean,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_object() {
        let raw = r#"{"response": "hi"}"#;
        assert_eq!(extract_json_object(raw), raw);
    }

    #[test]
    fn test_fenced_with_trailing_prose() {
        let raw = "```json\n{\"response\": \"ok\", \"parameters\": {\"a\": {\"b\": 1}}}\n```\nHope this helps! {not json}";
        assert_eq!(
            extract_json_object(raw),
            "{\"response\": \"ok\", \"parameters\": {\"a\": {\"b\": 1}}}"
        );
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let obj = r#"{"response": "use } and { freely", "parameters": {"body": "a \"quoted\" }"}}"#;
        let raw = format!("Sure thing: {obj} -- trailing }} text");
        assert_eq!(extract_json_object(&raw), obj);
    }

    #[test]
    fn test_escaped_backslash_before_quote_closes_string() {
        let obj = r#"{"path": "C:\\", "n": {"x": 1}}"#;
        let raw = format!("{obj} trailing");
        assert_eq!(extract_json_object(&raw), obj);
    }

    #[test]
    fn test_arrays_in_parameters() {
        let obj = r#"{"parameters": {"list": [{"a": 1}, {"b": [2, 3]}]}, "activeAgent": "Chat"}"#;
        assert_eq!(extract_json_object(&format!("prefix {obj}")), obj);
    }

    #[test]
    fn test_truncated_falls_back_to_last_brace() {
        let raw = r#"{"response": "x", "parameters": {"title": "Lunch"}, "command": "create_ev"#;
        let out = extract_json_object(raw);
        assert_eq!(out, r#"{"response": "x", "parameters": {"title": "Lunch"}"#);
        assert_ne!(out, raw);
    }

    #[test]
    fn test_no_brace_returns_original() {
        let raw = "```json\nI cannot help with that```";
        assert_eq!(extract_json_object(raw), raw);
    }

    #[test]
    fn test_truncated_without_any_closing_brace() {
        let raw = "{\"response\": \"cut";
        assert_eq!(extract_json_object(raw), raw);
    }

    #[test]
    fn test_multibyte_text_around_object() {
        let obj = r#"{"response": "日程已创建 ✅"}"#;
        let raw = format!("好的：{obj}。谢谢");
        assert_eq!(extract_json_object(&raw), obj);
    }
}
