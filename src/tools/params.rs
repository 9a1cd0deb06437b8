//! 工具参数读取与数值容错解析
//!
//! 模型给出的 parameters 是任意 JSON：字符串可能为空、数字可能以字符串形式出现（"$1,234.56"）。

use serde_json::{Map, Value};

/// 读取非空字符串参数；数字参数按其文本形式返回
pub fn str_param(params: &Map<String, Value>, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 去掉千分位、货币符号、百分号与空白后解析为 f64；失败时为 0
pub fn parse_number(raw: &str) -> f64 {
    let clean: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '%') && !c.is_whitespace())
        .collect();
    match clean.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => leading_number(&clean).unwrap_or(0.0),
    }
}

/// 任意 JSON 值到 f64：数字原样，字符串走 parse_number，其余为 0
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_number(s),
        _ => 0.0,
    }
}

/// 最长的合法数字前缀（"12abc" -> 12）
fn leading_number(s: &str) -> Option<f64> {
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            '-' | '+' if i == 0 => {}
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if !seen_digit {
        return None;
    }
    s[..end].trim_end_matches('.').parse::<f64>().ok()
}
