//! 网页搜索：百科阅读 -> 通用网页搜索阅读；知识兜底由 Search Agent 在全部失败后执行
//!
//! 两个数据源都经由阅读器代理（`{reader_url}/{target}`）取回正文，
//! 正文长度达不到阈值即视为不可用。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{fetch_json, FallbackResolver, Provider, ProviderError, Resolution};
use crate::config::SearchSection;
use crate::tools::SearchHit;

/// 百科卡片摘要长度
pub const WIKI_SNIPPET_CHARS: usize = 200;
/// 网页卡片摘要长度
pub const WEB_SNIPPET_CHARS: usize = 300;

/// 一个可用的搜索结果
#[derive(Debug, Clone, PartialEq)]
pub struct WebFinding {
    /// 交给摘要调用的完整摘录
    pub digest_input: SearchHit,
    /// 渲染用的短卡片
    pub card: SearchHit,
}

/// 前 n 个字符
pub fn take_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// "rust programming language" -> "Rust_Programming_Language"
pub fn title_case_slug(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("_")
}

fn looks_like_html(s: &str) -> bool {
    let s = s.trim_start();
    s.starts_with("<!")
        || s.starts_with("<html")
        || s.starts_with("<HTML")
        || (s.contains("</") && (s.contains("<body") || s.contains("<div") || s.contains("<p")))
}

/// 阅读器响应的正文：`data.content`，其次 `content`；HTML 转纯文本
pub fn reader_content(body: &Value) -> String {
    let raw = body
        .pointer("/data/content")
        .and_then(Value::as_str)
        .or_else(|| body.get("content").and_then(Value::as_str))
        .unwrap_or_default();
    if looks_like_html(raw) {
        match html2text::from_read(raw.as_bytes(), 120) {
            Ok(text) if !text.trim().is_empty() => text,
            _ => raw.to_string(),
        }
    } else {
        raw.to_string()
    }
}

/// 阅读器代理客户端
#[derive(Clone)]
pub struct ReaderClient {
    client: Client,
    reader_url: String,
}

impl ReaderClient {
    pub fn new(client: Client, reader_url: impl Into<String>) -> Self {
        Self {
            client,
            reader_url: reader_url.into(),
        }
    }

    pub async fn read(&self, target: &str) -> Result<String, ProviderError> {
        let url = format!("{}/{}", self.reader_url.trim_end_matches('/'), target);
        let request = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header("X-Return-Format", "markdown");
        let body = fetch_json(request).await?;
        Ok(reader_content(&body))
    }
}

/// 百科：查询转为标题式页面名，正文需超过阈值
pub struct WikipediaProvider {
    reader: ReaderClient,
    wiki_url: String,
    min_chars: usize,
    excerpt_chars: usize,
}

impl WikipediaProvider {
    pub fn new(reader: ReaderClient, cfg: &SearchSection) -> Self {
        Self {
            reader,
            wiki_url: cfg.wiki_url.trim_end_matches('/').to_string(),
            min_chars: cfg.wiki_min_chars,
            excerpt_chars: cfg.wiki_excerpt_chars,
        }
    }

    pub fn finding(&self, query: &str, content: &str) -> Result<WebFinding, ProviderError> {
        let len = content.chars().count();
        if len <= self.min_chars {
            return Err(ProviderError::Rejected(format!("content too short ({} chars)", len)));
        }
        let excerpt = take_chars(content, self.excerpt_chars).trim().to_string();
        let title = format!("Wikipedia: {}", query);
        Ok(WebFinding {
            card: SearchHit {
                title: title.clone(),
                snippet: format!("{}...", take_chars(&excerpt, WIKI_SNIPPET_CHARS)),
                source: "wikipedia.org".to_string(),
            },
            digest_input: SearchHit {
                title,
                snippet: excerpt,
                source: "wikipedia.org".to_string(),
            },
        })
    }
}

#[async_trait]
impl Provider<str, WebFinding> for WikipediaProvider {
    fn name(&self) -> &str {
        "wikipedia"
    }

    async fn attempt(&self, query: &str) -> Result<WebFinding, ProviderError> {
        let slug = title_case_slug(query);
        if slug.is_empty() {
            return Err(ProviderError::NotApplicable);
        }
        let target = format!("{}/{}", self.wiki_url, urlencoding::encode(&slug));
        let content = self.reader.read(&target).await?;
        self.finding(query, &content)
    }
}

/// 通用网页搜索结果页，正文需达到阈值
pub struct WebSearchProvider {
    reader: ReaderClient,
    search_url: String,
    min_chars: usize,
    excerpt_chars: usize,
}

impl WebSearchProvider {
    pub fn new(reader: ReaderClient, cfg: &SearchSection) -> Self {
        Self {
            reader,
            search_url: cfg.web_search_url.clone(),
            min_chars: cfg.web_min_chars,
            excerpt_chars: cfg.web_excerpt_chars,
        }
    }

    pub fn finding(&self, query: &str, content: &str) -> Result<WebFinding, ProviderError> {
        let len = content.chars().count();
        if len < self.min_chars {
            return Err(ProviderError::Rejected(format!("no search results ({} chars)", len)));
        }
        let excerpt = take_chars(content, self.excerpt_chars).trim().to_string();
        Ok(WebFinding {
            card: SearchHit {
                title: format!("Web search: {}", query),
                snippet: format!("{}...", take_chars(&excerpt, WEB_SNIPPET_CHARS)),
                source: "web search".to_string(),
            },
            digest_input: SearchHit {
                title: format!("Search results for \"{}\"", query),
                snippet: excerpt,
                source: "google.com".to_string(),
            },
        })
    }
}

#[async_trait]
impl Provider<str, WebFinding> for WebSearchProvider {
    fn name(&self) -> &str {
        "web-search"
    }

    async fn attempt(&self, query: &str) -> Result<WebFinding, ProviderError> {
        let target = format!("{}?q={}", self.search_url, urlencoding::encode(query));
        let content = self.reader.read(&target).await?;
        self.finding(query, &content)
    }
}

pub struct WebSearchResolver {
    resolver: FallbackResolver<str, WebFinding>,
}

impl WebSearchResolver {
    pub fn new(resolver: FallbackResolver<str, WebFinding>) -> Self {
        Self { resolver }
    }

    pub fn from_config(cfg: &SearchSection) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_default();
        let reader = ReaderClient::new(client, cfg.reader_url.clone());
        let resolver = FallbackResolver::new("search")
            .with_provider(WikipediaProvider::new(reader.clone(), cfg))
            .with_provider(WebSearchProvider::new(reader, cfg));
        Self::new(resolver)
    }

    pub async fn lookup(&self, query: &str) -> Resolution<WebFinding> {
        self.resolver.resolve(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reader() -> ReaderClient {
        ReaderClient::new(Client::new(), "http://127.0.0.1:9")
    }

    #[test]
    fn test_title_case_slug() {
        assert_eq!(title_case_slug("rust programming  language"), "Rust_Programming_Language");
        assert_eq!(title_case_slug("éclair"), "Éclair");
        assert_eq!(title_case_slug("   "), "");
    }

    #[test]
    fn test_reader_content_shapes() {
        assert_eq!(reader_content(&json!({"data": {"content": "A"}})), "A");
        assert_eq!(reader_content(&json!({"content": "B"})), "B");
        assert_eq!(reader_content(&json!({"code": 404})), "");
        let html = reader_content(&json!({"content": "<html><body><p>Hello world</p></body></html>"}));
        assert!(html.contains("Hello world"));
        assert!(!html.contains("<p>"));
    }

    #[test]
    fn test_wiki_threshold_and_snippet() {
        let cfg = SearchSection::default();
        let wiki = WikipediaProvider::new(reader(), &cfg);
        assert!(matches!(
            wiki.finding("Rust", &"x".repeat(100)),
            Err(ProviderError::Rejected(_))
        ));

        let found = wiki.finding("Rust", &"y".repeat(2000)).unwrap();
        assert_eq!(found.digest_input.snippet.chars().count(), 800);
        assert_eq!(found.card.snippet.chars().count(), 203);
        assert_eq!(found.card.title, "Wikipedia: Rust");
        assert_eq!(found.card.source, "wikipedia.org");
    }

    #[test]
    fn test_web_threshold_and_snippet() {
        let cfg = SearchSection::default();
        let web = WebSearchProvider::new(reader(), &cfg);
        assert!(web.finding("q", &"z".repeat(49)).is_err());

        let found = web.finding("q", &"z".repeat(50)).unwrap();
        assert_eq!(found.card.snippet.chars().count(), 53);
        assert_eq!(found.digest_input.title, "Search results for \"q\"");
        assert_eq!(found.card.source, "web search");
    }

    #[tokio::test]
    async fn test_unreachable_reader_exhausts() {
        let mut cfg = SearchSection::default();
        cfg.reader_url = "http://127.0.0.1:9".to_string();
        cfg.timeout_secs = 2;
        let search = WebSearchResolver::from_config(&cfg);
        assert!(matches!(
            search.lookup("anything").await,
            Resolution::Exhausted { ref failures } if failures.len() == 2
        ));
    }
}
