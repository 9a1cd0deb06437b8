//! 多源降级解析器
//!
//! 按顺序尝试一组相互独立的 Provider，第一个返回可用结果者胜出；全部失败时由调用方给出
//! 明确标注的降级结果，而不是把错误抛给用户。Provider 严格串行尝试，不做并发扇出，也不重试。
//!
//! 三处实例：行情（[`market`]）、网页搜索（[`web`]）、语音合成（[`speech`]）。

pub mod market;
pub mod speech;
pub mod web;

use async_trait::async_trait;
use thiserror::Error;

/// 单个 Provider 尝试失败的原因
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// 该 Provider 不处理此类查询（如非加密货币代码）
    #[error("not applicable")]
    NotApplicable,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {0}")]
    Http(u16),

    /// 响应可解析但未通过最低校验（内容过短、缺字段等）
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => ProviderError::Http(status.as_u16()),
            None if e.is_decode() => ProviderError::Decode(e.to_string()),
            None => ProviderError::Transport(e.to_string()),
        }
    }
}

/// GET 并解析 JSON；非 2xx 映射为 Http(status)
pub(crate) async fn fetch_json(
    request: reqwest::RequestBuilder,
) -> Result<serde_json::Value, ProviderError> {
    let resp = request.send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(ProviderError::Http(status.as_u16()));
    }
    resp.json::<serde_json::Value>()
        .await
        .map_err(|e| ProviderError::Decode(e.to_string()))
}

/// 一个数据源
#[async_trait]
pub trait Provider<Q: ?Sized + Sync, T: Send>: Send + Sync {
    fn name(&self) -> &str;

    async fn attempt(&self, query: &Q) -> Result<T, ProviderError>;
}

/// 解析结果：命中的 Provider 与其值，或全部失败的记录
#[derive(Debug)]
pub enum Resolution<T> {
    Resolved { provider: String, value: T },
    Exhausted { failures: Vec<(String, ProviderError)> },
}

impl<T> Resolution<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Resolution::Resolved { value, .. } => Some(value),
            Resolution::Exhausted { .. } => None,
        }
    }

    pub fn provider(&self) -> Option<&str> {
        match self {
            Resolution::Resolved { provider, .. } => Some(provider),
            Resolution::Exhausted { .. } => None,
        }
    }
}

pub struct FallbackResolver<Q: ?Sized + Sync, T: Send> {
    label: &'static str,
    providers: Vec<Box<dyn Provider<Q, T>>>,
}

impl<Q: ?Sized + Sync, T: Send> FallbackResolver<Q, T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            providers: Vec::new(),
        }
    }

    pub fn with_provider(mut self, provider: impl Provider<Q, T> + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn push(&mut self, provider: Box<dyn Provider<Q, T>>) {
        self.providers.push(provider);
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// 依次尝试；第一个 Ok 即返回
    pub async fn resolve(&self, query: &Q) -> Resolution<T> {
        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.attempt(query).await {
                Ok(value) => {
                    tracing::info!(
                        resolver = self.label,
                        provider = provider.name(),
                        skipped = failures.len(),
                        "provider resolved"
                    );
                    return Resolution::Resolved {
                        provider: provider.name().to_string(),
                        value,
                    };
                }
                Err(ProviderError::NotApplicable) => {
                    tracing::debug!(
                        resolver = self.label,
                        provider = provider.name(),
                        "provider not applicable"
                    );
                    failures.push((provider.name().to_string(), ProviderError::NotApplicable));
                }
                Err(e) => {
                    tracing::warn!(
                        resolver = self.label,
                        provider = provider.name(),
                        error = %e,
                        "provider failed, advancing"
                    );
                    failures.push((provider.name().to_string(), e));
                }
            }
        }
        tracing::warn!(resolver = self.label, attempts = failures.len(), "all providers exhausted");
        Resolution::Exhausted { failures }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! 测试用 Provider：固定返回值并计数

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    pub struct FixedProvider<T: Clone> {
        pub name: &'static str,
        pub outcome: Result<T, ProviderError>,
        pub calls: Arc<AtomicUsize>,
    }

    impl<T: Clone> FixedProvider<T> {
        pub fn new(name: &'static str, outcome: Result<T, ProviderError>) -> Self {
            Self {
                name,
                outcome,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl<Q: ?Sized + Sync, T: Clone + Send + Sync> Provider<Q, T> for FixedProvider<T> {
        fn name(&self) -> &str {
            self.name
        }

        async fn attempt(&self, _query: &Q) -> Result<T, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::FixedProvider;
    use super::*;

    #[tokio::test]
    async fn test_first_success_wins_and_stops() {
        let first = FixedProvider::new("a", Err(ProviderError::Http(503)));
        let second = FixedProvider::new("b", Ok(2u32));
        let third = FixedProvider::new("c", Ok(3u32));
        let third_calls = third.calls.clone();

        let resolver: FallbackResolver<str, u32> = FallbackResolver::new("test")
            .with_provider(first)
            .with_provider(second)
            .with_provider(third);

        let res = resolver.resolve("q").await;
        assert_eq!(res.provider(), Some("b"));
        assert_eq!(res.ok(), Some(2));
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exhausted_records_every_failure() {
        let resolver: FallbackResolver<str, u32> = FallbackResolver::new("test")
            .with_provider(FixedProvider::new("a", Err(ProviderError::NotApplicable)))
            .with_provider(FixedProvider::new(
                "b",
                Err(ProviderError::Transport("dns".into())),
            ));
        assert_eq!(resolver.provider_names(), vec!["a", "b"]);

        match resolver.resolve("q").await {
            Resolution::Exhausted { failures } => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0], ("a".to_string(), ProviderError::NotApplicable));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_resolver_is_exhausted() {
        let resolver: FallbackResolver<str, u32> = FallbackResolver::new("empty");
        assert!(resolver.resolve("q").await.ok().is_none());
    }
}
