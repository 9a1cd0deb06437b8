//! 行情数据：加密货币源 -> 股票行情源 -> （调用方）模拟数据
//!
//! 两个数据源的数值字段都经过 [`coerce_number`] 容错解析；价格解析为 0 时视为响应不可用，
//! 交给下一个数据源，而不是把 0 当作真实价格展示。

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde_json::Value;

use super::{fetch_json, FallbackResolver, Provider, ProviderError};
use crate::config::MarketSection;
use crate::tools::params::coerce_number;
use crate::tools::{DataQuality, FinancialReport, Recommendation};

/// 代码 -> CoinGecko id；非加密货币返回 None
pub fn crypto_id(symbol: &str) -> Option<String> {
    let upper = symbol.trim().to_uppercase();
    let id = match upper.as_str() {
        "BTC" | "BTC-USD" | "BITCOIN" => "bitcoin",
        "ETH" | "ETH-USD" | "ETHEREUM" => "ethereum",
        "SOL" | "SOL-USD" => "solana",
        "DOGE" => "dogecoin",
        "XRP" => "ripple",
        _ if upper.contains("USD") => return Some(upper.replace("-USD", "").to_lowercase()),
        _ => return None,
    };
    Some(id.to_string())
}

/// 公司名到股票代码的少量别名（仅对不含 '-' / '.' 的代码生效）
pub fn normalize_equity_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    if upper.contains('-') || upper.contains('.') {
        return upper;
    }
    match upper.as_str() {
        "APPLE" => "AAPL".to_string(),
        "TESLA" => "TSLA".to_string(),
        "GOOGLE" => "GOOGL".to_string(),
        _ => upper,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// 解析 simple/price 响应
pub fn decode_coingecko(
    symbol: &str,
    coin_id: &str,
    body: &Value,
) -> Result<FinancialReport, ProviderError> {
    let coin = body
        .get(coin_id)
        .ok_or_else(|| ProviderError::Rejected(format!("no quote for {}", coin_id)))?;
    let price = coerce_number(&coin["usd"]);
    if price <= 0.0 {
        tracing::warn!(coin = coin_id, raw = %coin["usd"], "non-positive crypto price, rejecting");
        return Err(ProviderError::Rejected("price unavailable".into()));
    }
    let change_percent = coerce_number(&coin["usd_24h_change"]);
    let market_cap = coerce_number(&coin["usd_market_cap"]);

    Ok(FinancialReport {
        symbol: symbol.trim().to_uppercase(),
        price,
        currency: "USD".to_string(),
        change: price * (change_percent / 100.0),
        change_percent,
        market_cap: format!("${:.2}B", market_cap / 1e9),
        pe_ratio: None,
        week52_high: price * 1.5,
        week52_low: price * 0.5,
        recommendation: if change_percent > 0.0 {
            Recommendation::Buy
        } else {
            Recommendation::Sell
        },
        analysis: format!("Live data from CoinGecko. 24h Change: {:.2}%", change_percent),
        data_quality: DataQuality::Live,
    })
}

/// 解析 v8 chart 响应（只用 meta）
pub fn decode_chart(symbol: &str, body: &Value) -> Result<FinancialReport, ProviderError> {
    let meta = body
        .pointer("/chart/result/0/meta")
        .ok_or_else(|| ProviderError::Rejected("empty chart result".into()))?;
    let price = coerce_number(&meta["regularMarketPrice"]);
    if price <= 0.0 {
        tracing::warn!(
            symbol,
            raw = %meta["regularMarketPrice"],
            "non-positive equity price, rejecting"
        );
        return Err(ProviderError::Rejected("price unavailable".into()));
    }
    let prev_close = coerce_number(&meta["chartPreviousClose"]);
    let change = price - prev_close;
    let change_percent = if prev_close != 0.0 {
        change / prev_close * 100.0
    } else {
        0.0
    };
    let or_default = |key: &str, factor: f64| match coerce_number(&meta[key]) {
        v if v > 0.0 => v,
        _ => price * factor,
    };

    Ok(FinancialReport {
        symbol: symbol.to_string(),
        price,
        currency: meta["currency"].as_str().unwrap_or("USD").to_string(),
        change,
        change_percent,
        market_cap: "N/A".to_string(),
        pe_ratio: None,
        week52_high: or_default("fiftyTwoWeekHigh", 1.1),
        week52_low: or_default("fiftyTwoWeekLow", 0.9),
        recommendation: Recommendation::from_change_percent(change_percent),
        analysis: format!(
            "Market data for {}. Volatility: {:.2}%",
            symbol,
            change_percent.abs()
        ),
        data_quality: DataQuality::Live,
    })
}

/// 全部行情源失败时的模拟报告（标记为 synthetic）
pub fn synthetic_report(symbol: &str) -> FinancialReport {
    let mut rng = rand::thread_rng();
    let base: f64 = rng.gen_range(50.0..1050.0);
    let change: f64 = rng.gen_range(-10.0..10.0);
    let percent = change / base * 100.0;
    let change_percent = round2(percent);

    FinancialReport {
        symbol: symbol.trim().to_uppercase(),
        price: round2(base),
        currency: "USD".to_string(),
        change: round2(change),
        change_percent,
        market_cap: format!("{:.1}T", rng.gen_range(0.5..2.5)),
        pe_ratio: Some(round2(rng.gen_range(10.0..60.0))),
        week52_high: round2(base * 1.2),
        week52_low: round2(base * 0.8),
        recommendation: Recommendation::from_change_percent(percent),
        analysis: "Generated based on simulated market volatility and technical indicators."
            .to_string(),
        data_quality: DataQuality::Synthetic,
    }
}

pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
}

impl CoinGeckoProvider {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Provider<str, FinancialReport> for CoinGeckoProvider {
    fn name(&self) -> &str {
        "coingecko"
    }

    async fn attempt(&self, symbol: &str) -> Result<FinancialReport, ProviderError> {
        let coin_id = crypto_id(symbol).ok_or(ProviderError::NotApplicable)?;
        let url = format!(
            "{}?ids={}&vs_currencies=usd&include_24hr_change=true&include_market_cap=true",
            self.base_url,
            urlencoding::encode(&coin_id)
        );
        let body = fetch_json(self.client.get(&url)).await?;
        decode_coingecko(symbol, &coin_id, &body)
    }
}

pub struct YahooChartProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl YahooChartProvider {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl Provider<str, FinancialReport> for YahooChartProvider {
    fn name(&self) -> &str {
        "yahoo-chart"
    }

    async fn attempt(&self, symbol: &str) -> Result<FinancialReport, ProviderError> {
        let ticker = normalize_equity_symbol(symbol);
        if ticker.is_empty() {
            return Err(ProviderError::NotApplicable);
        }
        let url = format!(
            "{}/{}?interval=1d&range=1d",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&ticker)
        );
        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let body = fetch_json(request).await?;
        decode_chart(&ticker, &body)
    }
}

/// 行情查询：加密货币源优先，其次股票行情源
pub struct MarketDataResolver {
    resolver: FallbackResolver<str, FinancialReport>,
}

impl MarketDataResolver {
    pub fn new(resolver: FallbackResolver<str, FinancialReport>) -> Self {
        Self { resolver }
    }

    pub fn from_config(cfg: &MarketSection) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_default();
        let resolver = FallbackResolver::new("market")
            .with_provider(CoinGeckoProvider::new(client.clone(), cfg.crypto_url.clone()))
            .with_provider(YahooChartProvider::new(
                client,
                cfg.equity_url.clone(),
                cfg.equity_api_key.clone(),
            ));
        Self::new(resolver)
    }

    /// 全部失败返回 None，由调用方替换为模拟数据
    pub async fn lookup(&self, symbol: &str) -> Option<FinancialReport> {
        self.resolver.resolve(symbol).await.ok()
    }
}
