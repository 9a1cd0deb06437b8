//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SURROGATE__*` 覆盖（双下划线表示嵌套，如 `SURROGATE__LLM__MODEL=mistral-small-latest`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub market: MarketSection,
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub speech: SpeechSection,
}

/// [app] 段：数据目录、历史轮数、工具超时
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    /// 会话存储快照文件；未设置时仅驻留内存
    pub data_file: Option<PathBuf>,
    /// 用户上下文中没有昵称时使用
    #[serde(default = "default_user_name")]
    pub user_name: String,
    /// 注入 Prompt 的历史 Turn 数上限
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
    /// 单次 Agent 工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            data_file: None,
            user_name: default_user_name(),
            history_turns: default_history_turns(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

fn default_user_name() -> String {
    "User".to_string()
}

fn default_history_turns() -> usize {
    20
}

fn default_tool_timeout_secs() -> u64 {
    45
}

/// [llm] 段：补全端点、主模型与各辅助调用的模型
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：mistral / openai
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    /// 会话标题生成（轻量模型）
    #[serde(default = "default_light_model")]
    pub title_model: String,
    /// 搜索摘要生成
    #[serde(default = "default_light_model")]
    pub digest_model: String,
    /// 行情交易分析
    #[serde(default = "default_analysis_model")]
    pub analysis_model: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            title_model: default_light_model(),
            digest_model: default_light_model(),
            analysis_model: default_analysis_model(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_provider() -> String {
    "mistral".to_string()
}

fn default_model() -> String {
    "mistral-large-latest".to_string()
}

fn default_light_model() -> String {
    "mistral-small-latest".to_string()
}

fn default_analysis_model() -> String {
    "open-mistral-7b".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

/// [market] 段：加密货币与股票行情源
#[derive(Debug, Clone, Deserialize)]
pub struct MarketSection {
    #[serde(default = "default_crypto_url")]
    pub crypto_url: String,
    #[serde(default = "default_equity_url")]
    pub equity_url: String,
    /// 股票行情源的 Bearer Key（可选）
    pub equity_api_key: Option<String>,
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MarketSection {
    fn default() -> Self {
        Self {
            crypto_url: default_crypto_url(),
            equity_url: default_equity_url(),
            equity_api_key: None,
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

fn default_crypto_url() -> String {
    "https://api.coingecko.com/api/v3/simple/price".to_string()
}

fn default_equity_url() -> String {
    "https://query1.finance.yahoo.com/v8/finance/chart".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    15
}

/// [search] 段：阅读器代理、百科与网页搜索入口、内容阈值
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSection {
    #[serde(default = "default_reader_url")]
    pub reader_url: String,
    #[serde(default = "default_wiki_url")]
    pub wiki_url: String,
    #[serde(default = "default_web_search_url")]
    pub web_search_url: String,
    /// 百科正文最少字符数（不足视为不可用）
    #[serde(default = "default_wiki_min_chars")]
    pub wiki_min_chars: usize,
    #[serde(default = "default_web_min_chars")]
    pub web_min_chars: usize,
    #[serde(default = "default_wiki_excerpt_chars")]
    pub wiki_excerpt_chars: usize,
    #[serde(default = "default_web_excerpt_chars")]
    pub web_excerpt_chars: usize,
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            reader_url: default_reader_url(),
            wiki_url: default_wiki_url(),
            web_search_url: default_web_search_url(),
            wiki_min_chars: default_wiki_min_chars(),
            web_min_chars: default_web_min_chars(),
            wiki_excerpt_chars: default_wiki_excerpt_chars(),
            web_excerpt_chars: default_web_excerpt_chars(),
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

fn default_reader_url() -> String {
    "https://r.jina.ai".to_string()
}

fn default_wiki_url() -> String {
    "https://en.wikipedia.org/wiki".to_string()
}

fn default_web_search_url() -> String {
    "https://www.google.com/search".to_string()
}

fn default_wiki_min_chars() -> usize {
    100
}

fn default_web_min_chars() -> usize {
    50
}

fn default_wiki_excerpt_chars() -> usize {
    800
}

fn default_web_excerpt_chars() -> usize {
    1000
}

/// [speech] 段：朗读文本长度与语言
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechSection {
    #[serde(default = "default_speech_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_speech_language")]
    pub language: String,
}

impl Default for SpeechSection {
    fn default() -> Self {
        Self {
            max_chars: default_speech_max_chars(),
            language: default_speech_language(),
        }
    }
}

fn default_speech_max_chars() -> usize {
    250
}

fn default_speech_language() -> String {
    "en".to_string()
}

/// 从 config 目录加载配置，环境变量 SURROGATE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SURROGATE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SURROGATE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
