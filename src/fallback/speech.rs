//! 语音合成：三个免费 TTS 端点依次尝试
//!
//! 「可用」指播放请求被音频端接受；播放是否真正完成只在结束回调中体现。
//! 端点同步抛错时立即尝试下一个，不等待音频完成。
//! 新的 speak 必须先停止并释放上一次的播放资源；stop / 析构同样释放。

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use super::{FallbackResolver, Provider, ProviderError, Resolution};
use crate::config::SpeechSection;

/// 播放结束回调
pub type FinishHook = Box<dyn FnOnce() + Send>;

/// 一次正在进行的播放
pub trait Playback: Send {
    /// 停止并释放资源
    fn stop(&mut self);
}

/// 音频播放端（宿主提供）
pub trait AudioSink: Send + Sync {
    /// 从 uri 加载并开始播放；返回 Ok 表示请求已被接受，播放自然结束时调用 on_finish
    fn start(&self, uri: &str, on_finish: FinishHook) -> Result<Box<dyn Playback>, ProviderError>;
}

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("All TTS providers failed: {0}")]
    Exhausted(String),
}

/// 一次朗读请求
pub struct SpeechJob {
    pub text: String,
    pub language: String,
    hook: Arc<dyn Fn() + Send + Sync>,
}

impl SpeechJob {
    fn finish_hook(&self) -> FinishHook {
        let hook = Arc::clone(&self.hook);
        Box::new(move || hook())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsEndpoint {
    /// translate_tts, client=tw-ob
    GoogleTranslate,
    /// translate_tts, client=gtx；文本只保留字母数字，最多 200 字符
    GoogleTranslateAlt,
    EdgeProxy,
}

static NON_ALNUM_RE: OnceLock<Regex> = OnceLock::new();

impl TtsEndpoint {
    pub const CHAIN: [TtsEndpoint; 3] = [
        TtsEndpoint::GoogleTranslate,
        TtsEndpoint::GoogleTranslateAlt,
        TtsEndpoint::EdgeProxy,
    ];

    pub fn url(&self, text: &str, language: &str) -> String {
        match self {
            TtsEndpoint::GoogleTranslate => format!(
                "https://translate.google.com/translate_tts?ie=UTF-8&q={}&tl={}&client=tw-ob",
                urlencoding::encode(text),
                language
            ),
            TtsEndpoint::GoogleTranslateAlt => {
                let re = NON_ALNUM_RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9\s]").unwrap());
                let clean = re.replace_all(text, " ");
                let clean: String = clean.trim().chars().take(200).collect();
                format!(
                    "https://translate.google.com/translate_tts?ie=UTF-8&q={}&tl={}&client=gtx&prev=input",
                    urlencoding::encode(&clean),
                    language
                )
            }
            TtsEndpoint::EdgeProxy => format!(
                "https://convert.rocks/api/edge-tts?text={}&voice=en-US-AriaNeural",
                urlencoding::encode(text)
            ),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TtsEndpoint::GoogleTranslate => "gtts",
            TtsEndpoint::GoogleTranslateAlt => "gtts-alt",
            TtsEndpoint::EdgeProxy => "edge-tts",
        }
    }
}

struct EndpointProvider {
    endpoint: TtsEndpoint,
    sink: Arc<dyn AudioSink>,
}

#[async_trait]
impl Provider<SpeechJob, Box<dyn Playback>> for EndpointProvider {
    fn name(&self) -> &str {
        self.endpoint.label()
    }

    async fn attempt(&self, job: &SpeechJob) -> Result<Box<dyn Playback>, ProviderError> {
        let url = self.endpoint.url(&job.text, &job.language);
        self.sink.start(&url, job.finish_hook())
    }
}

/// 朗读前截断到 max_chars 并追加 "..."，去掉会破坏 URL 的商标符号
pub fn prepare_text(text: &str, max_chars: usize) -> String {
    let truncated = if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    };
    truncated
        .chars()
        .filter(|c| !matches!(c, '™' | '®' | '©'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[derive(Default)]
struct SpeechState {
    current: Option<Box<dyn Playback>>,
    speaking_id: Option<String>,
    /// 每次 speak / stop 自增；过期播放的结束回调据此被忽略
    generation: u64,
}

impl SpeechState {
    /// 作废当前播放并取出；调用方须在释放锁之后再 stop，结束回调可能同步重入
    fn retire(&mut self) -> Option<Box<dyn Playback>> {
        self.generation += 1;
        self.speaking_id = None;
        self.current.take()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct SpeechService {
    resolver: FallbackResolver<SpeechJob, Box<dyn Playback>>,
    state: Arc<Mutex<SpeechState>>,
    max_chars: usize,
    language: String,
}

impl SpeechService {
    pub fn new(sink: Arc<dyn AudioSink>, cfg: &SpeechSection) -> Self {
        let mut resolver = FallbackResolver::new("speech");
        for endpoint in TtsEndpoint::CHAIN {
            resolver.push(Box::new(EndpointProvider {
                endpoint,
                sink: Arc::clone(&sink),
            }));
        }
        Self {
            resolver,
            state: Arc::new(Mutex::new(SpeechState::default())),
            max_chars: cfg.max_chars,
            language: cfg.language.clone(),
        }
    }

    /// 朗读 message_id 对应的文本；先释放上一次播放。返回命中的端点名
    pub async fn speak(
        &self,
        text: &str,
        message_id: &str,
        on_finish: Option<FinishHook>,
    ) -> Result<String, SpeechError> {
        let (previous, generation) = {
            let mut state = lock(&self.state);
            let previous = state.retire();
            state.speaking_id = Some(message_id.to_string());
            (previous, state.generation)
        };
        if let Some(mut previous) = previous {
            previous.stop();
        }

        let shared = Arc::clone(&self.state);
        let callback = Mutex::new(on_finish);
        let hook = move || {
            let fire = {
                let mut state = lock(&shared);
                if state.generation == generation {
                    state.speaking_id = None;
                    true
                } else {
                    false
                }
            };
            if fire {
                if let Some(cb) = lock(&callback).take() {
                    cb();
                }
            }
        };
        let job = SpeechJob {
            text: prepare_text(text, self.max_chars),
            language: self.language.clone(),
            hook: Arc::new(hook),
        };

        match self.resolver.resolve(&job).await {
            Resolution::Resolved { provider, value } => {
                let stale = {
                    let mut state = lock(&self.state);
                    if state.generation == generation {
                        state.current = Some(value);
                        None
                    } else {
                        Some(value)
                    }
                };
                if let Some(mut playback) = stale {
                    playback.stop();
                }
                tracing::info!(provider = %provider, message_id, "tts playback started");
                Ok(provider)
            }
            Resolution::Exhausted { failures } => {
                let mut state = lock(&self.state);
                if state.generation == generation {
                    state.speaking_id = None;
                }
                let last = failures
                    .last()
                    .map(|(name, e)| format!("{}: {}", name, e))
                    .unwrap_or_else(|| "no providers".to_string());
                Err(SpeechError::Exhausted(last))
            }
        }
    }

    /// 停止并释放当前播放
    pub fn stop(&self) {
        let current = lock(&self.state).retire();
        if let Some(mut playback) = current {
            playback.stop();
        }
    }

    /// 无参数时表示是否在朗读任意消息
    pub fn is_speaking(&self, message_id: Option<&str>) -> bool {
        let state = lock(&self.state);
        match message_id {
            Some(id) => state.speaking_id.as_deref() == Some(id),
            None => state.speaking_id.is_some(),
        }
    }
}

impl Drop for SpeechService {
    fn drop(&mut self) {
        let current = lock(&self.state).retire();
        if let Some(mut playback) = current {
            playback.stop();
        }
    }
}
