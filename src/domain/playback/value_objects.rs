//! Playback Context - Value Objects

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::AudioMime;

/// 可朗读条目标识（消息气泡、被描述的实体等）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 调用方没有自然 ID 时，用请求指纹作为条目标识
    pub fn for_request(request: &NarrationRequest) -> Self {
        Self(request.fingerprint())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 会话代次
///
/// 每次发起合成请求或关闭会话时从 [`GenerationSource`] 取新值。异步回调携带发起时的代次，
/// 与当前代次不一致即为过期回调。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// 代次发生器
///
/// 同一 worker 的所有会话共用一个发生器，被替换或重建的会话不会复用旧代次
#[derive(Debug, Clone, Default)]
pub struct GenerationSource(Arc<AtomicU64>);

impl GenerationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> Generation {
        Generation(self.0.fetch_add(1, Ordering::Relaxed).wrapping_add(1))
    }
}

/// 播放轮次
///
/// 元素每次受理 play() 生成新轮次，通知携带发出时的轮次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PlaybackRun(u64);

impl PlaybackRun {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PlaybackRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// 合成参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisParameters {
    pub voice: String,
    pub language: String,
    pub style: String,
    pub model: String,
}

impl Default for SynthesisParameters {
    fn default() -> Self {
        Self {
            voice: "alloy".to_string(),
            language: "en".to_string(),
            style: "neutral".to_string(),
            model: "tts-1".to_string(),
        }
    }
}

/// 朗读请求
///
/// 发出后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationRequest {
    source_text: String,
    parameters: SynthesisParameters,
}

impl NarrationRequest {
    pub fn new(source_text: impl Into<String>, parameters: SynthesisParameters) -> Self {
        Self {
            source_text: source_text.into(),
            parameters,
        }
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn parameters(&self) -> &SynthesisParameters {
        &self.parameters
    }

    /// md5(文本 + 参数)，用于日志追踪和派生条目 ID
    pub fn fingerprint(&self) -> String {
        let p = &self.parameters;
        let material = format!(
            "{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}",
            self.source_text, p.voice, p.language, p.style, p.model
        );
        format!("{:x}", md5::compute(material.as_bytes()))
    }
}

/// 临时资源句柄（blob URL）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle(String);

impl ResourceHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 已合成的音频资源
///
/// 由单个播放控制器独占，被替换或会话关闭时吊销句柄
#[derive(Debug, Clone)]
pub struct AudioAsset {
    mime: AudioMime,
    payload: Arc<[u8]>,
    handle: ResourceHandle,
}

impl AudioAsset {
    pub fn new(mime: AudioMime, payload: Arc<[u8]>, handle: ResourceHandle) -> Self {
        Self {
            mime,
            payload,
            handle,
        }
    }

    pub fn mime(&self) -> AudioMime {
        self.mime
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_depends_on_parameters() {
        let a = NarrationRequest::new("hello", SynthesisParameters::default());
        let mut params = SynthesisParameters::default();
        params.voice = "echo".to_string();
        let b = NarrationRequest::new("hello", params);

        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(ItemId::for_request(&a).as_str(), a.fingerprint());
    }

    #[test]
    fn test_generation_advances() {
        let g = Generation::default();
        assert_eq!(g.value(), 0);
        assert_eq!(g.next().next().value(), 2);
        assert!(g.next() > g);
    }

    #[test]
    fn test_generation_source_is_shared() {
        let source = GenerationSource::new();
        let other = source.clone();

        let a = source.next();
        let b = other.next();
        assert_ne!(a, b);
        assert!(b > a);
        assert!(a > Generation::default());
    }
}
