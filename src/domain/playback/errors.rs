//! Playback Context - Errors

use serde::Serialize;
use thiserror::Error;

/// 播放失败原因
///
/// 均可恢复：守卫已释放，下一次播放意图会重新发起合成
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum PlaybackFailure {
    /// TTS 返回错误或空音频
    #[error("unable to generate audio: {0}")]
    Synthesis(String),

    /// 播放被拒绝或音频元素报错
    #[error("unable to play: {0}")]
    Playback(String),
}

impl PlaybackFailure {
    pub fn reason(&self) -> &str {
        match self {
            PlaybackFailure::Synthesis(r) | PlaybackFailure::Playback(r) => r,
        }
    }
}
