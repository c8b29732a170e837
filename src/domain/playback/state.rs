//! Playback Context - 状态与事件

use super::{Generation, ItemId, NarrationRequest, PlaybackFailure, PlaybackRun, ResourceHandle};

/// 播放会话状态
///
/// ```text
/// Idle -> Requesting -> Ready -> Playing <-> Paused
///              |                   |
///              +----> Errored <----+
/// ```
/// 任意状态在关闭时回到 Idle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// 尚未请求音频
    #[default]
    Idle,
    /// 合成请求进行中
    Requesting,
    /// 音频已缓存，未在播放（可能正在等待播放确认）
    Ready,
    /// 正在播放
    Playing,
    /// 用户暂停
    Paused,
    /// 合成或播放失败，可重试
    Errored(PlaybackFailure),
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Requesting => "requesting",
            PlaybackState::Ready => "ready",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Errored(_) => "errored",
        }
    }

    pub fn is_errored(&self) -> bool {
        matches!(self, PlaybackState::Errored(_))
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Errored(failure) => write!(f, "errored ({})", failure),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// 合成结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    /// 合成成功，原始音频字节（可能为空）
    Audio(Vec<u8>),
    /// 合成失败
    Failed(String),
}

/// 音频元素通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementNotification {
    /// play() 已确认开始
    Started,
    /// play() 被拒绝（如自动播放策略）
    Rejected(String),
    /// 播放到结尾
    Ended,
    /// 元素报错
    Errored(String),
}

impl ElementNotification {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementNotification::Started => "started",
            ElementNotification::Rejected(_) => "rejected",
            ElementNotification::Ended => "ended",
            ElementNotification::Errored(_) => "errored",
        }
    }
}

/// 驱动状态机的离散事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    PlayIntent,
    PauseIntent,
    SynthesisCompleted {
        generation: Generation,
        outcome: SynthesisOutcome,
    },
    /// 元素通知携带发出时绑定的句柄和播放轮次，用于识别过期通知
    Element {
        handle: ResourceHandle,
        run: PlaybackRun,
        notification: ElementNotification,
    },
    CloseRequested,
}

/// 需要驱动方异步执行的合成任务
#[derive(Debug, Clone)]
pub struct SynthesisJob {
    pub item: ItemId,
    pub generation: Generation,
    pub request: NarrationRequest,
}

/// 事件被忽略的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// 去重守卫已置位，或正在等待播放确认
    Guarded,
    /// 回调属于已关闭或被替换的会话
    Stale,
    /// 当前状态下该事件无意义
    NotApplicable,
}

/// 处理事件后的指示
#[derive(Debug, Clone)]
pub enum Directive {
    /// 已同步完成转换
    Continue,
    /// 需要发起合成请求
    Synthesize(SynthesisJob),
    /// 事件被丢弃
    Ignored(IgnoreReason),
}
