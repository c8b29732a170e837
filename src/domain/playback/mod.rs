//! Playback Context - 播放生命周期限界上下文
//!
//! 职责:
//! - 音频 MIME 嗅探
//! - 播放状态与事件定义
//! - 合成请求去重

mod errors;
mod guard;
mod mime;
mod state;
mod value_objects;

pub use errors::PlaybackFailure;
pub use guard::RequestGuard;
pub use mime::{detect_mime, AudioMime};
pub use state::{
    Directive, ElementNotification, IgnoreReason, PlaybackEvent, PlaybackState, SynthesisJob,
    SynthesisOutcome,
};
pub use value_objects::{
    AudioAsset, Generation, GenerationSource, ItemId, NarrationRequest, PlaybackRun,
    ResourceHandle, SynthesisParameters,
};
