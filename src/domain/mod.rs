//! Domain Layer - 领域层
//!
//! Playback Context: 朗读音频的播放生命周期

pub mod playback;
