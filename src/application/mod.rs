//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（TtsEngine、AudioElement、ResourceHandle）
//! - controller: 单条目播放生命周期控制器
//! - commands: Worker 命令
//! - error: 应用层错误定义

pub mod commands;
pub mod controller;
pub mod error;
pub mod ports;

// Re-exports
pub use commands::NarrationCommand;
pub use controller::PlaybackController;
pub use error::ApplicationError;

pub use ports::{
    // Audio element
    AudioElementPort,
    AudioOutputPort,
    ElementError,
    PlaybackNotifier,
    // Resource handle
    BlobData,
    HandleError,
    ResourceHandlePort,
    // TTS engine
    SynthesisResponse,
    TtsEnginePort,
    TtsError,
};
