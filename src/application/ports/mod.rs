//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_element;
mod resource_handle;
mod tts_engine;

pub use audio_element::{AudioElementPort, AudioOutputPort, ElementError, PlaybackNotifier};
pub use resource_handle::{BlobData, HandleError, ResourceHandlePort};
pub use tts_engine::{SynthesisResponse, TtsEnginePort, TtsError};
