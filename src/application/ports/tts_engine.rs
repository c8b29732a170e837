//! TTS Engine Port - 文本转语音请求抽象
//!
//! 定义合成请求的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::playback::NarrationRequest;

/// TTS 错误
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl TtsError {
    /// 网络类错误可以重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, TtsError::NetworkError(_) | TtsError::Timeout)
    }
}

/// TTS 合成响应
#[derive(Debug, Clone)]
pub struct SynthesisResponse {
    /// 原始音频数据，可能为空（由播放控制器判定为失败）
    pub audio_data: Vec<u8>,
    /// 服务端声明的 Content-Type（仅用于日志，类型以魔数嗅探为准）
    pub content_type: Option<String>,
}

/// TTS Engine Port
///
/// 每个不同的文本发出一次请求，返回二进制音频或错误
#[async_trait]
pub trait TtsEnginePort: Send + Sync {
    /// 执行合成
    async fn synthesize(&self, request: &NarrationRequest) -> Result<SynthesisResponse, TtsError>;

    /// 检查 TTS 服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
