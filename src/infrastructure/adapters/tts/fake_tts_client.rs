//! Fake TTS Client - 用于演示和测试的 TTS 客户端
//!
//! 始终返回固定的音频，不实际调用 TTS 服务

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::application::ports::{SynthesisResponse, TtsEnginePort, TtsError};
use crate::domain::playback::NarrationRequest;

/// Fake TTS Client 配置
#[derive(Debug, Clone, Default)]
pub struct FakeTtsClientConfig {
    /// 固定返回的音频文件路径
    pub audio_file_path: Option<PathBuf>,
    /// 模拟合成延迟（毫秒）
    pub latency_ms: u64,
}

/// Fake TTS Client
pub struct FakeTtsClient {
    audio_data: Vec<u8>,
    latency: Duration,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl FakeTtsClient {
    /// 从配置创建，读取固定音频文件
    pub fn new(config: FakeTtsClientConfig) -> Result<Self, std::io::Error> {
        let audio_data = match &config.audio_file_path {
            Some(path) => std::fs::read(path)?,
            None => Vec::new(),
        };
        tracing::info!(
            path = ?config.audio_file_path,
            audio_size = audio_data.len(),
            "FakeTtsClient initialized"
        );
        Ok(Self::with_audio(audio_data).with_latency(Duration::from_millis(config.latency_ms)))
    }

    /// 使用内存中的音频创建
    pub fn with_audio(audio_data: Vec<u8>) -> Self {
        Self {
            audio_data,
            latency: Duration::ZERO,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// 始终返回服务错误
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::with_audio(Vec::new())
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 收到的合成请求数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TtsEnginePort for FakeTtsClient {
    async fn synthesize(&self, request: &NarrationRequest) -> Result<SynthesisResponse, TtsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            text_len = request.source_text().len(),
            voice = %request.parameters().voice,
            "FakeTtsClient: returning fixed audio"
        );

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(message) = &self.failure {
            return Err(TtsError::ServiceError(message.clone()));
        }

        Ok(SynthesisResponse {
            audio_data: self.audio_data.clone(),
            content_type: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_reads_audio_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"fLaC\x00\x00\x00\x22").unwrap();

        let client = FakeTtsClient::new(FakeTtsClientConfig {
            audio_file_path: Some(file.path().to_path_buf()),
            latency_ms: 0,
        })
        .unwrap();

        let request = NarrationRequest::new("text", Default::default());
        let response = client.synthesize(&request).await.unwrap();
        assert_eq!(&response.audio_data[..4], b"fLaC");
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_client() {
        let client = FakeTtsClient::failing("quota exceeded");
        let request = NarrationRequest::new("text", Default::default());
        let err = client.synthesize(&request).await.unwrap_err();
        assert!(matches!(err, TtsError::ServiceError(m) if m == "quota exceeded"));
    }
}
