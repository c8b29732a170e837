//! HTTP TTS Client - 调用外部 TTS HTTP 服务
//!
//! 实现 TtsEnginePort trait，通过 multipart 表单调用外部 TTS 服务
//!
//! 外部 TTS API:
//! POST {base_url}/api/tts
//! Request: multipart/form-data {text, model, voice, language, style}
//! Response: 原始音频二进制

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Client;
use std::time::Duration;

use crate::application::ports::{SynthesisResponse, TtsEnginePort, TtsError};
use crate::domain::playback::NarrationRequest;

/// HTTP TTS 客户端配置
#[derive(Debug, Clone)]
pub struct HttpTtsClientConfig {
    /// TTS 服务基础 URL
    pub base_url: String,
    /// 合成接口路径
    pub endpoint: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 网络错误重试次数
    pub max_retries: u32,
}

impl Default for HttpTtsClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            endpoint: "/api/tts".to_string(),
            timeout_secs: 60,
            max_retries: 0,
        }
    }
}

impl HttpTtsClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}

/// HTTP TTS 客户端
pub struct HttpTtsClient {
    client: Client,
    config: HttpTtsClientConfig,
}

impl HttpTtsClient {
    /// 创建新的 HTTP TTS 客户端
    pub fn new(config: HttpTtsClientConfig) -> Result<Self, TtsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TtsError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// 获取合成 URL
    fn synthesize_url(&self) -> String {
        format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.endpoint
        )
    }

    /// 获取健康检查 URL
    fn health_url(&self) -> String {
        format!("{}/health", self.config.base_url.trim_end_matches('/'))
    }

    fn build_form(request: &NarrationRequest) -> Form {
        let params = request.parameters();
        Form::new()
            .text("text", request.source_text().to_string())
            .text("model", params.model.clone())
            .text("voice", params.voice.clone())
            .text("language", params.language.clone())
            .text("style", params.style.clone())
    }

    async fn send_once(&self, request: &NarrationRequest) -> Result<SynthesisResponse, TtsError> {
        let response = self
            .client
            .post(self.synthesize_url())
            .multipart(Self::build_form(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TtsError::Timeout
                } else if e.is_connect() {
                    TtsError::NetworkError(format!("Cannot connect to TTS service: {}", e))
                } else {
                    TtsError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TtsError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let audio_data = response
            .bytes()
            .await
            .map_err(|e| TtsError::InvalidResponse(format!("Failed to read audio: {}", e)))?
            .to_vec();

        Ok(SynthesisResponse {
            audio_data,
            content_type,
        })
    }
}

#[async_trait]
impl TtsEnginePort for HttpTtsClient {
    async fn synthesize(&self, request: &NarrationRequest) -> Result<SynthesisResponse, TtsError> {
        tracing::debug!(
            url = %self.synthesize_url(),
            text_len = request.source_text().len(),
            voice = %request.parameters().voice,
            model = %request.parameters().model,
            "Sending TTS request"
        );

        let mut attempt = 0;
        loop {
            match self.send_once(request).await {
                Ok(response) => {
                    tracing::info!(
                        fingerprint = %request.fingerprint(),
                        content_type = ?response.content_type,
                        audio_size = response.audio_data.len(),
                        "TTS synthesis completed"
                    );
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(attempt = attempt, error = %e, "TTS request failed, retrying");
                    tokio::time::sleep(Duration::from_millis(250 * attempt as u64)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
