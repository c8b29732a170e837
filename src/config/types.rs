//! Configuration Types
//!
//! 定义所有配置结构体

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::playback::SynthesisParameters;

/// 应用主配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// TTS 服务配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 默认合成参数
    #[serde(default)]
    pub synthesis: SynthesisParameters,

    /// 播放配置
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// GC 配置
    #[serde(default)]
    pub gc: GcConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// TTS 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// TTS 服务基础 URL
    #[serde(default = "default_tts_url")]
    pub url: String,

    /// 合成接口路径
    #[serde(default = "default_tts_endpoint")]
    pub endpoint: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// 最大重试次数
    #[serde(default)]
    pub max_retries: u32,

    /// 设置后使用固定音频文件代替 HTTP 服务
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fake_audio_file: Option<PathBuf>,
}

fn default_tts_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_tts_endpoint() -> String {
    "/api/tts".to_string()
}

fn default_tts_timeout() -> u64 {
    60
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            url: default_tts_url(),
            endpoint: default_tts_endpoint(),
            timeout_secs: default_tts_timeout(),
            max_retries: 0,
            fake_audio_file: None,
        }
    }
}

/// 播放配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// 合成完成后自动播放
    #[serde(default = "default_true")]
    pub autoplay: bool,

    /// 同一时刻只允许一个条目发声
    #[serde(default = "default_true")]
    pub exclusive: bool,

    /// 命令队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 无法推算时长时的默认播放时长（毫秒）
    #[serde(default = "default_duration_ms")]
    pub default_duration_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_duration_ms() -> u64 {
    3000
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            autoplay: true,
            exclusive: true,
            queue_capacity: default_queue_capacity(),
            default_duration_ms: default_duration_ms(),
        }
    }
}

/// GC（空闲条目清理）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcConfig {
    /// 是否启用自动清理
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 清理间隔时间（秒）
    #[serde(default = "default_gc_interval")]
    pub interval_secs: u64,

    /// 条目空闲超时（秒）
    #[serde(default = "default_session_idle")]
    pub session_idle_secs: u64,
}

fn default_gc_interval() -> u64 {
    300 // 5 分钟
}

fn default_session_idle() -> u64 {
    1800 // 30 分钟
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_gc_interval(),
            session_idle_secs: default_session_idle(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
