//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（narrator.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["narrator", "narrator.local"];

/// 加载应用配置
///
/// # 环境变量示例
/// - `NARRATOR_TTS__URL=http://tts-server:8000`
/// - `NARRATOR_SYNTHESIS__VOICE=nova`
/// - `NARRATOR_PLAYBACK__AUTOPLAY=false`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("tts.url", "http://localhost:8000")?
        .set_default("tts.endpoint", "/api/tts")?
        .set_default("tts.timeout_secs", 60)?
        .set_default("tts.max_retries", 0)?
        .set_default("playback.autoplay", true)?
        .set_default("playback.exclusive", true)?
        .set_default("playback.queue_capacity", 1000)?
        .set_default("playback.default_duration_ms", 3000)?
        .set_default("gc.enabled", true)?
        .set_default("gc.interval_secs", 300)?
        .set_default("gc.session_idle_secs", 1800)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 前缀: NARRATOR_，层级分隔符: __
    builder = builder.add_source(
        Environment::with_prefix("NARRATOR")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.tts.url.is_empty() && config.tts.fake_audio_file.is_none() {
        return Err(ConfigError::ValidationError(
            "TTS URL cannot be empty".to_string(),
        ));
    }

    if !config.tts.endpoint.starts_with('/') {
        return Err(ConfigError::ValidationError(
            "TTS endpoint must start with '/'".to_string(),
        ));
    }

    if config.playback.queue_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "Playback queue capacity cannot be 0".to_string(),
        ));
    }

    if config.gc.enabled && config.gc.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "GC interval cannot be 0 when GC is enabled".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Narrator Configuration ===");
    match &config.tts.fake_audio_file {
        Some(path) => tracing::info!("TTS: fake audio {:?}", path),
        None => tracing::info!("TTS: {}{}", config.tts.url, config.tts.endpoint),
    }
    tracing::info!("TTS Timeout: {}s", config.tts.timeout_secs);
    tracing::info!(
        "Synthesis: model={} voice={} language={} style={}",
        config.synthesis.model,
        config.synthesis.voice,
        config.synthesis.language,
        config.synthesis.style
    );
    tracing::info!(
        "Playback: autoplay={} exclusive={}",
        config.playback.autoplay,
        config.playback.exclusive
    );
    tracing::info!("GC Enabled: {}", config.gc.enabled);
    if config.gc.enabled {
        tracing::info!("GC Interval: {}s", config.gc.interval_secs);
        tracing::info!("Session Idle: {}s", config.gc.session_idle_secs);
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("==============================");
}
