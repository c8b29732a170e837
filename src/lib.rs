//! Narrator - 朗读音频播放生命周期控制
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Playback Context: MIME 嗅探、播放状态与事件、请求去重守卫
//!
//! 应用层 (application/):
//! - Ports: 端口定义（TtsEngine, AudioElement, ResourceHandle）
//! - Controller: 每条目一个的播放状态机
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: HTTP/Fake TTS Client, 模拟音频输出
//! - Memory: blob 句柄注册表
//! - Worker: 单执行上下文事件循环
//! - Events: 播放状态事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
