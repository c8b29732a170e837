//! Worker Layer - 朗读事件循环
//!
//! 实现 NarrationWorker，串行处理所有条目的播放事件

mod narration_worker;

pub use narration_worker::{NarrationClient, NarrationWorker, NarrationWorkerConfig};
