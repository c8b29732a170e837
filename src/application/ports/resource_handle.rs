//! Resource Handle Port - 临时资源句柄分配
//!
//! 类似浏览器 blob URL：为内存中的音频分配可吊销的句柄

use std::sync::Arc;
use thiserror::Error;

use crate::domain::playback::{AudioMime, ResourceHandle};

/// 句柄错误
#[derive(Debug, Error)]
pub enum HandleError {
    #[error("Resource handle not found: {0}")]
    NotFound(String),

    #[error("Allocation failed: {0}")]
    AllocationFailed(String),
}

/// 句柄指向的数据
#[derive(Debug, Clone)]
pub struct BlobData {
    pub mime: AudioMime,
    pub payload: Arc<[u8]>,
}

/// Resource Handle Port
///
/// 吊销是尽力而为的，调用方必须吞掉吊销错误
pub trait ResourceHandlePort: Send + Sync {
    /// 为音频数据分配句柄
    fn create_handle(
        &self,
        payload: Arc<[u8]>,
        mime: AudioMime,
    ) -> Result<ResourceHandle, HandleError>;

    /// 吊销句柄，释放底层数据
    fn revoke_handle(&self, handle: &ResourceHandle) -> Result<(), HandleError>;

    /// 解析句柄，已吊销返回 None
    fn resolve(&self, handle: &ResourceHandle) -> Option<BlobData>;
}
