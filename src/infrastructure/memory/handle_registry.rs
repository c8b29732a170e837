//! In-Memory Resource Handle Registry
//!
//! 以 `blob:` URL 形式分配句柄，吊销后数据随之释放

use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::ports::{BlobData, HandleError, ResourceHandlePort};
use crate::domain::playback::{AudioMime, ResourceHandle};

const HANDLE_SCHEME: &str = "blob:narrator/";

/// 内存句柄注册表
pub struct InMemoryHandleRegistry {
    blobs: DashMap<String, BlobData>,
}

impl InMemoryHandleRegistry {
    pub fn new() -> Self {
        Self {
            blobs: DashMap::new(),
        }
    }

    /// 当前存活的句柄数
    pub fn live_count(&self) -> usize {
        self.blobs.len()
    }

    /// 当前存活句柄占用的字节数
    pub fn live_bytes(&self) -> usize {
        self.blobs.iter().map(|e| e.payload.len()).sum()
    }
}

impl Default for InMemoryHandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceHandlePort for InMemoryHandleRegistry {
    fn create_handle(
        &self,
        payload: Arc<[u8]>,
        mime: AudioMime,
    ) -> Result<ResourceHandle, HandleError> {
        if payload.is_empty() {
            return Err(HandleError::AllocationFailed("empty payload".to_string()));
        }
        let url = format!("{}{}", HANDLE_SCHEME, Uuid::new_v4());
        tracing::trace!(handle = %url, mime = %mime, size = payload.len(), "Handle created");
        self.blobs.insert(url.clone(), BlobData { mime, payload });
        Ok(ResourceHandle::new(url))
    }

    fn revoke_handle(&self, handle: &ResourceHandle) -> Result<(), HandleError> {
        self.blobs
            .remove(handle.as_str())
            .map(|_| {
                tracing::trace!(handle = %handle, "Handle revoked");
            })
            .ok_or_else(|| HandleError::NotFound(handle.to_string()))
    }

    fn resolve(&self, handle: &ResourceHandle) -> Option<BlobData> {
        self.blobs.get(handle.as_str()).map(|b| b.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_lifecycle() {
        let registry = InMemoryHandleRegistry::new();
        let payload: Arc<[u8]> = Arc::from(&b"OggS\x00\x02"[..]);

        let handle = registry.create_handle(payload, AudioMime::Ogg).unwrap();
        assert!(handle.as_str().starts_with("blob:narrator/"));
        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.live_bytes(), 6);

        let blob = registry.resolve(&handle).unwrap();
        assert_eq!(blob.mime, AudioMime::Ogg);

        assert!(registry.revoke_handle(&handle).is_ok());
        assert!(registry.resolve(&handle).is_none());
        assert_eq!(registry.live_count(), 0);

        // 重复吊销报错，由调用方吞掉
        assert!(matches!(
            registry.revoke_handle(&handle),
            Err(HandleError::NotFound(_))
        ));
    }

    #[test]
    fn test_handles_are_unique() {
        let registry = InMemoryHandleRegistry::new();
        let payload: Arc<[u8]> = Arc::from(&b"fLaC"[..]);
        let a = registry.create_handle(payload.clone(), AudioMime::Flac).unwrap();
        let b = registry.create_handle(payload, AudioMime::Flac).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_payload_rejected() {
        let registry = InMemoryHandleRegistry::new();
        let payload: Arc<[u8]> = Arc::from(Vec::new());
        assert!(registry.create_handle(payload, AudioMime::Mpeg).is_err());
    }
}
