//! Audio Element Port - 播放原语抽象
//!
//! 播放开始确认、结束、错误均通过 [`PlaybackNotifier`] 异步回送

use thiserror::Error;
use tokio::sync::mpsc;

use crate::application::commands::NarrationCommand;
use crate::domain::playback::{ElementNotification, ItemId, PlaybackRun, ResourceHandle};

/// 音频元素错误
#[derive(Debug, Error)]
pub enum ElementError {
    #[error("No source bound")]
    NoSource,

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Device error: {0}")]
    DeviceError(String),
}

/// 音频元素
///
/// 由单个播放会话独占
pub trait AudioElementPort: Send {
    /// 绑定音频源
    fn set_source(&mut self, handle: &ResourceHandle);

    /// 预加载已绑定的音频源
    fn load(&mut self);

    /// 请求开始播放
    ///
    /// 返回 Ok 仅表示请求已受理，开始与否由 `Started`/`Rejected` 通知确认。
    /// 返回的轮次与本次播放的所有通知一致
    fn play(&mut self) -> Result<PlaybackRun, ElementError>;

    fn pause(&mut self);

    /// 播放位置归零
    fn reset_position(&mut self);

    /// 解除音频源绑定
    fn clear_source(&mut self);
}

/// 音频输出端口：为每个条目创建独立的音频元素
pub trait AudioOutputPort: Send + Sync {
    fn create_element(&self, notifier: PlaybackNotifier) -> Box<dyn AudioElementPort>;
}

/// 元素通知回送器
#[derive(Debug, Clone)]
pub struct PlaybackNotifier {
    item: ItemId,
    sender: mpsc::Sender<NarrationCommand>,
}

impl PlaybackNotifier {
    pub fn new(item: ItemId, sender: mpsc::Sender<NarrationCommand>) -> Self {
        Self { item, sender }
    }

    pub fn item(&self) -> &ItemId {
        &self.item
    }

    /// 回送通知
    ///
    /// 通道满时等待，只有 worker 已停止时才丢弃
    pub async fn notify(
        &self,
        handle: &ResourceHandle,
        run: PlaybackRun,
        notification: ElementNotification,
    ) {
        let command = NarrationCommand::ElementNotified {
            item: self.item.clone(),
            handle: handle.clone(),
            run,
            notification,
        };
        if self.sender.send(command).await.is_err() {
            tracing::debug!(item = %self.item, "Worker stopped, element notification dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_waits_for_queue_capacity() {
        let (tx, mut rx) = mpsc::channel(1);
        tx.send(NarrationCommand::SweepIdle).await.unwrap();

        let notifier = PlaybackNotifier::new(ItemId::new("msg-1"), tx);
        let run = PlaybackRun::default().next();
        let task = tokio::spawn(async move {
            notifier
                .notify(&ResourceHandle::new("blob:test/0"), run, ElementNotification::Started)
                .await;
        });

        assert!(matches!(rx.recv().await, Some(NarrationCommand::SweepIdle)));
        match rx.recv().await {
            Some(NarrationCommand::ElementNotified {
                run: delivered,
                notification: ElementNotification::Started,
                ..
            }) => assert_eq!(delivered, run),
            other => panic!("expected element notification, got {:?}", other),
        }
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_notify_after_worker_stopped_is_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let notifier = PlaybackNotifier::new(ItemId::new("msg-1"), tx);
        notifier
            .notify(
                &ResourceHandle::new("blob:test/0"),
                PlaybackRun::default(),
                ElementNotification::Ended,
            )
            .await;
    }
}
