//! Event Publisher Implementation
//!
//! 向 UI 推送播放状态变更

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::playback::{ItemId, PlaybackFailure, PlaybackState};

/// 朗读事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum NarrationEvent {
    /// 状态变更
    StateChanged {
        item: String,
        from: String,
        to: String,
    },
    /// 无法生成或播放（UI 提示）
    Unavailable {
        item: String,
        message: String,
        reason: String,
    },
    /// 条目关闭
    SessionClosed {
        item: String,
        reason: String,
    },
}

impl NarrationEvent {
    pub fn item(&self) -> &str {
        match self {
            NarrationEvent::StateChanged { item, .. }
            | NarrationEvent::Unavailable { item, .. }
            | NarrationEvent::SessionClosed { item, .. } => item,
        }
    }
}

/// 事件发布器
pub struct EventPublisher {
    /// item -> broadcast sender（单条目订阅）
    item_channels: DashMap<ItemId, broadcast::Sender<NarrationEvent>>,
    /// 全局广播
    global_channel: broadcast::Sender<NarrationEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (global_tx, _) = broadcast::channel(256);
        Self {
            item_channels: DashMap::new(),
            global_channel: global_tx,
        }
    }

    /// 订阅全部条目的事件
    pub fn subscribe_global(&self) -> broadcast::Receiver<NarrationEvent> {
        self.global_channel.subscribe()
    }

    /// 订阅单个条目的事件
    pub fn subscribe(&self, item: &ItemId) -> broadcast::Receiver<NarrationEvent> {
        self.item_channels
            .entry(item.clone())
            .or_insert_with(|| broadcast::channel(64).0)
            .subscribe()
    }

    /// 发布状态变更，失败状态额外发布 Unavailable
    pub fn publish_state_changed(&self, item: &ItemId, from: &PlaybackState, to: &PlaybackState) {
        self.publish(
            item,
            NarrationEvent::StateChanged {
                item: item.to_string(),
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            },
        );

        if let PlaybackState::Errored(failure) = to {
            let message = match failure {
                PlaybackFailure::Synthesis(_) => "unable to generate audio",
                PlaybackFailure::Playback(_) => "unable to play",
            };
            self.publish(
                item,
                NarrationEvent::Unavailable {
                    item: item.to_string(),
                    message: message.to_string(),
                    reason: failure.reason().to_string(),
                },
            );
        }
    }

    /// 发布条目关闭事件，并移除条目通道
    pub fn publish_session_closed(&self, item: &ItemId, reason: &str) {
        self.publish(
            item,
            NarrationEvent::SessionClosed {
                item: item.to_string(),
                reason: reason.to_string(),
            },
        );
        self.item_channels.remove(item);
    }

    fn publish(&self, item: &ItemId, event: NarrationEvent) {
        if let Some(sender) = self.item_channels.get(item) {
            if let Err(e) = sender.send(event.clone()) {
                tracing::trace!(item = %item, error = %e, "No item subscribers");
            }
        }
        if let Err(e) = self.global_channel.send(event) {
            tracing::trace!(item = %item, error = %e, "No global subscribers");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
