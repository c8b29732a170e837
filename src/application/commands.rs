//! 朗读命令
//!
//! 所有会话的事件都经由同一个 mpsc 通道串行进入 worker

use tokio::sync::oneshot;

use crate::domain::playback::{
    ElementNotification, Generation, ItemId, NarrationRequest, PlaybackRun, PlaybackState,
    ResourceHandle, SynthesisOutcome,
};

/// Worker 处理的命令
#[derive(Debug)]
pub enum NarrationCommand {
    /// 播放意图（已在播放同一音频时为停止）
    Play {
        item: ItemId,
        request: NarrationRequest,
    },
    /// 显式暂停
    Pause { item: ItemId },
    /// 关闭条目（对应 UI 卸载）
    Close { item: ItemId },
    /// 关闭全部条目
    CloseAll,
    /// 关闭空闲超时的条目
    SweepIdle,
    /// 查询条目状态
    QueryState {
        item: ItemId,
        reply: oneshot::Sender<Option<PlaybackState>>,
    },
    /// 合成任务完成（内部回送）
    SynthesisFinished {
        item: ItemId,
        generation: Generation,
        outcome: SynthesisOutcome,
    },
    /// 音频元素通知（内部回送）
    ElementNotified {
        item: ItemId,
        handle: ResourceHandle,
        run: PlaybackRun,
        notification: ElementNotification,
    },
    /// 关闭全部条目并停止 worker
    Shutdown,
}

impl NarrationCommand {
    pub fn name(&self) -> &'static str {
        match self {
            NarrationCommand::Play { .. } => "play",
            NarrationCommand::Pause { .. } => "pause",
            NarrationCommand::Close { .. } => "close",
            NarrationCommand::CloseAll => "close_all",
            NarrationCommand::SweepIdle => "sweep_idle",
            NarrationCommand::QueryState { .. } => "query_state",
            NarrationCommand::SynthesisFinished { .. } => "synthesis_finished",
            NarrationCommand::ElementNotified { .. } => "element_notified",
            NarrationCommand::Shutdown => "shutdown",
        }
    }
}
