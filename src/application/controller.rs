//! Playback Controller - 单条目播放生命周期
//!
//! 每个可朗读条目一个控制器。所有转换在 `handle` 内同步完成，
//! 需要异步执行的合成请求以 [`Directive::Synthesize`] 返回给驱动方。

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::application::ports::{AudioElementPort, ResourceHandlePort};
use crate::domain::playback::{
    detect_mime, AudioAsset, Directive, ElementNotification, Generation, GenerationSource,
    IgnoreReason, ItemId, NarrationRequest, PlaybackEvent, PlaybackFailure, PlaybackRun,
    PlaybackState, RequestGuard, ResourceHandle, SynthesisJob, SynthesisOutcome,
};

/// 播放控制器
///
/// 不变量:
/// - 同一时刻最多一个进行中的合成请求（[`RequestGuard`]）
/// - 句柄吊销后立即丢弃资源，绝不再次绑定或播放
/// - 吊销前先暂停元素
/// - 代次取自共享的 [`GenerationSource`]，同一条目重建会话后旧回调仍可识别
pub struct PlaybackController {
    item: ItemId,
    request: NarrationRequest,
    state: PlaybackState,
    asset: Option<AudioAsset>,
    guard: RequestGuard,
    generation: Generation,
    generations: GenerationSource,
    /// 当前播放轮次，其他轮次的元素通知视为过期
    run: Option<PlaybackRun>,
    /// 已调用 play()，等待开始确认
    start_pending: bool,
    autoplay: bool,
    element: Box<dyn AudioElementPort>,
    handles: Arc<dyn ResourceHandlePort>,
    last_activity: DateTime<Utc>,
}

impl PlaybackController {
    pub fn new(
        item: ItemId,
        request: NarrationRequest,
        element: Box<dyn AudioElementPort>,
        handles: Arc<dyn ResourceHandlePort>,
        generations: GenerationSource,
        autoplay: bool,
    ) -> Self {
        Self {
            item,
            request,
            state: PlaybackState::Idle,
            asset: None,
            guard: RequestGuard::new(),
            generation: Generation::default(),
            generations,
            run: None,
            start_pending: false,
            autoplay,
            element,
            handles,
            last_activity: Utc::now(),
        }
    }

    pub fn item(&self) -> &ItemId {
        &self.item
    }

    pub fn request(&self) -> &NarrationRequest {
        &self.request
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn asset(&self) -> Option<&AudioAsset> {
        self.asset.as_ref()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_request_in_flight(&self) -> bool {
        self.guard.is_held()
    }

    /// 正在播放或等待播放确认
    pub fn is_audible(&self) -> bool {
        self.state == PlaybackState::Playing || self.start_pending
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// 处理一个事件
    pub fn handle(&mut self, event: PlaybackEvent) -> Directive {
        match event {
            PlaybackEvent::PlayIntent => {
                self.last_activity = Utc::now();
                self.on_play_intent()
            }
            PlaybackEvent::PauseIntent => {
                self.last_activity = Utc::now();
                self.on_pause_intent()
            }
            PlaybackEvent::SynthesisCompleted {
                generation,
                outcome,
            } => self.on_synthesis_completed(generation, outcome),
            PlaybackEvent::Element {
                handle,
                run,
                notification,
            } => self.on_element(&handle, run, notification),
            PlaybackEvent::CloseRequested => {
                self.close();
                Directive::Continue
            }
        }
    }

    fn on_play_intent(&mut self) -> Directive {
        match self.state {
            PlaybackState::Requesting => {
                tracing::debug!(item = %self.item, "Request in flight, play intent ignored");
                Directive::Ignored(IgnoreReason::Guarded)
            }
            PlaybackState::Ready if self.start_pending => {
                tracing::debug!(item = %self.item, "Start pending, play intent ignored");
                Directive::Ignored(IgnoreReason::Guarded)
            }
            PlaybackState::Playing => {
                // 同一音频再次点击为停止
                self.element.pause();
                self.element.reset_position();
                self.set_state(PlaybackState::Ready);
                Directive::Continue
            }
            PlaybackState::Ready | PlaybackState::Paused if self.asset.is_some() => {
                tracing::debug!(item = %self.item, "Cache hit, replaying cached audio");
                self.start_playback();
                Directive::Continue
            }
            _ => self.issue_request(),
        }
    }

    fn issue_request(&mut self) -> Directive {
        if !self.guard.try_acquire() {
            return Directive::Ignored(IgnoreReason::Guarded);
        }
        self.generation = self.generations.next();
        self.set_state(PlaybackState::Requesting);

        tracing::info!(
            item = %self.item,
            generation = %self.generation,
            fingerprint = %self.request.fingerprint(),
            text_len = self.request.source_text().len(),
            "Narration requested"
        );

        Directive::Synthesize(SynthesisJob {
            item: self.item.clone(),
            generation: self.generation,
            request: self.request.clone(),
        })
    }

    fn on_pause_intent(&mut self) -> Directive {
        if self.state == PlaybackState::Playing || self.start_pending {
            self.element.pause();
            self.start_pending = false;
            self.set_state(PlaybackState::Paused);
            Directive::Continue
        } else {
            Directive::Ignored(IgnoreReason::NotApplicable)
        }
    }

    fn on_synthesis_completed(
        &mut self,
        generation: Generation,
        outcome: SynthesisOutcome,
    ) -> Directive {
        if generation != self.generation || self.state != PlaybackState::Requesting {
            tracing::debug!(
                item = %self.item,
                generation = %generation,
                current = %self.generation,
                "Stale synthesis response discarded"
            );
            return Directive::Ignored(IgnoreReason::Stale);
        }
        self.guard.release();

        let audio = match outcome {
            SynthesisOutcome::Audio(audio) if audio.is_empty() => {
                tracing::warn!(item = %self.item, "Synthesis returned empty audio");
                self.set_state(PlaybackState::Errored(PlaybackFailure::Synthesis(
                    "empty audio payload".to_string(),
                )));
                return Directive::Continue;
            }
            SynthesisOutcome::Audio(audio) => audio,
            SynthesisOutcome::Failed(reason) => {
                tracing::warn!(item = %self.item, reason = %reason, "Synthesis failed");
                self.set_state(PlaybackState::Errored(PlaybackFailure::Synthesis(reason)));
                return Directive::Continue;
            }
        };

        let mime = detect_mime(&audio);
        let payload: Arc<[u8]> = audio.into();
        let handle = match self.handles.create_handle(payload.clone(), mime) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(item = %self.item, error = %e, "Failed to allocate resource handle");
                self.set_state(PlaybackState::Errored(PlaybackFailure::Playback(e.to_string())));
                return Directive::Continue;
            }
        };

        tracing::debug!(
            item = %self.item,
            mime = %mime,
            payload_size = payload.len(),
            handle = %handle,
            "Audio asset ready"
        );

        self.release_asset();
        self.element.set_source(&handle);
        self.element.load();
        self.asset = Some(AudioAsset::new(mime, payload, handle));
        self.set_state(PlaybackState::Ready);

        if self.autoplay {
            self.start_playback();
        }
        Directive::Continue
    }

    fn on_element(
        &mut self,
        handle: &ResourceHandle,
        run: PlaybackRun,
        notification: ElementNotification,
    ) -> Directive {
        let current = self.asset.as_ref().map(|a| a.handle());
        if current != Some(handle) || self.run != Some(run) {
            tracing::debug!(
                item = %self.item,
                handle = %handle,
                run = %run,
                notification = notification.as_str(),
                "Stale element notification discarded"
            );
            return Directive::Ignored(IgnoreReason::Stale);
        }

        match notification {
            ElementNotification::Started if self.start_pending => {
                self.start_pending = false;
                self.set_state(PlaybackState::Playing);
            }
            ElementNotification::Rejected(reason) if self.start_pending => {
                self.fail_playback(reason);
            }
            ElementNotification::Ended if self.state == PlaybackState::Playing => {
                self.element.reset_position();
                self.set_state(PlaybackState::Ready);
            }
            ElementNotification::Errored(reason) => {
                self.fail_playback(reason);
            }
            other => {
                tracing::trace!(
                    item = %self.item,
                    state = self.state.as_str(),
                    notification = other.as_str(),
                    "Element notification not applicable"
                );
                return Directive::Ignored(IgnoreReason::NotApplicable);
            }
        }
        Directive::Continue
    }

    /// 在已缓存的音频上请求播放
    fn start_playback(&mut self) {
        match self.element.play() {
            Ok(run) => {
                self.run = Some(run);
                self.start_pending = true;
                self.set_state(PlaybackState::Ready);
            }
            Err(e) => self.fail_playback(e.to_string()),
        }
    }

    fn fail_playback(&mut self, reason: String) {
        tracing::warn!(item = %self.item, reason = %reason, "Playback failed");
        self.start_pending = false;
        self.release_asset();
        self.set_state(PlaybackState::Errored(PlaybackFailure::Playback(reason)));
    }

    /// 暂停元素后吊销句柄，吊销失败只记录日志
    fn release_asset(&mut self) {
        self.element.pause();
        self.run = None;
        let Some(asset) = self.asset.take() else {
            return;
        };
        self.element.clear_source();
        match self.handles.revoke_handle(asset.handle()) {
            Ok(()) => tracing::debug!(item = %self.item, handle = %asset.handle(), "Handle revoked"),
            Err(e) => tracing::warn!(
                item = %self.item,
                handle = %asset.handle(),
                error = %e,
                "Failed to revoke handle, ignoring"
            ),
        }
    }

    /// 关闭会话：停止播放、吊销句柄、回到 Idle
    ///
    /// 进行中的合成请求不会被取消，其结果到达时因代次不符而被丢弃
    pub fn close(&mut self) {
        self.release_asset();
        self.guard.release();
        self.start_pending = false;
        self.generation = self.generations.next();
        self.set_state(PlaybackState::Idle);
    }

    fn set_state(&mut self, next: PlaybackState) {
        if self.state != next {
            tracing::debug!(
                item = %self.item,
                from = self.state.as_str(),
                to = next.as_str(),
                "Playback state changed"
            );
        }
        self.state = next;
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if self.asset.is_some() {
            self.release_asset();
        }
    }
}
