//! Narration Worker - 单执行上下文的朗读事件循环
//!
//! 所有条目的用户意图、合成结果、元素通知都经由同一个通道串行处理，
//! 合成请求在独立任务中执行，结果回送到通道。

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::application::commands::NarrationCommand;
use crate::application::controller::PlaybackController;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AudioOutputPort, PlaybackNotifier, ResourceHandlePort, TtsEnginePort,
};
use crate::domain::playback::{
    Directive, GenerationSource, ItemId, NarrationRequest, PlaybackEvent, PlaybackState,
    SynthesisJob, SynthesisOutcome,
};
use crate::infrastructure::events::EventPublisher;

/// Worker 配置
#[derive(Debug, Clone)]
pub struct NarrationWorkerConfig {
    /// 合成完成后自动播放
    pub autoplay: bool,
    /// 同一时刻只允许一个条目发声
    pub exclusive: bool,
    /// 命令队列容量
    pub queue_capacity: usize,
    /// 空闲清理间隔（秒），0 表示不清理
    pub sweep_interval_secs: u64,
    /// 条目空闲超时（秒）
    pub session_idle_secs: u64,
}

impl Default for NarrationWorkerConfig {
    fn default() -> Self {
        Self {
            autoplay: true,
            exclusive: true,
            queue_capacity: 1000,
            sweep_interval_secs: 300,
            session_idle_secs: 1800,
        }
    }
}

/// 朗读 Worker
///
/// 每个条目持有一个 [`PlaybackController`]
pub struct NarrationWorker {
    config: NarrationWorkerConfig,
    queue_receiver: mpsc::Receiver<NarrationCommand>,
    queue_sender: mpsc::Sender<NarrationCommand>,
    tts_engine: Arc<dyn TtsEnginePort>,
    audio_output: Arc<dyn AudioOutputPort>,
    handles: Arc<dyn ResourceHandlePort>,
    event_publisher: Arc<EventPublisher>,
    sessions: HashMap<ItemId, PlaybackController>,
    /// 所有会话共用，被替换会话的迟到结果不会匹配新会话
    generations: GenerationSource,
}

impl NarrationWorker {
    /// 创建 Worker 及其客户端
    pub fn new(
        config: NarrationWorkerConfig,
        tts_engine: Arc<dyn TtsEnginePort>,
        audio_output: Arc<dyn AudioOutputPort>,
        handles: Arc<dyn ResourceHandlePort>,
        event_publisher: Arc<EventPublisher>,
    ) -> (Self, NarrationClient) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let worker = Self {
            config,
            queue_receiver: rx,
            queue_sender: tx.clone(),
            tts_engine,
            audio_output,
            handles,
            event_publisher,
            sessions: HashMap::new(),
            generations: GenerationSource::new(),
        };
        (worker, NarrationClient { sender: tx })
    }

    /// 启动 Worker，直到收到 Shutdown
    pub async fn run(mut self) {
        tracing::info!(
            autoplay = self.config.autoplay,
            exclusive = self.config.exclusive,
            "NarrationWorker started"
        );

        let sweep_enabled = self.config.sweep_interval_secs > 0;
        let mut sweep = tokio::time::interval(Duration::from_secs(
            self.config.sweep_interval_secs.max(1),
        ));
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        sweep.tick().await;

        loop {
            let command = tokio::select! {
                command = self.queue_receiver.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
                _ = sweep.tick(), if sweep_enabled => NarrationCommand::SweepIdle,
            };

            if matches!(command, NarrationCommand::Shutdown) {
                self.close_all("shutdown");
                break;
            }
            self.process(command);
        }

        tracing::info!("NarrationWorker stopped");
    }

    /// 处理单个命令
    fn process(&mut self, command: NarrationCommand) {
        tracing::trace!(command = command.name(), "Processing command");

        match command {
            NarrationCommand::Play { item, request } => self.play(item, request),
            NarrationCommand::Pause { item } => {
                self.dispatch(&item, PlaybackEvent::PauseIntent);
            }
            NarrationCommand::Close { item } => self.close(&item, "closed"),
            NarrationCommand::CloseAll => self.close_all("closed"),
            NarrationCommand::SweepIdle => self.sweep_idle(),
            NarrationCommand::QueryState { item, reply } => {
                let state = self.sessions.get(&item).map(|c| c.state().clone());
                let _ = reply.send(state);
            }
            NarrationCommand::SynthesisFinished {
                item,
                generation,
                outcome,
            } => {
                if !self.sessions.contains_key(&item) {
                    tracing::debug!(item = %item, "Synthesis result for closed item dropped");
                    return;
                }
                self.dispatch(
                    &item,
                    PlaybackEvent::SynthesisCompleted {
                        generation,
                        outcome,
                    },
                );
                self.enforce_exclusive(&item);
            }
            NarrationCommand::ElementNotified {
                item,
                handle,
                run,
                notification,
            } => {
                self.dispatch(
                    &item,
                    PlaybackEvent::Element {
                        handle,
                        run,
                        notification,
                    },
                );
            }
            NarrationCommand::Shutdown => self.close_all("shutdown"),
        }
    }

    fn play(&mut self, item: ItemId, request: NarrationRequest) {
        // 条目文本或参数变化，旧音频作废
        let superseded = self
            .sessions
            .get(&item)
            .is_some_and(|c| c.request() != &request);
        if superseded {
            self.close(&item, "superseded");
        }

        if !self.sessions.contains_key(&item) {
            let notifier = PlaybackNotifier::new(item.clone(), self.queue_sender.clone());
            let element = self.audio_output.create_element(notifier);
            let controller = PlaybackController::new(
                item.clone(),
                request,
                element,
                self.handles.clone(),
                self.generations.clone(),
                self.config.autoplay,
            );
            tracing::debug!(item = %item, "Playback session created");
            self.sessions.insert(item.clone(), controller);
        }

        self.dispatch(&item, PlaybackEvent::PlayIntent);
        self.enforce_exclusive(&item);
    }

    /// 把事件交给条目控制器，并发布状态变化
    fn dispatch(&mut self, item: &ItemId, event: PlaybackEvent) {
        let Some(controller) = self.sessions.get_mut(item) else {
            tracing::debug!(item = %item, "Event for unknown item dropped");
            return;
        };

        let before = controller.state().clone();
        let directive = controller.handle(event);
        let after = controller.state().clone();

        if before != after {
            self.event_publisher.publish_state_changed(item, &before, &after);
        }

        match directive {
            Directive::Synthesize(job) => self.spawn_synthesis(job),
            Directive::Ignored(reason) => {
                tracing::trace!(item = %item, reason = ?reason, "Event ignored");
            }
            Directive::Continue => {}
        }
    }

    fn spawn_synthesis(&self, job: SynthesisJob) {
        let tts_engine = self.tts_engine.clone();
        let sender = self.queue_sender.clone();

        tokio::spawn(async move {
            let outcome = match tts_engine.synthesize(&job.request).await {
                Ok(response) => SynthesisOutcome::Audio(response.audio_data),
                Err(e) => {
                    tracing::error!(item = %job.item, error = %e, "TTS synthesis failed");
                    SynthesisOutcome::Failed(e.to_string())
                }
            };

            let command = NarrationCommand::SynthesisFinished {
                item: job.item,
                generation: job.generation,
                outcome,
            };
            if sender.send(command).await.is_err() {
                tracing::debug!("Worker stopped, synthesis result dropped");
            }
        });
    }

    /// 当前条目发声时暂停其他条目
    fn enforce_exclusive(&mut self, active: &ItemId) {
        if !self.config.exclusive {
            return;
        }
        let audible = self.sessions.get(active).is_some_and(|c| c.is_audible());
        if !audible {
            return;
        }

        let others: Vec<ItemId> = self
            .sessions
            .iter()
            .filter(|(id, c)| *id != active && c.is_audible())
            .map(|(id, _)| id.clone())
            .collect();

        for other in others {
            tracing::debug!(item = %other, active = %active, "Pausing for exclusive playback");
            self.dispatch(&other, PlaybackEvent::PauseIntent);
        }
    }

    fn close(&mut self, item: &ItemId, reason: &str) {
        let Some(mut controller) = self.sessions.remove(item) else {
            return;
        };
        let before = controller.state().clone();
        controller.handle(PlaybackEvent::CloseRequested);
        if before != PlaybackState::Idle {
            self.event_publisher
                .publish_state_changed(item, &before, controller.state());
        }
        self.event_publisher.publish_session_closed(item, reason);
        tracing::info!(item = %item, reason = %reason, "Playback session closed");
    }

    fn close_all(&mut self, reason: &str) {
        let items: Vec<ItemId> = self.sessions.keys().cloned().collect();
        for item in items {
            self.close(&item, reason);
        }
    }

    /// 关闭空闲超时且未发声的条目
    fn sweep_idle(&mut self) {
        let now = Utc::now();
        let timeout = chrono::Duration::seconds(self.config.session_idle_secs as i64);

        let expired: Vec<ItemId> = self
            .sessions
            .iter()
            .filter(|(_, c)| !c.is_audible() && !c.is_request_in_flight())
            .filter(|(_, c)| now - c.last_activity() > timeout)
            .map(|(id, _)| id.clone())
            .collect();

        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Closing idle playback sessions");
        }
        for item in expired {
            self.close(&item, "idle");
        }
    }
}

/// Worker 客户端
///
/// 可克隆，供 UI 绑定层发送意图
#[derive(Debug, Clone)]
pub struct NarrationClient {
    sender: mpsc::Sender<NarrationCommand>,
}

impl NarrationClient {
    /// 播放意图；已在播放同一音频时停止
    pub async fn play(&self, item: ItemId, request: NarrationRequest) -> Result<(), ApplicationError> {
        if request.source_text().trim().is_empty() {
            return Err(ApplicationError::validation("narration text is empty"));
        }
        self.send(NarrationCommand::Play { item, request }).await
    }

    pub async fn pause(&self, item: ItemId) -> Result<(), ApplicationError> {
        self.send(NarrationCommand::Pause { item }).await
    }

    /// 关闭条目，释放其音频资源
    pub async fn close(&self, item: ItemId) -> Result<(), ApplicationError> {
        self.send(NarrationCommand::Close { item }).await
    }

    pub async fn close_all(&self) -> Result<(), ApplicationError> {
        self.send(NarrationCommand::CloseAll).await
    }

    pub async fn sweep_idle(&self) -> Result<(), ApplicationError> {
        self.send(NarrationCommand::SweepIdle).await
    }

    /// 查询条目状态，条目不存在时返回 None
    pub async fn state(&self, item: ItemId) -> Result<Option<PlaybackState>, ApplicationError> {
        let (reply, rx) = oneshot::channel();
        self.send(NarrationCommand::QueryState { item, reply }).await?;
        rx.await
            .map_err(|_| ApplicationError::internal("state query dropped"))
    }

    /// 关闭全部条目并停止 Worker
    pub async fn shutdown(&self) -> Result<(), ApplicationError> {
        self.send(NarrationCommand::Shutdown).await
    }

    async fn send(&self, command: NarrationCommand) -> Result<(), ApplicationError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| ApplicationError::WorkerStopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{SynthesisResponse, TtsError};
    use crate::domain::playback::{PlaybackFailure, SynthesisParameters};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::infrastructure::adapters::{ClockedAudioOutput, ClockedOutputConfig, FakeTtsClient};
    use crate::infrastructure::events::NarrationEvent;
    use crate::infrastructure::memory::InMemoryHandleRegistry;
    use tokio::sync::broadcast;

    fn wav(duration_ms: u32) -> Vec<u8> {
        let byte_rate = 32000u32;
        let data_size = byte_rate / 1000 * duration_ms;
        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + data_size).to_le_bytes());
        wav.extend_from_slice(b"WAVEfmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&16000u32.to_le_bytes());
        wav.extend_from_slice(&byte_rate.to_le_bytes());
        wav.extend_from_slice(&2u16.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&data_size.to_le_bytes());
        wav.resize(wav.len() + data_size as usize, 0);
        wav
    }

    struct Harness {
        client: NarrationClient,
        tts: Arc<FakeTtsClient>,
        handles: Arc<InMemoryHandleRegistry>,
        events: broadcast::Receiver<NarrationEvent>,
    }

    fn start(tts: FakeTtsClient, output: ClockedOutputConfig) -> Harness {
        start_with(tts, output, 1000)
    }

    fn start_with(
        tts: FakeTtsClient,
        output: ClockedOutputConfig,
        queue_capacity: usize,
    ) -> Harness {
        let tts = Arc::new(tts);
        let (client, handles, events) = spawn_worker(tts.clone(), output, queue_capacity);
        Harness {
            client,
            tts,
            handles,
            events,
        }
    }

    fn spawn_worker(
        tts: Arc<dyn TtsEnginePort>,
        output: ClockedOutputConfig,
        queue_capacity: usize,
    ) -> (
        NarrationClient,
        Arc<InMemoryHandleRegistry>,
        broadcast::Receiver<NarrationEvent>,
    ) {
        let handles = Arc::new(InMemoryHandleRegistry::new());
        let publisher = Arc::new(EventPublisher::new());
        let events = publisher.subscribe_global();
        let output = Arc::new(ClockedAudioOutput::new(handles.clone(), output));

        let config = NarrationWorkerConfig {
            queue_capacity,
            sweep_interval_secs: 0,
            session_idle_secs: 0,
            ..Default::default()
        };
        let (worker, client) = NarrationWorker::new(config, tts, output, handles.clone(), publisher);
        tokio::spawn(worker.run());
        (client, handles, events)
    }

    /// 按调用顺序返回预设延迟和音频
    struct ScriptedTts {
        replies: Vec<(Duration, Vec<u8>)>,
        calls: AtomicUsize,
    }

    impl ScriptedTts {
        fn new(replies: Vec<(u64, usize)>) -> Self {
            let replies = replies
                .into_iter()
                .map(|(latency_ms, size)| {
                    let mut audio = b"OggS".to_vec();
                    audio.resize(size, 0);
                    (Duration::from_millis(latency_ms), audio)
                })
                .collect();
            Self {
                replies,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TtsEnginePort for ScriptedTts {
        async fn synthesize(
            &self,
            _request: &NarrationRequest,
        ) -> Result<SynthesisResponse, TtsError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let (latency, audio) = self
                .replies
                .get(n)
                .cloned()
                .ok_or_else(|| TtsError::ServiceError("no scripted reply".into()))?;
            tokio::time::sleep(latency).await;
            Ok(SynthesisResponse {
                audio_data: audio,
                content_type: Some("audio/ogg".into()),
            })
        }
    }

    fn request(text: &str) -> NarrationRequest {
        NarrationRequest::new(text, SynthesisParameters::default())
    }

    /// 等待条目进入指定状态
    async fn wait_for(events: &mut broadcast::Receiver<NarrationEvent>, item: &str, to: &str) {
        let deadline = Duration::from_secs(5);
        tokio::time::timeout(deadline, async {
            loop {
                match events.recv().await {
                    Ok(NarrationEvent::StateChanged { item: i, to: t, .. })
                        if i == item && t == to =>
                    {
                        return
                    }
                    Ok(_) => continue,
                    Err(e) => panic!("event stream failed: {}", e),
                }
            }
        })
        .await
        .expect("timed out waiting for state");
    }

    #[tokio::test]
    async fn test_play_to_end_and_replay_from_cache() {
        let tts = FakeTtsClient::with_audio(wav(50)).with_latency(Duration::from_millis(20));
        let mut h = start(tts, ClockedOutputConfig::default());
        let item = ItemId::new("msg-1");

        h.client.play(item.clone(), request("hello")).await.unwrap();
        // 合成期间的重复点击
        h.client.play(item.clone(), request("hello")).await.unwrap();

        wait_for(&mut h.events, "msg-1", "playing").await;
        wait_for(&mut h.events, "msg-1", "ready").await;
        assert_eq!(h.tts.call_count(), 1);

        h.client.play(item.clone(), request("hello")).await.unwrap();
        wait_for(&mut h.events, "msg-1", "playing").await;
        assert_eq!(h.tts.call_count(), 1);
        assert_eq!(h.handles.live_count(), 1);

        h.client.close(item.clone()).await.unwrap();
        assert_eq!(h.client.state(item).await.unwrap(), None);
        assert_eq!(h.handles.live_count(), 0);
    }

    #[tokio::test]
    async fn test_toggle_stop_while_playing() {
        let tts = FakeTtsClient::with_audio(wav(2000));
        let mut h = start(tts, ClockedOutputConfig::default());
        let item = ItemId::new("msg-2");

        h.client.play(item.clone(), request("long")).await.unwrap();
        wait_for(&mut h.events, "msg-2", "playing").await;

        h.client.play(item.clone(), request("long")).await.unwrap();
        assert_eq!(
            h.client.state(item).await.unwrap(),
            Some(PlaybackState::Ready)
        );
        assert_eq!(h.tts.call_count(), 1);
    }

    #[tokio::test]
    async fn test_exclusive_playback_pauses_other_item() {
        let tts = FakeTtsClient::with_audio(wav(2000));
        let mut h = start(tts, ClockedOutputConfig::default());
        let first = ItemId::new("a");
        let second = ItemId::new("b");

        h.client.play(first.clone(), request("first")).await.unwrap();
        wait_for(&mut h.events, "a", "playing").await;

        h.client.play(second.clone(), request("second")).await.unwrap();
        wait_for(&mut h.events, "b", "playing").await;

        assert_eq!(
            h.client.state(first).await.unwrap(),
            Some(PlaybackState::Paused)
        );
    }

    #[tokio::test]
    async fn test_synthesis_failure_surfaces_unavailable() {
        let mut h = start(
            FakeTtsClient::failing("HTTP 503"),
            ClockedOutputConfig::default(),
        );
        let item = ItemId::new("msg-3");

        h.client.play(item.clone(), request("x")).await.unwrap();
        let message = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Ok(NarrationEvent::Unavailable { message, .. }) = h.events.recv().await {
                    return message;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(message, "unable to generate audio");

        // 守卫已释放，可重试
        h.client.play(item.clone(), request("x")).await.unwrap();
        wait_for(&mut h.events, "msg-3", "errored").await;
        assert_eq!(h.tts.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_audio_is_errored() {
        let mut h = start(FakeTtsClient::with_audio(Vec::new()), ClockedOutputConfig::default());
        let item = ItemId::new("msg-4");

        h.client.play(item.clone(), request("x")).await.unwrap();
        wait_for(&mut h.events, "msg-4", "errored").await;
        assert_eq!(
            h.client.state(item).await.unwrap(),
            Some(PlaybackState::Errored(PlaybackFailure::Synthesis(
                "empty audio payload".into()
            )))
        );
        assert_eq!(h.handles.live_count(), 0);
    }

    #[tokio::test]
    async fn test_denied_playback_releases_handle() {
        let output = ClockedOutputConfig {
            deny_playback: true,
            ..Default::default()
        };
        let mut h = start(FakeTtsClient::with_audio(wav(100)), output);
        let item = ItemId::new("msg-5");

        h.client.play(item.clone(), request("x")).await.unwrap();
        wait_for(&mut h.events, "msg-5", "errored").await;
        assert_eq!(h.handles.live_count(), 0);
    }

    #[tokio::test]
    async fn test_close_during_synthesis_discards_result() {
        let tts = FakeTtsClient::with_audio(wav(100)).with_latency(Duration::from_millis(100));
        let h = start(tts, ClockedOutputConfig::default());
        let item = ItemId::new("msg-6");

        h.client.play(item.clone(), request("x")).await.unwrap();
        h.client.close(item.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(h.client.state(item).await.unwrap(), None);
        assert_eq!(h.handles.live_count(), 0);
    }

    #[tokio::test]
    async fn test_changed_text_supersedes_asset() {
        let tts = FakeTtsClient::with_audio(wav(2000));
        let mut h = start(tts, ClockedOutputConfig::default());
        let item = ItemId::new("entity-9");

        h.client.play(item.clone(), request("v1")).await.unwrap();
        wait_for(&mut h.events, "entity-9", "playing").await;

        h.client.play(item.clone(), request("v2")).await.unwrap();
        wait_for(&mut h.events, "entity-9", "playing").await;
        assert_eq!(h.tts.call_count(), 2);
        assert_eq!(h.handles.live_count(), 1);
    }

    #[tokio::test]
    async fn test_superseded_in_flight_response_is_discarded() {
        // v1 先返回，但 v2 已替换会话
        let tts = Arc::new(ScriptedTts::new(vec![(200, 100), (400, 1000)]));
        let (client, handles, _events) =
            spawn_worker(tts.clone(), ClockedOutputConfig::default(), 1000);
        let item = ItemId::new("entity-1");

        client.play(item.clone(), request("v1")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.play(item.clone(), request("v2")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(280)).await;
        assert_eq!(
            client.state(item.clone()).await.unwrap(),
            Some(PlaybackState::Requesting)
        );
        assert_eq!(handles.live_count(), 0);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(
            client.state(item).await.unwrap(),
            Some(PlaybackState::Playing)
        );
        assert_eq!(handles.live_bytes(), 1000);
        assert_eq!(tts.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reopened_session_ignores_earlier_response() {
        let tts = Arc::new(ScriptedTts::new(vec![(300, 100), (50, 1000)]));
        let (client, handles, _events) =
            spawn_worker(tts.clone(), ClockedOutputConfig::default(), 1000);
        let item = ItemId::new("msg-7");

        client.play(item.clone(), request("x")).await.unwrap();
        client.close(item.clone()).await.unwrap();
        client.play(item.clone(), request("x")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(handles.live_bytes(), 1000);

        // 第一次请求的结果已到达并被丢弃
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(handles.live_count(), 1);
        assert_eq!(handles.live_bytes(), 1000);
        assert_eq!(
            client.state(item).await.unwrap(),
            Some(PlaybackState::Playing)
        );
    }

    #[tokio::test]
    async fn test_full_queue_still_delivers_element_notifications() {
        let tts = FakeTtsClient::with_audio(wav(50));
        let mut h = start_with(tts, ClockedOutputConfig::default(), 1);
        let item = ItemId::new("msg-8");

        h.client.play(item.clone(), request("x")).await.unwrap();
        for _ in 0..20 {
            h.client.state(item.clone()).await.unwrap();
        }
        wait_for(&mut h.events, "msg-8", "playing").await;
        wait_for(&mut h.events, "msg-8", "ready").await;

        // 未卡在等待确认，再次点击走缓存
        h.client.play(item.clone(), request("x")).await.unwrap();
        wait_for(&mut h.events, "msg-8", "playing").await;
        assert_eq!(h.tts.call_count(), 1);
    }

    #[tokio::test]
    async fn test_without_autoplay_second_play_starts_audio() {
        let tts = Arc::new(FakeTtsClient::with_audio(wav(50)));
        let handles = Arc::new(InMemoryHandleRegistry::new());
        let publisher = Arc::new(EventPublisher::new());
        let mut events = publisher.subscribe_global();
        let output = Arc::new(ClockedAudioOutput::new(
            handles.clone(),
            ClockedOutputConfig::default(),
        ));
        let config = NarrationWorkerConfig {
            autoplay: false,
            sweep_interval_secs: 0,
            ..Default::default()
        };
        let (worker, client) = NarrationWorker::new(config, tts.clone(), output, handles, publisher);
        tokio::spawn(worker.run());
        let item = ItemId::new("msg-9");

        client.play(item.clone(), request("x")).await.unwrap();
        wait_for(&mut events, "msg-9", "ready").await;
        assert_eq!(
            client.state(item.clone()).await.unwrap(),
            Some(PlaybackState::Ready)
        );

        client.play(item.clone(), request("x")).await.unwrap();
        wait_for(&mut events, "msg-9", "playing").await;
        wait_for(&mut events, "msg-9", "ready").await;
        assert_eq!(tts.call_count(), 1);
    }

    #[tokio::test]
    async fn test_sweep_closes_idle_sessions() {
        let tts = FakeTtsClient::with_audio(wav(20));
        let mut h = start(tts, ClockedOutputConfig::default());
        let item = ItemId::new("old");

        h.client.play(item.clone(), request("x")).await.unwrap();
        wait_for(&mut h.events, "old", "playing").await;
        wait_for(&mut h.events, "old", "ready").await;

        tokio::time::sleep(Duration::from_millis(1100)).await;
        h.client.sweep_idle().await.unwrap();
        assert_eq!(h.client.state(item).await.unwrap(), None);
        assert_eq!(h.handles.live_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let h = start(FakeTtsClient::with_audio(wav(10)), ClockedOutputConfig::default());
        let err = h
            .client
            .play(ItemId::new("x"), request("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_shutdown_stops_worker() {
        let h = start(FakeTtsClient::with_audio(wav(10)), ClockedOutputConfig::default());
        h.client.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = h.client.state(ItemId::new("x")).await.unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::WorkerStopped | ApplicationError::InternalError(_)
        ));
    }
}
