//! Narrator - 朗读一段文本并报告播放生命周期
//!
//! 用法:
//! - `narrator <text...>` 合成并播放文本
//! - `narrator --print-config` 打印生效的配置（TOML）

use std::sync::Arc;

use narrator::application::ports::TtsEnginePort;
use narrator::config::{load_config, print_config};
use narrator::domain::playback::{ItemId, NarrationRequest};
use narrator::infrastructure::adapters::{
    ClockedAudioOutput, ClockedOutputConfig, FakeTtsClient, FakeTtsClientConfig, HttpTtsClient,
    HttpTtsClientConfig,
};
use narrator::infrastructure::events::{EventPublisher, NarrationEvent};
use narrator::infrastructure::memory::InMemoryHandleRegistry;
use narrator::infrastructure::worker::{NarrationWorker, NarrationWorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--print-config") {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    // 初始化日志
    let log_filter = format!("{},narrator={}", config.log.level, config.log.level);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));
    if config.log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let text = args.join(" ");
    if text.trim().is_empty() {
        anyhow::bail!("usage: narrator <text...> | narrator --print-config");
    }

    print_config(&config);

    // 创建 TTS 引擎
    let tts_engine: Arc<dyn TtsEnginePort> = match &config.tts.fake_audio_file {
        Some(path) => Arc::new(FakeTtsClient::new(FakeTtsClientConfig {
            audio_file_path: Some(path.clone()),
            latency_ms: 200,
        })?),
        None => {
            let tts_config = HttpTtsClientConfig {
                base_url: config.tts.url.clone(),
                endpoint: config.tts.endpoint.clone(),
                timeout_secs: config.tts.timeout_secs,
                max_retries: config.tts.max_retries,
            };
            let client = HttpTtsClient::new(tts_config)?;
            if !client.health_check().await {
                tracing::warn!(url = %config.tts.url, "TTS service health check failed");
            }
            Arc::new(client)
        }
    };

    let handles = Arc::new(InMemoryHandleRegistry::new());
    let audio_output = Arc::new(ClockedAudioOutput::new(
        handles.clone(),
        ClockedOutputConfig {
            default_duration_ms: config.playback.default_duration_ms,
            deny_playback: false,
        },
    ));
    let event_publisher = Arc::new(EventPublisher::new());

    let worker_config = NarrationWorkerConfig {
        autoplay: config.playback.autoplay,
        exclusive: config.playback.exclusive,
        queue_capacity: config.playback.queue_capacity,
        sweep_interval_secs: if config.gc.enabled {
            config.gc.interval_secs
        } else {
            0
        },
        session_idle_secs: config.gc.session_idle_secs,
    };
    let (worker, client) = NarrationWorker::new(
        worker_config,
        tts_engine,
        audio_output,
        handles.clone(),
        event_publisher.clone(),
    );
    let worker_task = tokio::spawn(worker.run());

    let request = NarrationRequest::new(text, config.synthesis.clone());
    let item = ItemId::for_request(&request);
    let mut events = event_publisher.subscribe(&item);

    client.play(item.clone(), request.clone()).await?;

    // 播放结束、失败或 Ctrl-C 时退出
    let autoplay = config.playback.autoplay;
    let mut was_playing = false;
    loop {
        tokio::select! {
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(error = %e, "Event stream interrupted");
                        break;
                    }
                };
                println!("{}", serde_json::to_string(&event)?);

                match &event {
                    // 未开启自动播放时，合成完成后再点一次播放
                    NarrationEvent::StateChanged { from, to, .. }
                        if !autoplay && from == "requesting" && to == "ready" =>
                    {
                        client.play(item.clone(), request.clone()).await?;
                    }
                    NarrationEvent::StateChanged { to, .. } if to == "playing" => was_playing = true,
                    NarrationEvent::StateChanged { from, to, .. }
                        if was_playing && from == "playing" && to == "ready" => break,
                    NarrationEvent::Unavailable { .. } => break,
                    _ => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
                break;
            }
        }
    }

    client.shutdown().await?;
    worker_task.await?;
    tracing::info!(live_handles = handles.live_count(), "Narrator finished");

    Ok(())
}
