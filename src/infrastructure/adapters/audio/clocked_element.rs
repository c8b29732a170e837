//! Clocked Audio Element - 按时钟模拟播放的音频元素
//!
//! 不输出声音，按音频时长计时并回送 started/ended 通知。
//! WAV 时长从文件头计算，其他格式使用配置的默认时长。

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::application::ports::{
    AudioElementPort, AudioOutputPort, ElementError, PlaybackNotifier, ResourceHandlePort,
};
use crate::domain::playback::{AudioMime, ElementNotification, PlaybackRun, ResourceHandle};

/// 模拟输出配置
#[derive(Debug, Clone)]
pub struct ClockedOutputConfig {
    /// 无法从音频头推算时长时使用的时长（毫秒）
    pub default_duration_ms: u64,
    /// 模拟浏览器自动播放策略，拒绝所有 play()
    pub deny_playback: bool,
}

impl Default for ClockedOutputConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: 3000,
            deny_playback: false,
        }
    }
}

/// 模拟音频输出
pub struct ClockedAudioOutput {
    handles: Arc<dyn ResourceHandlePort>,
    config: ClockedOutputConfig,
}

impl ClockedAudioOutput {
    pub fn new(handles: Arc<dyn ResourceHandlePort>, config: ClockedOutputConfig) -> Self {
        Self { handles, config }
    }
}

impl AudioOutputPort for ClockedAudioOutput {
    fn create_element(&self, notifier: PlaybackNotifier) -> Box<dyn AudioElementPort> {
        Box::new(ClockedAudioElement {
            notifier,
            handles: self.handles.clone(),
            config: self.config.clone(),
            source: None,
            duration: Duration::ZERO,
            position: Duration::ZERO,
            run: PlaybackRun::default(),
            clock: None,
        })
    }
}

/// 正在走的播放时钟
struct RunningClock {
    started_at: Instant,
    task: JoinHandle<()>,
}

pub struct ClockedAudioElement {
    notifier: PlaybackNotifier,
    handles: Arc<dyn ResourceHandlePort>,
    config: ClockedOutputConfig,
    source: Option<ResourceHandle>,
    duration: Duration,
    position: Duration,
    run: PlaybackRun,
    clock: Option<RunningClock>,
}

impl ClockedAudioElement {
    /// 停止时钟并累计播放位置
    fn stop_clock(&mut self) {
        if let Some(clock) = self.clock.take() {
            clock.task.abort();
            self.position = (self.position + clock.started_at.elapsed()).min(self.duration);
        }
    }
}

impl AudioElementPort for ClockedAudioElement {
    fn set_source(&mut self, handle: &ResourceHandle) {
        self.stop_clock();
        self.source = Some(handle.clone());
        self.duration = Duration::ZERO;
        self.position = Duration::ZERO;
    }

    fn load(&mut self) {
        let Some(source) = &self.source else {
            return;
        };
        let default = Duration::from_millis(self.config.default_duration_ms);
        self.duration = match self.handles.resolve(source) {
            Some(blob) => estimate_duration(&blob.payload, blob.mime).unwrap_or(default),
            None => default,
        };
        tracing::trace!(
            item = %self.notifier.item(),
            duration_ms = self.duration.as_millis() as u64,
            "Source loaded"
        );
    }

    fn play(&mut self) -> Result<PlaybackRun, ElementError> {
        let source = self.source.clone().ok_or(ElementError::NoSource)?;
        if self.handles.resolve(&source).is_none() {
            return Err(ElementError::SourceUnavailable(source.to_string()));
        }
        if self.clock.is_some() {
            self.stop_clock();
        }

        self.run = self.run.next();
        let run = self.run;
        let notifier = self.notifier.clone();
        let deny = self.config.deny_playback;
        let remaining = self.duration.saturating_sub(self.position);

        let task = tokio::spawn(async move {
            if deny {
                notifier
                    .notify(
                        &source,
                        run,
                        ElementNotification::Rejected("playback not allowed".to_string()),
                    )
                    .await;
                return;
            }
            notifier
                .notify(&source, run, ElementNotification::Started)
                .await;
            tokio::time::sleep(remaining).await;
            notifier.notify(&source, run, ElementNotification::Ended).await;
        });

        self.clock = Some(RunningClock {
            started_at: Instant::now(),
            task,
        });
        Ok(run)
    }

    fn pause(&mut self) {
        self.stop_clock();
    }

    fn reset_position(&mut self) {
        self.stop_clock();
        self.position = Duration::ZERO;
    }

    fn clear_source(&mut self) {
        self.stop_clock();
        self.source = None;
        self.duration = Duration::ZERO;
        self.position = Duration::ZERO;
    }
}

impl Drop for ClockedAudioElement {
    fn drop(&mut self) {
        if let Some(clock) = self.clock.take() {
            clock.task.abort();
        }
    }
}

/// 推算音频时长，目前只支持 WAV
pub fn estimate_duration(data: &[u8], mime: AudioMime) -> Option<Duration> {
    if mime != AudioMime::Wav || data.len() < 12 {
        return None;
    }

    let mut pos = 12;
    let mut byte_rate: Option<u32> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size =
            u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]])
                as usize;

        match chunk_id {
            b"fmt " if chunk_size >= 16 && pos + 20 <= data.len() => {
                byte_rate = Some(u32::from_le_bytes([
                    data[pos + 16],
                    data[pos + 17],
                    data[pos + 18],
                    data[pos + 19],
                ]));
            }
            b"data" => {
                let rate = byte_rate.filter(|r| *r > 0)?;
                // 流式 WAV 的 data 长度可能不准，以实际字节为上限
                let size = chunk_size.min(data.len() - (pos + 8)) as u64;
                return Some(Duration::from_millis(size * 1000 / rate as u64));
            }
            _ => {}
        }

        pos += 8 + chunk_size;
        // 对齐到偶数字节
        if chunk_size % 2 != 0 {
            pos += 1;
        }
    }
    None
}
