//! Audio Adapter - 音频输出实现

mod clocked_element;

pub use clocked_element::{
    estimate_duration, ClockedAudioElement, ClockedAudioOutput, ClockedOutputConfig,
};
