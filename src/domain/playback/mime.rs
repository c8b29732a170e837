//! 音频 MIME 嗅探
//!
//! 按文件头魔数判断音频类型，无法识别时回退为 `audio/mpeg`

use serde::{Deserialize, Serialize};

/// 支持的音频 MIME 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioMime {
    #[serde(rename = "audio/wav")]
    Wav,
    #[serde(rename = "audio/ogg")]
    Ogg,
    #[serde(rename = "audio/flac")]
    Flac,
    #[serde(rename = "audio/mpeg")]
    Mpeg,
}

impl AudioMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioMime::Wav => "audio/wav",
            AudioMime::Ogg => "audio/ogg",
            AudioMime::Flac => "audio/flac",
            AudioMime::Mpeg => "audio/mpeg",
        }
    }
}

impl std::fmt::Display for AudioMime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 根据前导字节检测音频类型
///
/// 规则按顺序匹配，先命中者生效：
/// 1. `RIFF....WAVE` -> audio/wav
/// 2. `OggS` -> audio/ogg
/// 3. `fLaC` -> audio/flac
/// 4. `ID3` -> audio/mpeg
/// 5. MPEG 帧同步 (0xFF, 0xE0 掩码) -> audio/mpeg
/// 6. 其他 -> audio/mpeg
pub fn detect_mime(data: &[u8]) -> AudioMime {
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE" {
        return AudioMime::Wav;
    }
    if data.starts_with(b"OggS") {
        return AudioMime::Ogg;
    }
    if data.starts_with(b"fLaC") {
        return AudioMime::Flac;
    }
    if data.starts_with(b"ID3") {
        return AudioMime::Mpeg;
    }
    if data.len() >= 2 && data[0] == 0xFF && (data[1] & 0xE0) == 0xE0 {
        return AudioMime::Mpeg;
    }
    AudioMime::Mpeg
}
