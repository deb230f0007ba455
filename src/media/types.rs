use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Codec value yt-dlp uses to mark an absent stream.
pub const NO_CODEC: &str = "none";

/// Top-level info document returned by the backend for one URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub thumbnails: Vec<Thumbnail>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub is_live: Option<bool>,
    /// Kept raw so that one unreadable record does not reject the document.
    #[serde(default, deserialize_with = "lenient_vec")]
    pub formats: Vec<Value>,
}

impl MediaInfo {
    /// Parses every raw format record, skipping the ones that cannot be read.
    pub fn format_descriptors(&self) -> Vec<FormatDescriptor> {
        self.formats
            .iter()
            .filter_map(|raw| serde_json::from_value(raw.clone()).ok())
            .collect()
    }

    pub fn find_format(&self, format_id: &str) -> Option<FormatDescriptor> {
        self.format_descriptors()
            .into_iter()
            .find(|f| f.format_id.as_deref() == Some(format_id))
    }

    /// The last thumbnail entry is the largest one yt-dlp knows about.
    pub fn best_thumbnail(&self) -> String {
        self.thumbnails
            .iter()
            .rev()
            .find_map(|t| t.url.clone())
            .or_else(|| self.thumbnail.clone())
            .unwrap_or_default()
    }

    pub fn is_live(&self) -> bool {
        self.is_live.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnail {
    #[serde(default)]
    pub url: Option<String>,
}

/// One encoding variant of a media item as reported by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormatDescriptor {
    #[serde(default, deserialize_with = "lenient_string")]
    pub format_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub abr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub resolution: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fps: Option<f64>,
    #[serde(default)]
    pub format_note: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub filesize: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub filesize_approx: Option<u64>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub is_live: Option<bool>,
}

impl FormatDescriptor {
    pub fn has_video(&self) -> bool {
        self.vcodec.as_deref() != Some(NO_CODEC)
    }

    pub fn has_audio(&self) -> bool {
        self.acodec.as_deref() != Some(NO_CODEC)
    }

    pub fn is_video_only(&self) -> bool {
        self.has_video() && !self.has_audio()
    }

    /// Exact size when known and non-zero, otherwise the estimate.
    pub fn size_bytes(&self) -> Option<u64> {
        self.filesize
            .filter(|&size| size > 0)
            .or(self.filesize_approx.filter(|&size| size > 0))
    }
}

/// UI projection of a format that carries a video stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoFormatSummary {
    pub quality: String,
    pub resolution: Option<String>,
    pub size: String,
    pub id: String,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub ext: String,
    pub url: String,
    pub height: u32,
    pub fps: Option<f64>,
    pub protocol: Option<String>,
    pub filesize: Option<u64>,
}

/// UI projection of an audio-only format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioFormatSummary {
    pub quality: String,
    pub abr: Option<f64>,
    pub size: String,
    pub filesize: Option<u64>,
    pub id: String,
    pub acodec: Option<String>,
    pub ext: String,
    pub url: String,
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestAudioSummary {
    pub quality: String,
    pub size: String,
    pub id: String,
    pub ext: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFormats {
    pub video: Vec<VideoFormatSummary>,
    pub audio: Vec<AudioFormatSummary>,
    pub best_audio: Option<BestAudioSummary>,
}

impl ExtractedFormats {
    pub fn is_empty(&self) -> bool {
        self.video.is_empty() && self.audio.is_empty()
    }
}

fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value))
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value)
        .filter(|n| *n >= 0.0)
        .map(|n| n as u64))
}

/// A list that may be `null` or hold unreadable entries; both are dropped.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
