//! Reshapes the backend's raw format list into the lists the frontend shows.

use super::types::{
    AudioFormatSummary, BestAudioSummary, ExtractedFormats, FormatDescriptor, VideoFormatSummary,
};
use crate::utils::format_size;
use std::cmp::Ordering;

pub fn extract_formats(formats: &[FormatDescriptor]) -> ExtractedFormats {
    let mut video = Vec::new();
    let mut audio: Vec<AudioFormatSummary> = Vec::new();
    let mut best_audio: Option<AudioFormatSummary> = None;

    for format in formats {
        let (Some(id), Some(url)) = (non_empty(&format.format_id), non_empty(&format.url)) else {
            continue;
        };
        if format.is_live.unwrap_or(false) {
            continue;
        }

        let filesize = format.size_bytes();
        let size = format_size(filesize);

        if format.has_video() && carries_dimensions(format) {
            let quality = format
                .format_note
                .clone()
                .or_else(|| format.resolution.clone())
                .unwrap_or_else(|| "Unknown Video".to_string());

            video.push(VideoFormatSummary {
                quality,
                resolution: format.resolution.clone(),
                size,
                id: id.to_string(),
                vcodec: format.vcodec.clone(),
                acodec: format.acodec.clone(),
                ext: format.ext.clone().unwrap_or_else(|| "mp4".to_string()),
                url: url.to_string(),
                height: format.height.map(|h| h.max(0.0) as u32).unwrap_or(0),
                fps: format.fps,
                protocol: format.protocol.clone(),
                filesize,
            });
        } else if format.has_audio() && !format.has_video() {
            let summary = AudioFormatSummary {
                quality: audio_quality_label(format),
                abr: format.abr,
                size,
                filesize,
                id: id.to_string(),
                acodec: format.acodec.clone(),
                ext: format.ext.clone().unwrap_or_else(|| "m4a".to_string()),
                url: url.to_string(),
                protocol: format.protocol.clone(),
            };

            let replaces_best = match (summary.abr, &best_audio) {
                (Some(abr), Some(best)) => abr > best.abr.unwrap_or(-1.0),
                (Some(_), None) | (None, None) => true,
                (None, Some(_)) => false,
            };
            if replaces_best {
                best_audio = Some(summary.clone());
            }

            audio.push(summary);
        }
    }

    video.sort_by(|a, b| {
        b.height
            .cmp(&a.height)
            .then_with(|| desc(a.fps.unwrap_or(0.0), b.fps.unwrap_or(0.0)))
    });
    audio.sort_by(|a, b| desc(a.abr.unwrap_or(-1.0), b.abr.unwrap_or(-1.0)));

    ExtractedFormats {
        video,
        audio,
        best_audio: best_audio.map(|best| BestAudioSummary {
            quality: format!("Audio Only ({})", best.quality),
            size: best.size,
            id: best.id,
            ext: best.ext,
        }),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn carries_dimensions(format: &FormatDescriptor) -> bool {
    non_empty(&format.resolution).is_some() || format.height.is_some_and(|h| h != 0.0)
}

fn audio_quality_label(format: &FormatDescriptor) -> String {
    if let Some(note) = non_empty(&format.format_note) {
        return note.to_string();
    }
    match format.abr {
        Some(abr) => format!("~{:.0}kbps", abr),
        None => format!("Audio ({})", format.acodec.as_deref().unwrap_or("?")),
    }
}

fn desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}
