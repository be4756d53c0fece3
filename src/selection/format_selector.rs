// FormatSelector - ranking of playable renditions
//
// Converts the two raw format lists of a video into UI-friendly options.
// Handles:
// - Combined (audio+video) streams preferred over adaptive ones per resolution
// - Highest-bitrate adaptive video per quality label
// - Audio source choice for video-only streams (original-language first)
// - "Closest to preferred resolution" lookup with combined tie-break

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::invidious::models::{AdaptiveFormat, CombinedFormat};

/// Combined itags tried first as audio source: 720p then 360p
const PREFERRED_COMBINED_ITAGS: [&str; 2] = ["22", "18"];

/// Adaptive audio itags that carry the original track: m4a then opus
const PREFERRED_AUDIO_ITAGS: [&str; 4] = ["140", "251", "250", "249"];

/// Appended to labels of combined streams
const COMBINED_MARKER: &str = "✓";

lazy_static! {
    static ref RESOLUTION_RE: Regex = Regex::new(r"(\d+)p").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Nothing playable could be derived from the formats
    #[error("No playable stream available")]
    Empty,

    /// Adaptive video chosen, no audio for it and no combined substitute
    #[error("No audio source for {resolution}p and no combined stream to fall back to")]
    MissingAudioSource { resolution: u32 },

    #[error("Quality index {0} is out of range")]
    InvalidIndex(usize),
}

/// Quality option for playback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityOption {
    /// Display label (e.g., "720p ✓" for combined, "1080p60" for adaptive)
    pub label: String,

    /// Video-bearing URL (combined or video-only)
    pub video_url: String,

    /// Separate audio URL for adaptive options
    pub audio_url: Option<String>,

    /// Vertical resolution in pixels (e.g., 1080)
    pub resolution_px: u32,

    /// Whether audio comes from a second resource
    pub has_separate_audio: bool,

    /// Source itag
    pub source_format_id: String,

    /// MIME type of the video resource (e.g., "video/mp4; codecs=...")
    pub mime_type: String,
}

impl std::fmt::Display for QualityOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label)
    }
}

/// Format selector with combined-first ranking
pub struct FormatSelector;

impl FormatSelector {
    /// Build the ranked option list, highest resolution first
    pub fn build_quality_list(
        combined: &[CombinedFormat],
        adaptive: &[AdaptiveFormat],
    ) -> Vec<QualityOption> {
        let mut options: Vec<QualityOption> = Vec::new();
        let best_audio_url = Self::best_audio_url(combined, adaptive);

        // 1. Combined streams - no sync needed
        for stream in combined {
            let resolution = parse_resolution(Some(&stream.quality_label));
            if resolution == 0 || stream.url.is_empty() {
                continue;
            }
            if options.iter().any(|o| o.resolution_px == resolution) {
                continue;
            }

            options.push(QualityOption {
                label: format!("{} {}", stream.quality_label, COMBINED_MARKER),
                video_url: stream.url.clone(),
                audio_url: None,
                resolution_px: resolution,
                has_separate_audio: false,
                source_format_id: stream.itag.clone(),
                mime_type: stream.mime_type.clone(),
            });
        }

        // 2. Adaptive video for every resolution not covered above
        for stream in Self::best_video_per_label(adaptive) {
            let label = stream.quality_label.as_deref();
            let resolution = parse_resolution(label);
            if resolution == 0 || options.iter().any(|o| o.resolution_px == resolution) {
                continue;
            }

            options.push(QualityOption {
                label: label
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}p", resolution)),
                video_url: stream.url.clone(),
                audio_url: best_audio_url.clone(),
                resolution_px: resolution,
                has_separate_audio: true,
                source_format_id: stream.itag.clone(),
                mime_type: stream.mime_type.clone(),
            });
        }

        // Stable: ties keep combined-first insertion order
        options.sort_by(|a, b| b.resolution_px.cmp(&a.resolution_px));

        debug!(
            "Available qualities: {}",
            options
                .iter()
                .map(|o| o.label.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        options
    }

    /// Highest-bitrate video-only entry per quality label, in first-seen order
    fn best_video_per_label(adaptive: &[AdaptiveFormat]) -> Vec<&AdaptiveFormat> {
        let mut groups: Vec<&AdaptiveFormat> = Vec::new();

        for format in adaptive.iter().filter(|f| f.is_video() && !f.url.is_empty()) {
            match groups
                .iter_mut()
                .find(|g| g.quality_label == format.quality_label)
            {
                Some(best) if format.bitrate > best.bitrate => *best = format,
                Some(_) => {}
                None => groups.push(format),
            }
        }

        groups
    }

    /// Audio source for video-only options.
    ///
    /// Combined streams always carry the original-language track, whereas
    /// adaptive audio may be a dub, so a combined URL wins whenever one exists.
    pub fn best_audio_url(
        combined: &[CombinedFormat],
        adaptive: &[AdaptiveFormat],
    ) -> Option<String> {
        let usable: Vec<&CombinedFormat> = combined.iter().filter(|f| !f.url.is_empty()).collect();
        if let Some(source) = pick_preferred(&usable, &PREFERRED_COMBINED_ITAGS, |f| &f.itag) {
            debug!(itag = %source.itag, "Using combined stream as audio source");
            return Some(source.url.clone());
        }

        let mut audio: Vec<&AdaptiveFormat> = adaptive
            .iter()
            .filter(|f| f.is_audio() && !f.url.is_empty())
            .collect();
        audio.sort_by(|a, b| b.bitrate.cmp(&a.bitrate));

        if let Some(source) = pick_preferred(&audio, &PREFERRED_AUDIO_ITAGS, |f| &f.itag) {
            debug!(itag = %source.itag, bitrate = source.bitrate, "Using adaptive audio");
            return Some(source.url.clone());
        }

        None
    }

    /// Default stream for a video: combined if possible, else best adaptive,
    /// else the server's own proxy endpoint
    pub fn best_stream_url(
        combined: &[CombinedFormat],
        adaptive: &[AdaptiveFormat],
        base_url: &str,
        video_id: &str,
    ) -> String {
        let usable: Vec<&CombinedFormat> = combined.iter().filter(|f| !f.url.is_empty()).collect();
        if let Some(best) = pick_preferred(&usable, &PREFERRED_COMBINED_ITAGS, |f| &f.itag) {
            return best.url.clone();
        }

        let best_adaptive = adaptive
            .iter()
            .filter(|f| f.is_video() && !f.url.is_empty())
            .max_by(|a, b| {
                parse_resolution(a.quality_label.as_deref())
                    .cmp(&parse_resolution(b.quality_label.as_deref()))
                    .then(a.bitrate.cmp(&b.bitrate))
                    // max_by keeps the last maximum; reverse so the first wins
                    .then(std::cmp::Ordering::Greater)
            });
        if let Some(best) = best_adaptive {
            debug!(itag = %best.itag, "Using adaptive stream - requires audio sync");
            return best.url.clone();
        }

        format!("{}/latest_version?id={}&itag=22", base_url, video_id)
    }

    /// Index of the option closest to `preferred_px`.
    ///
    /// Ties go to a combined option; among equals of the same kind the
    /// earliest wins. `None` only for an empty list.
    pub fn select_closest(options: &[QualityOption], preferred_px: u32) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;

        for (idx, option) in options.iter().enumerate() {
            let diff = option.resolution_px.abs_diff(preferred_px);
            best = match best {
                None => Some((idx, diff)),
                Some((best_idx, best_diff)) => {
                    let better = diff < best_diff
                        || (diff == best_diff
                            && !option.has_separate_audio
                            && options[best_idx].has_separate_audio);
                    if better {
                        Some((idx, diff))
                    } else {
                        Some((best_idx, best_diff))
                    }
                }
            };
        }

        best.map(|(idx, _)| idx)
    }

    /// Turn a chosen index into something safe to play.
    ///
    /// A video-only option without an audio source is never played silently:
    /// it is replaced by a combined option at the same resolution, or else
    /// the first combined option at any resolution.
    pub fn resolve_playable(
        options: &[QualityOption],
        index: usize,
    ) -> Result<&QualityOption, SelectionError> {
        if options.is_empty() {
            return Err(SelectionError::Empty);
        }
        let chosen = options.get(index).ok_or(SelectionError::InvalidIndex(index))?;

        if !chosen.has_separate_audio || chosen.audio_url.is_some() {
            return Ok(chosen);
        }

        let fallback = options
            .iter()
            .find(|o| !o.has_separate_audio && o.resolution_px == chosen.resolution_px)
            .or_else(|| options.iter().find(|o| !o.has_separate_audio));

        match fallback {
            Some(option) => {
                debug!("Fallback to combined stream: {}", option.label);
                Ok(option)
            }
            None => Err(SelectionError::MissingAudioSource {
                resolution: chosen.resolution_px,
            }),
        }
    }

    /// Closest option to `preferred_px`, resolved for playback
    pub fn select_for_playback(
        options: &[QualityOption],
        preferred_px: u32,
    ) -> Result<&QualityOption, SelectionError> {
        let index = Self::select_closest(options, preferred_px).ok_or(SelectionError::Empty)?;
        Self::resolve_playable(options, index)
    }
}

/// Vertical resolution from labels like "1080p60", "720p", "hd 480p".
/// Returns 0 when the label has no `<digits>p`.
pub fn parse_resolution(label: Option<&str>) -> u32 {
    label
        .and_then(|l| RESOLUTION_RE.captures(l))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// First item matching the itag preference order, else the first item
fn pick_preferred<'a, T>(
    items: &[&'a T],
    preferred: &[&str],
    itag: impl Fn(&T) -> &String,
) -> Option<&'a T> {
    preferred
        .iter()
        .find_map(|want| items.iter().find(|f| itag(f) == want))
        .or_else(|| items.first())
        .copied()
}
