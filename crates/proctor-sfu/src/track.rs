use serde::{Deserialize, Serialize};
use str0m::media::Mid;

/// What a forwarded track carries. Mirrors the wire-level `trackInfo.label`
/// values exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackLabel {
    Camera,
    Screen,
    Audio,
}

/// A `trackInfo` entry as sent alongside an `offer`/`answer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackInfo {
    #[serde(rename = "trackId")]
    pub track_id: String,
    pub label: TrackLabel,
}

/// A track published by a candidate, as tracked by the SFU once its media
/// section has actually negotiated (`on_track`/`MediaAdded`).
#[derive(Debug, Clone)]
pub struct PublishedTrack {
    pub track_id: String,
    pub label: TrackLabel,
    pub mid: Mid,
}

/// Assigns a label to a track that arrived without one in `trackInfo`,
/// per §4.5: "first video seen → camera, second → screen, audio by kind".
#[derive(Debug, Default)]
pub struct LabelFallback {
    video_seen: u32,
}

impl LabelFallback {
    pub fn assign(&mut self, kind: str0m::media::MediaKind) -> TrackLabel {
        use str0m::media::MediaKind;
        match kind {
            MediaKind::Audio => TrackLabel::Audio,
            MediaKind::Video => {
                self.video_seen += 1;
                if self.video_seen == 1 {
                    TrackLabel::Camera
                } else {
                    TrackLabel::Screen
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use str0m::media::MediaKind;

    #[test]
    fn first_video_is_camera_second_is_screen() {
        let mut fallback = LabelFallback::default();
        assert_eq!(fallback.assign(MediaKind::Video), TrackLabel::Camera);
        assert_eq!(fallback.assign(MediaKind::Video), TrackLabel::Screen);
    }

    #[test]
    fn audio_is_always_audio() {
        let mut fallback = LabelFallback::default();
        assert_eq!(fallback.assign(MediaKind::Audio), TrackLabel::Audio);
        assert_eq!(fallback.assign(MediaKind::Audio), TrackLabel::Audio);
    }

    #[test]
    fn third_video_stays_screen() {
        let mut fallback = LabelFallback::default();
        fallback.assign(MediaKind::Video);
        fallback.assign(MediaKind::Video);
        assert_eq!(fallback.assign(MediaKind::Video), TrackLabel::Screen);
    }
}
