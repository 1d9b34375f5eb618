//! Synthetic analysis-frame generation, standing in for a real AI model.
//!
//! Each tick samples one [`Scenario`] from a fixed weighted distribution and
//! expands it into the sub-analyses a real pipeline would report for that
//! frame — most scenarios carry no alert at all; the handful that do map
//! onto an incident-taxonomy code and its default severity.

use proctor_common::IncidentCode;
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Normal,
    NoFace,
    FaceTurned,
    SearchEngine,
    VoiceDetected,
    MultipleFaces,
    ChatApp,
    FaceMismatch,
    MultipleSpeakers,
    LookingAway,
}

impl Scenario {
    /// `(scenario, weight)` pairs, in the exact proportions the reference
    /// mock analyzer used.
    const WEIGHTED: [(Scenario, f64); 10] = [
        (Scenario::Normal, 0.75),
        (Scenario::NoFace, 0.08),
        (Scenario::FaceTurned, 0.03),
        (Scenario::SearchEngine, 0.04),
        (Scenario::VoiceDetected, 0.03),
        (Scenario::MultipleFaces, 0.02),
        (Scenario::ChatApp, 0.02),
        (Scenario::FaceMismatch, 0.01),
        (Scenario::MultipleSpeakers, 0.01),
        (Scenario::LookingAway, 0.01),
    ];

    pub fn sample(rng: &mut impl Rng) -> Scenario {
        let total: f64 = Self::WEIGHTED.iter().map(|(_, w)| w).sum();
        let mut roll = rng.random_range(0.0..total);
        for (scenario, weight) in Self::WEIGHTED {
            if roll < weight {
                return scenario;
            }
            roll -= weight;
        }
        Scenario::Normal
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::Normal => "normal",
            Scenario::NoFace => "no_face",
            Scenario::FaceTurned => "face_turned",
            Scenario::SearchEngine => "search_engine",
            Scenario::VoiceDetected => "voice_detected",
            Scenario::MultipleFaces => "multiple_faces",
            Scenario::ChatApp => "chat_app",
            Scenario::FaceMismatch => "face_mismatch",
            Scenario::MultipleSpeakers => "multiple_speakers",
            Scenario::LookingAway => "looking_away",
        }
    }

    /// The incident code this scenario would surface, if any. `Normal`
    /// carries no alert at all, matching every sub-analysis in the
    /// reference generator having `alert: None`.
    fn incident_code(self) -> Option<IncidentCode> {
        match self {
            Scenario::Normal => None,
            Scenario::NoFace => Some(IncidentCode::A1),
            Scenario::MultipleFaces => Some(IncidentCode::A2),
            Scenario::SearchEngine => Some(IncidentCode::A5),
            Scenario::ChatApp => Some(IncidentCode::A7),
            Scenario::VoiceDetected | Scenario::MultipleSpeakers => Some(IncidentCode::A6),
            Scenario::FaceTurned => Some(IncidentCode::A8),
            Scenario::FaceMismatch => Some(IncidentCode::A10),
            Scenario::LookingAway => Some(IncidentCode::A11),
        }
    }

    fn alert(self, rng: &mut impl Rng) -> Option<Value> {
        let code = self.incident_code()?;
        let message = match self {
            Scenario::MultipleFaces => {
                format!("{} faces detected - {}", rng.random_range(2..=3), code.description())
            }
            _ => code.description().to_string(),
        };
        Some(json!({
            "type": code.as_str(),
            "level": code.default_level(),
            "message": message,
        }))
    }

    /// Build the `analyses` array for this scenario.
    pub fn analyses(self, rng: &mut impl Rng) -> Vec<SubAnalysis> {
        let alert = self.alert(rng);
        match self {
            Scenario::Normal => vec![
                SubAnalysis::new("face_detection", face_detection_normal(rng)),
                SubAnalysis::new("face_recognition", face_recognition_normal(rng)),
                SubAnalysis::new("screen_analysis", screen_analysis_clean(rng)),
                SubAnalysis::new("audio_analysis", audio_analysis_silent()),
                SubAnalysis::new("behavior_analysis", behavior_analysis_normal(rng)),
            ],
            Scenario::NoFace => vec![
                SubAnalysis::new(
                    "face_detection",
                    json!({
                        "faces_detected": 0,
                        "confidence": 0.0,
                        "bounding_boxes": [],
                        "status": "no_face",
                        "alert": alert,
                    }),
                ),
                SubAnalysis::new(
                    "behavior_analysis",
                    json!({
                        "gaze_direction": "unknown",
                        "looking_away_duration": rng.random_range(2.0..10.0),
                        "left_camera": true,
                        "movement_score": 0.0,
                        "status": "left_camera",
                        "alert": null,
                    }),
                ),
            ],
            Scenario::MultipleFaces => {
                let num_faces = rng.random_range(2..=3);
                vec![SubAnalysis::new(
                    "face_detection",
                    json!({
                        "faces_detected": num_faces,
                        "confidence": rng.random_range(0.75..0.92),
                        "bounding_boxes": (0..num_faces).map(|_| bounding_box(rng)).collect::<Vec<_>>(),
                        "status": "multiple_faces",
                        "alert": alert,
                    }),
                )]
            }
            Scenario::FaceMismatch => vec![SubAnalysis::new(
                "face_recognition",
                json!({
                    "is_verified": false,
                    "similarity_score": rng.random_range(0.25..0.48),
                    "kyc_image_id": kyc_id(rng),
                    "status": "mismatch",
                    "alert": alert,
                }),
            )],
            Scenario::FaceTurned => vec![SubAnalysis::new(
                "face_detection",
                json!({
                    "faces_detected": 1,
                    "confidence": rng.random_range(0.35..0.55),
                    "bounding_boxes": [bounding_box(rng)],
                    "status": "face_turned",
                    "alert": alert,
                }),
            )],
            Scenario::SearchEngine => vec![SubAnalysis::new(
                "screen_analysis",
                json!({
                    "ocr_text": pick(rng, &[
                        "Google Search: python tutorial",
                        "ChatGPT - how to solve...",
                        "Bing: javascript function",
                        "Stack Overflow: algorithm help",
                    ]),
                    "detected_apps": ["chrome", "edge"],
                    "suspicious_keywords": ["google", "search", "chatgpt"],
                    "suspicious_score": rng.random_range(0.8..0.95),
                    "status": "suspicious",
                    "alert": alert,
                }),
            )],
            Scenario::ChatApp => vec![SubAnalysis::new(
                "screen_analysis",
                json!({
                    "ocr_text": "Messenger: Hey, what's the answer?",
                    "detected_apps": [pick(rng, &["messenger", "zalo", "discord", "telegram"])],
                    "suspicious_keywords": ["messenger", "chat"],
                    "suspicious_score": rng.random_range(0.85..0.98),
                    "status": "violation",
                    "alert": alert,
                }),
            )],
            Scenario::VoiceDetected => vec![SubAnalysis::new(
                "audio_analysis",
                json!({
                    "voice_detected": true,
                    "speaking_duration": rng.random_range(1.5..5.0),
                    "num_speakers": 1,
                    "confidence": rng.random_range(0.85..0.95),
                    "status": "speaking",
                    "alert": alert,
                }),
            )],
            Scenario::MultipleSpeakers => vec![SubAnalysis::new(
                "audio_analysis",
                json!({
                    "voice_detected": true,
                    "speaking_duration": rng.random_range(3.0..8.0),
                    "num_speakers": rng.random_range(2..=3),
                    "confidence": rng.random_range(0.75..0.92),
                    "status": "multiple_speakers",
                    "alert": alert,
                }),
            )],
            Scenario::LookingAway => vec![SubAnalysis::new(
                "behavior_analysis",
                json!({
                    "gaze_direction": pick(rng, &["left", "right", "down", "up"]),
                    "looking_away_duration": rng.random_range(3.0..8.0),
                    "left_camera": false,
                    "movement_score": rng.random_range(0.4..0.7),
                    "status": "looking_away",
                    "alert": alert,
                }),
            )],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubAnalysis {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub result: Value,
}

impl SubAnalysis {
    fn new(kind: &'static str, result: Value) -> Self {
        Self { kind, result }
    }
}

fn bounding_box(rng: &mut impl Rng) -> Value {
    json!({
        "x": rng.random_range(50..150),
        "y": rng.random_range(50..150),
        "width": rng.random_range(100..220),
        "height": rng.random_range(120..260),
        "confidence": rng.random_range(0.75..0.98),
    })
}

fn kyc_id(rng: &mut impl Rng) -> String {
    format!("kyc_{}", rng.random_range(100_000..999_999))
}

fn pick<'a>(rng: &mut impl Rng, options: &[&'a str]) -> &'a str {
    options[rng.random_range(0..options.len())]
}

fn face_detection_normal(rng: &mut impl Rng) -> Value {
    json!({
        "faces_detected": 1,
        "confidence": rng.random_range(0.85..0.98),
        "bounding_boxes": [bounding_box(rng)],
        "status": "normal",
        "alert": null,
    })
}

fn face_recognition_normal(rng: &mut impl Rng) -> Value {
    json!({
        "is_verified": true,
        "similarity_score": rng.random_range(0.78..0.95),
        "kyc_image_id": kyc_id(rng),
        "status": "verified",
        "alert": null,
    })
}

fn screen_analysis_clean(rng: &mut impl Rng) -> Value {
    json!({
        "ocr_text": format!("Exam Question {}: What is...", rng.random_range(1..=50)),
        "detected_apps": ["exam_browser"],
        "suspicious_keywords": Vec::<String>::new(),
        "suspicious_score": 0.0,
        "status": "clean",
        "alert": null,
    })
}

fn audio_analysis_silent() -> Value {
    json!({
        "voice_detected": false,
        "speaking_duration": 0,
        "num_speakers": 0,
        "confidence": 1.0,
        "status": "silent",
        "alert": null,
    })
}

fn behavior_analysis_normal(rng: &mut impl Rng) -> Value {
    json!({
        "gaze_direction": "center",
        "looking_away_duration": 0,
        "left_camera": false,
        "movement_score": rng.random_range(0.1..0.3),
        "status": "normal",
        "alert": null,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_always_returns_a_scenario() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let _ = Scenario::sample(&mut rng);
        }
    }

    #[test]
    fn normal_scenario_has_no_incident_code() {
        assert_eq!(Scenario::Normal.incident_code(), None);
    }

    #[test]
    fn no_face_maps_to_a1() {
        assert_eq!(Scenario::NoFace.incident_code(), Some(IncidentCode::A1));
    }

    #[test]
    fn alert_level_matches_taxonomy_default() {
        let mut rng = rand::rng();
        let alert = Scenario::MultipleFaces.alert(&mut rng).unwrap();
        assert_eq!(alert["level"], serde_json::to_value(IncidentCode::A2.default_level()).unwrap());
    }
}
