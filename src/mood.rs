//! Mood presets and the audio-feature targets behind them.
//!
//! A mood is a fixed set of optional feature targets. The primary
//! recommendation path sends them upstream as `target_<feature>` parameters;
//! the fallback path turns them into plain search terms with
//! [`derive_mood_terms`].

use std::{fmt, str::FromStr};

/// Target values for the recommendation endpoint. Every feature is in
/// `0.0..=1.0` except `tempo`, which is in BPM.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoodFeatures {
    pub energy: Option<f64>,
    pub valence: Option<f64>,
    pub tempo: Option<f64>,
    pub danceability: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub acousticness: Option<f64>,
    pub speechiness: Option<f64>,
}

impl MoodFeatures {
    pub fn is_empty(&self) -> bool {
        self.query_params().is_empty()
    }

    /// `target_<feature>` query parameters for every feature that is set.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        [
            ("target_energy", self.energy),
            ("target_valence", self.valence),
            ("target_tempo", self.tempo),
            ("target_danceability", self.danceability),
            ("target_instrumentalness", self.instrumentalness),
            ("target_acousticness", self.acousticness),
            ("target_speechiness", self.speechiness),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v.to_string())))
        .collect()
    }
}

/// Maps feature targets to descriptive search terms.
///
/// Each feature contributes at most one term; unset features and features
/// without a threshold (speechiness) contribute nothing. The result keeps
/// table order and holds no duplicates.
pub fn derive_mood_terms(features: &MoodFeatures) -> Vec<&'static str> {
    let mut terms: Vec<&'static str> = Vec::new();
    let mut push = |term: &'static str| {
        if !terms.contains(&term) {
            terms.push(term);
        }
    };

    if let Some(energy) = features.energy {
        if energy >= 0.8 {
            push("energetic");
        } else if energy > 0.0 && energy <= 0.3 {
            push("calm");
        }
    }

    if let Some(valence) = features.valence {
        if valence >= 0.75 {
            push("upbeat");
        } else if valence > 0.0 && valence <= 0.3 {
            push("melancholy");
        }
    }

    if let Some(tempo) = features.tempo {
        if tempo >= 135.0 {
            push("workout");
        } else if tempo > 0.0 && tempo <= 85.0 {
            push("ambient");
        }
    }

    if features.danceability.is_some_and(|d| d >= 0.75) {
        push("dance");
    }

    if features.instrumentalness.is_some_and(|i| i >= 0.6) {
        push("instrumental");
    }

    if features.acousticness.is_some_and(|a| a >= 0.6) {
        push("acoustic");
    }

    terms
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mood {
    Chill,
    #[default]
    Flow,
    Hype,
    Focus,
    Party,
    Upbeat,
    Melancholy,
    Ambient,
    Workout,
    Sleep,
}

impl Mood {
    pub const ALL: [Mood; 10] = [
        Mood::Chill,
        Mood::Flow,
        Mood::Hype,
        Mood::Focus,
        Mood::Party,
        Mood::Upbeat,
        Mood::Melancholy,
        Mood::Ambient,
        Mood::Workout,
        Mood::Sleep,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Mood::Chill => "chill",
            Mood::Flow => "flow",
            Mood::Hype => "hype",
            Mood::Focus => "focus",
            Mood::Party => "party",
            Mood::Upbeat => "upbeat",
            Mood::Melancholy => "melancholy",
            Mood::Ambient => "ambient",
            Mood::Workout => "workout",
            Mood::Sleep => "sleep",
        }
    }

    pub fn features(&self) -> MoodFeatures {
        match self {
            Mood::Chill => MoodFeatures {
                energy: Some(0.3),
                valence: Some(0.5),
                tempo: Some(90.0),
                danceability: Some(0.5),
                acousticness: Some(0.6),
                ..Default::default()
            },
            Mood::Flow => MoodFeatures {
                energy: Some(0.6),
                valence: Some(0.6),
                tempo: Some(120.0),
                danceability: Some(0.6),
                instrumentalness: Some(0.2),
                ..Default::default()
            },
            Mood::Hype => MoodFeatures {
                energy: Some(0.9),
                valence: Some(0.8),
                tempo: Some(140.0),
                danceability: Some(0.85),
                ..Default::default()
            },
            Mood::Focus => MoodFeatures {
                energy: Some(0.45),
                valence: Some(0.4),
                tempo: Some(105.0),
                instrumentalness: Some(0.7),
                speechiness: Some(0.08),
                ..Default::default()
            },
            Mood::Party => MoodFeatures {
                energy: Some(0.92),
                valence: Some(0.85),
                tempo: Some(128.0),
                danceability: Some(0.9),
                ..Default::default()
            },
            Mood::Upbeat => MoodFeatures {
                energy: Some(0.78),
                valence: Some(0.82),
                tempo: Some(124.0),
                danceability: Some(0.78),
                ..Default::default()
            },
            Mood::Melancholy => MoodFeatures {
                energy: Some(0.4),
                valence: Some(0.2),
                tempo: Some(95.0),
                acousticness: Some(0.45),
                ..Default::default()
            },
            Mood::Ambient => MoodFeatures {
                energy: Some(0.2),
                valence: Some(0.4),
                tempo: Some(78.0),
                acousticness: Some(0.7),
                instrumentalness: Some(0.85),
                ..Default::default()
            },
            Mood::Workout => MoodFeatures {
                energy: Some(0.95),
                valence: Some(0.7),
                tempo: Some(150.0),
                danceability: Some(0.82),
                ..Default::default()
            },
            Mood::Sleep => MoodFeatures {
                energy: Some(0.12),
                valence: Some(0.28),
                tempo: Some(65.0),
                acousticness: Some(0.82),
                instrumentalness: Some(0.9),
                ..Default::default()
            },
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Mood::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| format!("unknown mood '{}'", s))
    }
}
