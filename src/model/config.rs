use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PairingError;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionType {
    #[default]
    Individual,
    Team,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoringBasis {
    #[default]
    Net,
    Gross,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TeeOffMethod {
    #[default]
    Timed,
    Shotgun,
}

impl fmt::Display for TeeOffMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TeeOffMethod::Timed => "timed",
            TeeOffMethod::Shotgun => "shotgun",
        };
        write!(f, "{s}")
    }
}

/// Course and tee-set context handed to the rating service with every call.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TeeSetContext {
    pub course_id: String,
    pub tee_set_id: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default = "default_slope")]
    pub slope: f32,
    #[serde(default = "default_course_rating")]
    pub course_rating: f32,
    #[serde(default = "default_par")]
    pub par: i32,
    #[serde(default = "default_allowance")]
    pub allowance_pct: f32,
}

fn default_slope() -> f32 {
    113.0
}

fn default_course_rating() -> f32 {
    72.0
}

fn default_par() -> i32 {
    72
}

fn default_allowance() -> f32 {
    100.0
}

impl Default for TeeSetContext {
    fn default() -> Self {
        Self {
            course_id: String::new(),
            tee_set_id: String::new(),
            gender: None,
            slope: default_slope(),
            course_rating: default_course_rating(),
            par: default_par(),
            allowance_pct: default_allowance(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GameConfig {
    pub game_id: String,
    #[serde(default)]
    pub competition: CompetitionType,
    #[serde(default)]
    pub scoring: ScoringBasis,
    #[serde(default)]
    pub tee_off: TeeOffMethod,
    #[serde(default = "default_holes")]
    pub holes: Vec<String>,
    #[serde(default = "default_suffix_alphabet")]
    pub suffix_alphabet: Vec<String>,
    #[serde(default)]
    pub tee_times: Vec<String>,
    #[serde(default)]
    pub max_groups: Option<usize>,
    #[serde(default)]
    pub tee_set: TeeSetContext,
}

fn default_holes() -> Vec<String> {
    vec!["1".to_string()]
}

fn default_suffix_alphabet() -> Vec<String> {
    ["A", "B", "C", "D"].iter().map(|s| (*s).to_string()).collect()
}

impl GameConfig {
    #[must_use]
    pub fn new(game_id: impl Into<String>, competition: CompetitionType) -> Self {
        Self {
            game_id: game_id.into(),
            competition,
            scoring: ScoringBasis::Net,
            tee_off: TeeOffMethod::Timed,
            holes: default_holes(),
            suffix_alphabet: default_suffix_alphabet(),
            tee_times: Vec::new(),
            max_groups: None,
            tee_set: TeeSetContext::default(),
        }
    }

    #[must_use]
    pub fn is_team(&self) -> bool {
        self.competition == CompetitionType::Team
    }

    #[must_use]
    pub fn is_shotgun(&self) -> bool {
        self.tee_off == TeeOffMethod::Shotgun
    }

    /// Team formats are strictly 1v1 pairs.
    #[must_use]
    pub fn max_pairing_size(&self) -> usize {
        match self.competition {
            CompetitionType::Individual => 4,
            CompetitionType::Team => 2,
        }
    }

    #[must_use]
    pub fn default_suffix(&self) -> Option<&str> {
        self.suffix_alphabet.first().map(String::as_str)
    }

    /// Number of groups the tee sheet can hold.
    #[must_use]
    pub fn tee_time_capacity(&self) -> usize {
        if let Some(max) = self.max_groups {
            return max;
        }
        let times = self.tee_times.len().max(1);
        let holes = self.holes.len().max(1);
        match self.tee_off {
            TeeOffMethod::Timed => times * holes,
            TeeOffMethod::Shotgun => times * holes * self.suffix_alphabet.len().max(1),
        }
    }

    /// # Errors
    ///
    /// Will return `Err` if a tee time is not `HH:MM`, or if the hole list or
    /// suffix alphabet is empty or has repeats.
    pub fn validate(&self) -> Result<(), PairingError> {
        if self.game_id.trim().is_empty() {
            return Err(PairingError::Config("game_id must not be empty".into()));
        }
        for tee_time in &self.tee_times {
            NaiveTime::parse_from_str(tee_time, "%H:%M").map_err(|e| {
                PairingError::Config(format!(
                    "game {}: tee time '{tee_time}' is not HH:MM ({e})",
                    self.game_id
                ))
            })?;
        }
        check_labels(&self.game_id, "holes", &self.holes)?;
        check_labels(&self.game_id, "suffix_alphabet", &self.suffix_alphabet)?;
        Ok(())
    }
}

fn check_labels(game_id: &str, what: &str, labels: &[String]) -> Result<(), PairingError> {
    if labels.is_empty() {
        return Err(PairingError::Config(format!(
            "game {game_id}: {what} must not be empty"
        )));
    }
    for (i, label) in labels.iter().enumerate() {
        if label.trim().is_empty() || labels[..i].contains(label) {
            return Err(PairingError::Config(format!(
                "game {game_id}: {what} has a blank or repeated entry '{label}'"
            )));
        }
    }
    Ok(())
}
