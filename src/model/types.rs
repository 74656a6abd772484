use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Sentinel written to the store for players without a pairing.
pub const UNASSIGNED_PAIRING: &str = "000";

/// Largest id that fits the three-digit stored label.
pub const MAX_GROUP_ID: u32 = 999;

/// Ranking value for players with no handicap figure at all.
pub const RANK_SENTINEL: f32 = 999.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairingId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlightId(pub u32);

macro_rules! padded_id {
    ($name:ident) => {
        impl $name {
            /// Whether the id can be stored: `001` to `999`.
            #[must_use]
            pub fn in_range(self) -> bool {
                (1..=MAX_GROUP_ID).contains(&self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:03}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let n: u32 = s
                    .trim()
                    .parse()
                    .map_err(|_| format!("'{s}' is not a group id"))?;
                if n == 0 {
                    return Err(format!("'{s}' is the unassigned sentinel"));
                }
                if n > MAX_GROUP_ID {
                    return Err(format!("'{s}' is above {MAX_GROUP_ID}"));
                }
                Ok(Self(n))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

padded_id!(PairingId);
padded_id!(FlightId);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FlightSide {
    A,
    B,
}

impl fmt::Display for FlightSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlightSide::A => "A",
            FlightSide::B => "B",
        };
        write!(f, "{s}")
    }
}

impl FromStr for FlightSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(FlightSide::A),
            "B" | "b" => Ok(FlightSide::B),
            other => Err(format!("'{other}' is not a flight side")),
        }
    }
}

/// Tee time, starting hole and shotgun slot. A group-level fact copied onto
/// every member row.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    pub tee_time: Option<String>,
    pub start_hole: Option<String>,
    pub start_hole_suffix: Option<String>,
}

impl Schedule {
    #[must_use]
    pub fn new(tee_time: &str, start_hole: &str, suffix: Option<&str>) -> Self {
        Self {
            tee_time: Some(tee_time.to_string()),
            start_hole: Some(start_hole.to_string()),
            start_hole_suffix: suffix.map(str::to_string),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tee_time.is_none() && self.start_hole.is_none() && self.start_hole_suffix.is_none()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Player {
    pub ghin: String,
    pub name: String,
    pub handicap_index: Option<f32>,
    pub course_handicap: Option<i32>,
    pub playing_handicap: Option<i32>,
    pub shots_off: Option<i32>,
    pub pairing_id: Option<PairingId>,
    pub pairing_pos: Option<u32>,
    pub flight_id: Option<FlightId>,
    pub flight_pos: Option<FlightSide>,
    #[serde(flatten)]
    pub schedule: Schedule,
    pub score_key: Option<String>,
}

impl Player {
    #[must_use]
    pub fn new(
        ghin: impl Into<String>,
        name: impl Into<String>,
        handicap_index: Option<f32>,
    ) -> Self {
        Self {
            ghin: ghin.into(),
            name: name.into(),
            handicap_index,
            course_handicap: None,
            playing_handicap: None,
            shots_off: None,
            pairing_id: None,
            pairing_pos: None,
            flight_id: None,
            flight_pos: None,
            schedule: Schedule::default(),
            score_key: None,
        }
    }

    #[must_use]
    pub fn is_assigned(&self) -> bool {
        self.pairing_id.is_some()
    }

    /// Store form of the pairing id, `"000"` when unassigned.
    #[must_use]
    pub fn pairing_label(&self) -> String {
        self.pairing_id
            .map_or_else(|| UNASSIGNED_PAIRING.to_string(), |id| id.to_string())
    }

    /// Lower is stronger. Playing handicap first, then course handicap, then index.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ranking_proxy(&self) -> f32 {
        self.playing_handicap
            .map(|v| v as f32)
            .or(self.course_handicap.map(|v| v as f32))
            .or(self.handicap_index)
            .unwrap_or(RANK_SENTINEL)
    }

    pub(crate) fn clear_grouping(&mut self) {
        self.pairing_id = None;
        self.pairing_pos = None;
        self.flight_id = None;
        self.flight_pos = None;
        self.schedule = Schedule::default();
        self.score_key = None;
    }

    pub(crate) fn clear_flight(&mut self) {
        self.flight_id = None;
        self.flight_pos = None;
        self.schedule = Schedule::default();
        self.score_key = None;
    }
}

/// A pairing or a flight, the two kinds of group a player can be part of.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum GroupRef {
    Pairing(PairingId),
    Flight(FlightId),
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupRef::Pairing(id) => write!(f, "pairing {id}"),
            GroupRef::Flight(id) => write!(f, "flight {id}"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RecalcScope {
    Player(String),
    Pairing(PairingId),
    Flight(FlightId),
    All,
}

/// Players picked for an assignment, in the order they should be seated.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    ghins: Vec<String>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ghin: impl Into<String>) {
        self.ghins.push(ghin.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ghins.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ghins.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ghins.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Selection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ghins: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_within_three_digits() {
        assert_eq!("7".parse::<PairingId>(), Ok(PairingId(7)));
        assert_eq!("999".parse::<FlightId>(), Ok(FlightId(999)));
        assert!("000".parse::<PairingId>().is_err());
        assert!("1000".parse::<PairingId>().is_err());
        assert!(!PairingId(1000).in_range());
        assert_eq!(PairingId(7).to_string(), "007");
    }
}
