use regex::Regex;
use std::sync::OnceLock;

use crate::model::{FlightId, FlightSide, PairingId, Player, Schedule};
use crate::storage::StorageError;

/// A player row as the store hands it over: every grouping field is loose
/// text that may be blank.
#[derive(Debug, Clone, Default)]
pub struct RosterRow {
    pub ghin: String,
    pub name: String,
    pub handicap_index: Option<f64>,
    pub course_handicap: Option<i64>,
    pub playing_handicap: Option<i64>,
    pub shots_off: Option<i64>,
    pub pairing_id: Option<String>,
    pub pairing_pos: Option<String>,
    pub flight_id: Option<String>,
    pub flight_pos: Option<String>,
    pub tee_time: Option<String>,
    pub start_hole: Option<String>,
    pub start_hole_suffix: Option<String>,
}

fn group_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{1,3}$").expect("static regex"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn group_number(
    field: &str,
    ghin: &str,
    raw: Option<String>,
) -> Result<Option<u32>, StorageError> {
    let Some(raw) = non_blank(raw) else {
        return Ok(None);
    };
    if !group_id_pattern().is_match(&raw) {
        return Err(StorageError::new(format!(
            "player {ghin}: {field} '{raw}' is not a 1-3 digit id"
        )));
    }
    let n: u32 = raw
        .parse()
        .map_err(|_| StorageError::new(format!("player {ghin}: bad {field} '{raw}'")))?;
    Ok((n != 0).then_some(n))
}

fn to_i32(field: &str, ghin: &str, value: Option<i64>) -> Result<Option<i32>, StorageError> {
    value
        .map(|v| {
            i32::try_from(v)
                .map_err(|_| StorageError::new(format!("player {ghin}: {field} {v} out of range")))
        })
        .transpose()
}

/// Turn a loose store row into a strict [`Player`]. A row with a sentinel
/// pairing drops its position, flight and schedule.
///
/// # Errors
///
/// Will return `Err` if the ghin is blank or a numeric field cannot be read.
#[allow(clippy::cast_possible_truncation)]
pub fn normalize_row(row: RosterRow) -> Result<Player, StorageError> {
    let ghin = row.ghin.trim().to_string();
    if ghin.is_empty() {
        return Err(StorageError::new("roster row without a ghin"));
    }

    let pairing_id = group_number("pairing_id", &ghin, row.pairing_id)?.map(PairingId);
    let pairing_pos = group_number("pairing_pos", &ghin, row.pairing_pos)?;
    let flight_id = group_number("flight_id", &ghin, row.flight_id)?.map(FlightId);
    let flight_pos = non_blank(row.flight_pos)
        .map(|s| s.parse::<FlightSide>())
        .transpose()
        .map_err(|e| StorageError::new(format!("player {ghin}: {e}")))?;

    let mut player = Player {
        name: row.name.trim().to_string(),
        handicap_index: row.handicap_index.map(|v| v as f32),
        course_handicap: to_i32("course_handicap", &ghin, row.course_handicap)?,
        playing_handicap: to_i32("playing_handicap", &ghin, row.playing_handicap)?,
        shots_off: to_i32("shots_off", &ghin, row.shots_off)?,
        pairing_id,
        pairing_pos,
        flight_id,
        flight_pos,
        schedule: Schedule {
            tee_time: non_blank(row.tee_time),
            start_hole: non_blank(row.start_hole),
            start_hole_suffix: non_blank(row.start_hole_suffix),
        },
        score_key: None,
        ghin,
    };

    if player.pairing_id.is_none() {
        player.pairing_pos = None;
        player.flight_id = None;
        player.flight_pos = None;
        player.schedule = Schedule::default();
    } else if player.flight_id.is_none() || player.flight_pos.is_none() {
        player.flight_id = None;
        player.flight_pos = None;
    }
    Ok(player)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_pairing_clears_the_rest() {
        let row = RosterRow {
            ghin: " 1234567 ".into(),
            name: "Pat".into(),
            pairing_id: Some("000".into()),
            pairing_pos: Some("2".into()),
            tee_time: Some("08:00".into()),
            ..RosterRow::default()
        };
        let p = normalize_row(row).unwrap();
        assert_eq!(p.ghin, "1234567");
        assert_eq!(p.pairing_id, None);
        assert_eq!(p.pairing_pos, None);
        assert!(p.schedule.is_empty());
    }

    #[test]
    fn padded_and_blank_fields() {
        let row = RosterRow {
            ghin: "42".into(),
            pairing_id: Some("007".into()),
            pairing_pos: Some("3".into()),
            flight_id: Some(String::new()),
            flight_pos: Some("B".into()),
            start_hole: Some(" 5 ".into()),
            start_hole_suffix: Some(String::new()),
            playing_handicap: Some(12),
            ..RosterRow::default()
        };
        let p = normalize_row(row).unwrap();
        assert_eq!(p.pairing_id, Some(PairingId(7)));
        assert_eq!(p.pairing_pos, Some(3));
        assert_eq!(p.flight_id, None);
        assert_eq!(p.flight_pos, None);
        assert_eq!(p.schedule.start_hole.as_deref(), Some("5"));
        assert_eq!(p.schedule.start_hole_suffix, None);
        assert_eq!(p.playing_handicap, Some(12));
    }

    #[test]
    fn rejects_garbage_ids() {
        let row = RosterRow {
            ghin: "42".into(),
            pairing_id: Some("12a".into()),
            ..RosterRow::default()
        };
        assert!(normalize_row(row).is_err());
        assert!(normalize_row(RosterRow::default()).is_err());
    }
}
