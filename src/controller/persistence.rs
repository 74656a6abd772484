use std::collections::BTreeSet;

use crate::error::ValidationError;
use crate::model::{GameConfig, GroupModel, Player};
use crate::storage::AssignmentRow;

/// Structural checks run before any write. Nothing here touches the network.
///
/// # Errors
///
/// Will return `Err` naming the first violated constraint and its group.
pub fn validate(model: &GroupModel, config: &GameConfig) -> Result<(), ValidationError> {
    let max = config.max_pairing_size();
    for id in model.pairing_ids() {
        let size = model.pairing_size(id);
        if size > max {
            return Err(ValidationError::TooManyInPairing {
                pairing_id: id.to_string(),
                size,
                max,
            });
        }
    }
    model.check_invariants(max)
}

fn text(value: Option<impl ToString>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[must_use]
pub fn assignment_row(player: &Player) -> AssignmentRow {
    AssignmentRow {
        ghin: player.ghin.clone(),
        pairing_id: player.pairing_label(),
        pairing_pos: text(player.pairing_pos),
        flight_id: text(player.flight_id),
        flight_pos: text(player.flight_pos),
        tee_time: text(player.schedule.tee_time.as_deref()),
        start_hole: text(player.schedule.start_hole.as_deref()),
        start_hole_suffix: text(player.schedule.start_hole_suffix.as_deref()),
    }
}

/// Full grouping tuple of every dirty player still on the roster.
#[must_use]
pub fn build_dirty_payload(model: &GroupModel, dirty: &BTreeSet<String>) -> Vec<AssignmentRow> {
    dirty
        .iter()
        .filter_map(|ghin| model.player(ghin))
        .map(assignment_row)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CompetitionType, FlightId, FlightSide, PairingId, Schedule};

    #[test]
    fn payload_carries_the_whole_tuple() {
        let mut a = Player::new("a", "A", Some(3.0));
        a.pairing_id = Some(PairingId(4));
        a.pairing_pos = Some(2);
        a.flight_id = Some(FlightId(1));
        a.flight_pos = Some(FlightSide::B);
        a.schedule = Schedule::new("09:00", "5", Some("B"));
        let b = Player::new("b", "B", None);
        let model = GroupModel::new("g1", CompetitionType::Team, vec![a, b]).unwrap();

        let dirty: BTreeSet<String> = ["b", "a", "gone"].iter().map(|s| (*s).to_string()).collect();
        let rows = build_dirty_payload(&model, &dirty);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ghin, "a");
        assert_eq!(rows[0].pairing_id, "004");
        assert_eq!(rows[0].pairing_pos, "2");
        assert_eq!(rows[0].flight_id, "001");
        assert_eq!(rows[0].flight_pos, "B");
        assert_eq!(rows[0].start_hole_suffix, "B");
        assert_eq!(rows[1].pairing_id, "000");
        assert_eq!(rows[1].tee_time, "");
    }
}
