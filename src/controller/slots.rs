use std::collections::BTreeSet;

use crate::error::ValidationError;
use crate::model::{FlightId, FlightSide, GroupModel, PairingId};

/// The `count` smallest positive positions not yet taken in `pairing_id`,
/// ascending. Holes left by departed players are filled first.
#[must_use]
pub fn next_pairing_positions(
    model: &GroupModel,
    pairing_id: PairingId,
    count: usize,
) -> Vec<u32> {
    let taken: BTreeSet<u32> = model
        .pairing_members(pairing_id)
        .iter()
        .filter_map(|p| p.pairing_pos)
        .collect();

    (1..)
        .filter(|pos| !taken.contains(pos))
        .take(count)
        .collect()
}

/// Side A if free, else side B.
///
/// # Errors
///
/// Will return `Err` if both sides of the flight are occupied.
pub fn next_flight_position(
    model: &GroupModel,
    flight_id: FlightId,
) -> Result<FlightSide, ValidationError> {
    let sides = model.flight_pairings(flight_id);
    if !sides.contains_key(&FlightSide::A) {
        Ok(FlightSide::A)
    } else if !sides.contains_key(&FlightSide::B) {
        Ok(FlightSide::B)
    } else {
        Err(ValidationError::FlightFull(flight_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CompetitionType, Player};

    fn seated(ghin: &str, pairing: u32, pos: u32) -> Player {
        let mut p = Player::new(ghin, ghin, Some(10.0));
        p.pairing_id = Some(PairingId(pairing));
        p.pairing_pos = Some(pos);
        p
    }

    #[test]
    fn fills_gaps_before_appending() {
        let model = GroupModel::new(
            "g1",
            CompetitionType::Individual,
            vec![seated("1", 1, 1), seated("2", 1, 3), seated("3", 2, 1)],
        )
        .unwrap();

        assert_eq!(next_pairing_positions(&model, PairingId(1), 2), vec![2, 4]);
        assert_eq!(next_pairing_positions(&model, PairingId(7), 3), vec![1, 2, 3]);
        assert!(next_pairing_positions(&model, PairingId(1), 0).is_empty());
    }

    #[test]
    fn flight_sides_fill_a_then_b() {
        let mut a = seated("1", 1, 1);
        a.flight_id = Some(FlightId(1));
        a.flight_pos = Some(FlightSide::A);
        let mut model =
            GroupModel::new("g1", CompetitionType::Team, vec![a, seated("2", 2, 1)]).unwrap();

        assert_eq!(next_flight_position(&model, FlightId(2)), Ok(FlightSide::A));
        assert_eq!(next_flight_position(&model, FlightId(1)), Ok(FlightSide::B));

        let mut b = seated("3", 3, 1);
        b.flight_id = Some(FlightId(1));
        b.flight_pos = Some(FlightSide::B);
        let mut players = model.players().to_vec();
        players.push(b);
        model.replace_all(players).unwrap();
        assert!(matches!(
            next_flight_position(&model, FlightId(1)),
            Err(ValidationError::FlightFull(_))
        ));
    }
}
