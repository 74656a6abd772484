use ahash::RandomState;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::ValidationError;
use crate::model::config::CompetitionType;
use crate::model::types::{
    FlightId, FlightSide, GroupRef, MAX_GROUP_ID, PairingId, Player, Schedule,
};

/// Up to `count` ids in `1..=MAX_GROUP_ID` missing from the ascending `used`,
/// starting above its maximum.
fn free_ids(used: &[u32], count: usize) -> Vec<u32> {
    let above = used.last().map_or(1, |max| max + 1).min(MAX_GROUP_ID + 1);
    (above..=MAX_GROUP_ID)
        .chain(1..above)
        .filter(|id| used.binary_search(id).is_err())
        .take(count)
        .collect()
}

/// What an unassign or dissolve did to the roster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Removal {
    /// Every player whose grouping or schedule fields changed.
    pub affected: Vec<String>,
    /// Groups that no longer exist afterwards.
    pub dissolved: Vec<GroupRef>,
    /// Group that lost members but survived, if any.
    pub remaining: Option<GroupRef>,
}

/// In-memory roster of one game plus the pairings and flights derived from it.
#[derive(Debug, Clone)]
pub struct GroupModel {
    game_id: String,
    competition: CompetitionType,
    players: Vec<Player>,
    index: HashMap<String, usize, RandomState>,
}

impl GroupModel {
    /// # Errors
    ///
    /// Will return `Err` if two players share a ghin.
    pub fn new(
        game_id: impl Into<String>,
        competition: CompetitionType,
        players: Vec<Player>,
    ) -> Result<Self, ValidationError> {
        let mut model = Self {
            game_id: game_id.into(),
            competition,
            players: Vec::new(),
            index: HashMap::default(),
        };
        model.replace_all(players)?;
        Ok(model)
    }

    /// Swap in a canonical roster wholesale.
    ///
    /// # Errors
    ///
    /// Will return `Err` if two players share a ghin; the model is unchanged then.
    pub fn replace_all(&mut self, players: Vec<Player>) -> Result<(), ValidationError> {
        let mut index: HashMap<String, usize, RandomState> = HashMap::default();
        for (i, p) in players.iter().enumerate() {
            if index.insert(p.ghin.clone(), i).is_some() {
                return Err(ValidationError::DuplicatePlayer(p.ghin.clone()));
            }
        }
        self.players = players;
        self.index = index;
        self.refresh_score_keys();
        Ok(())
    }

    #[must_use]
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    #[must_use]
    pub fn competition(&self) -> CompetitionType {
        self.competition
    }

    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[must_use]
    pub fn player(&self, ghin: &str) -> Option<&Player> {
        self.index.get(ghin).map(|&i| &self.players[i])
    }

    pub(crate) fn player_mut(&mut self, ghin: &str) -> Option<&mut Player> {
        match self.index.get(ghin) {
            Some(&i) => Some(&mut self.players[i]),
            None => None,
        }
    }

    pub(crate) fn remove_player(&mut self, ghin: &str) -> Option<Player> {
        let i = self.index.remove(ghin)?;
        let removed = self.players.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    #[must_use]
    pub fn unassigned(&self) -> Vec<&Player> {
        self.players.iter().filter(|p| !p.is_assigned()).collect()
    }

    /// Members of a pairing ordered by position.
    #[must_use]
    pub fn pairing_members(&self, pairing_id: PairingId) -> Vec<&Player> {
        let mut members: Vec<&Player> = self
            .players
            .iter()
            .filter(|p| p.pairing_id == Some(pairing_id))
            .collect();
        members.sort_by_key(|p| p.pairing_pos.unwrap_or(u32::MAX));
        members
    }

    #[must_use]
    pub fn pairing_size(&self, pairing_id: PairingId) -> usize {
        self.players
            .iter()
            .filter(|p| p.pairing_id == Some(pairing_id))
            .count()
    }

    #[must_use]
    pub fn pairing_ids(&self) -> BTreeSet<PairingId> {
        self.players.iter().filter_map(|p| p.pairing_id).collect()
    }

    /// Id for a new pairing: one above the highest in use, or the lowest gap
    /// once `999` is taken.
    ///
    /// # Errors
    ///
    /// Will return `Err` if every id from `001` to `999` is in use.
    pub fn next_pairing_id(&self) -> Result<PairingId, ValidationError> {
        self.free_pairing_ids(1)?
            .pop()
            .ok_or(ValidationError::NoFreePairingId { needed: 1 })
    }

    /// `count` unused pairing ids, counting on from the highest in use and
    /// wrapping to the gaps below it.
    ///
    /// # Errors
    ///
    /// Will return `Err` if fewer than `count` ids are free.
    pub fn free_pairing_ids(&self, count: usize) -> Result<Vec<PairingId>, ValidationError> {
        let used: Vec<u32> = self.pairing_ids().into_iter().map(|id| id.0).collect();
        let ids: Vec<PairingId> = free_ids(&used, count).into_iter().map(PairingId).collect();
        if ids.len() < count {
            return Err(ValidationError::NoFreePairingId { needed: count });
        }
        Ok(ids)
    }

    #[must_use]
    pub fn flight_ids(&self) -> BTreeSet<FlightId> {
        self.players.iter().filter_map(|p| p.flight_id).collect()
    }

    /// # Errors
    ///
    /// Will return `Err` if every id from `001` to `999` is in use.
    pub fn next_flight_id(&self) -> Result<FlightId, ValidationError> {
        let used: Vec<u32> = self.flight_ids().into_iter().map(|id| id.0).collect();
        free_ids(&used, 1)
            .pop()
            .map(FlightId)
            .ok_or(ValidationError::NoFreeFlightId)
    }

    /// Flight and side a pairing plays in, read from its first member.
    #[must_use]
    pub fn flight_of(&self, pairing_id: PairingId) -> Option<(FlightId, FlightSide)> {
        self.pairing_members(pairing_id)
            .first()
            .and_then(|p| p.flight_id.zip(p.flight_pos))
    }

    /// Pairings of a flight keyed by side.
    #[must_use]
    pub fn flight_pairings(&self, flight_id: FlightId) -> BTreeMap<FlightSide, PairingId> {
        self.players
            .iter()
            .filter(|p| p.flight_id == Some(flight_id))
            .filter_map(|p| Some((p.flight_pos?, p.pairing_id?)))
            .collect()
    }

    #[must_use]
    pub fn group_members(&self, group: GroupRef) -> Vec<&Player> {
        match group {
            GroupRef::Pairing(id) => self.pairing_members(id),
            GroupRef::Flight(id) => {
                let mut members: Vec<&Player> = self
                    .players
                    .iter()
                    .filter(|p| p.flight_id == Some(id))
                    .collect();
                members.sort_by_key(|p| (p.flight_pos, p.pairing_pos));
                members
            }
        }
    }

    #[must_use]
    pub fn group_exists(&self, group: GroupRef) -> bool {
        self.players.iter().any(|p| match group {
            GroupRef::Pairing(id) => p.pairing_id == Some(id),
            GroupRef::Flight(id) => p.flight_id == Some(id),
        })
    }

    /// The group whose schedule a player follows: the flight when flighted,
    /// otherwise the pairing.
    #[must_use]
    pub fn schedule_unit(&self, player: &Player) -> Option<GroupRef> {
        match (player.flight_id, player.pairing_id) {
            (Some(flight), _) => Some(GroupRef::Flight(flight)),
            (None, Some(pairing)) => Some(GroupRef::Pairing(pairing)),
            (None, None) => None,
        }
    }

    /// Resolve a pairing to the group that owns its schedule.
    #[must_use]
    pub fn schedule_owner(&self, group: GroupRef) -> GroupRef {
        match group {
            GroupRef::Pairing(id) => self
                .flight_of(id)
                .map_or(group, |(flight, _)| GroupRef::Flight(flight)),
            GroupRef::Flight(_) => group,
        }
    }

    #[must_use]
    pub fn schedule_units(&self) -> BTreeSet<GroupRef> {
        self.players
            .iter()
            .filter_map(|p| self.schedule_unit(p))
            .collect()
    }

    pub(crate) fn place(
        &mut self,
        ghin: &str,
        pairing_id: PairingId,
        pos: u32,
        flight: Option<(FlightId, FlightSide)>,
        schedule: &Schedule,
    ) {
        if let Some(p) = self.player_mut(ghin) {
            p.pairing_id = Some(pairing_id);
            p.pairing_pos = Some(pos);
            p.flight_id = flight.map(|(id, _)| id);
            p.flight_pos = flight.map(|(_, side)| side);
            p.schedule = schedule.clone();
        }
    }

    pub(crate) fn set_flight(
        &mut self,
        pairing_id: PairingId,
        flight: FlightId,
        side: FlightSide,
        schedule: &Schedule,
    ) -> Vec<String> {
        let mut touched = Vec::new();
        for p in &mut self.players {
            if p.pairing_id == Some(pairing_id) {
                p.flight_id = Some(flight);
                p.flight_pos = Some(side);
                p.schedule = schedule.clone();
                touched.push(p.ghin.clone());
            }
        }
        touched
    }

    pub(crate) fn set_schedule(&mut self, group: GroupRef, schedule: &Schedule) -> Vec<String> {
        let mut touched = Vec::new();
        for p in &mut self.players {
            let member = match group {
                GroupRef::Pairing(id) => p.pairing_id == Some(id),
                GroupRef::Flight(id) => p.flight_id == Some(id),
            };
            if member {
                p.schedule = schedule.clone();
                touched.push(p.ghin.clone());
            }
        }
        touched
    }

    /// Take one player out of their pairing, cascading to the pairing and
    /// flight when sides empty out.
    pub(crate) fn unassign(&mut self, ghin: &str) -> Removal {
        let Some(player) = self.player(ghin) else {
            return Removal::default();
        };
        let Some(pairing_id) = player.pairing_id else {
            return Removal::default();
        };
        let flight = player.flight_id;

        let mut removal = Removal {
            affected: vec![ghin.to_string()],
            ..Removal::default()
        };
        if let Some(p) = self.player_mut(ghin) {
            p.clear_grouping();
        }

        if self.pairing_size(pairing_id) > 0 {
            removal.remaining = Some(match flight {
                Some(flight) => GroupRef::Flight(flight),
                None => GroupRef::Pairing(pairing_id),
            });
        } else {
            removal.dissolved.push(GroupRef::Pairing(pairing_id));
            if let Some(flight) = flight {
                let cascade = self.dissolve_flight(flight);
                removal.affected.extend(cascade.affected);
                removal.dissolved.extend(cascade.dissolved);
                removal.remaining = cascade.remaining;
            }
        }
        self.refresh_score_keys();
        removal
    }

    /// Revert every member to unassigned; the owning flight goes with it.
    pub(crate) fn dissolve_pairing(&mut self, pairing_id: PairingId) -> Removal {
        let flight = self.flight_of(pairing_id).map(|(id, _)| id);
        let mut removal = Removal::default();
        for p in &mut self.players {
            if p.pairing_id == Some(pairing_id) {
                p.clear_grouping();
                removal.affected.push(p.ghin.clone());
            }
        }
        if removal.affected.is_empty() {
            return removal;
        }
        removal.dissolved.push(GroupRef::Pairing(pairing_id));
        if let Some(flight) = flight {
            let cascade = self.dissolve_flight(flight);
            removal.affected.extend(cascade.affected);
            removal.dissolved.extend(cascade.dissolved);
            removal.remaining = cascade.remaining;
        }
        self.refresh_score_keys();
        removal
    }

    /// Break a flight apart. Member pairings survive without flight or schedule.
    pub(crate) fn dissolve_flight(&mut self, flight_id: FlightId) -> Removal {
        let mut removal = Removal::default();
        let mut survivors = BTreeSet::new();
        for p in &mut self.players {
            if p.flight_id == Some(flight_id) {
                p.clear_flight();
                removal.affected.push(p.ghin.clone());
                if let Some(pairing) = p.pairing_id {
                    survivors.insert(pairing);
                }
            }
        }
        if removal.affected.is_empty() {
            return removal;
        }
        removal.dissolved.push(GroupRef::Flight(flight_id));
        // a lone surviving pairing keeps its players and needs rescoping
        removal.remaining = survivors.first().map(|&id| GroupRef::Pairing(id));
        self.refresh_score_keys();
        removal
    }

    /// Recompute the scoring-system key of every player. Only players in a
    /// fully resolved, scheduled group get one.
    pub(crate) fn refresh_score_keys(&mut self) {
        let mut keys: HashMap<String, String, RandomState> = HashMap::default();
        match self.competition {
            CompetitionType::Individual => {
                for id in self.pairing_ids() {
                    let members = self.pairing_members(id);
                    let scheduled = members.iter().all(|p| p.schedule.tee_time.is_some());
                    if members.len() >= 2 && scheduled {
                        for p in members {
                            let pos = p.pairing_pos.unwrap_or_default();
                            keys.insert(p.ghin.clone(), format!("{}-{id}-{pos}", self.game_id));
                        }
                    }
                }
            }
            CompetitionType::Team => {
                for id in self.flight_ids() {
                    let sides = self.flight_pairings(id);
                    let members = self.group_members(GroupRef::Flight(id));
                    let scheduled = members.iter().all(|p| p.schedule.tee_time.is_some());
                    let complete = sides.len() == 2
                        && sides.values().all(|&pairing| self.pairing_size(pairing) == 2);
                    if complete && scheduled {
                        for p in members {
                            let side = p.flight_pos.map(|s| s.to_string()).unwrap_or_default();
                            let pos = p.pairing_pos.unwrap_or_default();
                            keys.insert(
                                p.ghin.clone(),
                                format!("{}-F{id}-{side}{pos}", self.game_id),
                            );
                        }
                    }
                }
            }
        }
        for p in &mut self.players {
            p.score_key = keys.remove(&p.ghin);
        }
    }

    /// Structural checks that must hold before anything is written out.
    ///
    /// # Errors
    ///
    /// Will return `Err` naming the first violated constraint and its group.
    pub fn check_invariants(&self, max_pairing_size: usize) -> Result<(), ValidationError> {
        let mut seen: BTreeMap<PairingId, BTreeSet<u32>> = BTreeMap::new();
        for p in &self.players {
            if let Some(id) = p.pairing_id.filter(|id| !id.in_range()) {
                return Err(ValidationError::GroupIdOutOfRange(id.0.to_string()));
            }
            if let Some(id) = p.flight_id.filter(|id| !id.in_range()) {
                return Err(ValidationError::GroupIdOutOfRange(id.0.to_string()));
            }
            match (p.pairing_id, p.pairing_pos) {
                (None, Some(_)) => {
                    return Err(ValidationError::PositionWithoutPairing(p.ghin.clone()));
                }
                (Some(id), None) => {
                    return Err(ValidationError::PositionOutOfRange {
                        ghin: p.ghin.clone(),
                        pairing_id: id.to_string(),
                        pos: 0,
                        size: self.pairing_size(id),
                    });
                }
                (Some(id), Some(pos)) => {
                    let size = self.pairing_size(id);
                    if pos == 0 || pos as usize > max_pairing_size.max(size) {
                        return Err(ValidationError::PositionOutOfRange {
                            ghin: p.ghin.clone(),
                            pairing_id: id.to_string(),
                            pos,
                            size,
                        });
                    }
                    if !seen.entry(id).or_default().insert(pos) {
                        return Err(ValidationError::DuplicatePosition {
                            pairing_id: id.to_string(),
                            pos,
                        });
                    }
                }
                (None, None) => {}
            }
        }

        for flight in self.flight_ids() {
            let mut sides: BTreeMap<FlightSide, BTreeSet<PairingId>> = BTreeMap::new();
            for p in self.players.iter().filter(|p| p.flight_id == Some(flight)) {
                if let (Some(side), Some(pairing)) = (p.flight_pos, p.pairing_id) {
                    sides.entry(side).or_default().insert(pairing);
                }
            }
            for (side, pairings) in sides {
                if pairings.len() > 1 {
                    return Err(ValidationError::FlightSideConflict {
                        flight_id: flight.to_string(),
                        side: side.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_count_on_then_fill_gaps() {
        assert_eq!(free_ids(&[], 2), vec![1, 2]);
        assert_eq!(free_ids(&[1, 2, 5], 2), vec![6, 7]);
        assert_eq!(free_ids(&[3, 998], 3), vec![999, 1, 2]);
        assert_eq!(free_ids(&[999], 1), vec![1]);
    }

    #[test]
    fn a_full_range_has_nothing_left() {
        let used: Vec<u32> = (1..=MAX_GROUP_ID).collect();
        assert!(free_ids(&used, 1).is_empty());

        let almost: Vec<u32> = (1..MAX_GROUP_ID).collect();
        assert_eq!(free_ids(&almost, 2), vec![MAX_GROUP_ID]);
    }

    #[test]
    fn a_crowded_roster_refuses_more_pairings() {
        let players: Vec<Player> = (1..=MAX_GROUP_ID)
            .map(|n| {
                let mut p = Player::new(format!("p{n}"), "P", None);
                p.pairing_id = Some(PairingId(n));
                p.pairing_pos = Some(1);
                p
            })
            .collect();
        let model = GroupModel::new("g", CompetitionType::Individual, players)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(
            model.next_pairing_id(),
            Err(ValidationError::NoFreePairingId { needed: 1 })
        );
        assert_eq!(model.next_flight_id(), Ok(FlightId(1)));
    }
}
