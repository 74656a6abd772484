use crate::model::{GroupModel, GroupRef, Schedule};

/// First non-empty schedule found among the group's players, or an empty one
/// when nobody in the group has been scheduled yet.
#[must_use]
pub fn schedule_of(model: &GroupModel, group: GroupRef) -> Schedule {
    model
        .group_members(group)
        .into_iter()
        .map(|p| &p.schedule)
        .find(|s| !s.is_empty())
        .cloned()
        .unwrap_or_default()
}

/// Schedule a player joining `group` should carry. Pairings that sit inside a
/// flight take the flight's schedule.
#[must_use]
pub fn inherited_schedule(model: &GroupModel, group: GroupRef) -> Schedule {
    schedule_of(model, model.schedule_owner(group))
}
