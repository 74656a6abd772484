use std::collections::BTreeSet;

use crate::controller::tee_schedule::schedule_of;
use crate::error::{PairingError, ValidationError};
use crate::model::{GroupModel, GroupRef};

/// Hands out lettered slots so two groups starting on the same hole at the
/// same time never share a suffix.
pub struct ShotgunSlotAssigner<'a> {
    alphabet: &'a [String],
}

impl<'a> ShotgunSlotAssigner<'a> {
    #[must_use]
    pub fn new(alphabet: &'a [String]) -> Self {
        Self { alphabet }
    }

    /// Suffixes held by other groups at `(tee_time, start_hole)`.
    #[must_use]
    pub fn used_suffixes(
        &self,
        model: &GroupModel,
        tee_time: &str,
        start_hole: &str,
        excluding: Option<GroupRef>,
    ) -> BTreeSet<String> {
        model
            .schedule_units()
            .into_iter()
            .filter(|unit| Some(*unit) != excluding)
            .map(|unit| schedule_of(model, unit))
            .filter(|s| {
                s.tee_time.as_deref() == Some(tee_time)
                    && s.start_hole.as_deref() == Some(start_hole)
            })
            .filter_map(|s| s.start_hole_suffix)
            .collect()
    }

    /// Keep `desired` (or the first letter of the alphabet) when free, else
    /// the first free letter.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `desired` is not in the alphabet, or if every
    /// letter is already taken at this tee time and hole.
    pub fn assign(
        &self,
        model: &GroupModel,
        tee_time: &str,
        start_hole: &str,
        desired: Option<&str>,
        excluding: Option<GroupRef>,
    ) -> Result<String, PairingError> {
        if let Some(d) = desired {
            if !self.alphabet.iter().any(|a| a == d) {
                return Err(ValidationError::UnknownSuffix(d.to_string()).into());
            }
        }
        let used = self.used_suffixes(model, tee_time, start_hole, excluding);

        let wanted = desired.or(self.alphabet.first().map(String::as_str));
        if let Some(w) = wanted {
            if !used.contains(w) {
                return Ok(w.to_string());
            }
        }

        self.alphabet
            .iter()
            .find(|letter| !used.contains(*letter))
            .cloned()
            .ok_or_else(|| PairingError::SlotExhausted {
                tee_time: tee_time.to_string(),
                start_hole: start_hole.to_string(),
            })
    }
}
