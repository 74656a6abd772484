use serde::{Deserialize, Serialize};

/// How many foursomes, threesomes and twosomes to build.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GroupMix {
    pub fours: usize,
    pub threes: usize,
    pub twos: usize,
}

impl GroupMix {
    #[must_use]
    pub fn new(fours: usize, threes: usize, twos: usize) -> Self {
        Self {
            fours,
            threes,
            twos,
        }
    }

    #[must_use]
    pub fn seats(&self) -> usize {
        4 * self.fours + 3 * self.threes + 2 * self.twos
    }

    #[must_use]
    pub fn groups(&self) -> usize {
        self.fours + self.threes + self.twos
    }

    #[must_use]
    pub fn distinct_sizes(&self) -> usize {
        [self.fours, self.threes, self.twos]
            .iter()
            .filter(|&&n| n > 0)
            .count()
    }

    /// Target sizes in build order, largest groups first: `[4, 4, 3]`.
    #[must_use]
    pub fn size_sequence(&self) -> Vec<usize> {
        let mut sizes = vec![4; self.fours];
        sizes.extend(std::iter::repeat_n(3, self.threes));
        sizes.extend(std::iter::repeat_n(2, self.twos));
        sizes
    }
}

/// Every way to seat `total_players` in groups of 4, 3 and 2 using at most
/// `max_groups` groups. Homogeneous mixes come first, then larger groups.
#[must_use]
pub fn valid_mixes(total_players: usize, max_groups: usize) -> Vec<GroupMix> {
    let mut mixes = Vec::new();
    if total_players == 0 {
        return mixes;
    }

    for fours in 0..=total_players / 4 {
        let after_fours = total_players - 4 * fours;
        for threes in 0..=after_fours / 3 {
            let rest = after_fours - 3 * threes;
            if rest % 2 != 0 {
                continue;
            }
            let mix = GroupMix::new(fours, threes, rest / 2);
            if mix.groups() <= max_groups {
                mixes.push(mix);
            }
        }
    }

    mixes.sort_by(|a, b| {
        a.distinct_sizes()
            .cmp(&b.distinct_sizes())
            .then_with(|| b.fours.cmp(&a.fours))
            .then_with(|| b.threes.cmp(&a.threes))
            .then_with(|| b.twos.cmp(&a.twos))
    });
    mixes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mix_seats_everyone_within_the_group_limit() {
        for total in 1..=40 {
            for max_groups in 0..=12 {
                for mix in valid_mixes(total, max_groups) {
                    assert_eq!(mix.seats(), total, "{mix:?} for {total}");
                    assert!(mix.groups() <= max_groups, "{mix:?} over {max_groups}");
                }
            }
        }
    }

    #[test]
    fn ten_players_three_groups() {
        let mixes = valid_mixes(10, 3);
        assert_eq!(mixes, vec![GroupMix::new(2, 0, 1), GroupMix::new(1, 2, 0)]);
        assert!(!mixes.contains(&GroupMix::new(1, 0, 3)));
    }

    #[test]
    fn homogeneous_mixes_rank_first() {
        let mixes = valid_mixes(12, 6);
        assert_eq!(mixes[0], GroupMix::new(3, 0, 0));
        assert_eq!(mixes[1], GroupMix::new(0, 4, 0));
        assert_eq!(mixes[2], GroupMix::new(0, 0, 6));
        assert!(mixes[3..].iter().all(|m| m.distinct_sizes() >= 2));
    }

    #[test]
    fn impossible_totals_have_no_mix() {
        assert!(valid_mixes(1, 10).is_empty());
        assert!(valid_mixes(0, 10).is_empty());
        assert!(valid_mixes(9, 2).is_empty());
    }
}
