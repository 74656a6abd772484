use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum DraftStrategy {
    /// Snake draft across the skill buckets.
    Balanced,
    InOrder,
    /// One pick from each bucket in turn, A then B then C then D.
    AbcdDraw,
    Random,
    StackedHighFirst,
}

impl DraftStrategy {
    pub const ALL: [DraftStrategy; 5] = [
        DraftStrategy::Balanced,
        DraftStrategy::InOrder,
        DraftStrategy::AbcdDraw,
        DraftStrategy::Random,
        DraftStrategy::StackedHighFirst,
    ];
}

impl fmt::Display for DraftStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DraftStrategy::Balanced => "balanced",
            DraftStrategy::InOrder => "inOrder",
            DraftStrategy::AbcdDraw => "abcdDraw",
            DraftStrategy::Random => "random",
            DraftStrategy::StackedHighFirst => "stackedHighFirst",
        };
        write!(f, "{s}")
    }
}

/// Fill groups of the given `sizes` from the bucketed pool. Seats and pool
/// size are expected to match; any shortfall leaves the last groups short.
pub fn draft<T: Clone, R: Rng + ?Sized>(
    strategy: DraftStrategy,
    sizes: &[usize],
    buckets: &[Vec<T>],
    rng: &mut R,
) -> Vec<Vec<T>> {
    let pool: Vec<T> = buckets.iter().flatten().cloned().collect();
    match strategy {
        DraftStrategy::Balanced => snake(sizes, buckets),
        DraftStrategy::InOrder | DraftStrategy::StackedHighFirst => in_order(sizes, pool),
        DraftStrategy::AbcdDraw => round_robin(sizes, buckets),
        DraftStrategy::Random => {
            let mut pool = pool;
            pool.shuffle(rng);
            in_order(sizes, pool)
        }
    }
}

fn in_order<T>(sizes: &[usize], pool: Vec<T>) -> Vec<Vec<T>> {
    let mut pool = pool.into_iter();
    sizes
        .iter()
        .map(|&size| pool.by_ref().take(size).collect())
        .collect()
}

/// Round `r` feeds bucket `r` to the groups, walking the groups forward on
/// even rounds and backward on odd ones. Picks a group could not take carry
/// over to the next round.
fn snake<T: Clone>(sizes: &[usize], buckets: &[Vec<T>]) -> Vec<Vec<T>> {
    let mut groups: Vec<Vec<T>> = sizes.iter().map(|&s| Vec::with_capacity(s)).collect();
    let mut queue: VecDeque<T> = VecDeque::new();
    let mut round = 0;

    loop {
        if let Some(bucket) = buckets.get(round) {
            queue.extend(bucket.iter().cloned());
        }
        if queue.is_empty() && round >= buckets.len() {
            break;
        }

        let order: Vec<usize> = if round % 2 == 0 {
            (0..sizes.len()).collect()
        } else {
            (0..sizes.len()).rev().collect()
        };
        let mut placed = false;
        for g in order {
            if groups[g].len() < sizes[g] {
                if let Some(p) = queue.pop_front() {
                    groups[g].push(p);
                    placed = true;
                }
            }
        }

        if !placed && round >= buckets.len() {
            break;
        }
        round += 1;
    }
    groups
}

/// Walk the buckets in order, one pick per bucket, cursor carrying over
/// from one group to the next. Empty buckets are skipped.
fn round_robin<T: Clone>(sizes: &[usize], buckets: &[Vec<T>]) -> Vec<Vec<T>> {
    let mut queues: Vec<VecDeque<T>> = buckets
        .iter()
        .map(|b| b.iter().cloned().collect())
        .collect();
    let mut cursor = 0;
    let mut groups = Vec::with_capacity(sizes.len());

    for &size in sizes {
        let mut group = Vec::with_capacity(size);
        while group.len() < size {
            let Some(offset) = (0..queues.len())
                .find(|i| !queues[(cursor + i) % queues.len()].is_empty())
            else {
                break;
            };
            let b = (cursor + offset) % queues.len();
            if let Some(p) = queues[b].pop_front() {
                group.push(p);
            }
            cursor = (b + 1) % queues.len();
        }
        groups.push(group);
    }
    groups
}
