use crate::model::Player;

/// Ghins ordered strongest first by ranking proxy; ghin breaks ties so the
/// order is stable across runs.
#[must_use]
pub fn rank_pool(players: &[&Player]) -> Vec<String> {
    let mut ranked: Vec<(f32, &str)> = players
        .iter()
        .map(|p| (p.ranking_proxy(), p.ghin.as_str()))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    ranked.into_iter().map(|(_, ghin)| ghin.to_string()).collect()
}

/// Split an ordered pool into `bucket_count` contiguous slices. Sizes differ
/// by at most one, the earlier buckets taking the extra members.
#[must_use]
pub fn bucketize<T: Clone>(sorted: &[T], bucket_count: usize) -> Vec<Vec<T>> {
    if bucket_count == 0 {
        return Vec::new();
    }
    let base = sorted.len() / bucket_count;
    let extra = sorted.len() % bucket_count;

    let mut buckets = Vec::with_capacity(bucket_count.min(sorted.len()));
    let mut start = 0;
    for i in 0..bucket_count {
        let len = base + usize::from(i < extra);
        buckets.push(sorted[start..start + len].to_vec());
        start += len;
    }
    buckets
}
