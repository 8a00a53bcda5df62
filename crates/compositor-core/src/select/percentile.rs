use crate::quality::Quality;

/// 1-based rank of the `percentile` order statistic among `n` values.
///
/// `k = ceil(p / 100 * n)`, clamped to `[1, n]`. Requires `n > 0`.
pub fn rank_for(percentile: f32, n: usize) -> usize {
    let k = (percentile as f64 / 100.0 * n as f64).ceil();
    (k.max(1.0) as usize).min(n)
}

/// Input whose quality is the k-th smallest valid quality.
///
/// Valid values are sorted by (quality, index), so among inputs sharing the
/// selected quality the lowest index comes first.
pub fn percentile_rank(
    qualities: &[Quality],
    percentile: f32,
    scratch: &mut Vec<(f32, usize)>,
) -> Option<usize> {
    scratch.clear();
    scratch.extend(
        qualities
            .iter()
            .enumerate()
            .filter_map(|(i, q)| q.value().map(|v| (v, i))),
    );
    if scratch.is_empty() {
        return None;
    }

    scratch.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    let target = scratch[rank_for(percentile, scratch.len()) - 1].0;
    scratch
        .iter()
        .find(|(v, _)| v.total_cmp(&target).is_eq())
        .map(|&(_, i)| i)
}
