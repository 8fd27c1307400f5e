/// Assigns ranks 1..=N by descending score.
///
/// Every alternative gets its own rank. Exactly equal scores keep their input
/// order, so the earlier alternative takes the lower rank number. This is a
/// determinism rule, not part of TOPSIS itself.
pub fn assign_ranks(scores: &[f64]) -> Vec<u32> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    // sort_by is stable
    order.sort_by(|a, b| {
        let sa = scores.get(*a).copied().unwrap_or(0.0);
        let sb = scores.get(*b).copied().unwrap_or(0.0);
        sb.total_cmp(&sa)
    });

    let mut ranks = vec![0_u32; scores.len()];
    for (position, index) in order.into_iter().enumerate() {
        if let Some(slot) = ranks.get_mut(index) {
            *slot = u32::try_from(position + 1).unwrap_or(u32::MAX);
        }
    }
    ranks
}
