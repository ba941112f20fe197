//! Map selection by vote tally.

use rand::Rng;

/// Picks the map index with the most votes.
///
/// Only a strictly higher count replaces the current leader, so ties go to
/// the earliest index. Without any votes a uniformly random index is
/// returned. `None` only if there are no maps at all.
pub fn select_map<R: Rng + ?Sized>(votes: &[usize], rng: &mut R) -> Option<usize> {
    if votes.is_empty() {
        return None;
    }

    let mut best: Option<(usize, usize)> = None;
    for (index, &count) in votes.iter().enumerate() {
        if count == 0 {
            continue;
        }
        match best {
            Some((_, top)) if count <= top => {}
            _ => best = Some((index, count)),
        }
    }

    Some(match best {
        Some((index, _)) => index,
        None => rng.gen_range(0..votes.len()),
    })
}

/// Counts `votes` into one bucket per map, ignoring out of range indices.
pub fn tally(votes: impl IntoIterator<Item = usize>, maps: usize) -> Vec<usize> {
    let mut counts = vec![0; maps];
    for index in votes {
        if let Some(count) = counts.get_mut(index) {
            *count += 1;
        }
    }
    counts
}
