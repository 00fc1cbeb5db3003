//! Scalar helpers and normalized ranking.
//!
//! Ranks are returned as a vector aligned with the input slice: `ranks[i]` is
//! the rank of `items[i]`. Every rank lies in `[0, 1]`.

use std::cmp::Ordering;

/// A closed interval `(lower, upper)`.
pub type Range = (f64, f64);

/// Clamp a value to the given range.
#[must_use]
pub fn clamp(x: f64, target: Range) -> f64 {
    let (lower, upper) = target;
    lower.max(upper.min(x))
}

/// Re-map a number from one range to another, clamping the result.
///
/// The source range must not be degenerate; callers validate that through
/// config bounds.
///
/// ```
/// # use prism::rank::map_number;
/// assert_eq!(map_number(1.0, (0.0, 2.0), (0.0, 10.0)), 5.0);
/// assert_eq!(map_number(7.0, (0.0, 2.0), (0.0, 10.0)), 10.0);
/// ```
#[must_use]
pub fn map_number(x: f64, source: Range, target: Range) -> f64 {
    let (a, b) = source;
    let (c, d) = target;
    clamp((x - a) / (b - a) * (d - c) + c, target)
}

/// Linearly interpolate between two numbers. `t` is not clamped.
#[must_use]
pub fn interpolate(x1: f64, x2: f64, t: f64) -> f64 {
    x1 + t * (x2 - x1)
}

/// How close `x` and `y` are, both assumed to be in `[0, 1]`.
///
/// The result is 1 when they are equal and 0 when they are as far apart as
/// possible.
#[must_use]
pub fn closeness(x: f64, y: f64) -> f64 {
    clamp(1.0 - (x - y).powi(2), (0.0, 1.0))
}

fn compare<K: PartialOrd>(a: &K, b: &K) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// Normalized ranks of `items` ordered by `key`.
///
/// Items are sorted ascending (descending when `reverse`), ties keep their
/// input order, and the item at sorted position `i` gets rank `i / (n - 1)`.
/// A single item gets 0.5.
///
/// ```
/// # use prism::rank::normalized_ranks;
/// let ranks = normalized_ranks(&[0, 99, 4], |x| *x, false);
/// assert_eq!(ranks, vec![0.0, 1.0, 0.5]);
/// ```
pub fn normalized_ranks<T, K, F>(items: &[T], key: F, reverse: bool) -> Vec<f64>
where
    K: PartialOrd,
    F: Fn(&T) -> K,
{
    let mut ranks = vec![0.0; items.len()];
    match items.len() {
        0 => return ranks,
        1 => {
            ranks[0] = 0.5;
            return ranks;
        }
        _ => {}
    }

    let keys: Vec<K> = items.iter().map(key).collect();
    let mut order: Vec<usize> = (0..items.len()).collect();
    // sort_by is stable, so equal keys keep input order in both directions
    if reverse {
        order.sort_by(|&a, &b| compare(&keys[b], &keys[a]));
    } else {
        order.sort_by(|&a, &b| compare(&keys[a], &keys[b]));
    }

    #[allow(clippy::cast_precision_loss)]
    let n = (items.len() - 1) as f64;
    for (position, &index) in order.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let position = position as f64;
        ranks[index] = position / n;
    }
    ranks
}

/// Like [`normalized_ranks`], but treats values at or below `middle` and values
/// above it as two separate populations.
///
/// The lower side gets ranks in `[0, 0.5 - g]` and the upper side ranks in
/// `[0.5 + g, 1]`, where `g` is half of the average per-step gap of both
/// sides. With `reverse` the sides trade places so the overall order flips.
///
/// # Arguments
///
/// * `items` - The values to rank
/// * `middle` - The key separating the two populations
/// * `key` - Extracts the compared key from an item
/// * `reverse` - Rank from highest to lowest instead
///
/// # Returns
///
/// One rank per item, in the order of `items`. A lone item on either side
/// ranks 0.25 or 0.75.
pub fn bimodal_normalized_ranks<T, K, F>(items: &[T], middle: &K, key: F, reverse: bool) -> Vec<f64>
where
    K: PartialOrd,
    F: Fn(&T) -> K,
{
    let (mut left, mut right): (Vec<usize>, Vec<usize>) =
        (0..items.len()).partition(|&i| key(&items[i]) <= *middle);
    if reverse {
        std::mem::swap(&mut left, &mut right);
    }

    let step_gap = |side: &[usize]| {
        if side.len() > 1 {
            #[allow(clippy::cast_precision_loss)]
            let steps = (side.len() - 1) as f64;
            0.5 / steps
        } else {
            0.0
        }
    };
    let half_gap = (step_gap(&left) + step_gap(&right)) / 2.0 / 2.0;

    let mut ranks = vec![0.0; items.len()];
    for (side, target) in [
        (&left, (0.0, 0.5 - half_gap)),
        (&right, (0.5 + half_gap, 1.0)),
    ] {
        let side_ranks = normalized_ranks(side, |&i| key(&items[i]), reverse);
        for (&index, rank) in side.iter().zip(side_ranks) {
            ranks[index] = map_number(rank, (0.0, 1.0), target);
        }
    }
    ranks
}
