//! Strategy Scorer
//!
//! Marks the single recommended strategy and orders the batch by score.

use super::types::Strategy;

/// Mark one strategy as recommended and sort the batch by descending score.
///
/// The first strategy in input order that reaches the maximum score is the
/// one recommended. The sort is stable, so equal scores keep their
/// generation order. An empty batch is returned unchanged.
pub fn score(mut strategies: Vec<Strategy>) -> Vec<Strategy> {
    let Some(max) = strategies.iter().map(|s| s.score).max() else {
        return strategies;
    };

    for strategy in strategies.iter_mut() {
        strategy.recommended = false;
    }
    if let Some(winner) = strategies.iter_mut().find(|s| s.score == max) {
        winner.recommended = true;
    }

    strategies.sort_by(|a, b| b.score.cmp(&a.score));
    strategies
}

/// Position of the recommended strategy in a scored batch
pub fn recommended_index(strategies: &[Strategy]) -> Option<usize> {
    strategies.iter().position(|s| s.recommended)
}
