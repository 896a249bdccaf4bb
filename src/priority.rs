//! Conversion between the float *score* domain and the integer *priority*
//! domain, plus softmax with temperature.
//!
//! Priorities are kept as scaled integers so the heap in
//! [`crate::domain_queue::DomainQueue`] can use plain integer comparisons
//! while callers still reason in scores.

/// Scales a float score into the integer priority space.
pub const P_MULT: i64 = 10_000;

/// `max_priority` sentinel returned by an empty [`crate::domain_queue::DomainQueue`].
pub const EMPTY: i64 = -10_000 * P_MULT;

/// Added on top of the current max priority when tombstoning an entry, so
/// it floats to the heap root for eager reclamation.
pub const REMOVED_DELTA: i64 = 10_000 * P_MULT;

/// Converts a score to a priority: `round(score * P_MULT)`, truncated toward zero.
pub fn score_to_priority(score: f64) -> i64 {
    (score * P_MULT as f64) as i64
}

/// Converts a priority back to a score: `priority / P_MULT`.
pub fn priority_to_score(priority: i64) -> f64 {
    priority as f64 / P_MULT as f64
}

/// Softmax with temperature: `exp((z_i - max(z)) / t) / sum_j exp((z_j - max(z)) / t)`.
///
/// Returns an empty vector for empty input. `t` must be positive; this is a
/// contract violation (caller error), not a recoverable error, so it panics.
pub fn softmax(z: &[f64], t: f64) -> Vec<f64> {
    if z.is_empty() {
        return Vec::new();
    }
    assert!(t > 0.0, "softmax temperature must be positive, got {t}");

    let max_z = z.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = z.iter().map(|zi| ((zi - max_z) / t).exp()).collect();
    let sum: f64 = exps.iter().sum();

    if sum == 0.0 {
        // All inputs collapsed to zero weight (e.g. t extremely small with
        // ties at something other than the max); fall back to uniform.
        let n = z.len() as f64;
        return vec![1.0 / n; z.len()];
    }

    exps.into_iter().map(|e| e / sum).collect()
}

/// Softmax over priorities (scaled integer space). The caller's temperature
/// is a score-space temperature; it is scaled by [`P_MULT`] here because the
/// weights are priorities, not scores. See the scheduler's balancing
/// temperature for why this scaling must not be dropped.
pub fn softmax_priorities(priorities: &[i64], score_space_temperature: f64) -> Vec<f64> {
    let z: Vec<f64> = priorities.iter().map(|&p| p as f64).collect();
    softmax(&z, P_MULT as f64 * score_space_temperature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_identity_on_representable_priorities() {
        for score_milli in -5000..5000 {
            let score = score_milli as f64 / 1000.0;
            let priority = score_to_priority(score);
            let round_tripped = score_to_priority(priority_to_score(priority));
            assert_eq!(priority, round_tripped);
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(softmax(&[], 1.0).is_empty());
    }

    #[test]
    fn uniform_input_yields_uniform_distribution() {
        let p = softmax(&[0.0, 0.0, 0.0, 0.0], 1.0);
        assert_eq!(p.len(), 4);
        for pi in p {
            assert!((pi - 0.25).abs() < 1e-9);
        }
    }

    #[test]
    fn low_temperature_concentrates_on_max() {
        let p = softmax(&[-2.85, 0.86, 0.28], 0.00001);
        assert!((p[0]).abs() < 1e-6);
        assert!((p[1] - 1.0).abs() < 1e-6);
        assert!((p[2]).abs() < 1e-6);
    }

    #[test]
    fn output_is_a_valid_probability_vector() {
        let p = softmax(&[3.0, -1.0, 0.0, 7.5, -100.0], 2.0);
        assert!(p.iter().all(|&pi| pi >= 0.0));
        let sum: f64 = p.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn priority_space_scaling_matches_score_space_temperature_one() {
        let priorities = vec![score_to_priority(1.0), score_to_priority(0.0)];
        let from_priorities = softmax_priorities(&priorities, 1.0);
        let from_scores = softmax(&[1.0, 0.0], 1.0);
        for (a, b) in from_priorities.iter().zip(from_scores.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}
