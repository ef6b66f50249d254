use crate::io::error::{self, Result};

/// Sample a value from `(value, weight)` pairs using a uniform draw
///
/// The value whose normalized cumulative interval contains `p` is returned.
/// Numerical drift that pushes `p` beyond the final interval falls back to
/// the last value.
///
/// # Errors
///
/// Returns `PreconditionViolation` for an empty sequence, a negative weight
/// or a non-positive weight total.
pub fn sample_cdf<T: Copy>(entries: &[(T, f64)], p: f64) -> Result<T> {
    let Some((&(last_value, _), _)) = entries.split_last() else {
        return Err(error::precondition(
            "entries",
            &0,
            &"sampler needs at least one value",
        ));
    };
    if let Some(&(_, negative)) = entries.iter().find(|&&(_, w)| w < 0.0) {
        return Err(error::precondition(
            "weights",
            &negative,
            &"weights must be non-negative",
        ));
    }
    let total: f64 = entries.iter().map(|&(_, w)| w).sum();
    if total <= 0.0 {
        return Err(error::precondition(
            "weights",
            &total,
            &"total weight must be positive",
        ));
    }

    let mut cumulative = 0.0;
    for &(value, weight) in entries {
        cumulative += weight / total;
        if p < cumulative {
            return Ok(value);
        }
    }
    Ok(last_value)
}
