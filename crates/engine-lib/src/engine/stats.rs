//! Statistical helpers shared by the engines

use crate::error::EngineError;

/// Nearest-rank percentile: sort ascending, take index `round(p/100 * (n-1))`
pub fn percentile(p: f64, values: &[f64]) -> Result<f64, EngineError> {
    if values.is_empty() {
        return Err(EngineError::EmptyPercentileInput);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    Ok(sorted[idx.min(sorted.len() - 1)])
}

/// Replica count inferred from `ceil(sum / avg)`; a zero average yields 0
pub fn pods_from_ratio(sum: f64, avg: f64) -> u32 {
    if avg == 0.0 {
        return 0;
    }
    (sum / avg).ceil() as u32
}

/// Raw `sum / avg` ratio, 0 for a zero average
pub(crate) fn ratio(sum: f64, avg: f64) -> f64 {
    if avg == 0.0 {
        0.0
    } else {
        sum / avg
    }
}

pub(crate) fn max_of(values: &[f64]) -> Result<f64, EngineError> {
    values
        .iter()
        .copied()
        .max_by(|a, b| a.total_cmp(b))
        .ok_or(EngineError::EmptyPercentileInput)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_nearest_rank() {
        let values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        // round(0.5 * 9) = round(4.5) = 5 -> sixth element
        assert_eq!(percentile(50.0, &values).unwrap(), 6.0);
        // round(0.98 * 9) = round(8.82) = 9
        assert_eq!(percentile(98.0, &values).unwrap(), 10.0);
        assert_eq!(percentile(100.0, &values).unwrap(), 10.0);
        assert_eq!(percentile(0.0, &values).unwrap(), 1.0);
    }

    #[test]
    fn test_percentile_ignores_input_order() {
        let values = vec![5.0, 1.0, 4.0, 2.0, 3.0];
        assert_eq!(percentile(100.0, &values).unwrap(), 5.0);
        assert_eq!(percentile(0.0, &values).unwrap(), 1.0);
    }

    #[test]
    fn test_percentile_of_empty_list() {
        assert_eq!(percentile(98.0, &[]), Err(EngineError::EmptyPercentileInput));
        assert!(max_of(&[]).is_err());
    }

    #[test]
    fn test_pods_from_ratio() {
        assert_eq!(pods_from_ratio(3.0, 1.0), 3);
        assert_eq!(pods_from_ratio(2.5, 1.0), 3);
        assert_eq!(pods_from_ratio(1.0, 0.0), 0);
        assert_eq!(pods_from_ratio(0.0, 0.0), 0);
        assert_eq!(ratio(2.5, 1.0), 2.5);
        assert_eq!(ratio(2.5, 0.0), 0.0);
    }
}
