pub mod logging;

/// Round to a fixed number of decimals for the wire format (2 for seconds,
/// 1 for percentages).
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_seconds_and_percentages() {
        assert_eq!(round_to(12.345_6, 2), 12.35);
        assert_eq!(round_to(66.666, 1), 66.7);
        assert_eq!(round_to(0.0, 2), 0.0);
    }
}
