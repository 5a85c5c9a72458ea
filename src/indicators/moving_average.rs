// ============================================================================
// Moyennes mobiles : SMA et EMA
// ============================================================================
// Alignements différents, à ne pas confondre :
// - SMA(p) : première valeur à l'index p-1 (len - p + 1 valeurs)
// - EMA(p) : une valeur par entrée, la première entrée sert de graine
// ============================================================================

use crate::models::PricePoint;

/// Moyenne mobile simple sur `period` clôtures
///
/// `output[i]` est la moyenne de la fenêtre qui se termine à l'entrée `i + period - 1`.
pub fn sma(closes: &[PricePoint], period: usize) -> Vec<PricePoint> {
    if period == 0 || closes.len() < period {
        return Vec::new();
    }

    let mut output = Vec::with_capacity(closes.len() - period + 1);
    let mut sum: f64 = closes[..period].iter().map(|p| p.value).sum();
    output.push(PricePoint::new(closes[period - 1].time, sum / period as f64));

    for i in period..closes.len() {
        sum += closes[i].value - closes[i - period].value;
        output.push(PricePoint::new(closes[i].time, sum / period as f64));
    }

    output
}

/// Moyenne mobile exponentielle, k = 2 / (period + 1)
///
/// Graine = première clôture ; émet une valeur par entrée.
pub fn ema(closes: &[PricePoint], period: usize) -> Vec<PricePoint> {
    let Some(first) = closes.first() else {
        return Vec::new();
    };
    if period == 0 {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut output = Vec::with_capacity(closes.len());
    let mut previous = first.value;
    output.push(PricePoint::new(first.time, previous));

    for point in &closes[1..] {
        previous = point.value * k + previous * (1.0 - k);
        output.push(PricePoint::new(point.time, previous));
    }

    output
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::testing::*;

    #[test]
    fn test_sma_scenario_period_two() {
        let closes = series(&[10.0, 12.0, 11.0, 13.0]);
        let output = sma(&closes, 2);

        let expected = [(1, 11.0), (2, 11.5), (3, 12.0)];
        assert_eq!(output.len(), expected.len());
        for (point, (time, value)) in output.iter().zip(expected) {
            assert_eq!(point.time, time);
            assert!(approx_eq(point.value, value), "{} != {}", point.value, value);
        }
    }

    #[test]
    fn test_sma_shorter_than_period_is_empty() {
        assert!(sma(&series(&[1.0, 2.0]), 3).is_empty());
        assert!(sma(&series(&[1.0, 2.0]), 0).is_empty());
        assert!(sma(&[], 1).is_empty());
    }

    #[test]
    fn test_sma_exact_period_gives_single_value() {
        let output = sma(&series(&[2.0, 4.0, 6.0]), 3);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].time, 2);
        assert!(approx_eq(output[0].value, 4.0));
    }

    #[test]
    fn test_ema_period_one_is_identity() {
        let closes = wave(30);
        let output = ema(&closes, 1);
        assert_eq!(output.len(), closes.len());
        for (out, input) in output.iter().zip(&closes) {
            assert_eq!(out.time, input.time);
            assert!(approx_eq(out.value, input.value));
        }
    }

    #[test]
    fn test_ema_seeded_with_first_value() {
        let output = ema(&series(&[10.0, 20.0]), 3);
        // k = 0.5
        assert!(approx_eq(output[0].value, 10.0));
        assert!(approx_eq(output[1].value, 15.0));
    }

    #[test]
    fn test_ema_emits_one_value_per_input() {
        let closes = series(&[5.0, 6.0, 7.0]);
        assert_eq!(ema(&closes, 26).len(), 3);
        assert!(ema(&[], 5).is_empty());
        assert!(ema(&closes, 0).is_empty());
    }

    #[test]
    fn test_ema_of_constant_series_is_constant() {
        let output = ema(&series(&[42.0; 20]), 9);
        assert!(output.iter().all(|p| approx_eq(p.value, 42.0)));
    }
}
