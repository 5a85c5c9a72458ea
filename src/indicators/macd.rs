// ============================================================================
// MACD : Moving Average Convergence Divergence
// ============================================================================
// offset = slow - fast
// macd[i]      = EMA(fast)[i + offset] - EMA(slow)[i]   (temps de EMA(fast)[i + offset])
// signal       = EMA(signal) de la ligne macd
// histogram[i] = macd[i] - signal[i], seulement là où le signal existe
// ============================================================================

use crate::indicators::moving_average::ema;
use crate::models::PricePoint;

/// Les trois lignes du MACD, sur les mêmes timestamps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<PricePoint>,
    pub signal: Vec<PricePoint>,
    pub histogram: Vec<PricePoint>,
}

/// MACD(fast, slow, signal)
///
/// Série vide si une période est nulle, si `fast >= slow`, ou si l'entrée
/// ne dépasse pas `slow - fast` points.
pub fn macd(closes: &[PricePoint], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    if fast == 0 || signal == 0 || fast >= slow {
        return MacdSeries::default();
    }
    let offset = slow - fast;
    if closes.len() <= offset {
        return MacdSeries::default();
    }

    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);

    let macd_line: Vec<PricePoint> = fast_ema[offset..]
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| PricePoint::new(f.time, f.value - s.value))
        .collect();

    let signal_line = ema(&macd_line, signal);

    // Un point d'histogramme sans signal n'a pas de sens : il est omis
    let histogram = macd_line
        .iter()
        .enumerate()
        .filter_map(|(i, m)| {
            signal_line
                .get(i)
                .map(|s| PricePoint::new(m.time, m.value - s.value))
        })
        .collect();

    MacdSeries {
        macd: macd_line,
        signal: signal_line,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::testing::*;

    #[test]
    fn test_macd_matches_ema_difference() {
        let closes = wave(100);
        let (fast, slow) = (12, 26);
        let offset = slow - fast;
        let fast_ema = ema(&closes, fast);
        let slow_ema = ema(&closes, slow);

        let output = macd(&closes, fast, slow, 9);
        assert_eq!(output.macd.len(), closes.len() - offset);
        for (i, point) in output.macd.iter().enumerate() {
            let expected = fast_ema[i + offset].value - slow_ema[i].value;
            assert!(approx_eq(point.value, expected));
            assert_eq!(point.time, fast_ema[i + offset].time);
        }
    }

    #[test]
    fn test_three_lines_share_timestamps() {
        let output = macd(&wave(60), 12, 26, 9);
        assert_eq!(output.macd.len(), output.signal.len());
        assert_eq!(output.macd.len(), output.histogram.len());
        for ((m, s), h) in output.macd.iter().zip(&output.signal).zip(&output.histogram) {
            assert_eq!(m.time, s.time);
            assert_eq!(m.time, h.time);
            assert!(approx_eq(h.value, m.value - s.value));
        }
    }

    #[test]
    fn test_invalid_periods_give_empty_series() {
        let closes = wave(60);
        assert_eq!(macd(&closes, 26, 12, 9), MacdSeries::default());
        assert_eq!(macd(&closes, 12, 12, 9), MacdSeries::default());
        assert_eq!(macd(&closes, 0, 26, 9), MacdSeries::default());
        assert_eq!(macd(&closes, 12, 26, 0), MacdSeries::default());
    }

    #[test]
    fn test_input_not_longer_than_offset_is_empty() {
        assert!(macd(&wave(14), 12, 26, 9).macd.is_empty());
        assert_eq!(macd(&wave(15), 12, 26, 9).macd.len(), 1);
    }

    #[test]
    fn test_constant_series_has_zero_macd() {
        let output = macd(&series(&[50.0; 40]), 3, 6, 4);
        assert!(output.histogram.iter().all(|p| approx_eq(p.value, 0.0)));
        assert!(output.macd.iter().all(|p| approx_eq(p.value, 0.0)));
    }
}
