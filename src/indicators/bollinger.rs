// ============================================================================
// Bandes de Bollinger
// ============================================================================
// middle = SMA(period)
// stddev = écart-type population de la fenêtre (division par period)
// upper / lower = middle ± multiplier * stddev
// ============================================================================

use serde::Serialize;

use crate::models::PricePoint;

/// Un point des bandes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandPoint {
    pub time: i64,
    pub upper: f64,
    pub lower: f64,
    pub middle: f64,
}

/// Bandes de Bollinger ; première valeur à l'index `period - 1`
pub fn bollinger(closes: &[PricePoint], period: usize, multiplier: f64) -> Vec<BandPoint> {
    if period == 0 || closes.len() < period {
        return Vec::new();
    }

    let n = period as f64;
    closes
        .windows(period)
        .map(|window| {
            let mean = window.iter().map(|p| p.value).sum::<f64>() / n;
            let variance = window.iter().map(|p| (p.value - mean).powi(2)).sum::<f64>() / n;
            let width = multiplier * variance.sqrt();
            let time = window[period - 1].time;
            BandPoint {
                time,
                upper: mean + width,
                lower: mean - width,
                middle: mean,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::moving_average::sma;
    use crate::indicators::testing::*;

    #[test]
    fn test_bands_are_symmetric() {
        for band in bollinger(&wave(80), 20, 2.0) {
            assert!(approx_eq(band.upper - band.middle, band.middle - band.lower));
            assert!(band.upper >= band.lower);
        }
    }

    #[test]
    fn test_middle_is_sma() {
        let closes = wave(50);
        let bands = bollinger(&closes, 20, 2.0);
        let average = sma(&closes, 20);
        assert_eq!(bands.len(), average.len());
        for (band, avg) in bands.iter().zip(&average) {
            assert_eq!(band.time, avg.time);
            assert!(approx_eq(band.middle, avg.value));
        }
    }

    #[test]
    fn test_population_standard_deviation() {
        // fenêtre [2, 4, 4, 4, 5, 5, 7, 9] : moyenne 5, écart-type population 2
        let closes = series(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let bands = bollinger(&closes, 8, 2.0);
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].time, 7);
        assert!(approx_eq(bands[0].middle, 5.0));
        assert!(approx_eq(bands[0].upper, 9.0));
        assert!(approx_eq(bands[0].lower, 1.0));
    }

    #[test]
    fn test_short_input_is_empty() {
        assert!(bollinger(&wave(19), 20, 2.0).is_empty());
        assert!(bollinger(&wave(19), 0, 2.0).is_empty());
    }
}
