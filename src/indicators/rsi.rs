// ============================================================================
// RSI : Relative Strength Index (lissage de Wilder)
// ============================================================================
// - deltas entre clôtures consécutives
// - à l'index `period` : moyennes gain/perte = moyenne simple des `period`
//   premiers deltas
// - ensuite : avg = (avg_prev * (period - 1) + delta) / period
// - RSI = 100 - 100 / (1 + avg_gain / avg_loss), 100 si avg_loss == 0
// ============================================================================

use crate::models::PricePoint;

/// RSI sur `period` deltas ; première valeur à l'index `period` de l'entrée
pub fn rsi(closes: &[PricePoint], period: usize) -> Vec<PricePoint> {
    if period == 0 || closes.len() <= period {
        return Vec::new();
    }

    let p = period as f64;
    let delta = |i: usize| closes[i].value - closes[i - 1].value;

    let (mut avg_gain, mut avg_loss) = (1..=period).fold((0.0, 0.0), |(gain, loss), i| {
        let d = delta(i);
        (gain + d.max(0.0), loss + (-d).max(0.0))
    });
    avg_gain /= p;
    avg_loss /= p;

    let mut output = Vec::with_capacity(closes.len() - period);
    output.push(PricePoint::new(closes[period].time, rsi_value(avg_gain, avg_loss)));

    for i in (period + 1)..closes.len() {
        let d = delta(i);
        avg_gain = (avg_gain * (p - 1.0) + d.max(0.0)) / p;
        avg_loss = (avg_loss * (p - 1.0) + (-d).max(0.0)) / p;
        output.push(PricePoint::new(closes[i].time, rsi_value(avg_gain, avg_loss)));
    }

    output
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
