// ============================================================================
// Module : indicators
// ============================================================================
// Indicateurs techniques calculés sur les prix de clôture
//
// Toutes les fonctions sont pures : même entrée, même sortie, aucun état
// partagé. Chaque sortie est alignée sur un suffixe de l'entrée (mêmes
// timestamps), sauf l'EMA qui émet une valeur par entrée.
//
// Données insuffisantes (ou période nulle) : série vide, jamais d'erreur.
// ============================================================================

pub mod bollinger;      // Bandes de Bollinger (écart-type population)
pub mod macd;           // MACD + signal + histogramme
pub mod moving_average; // SMA / EMA
pub mod rsi;            // RSI (lissage de Wilder)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::models::PricePoint;

pub use bollinger::{bollinger, BandPoint};
pub use macd::{macd, MacdSeries};
pub use moving_average::{ema, sma};
pub use rsi::rsi;

/// Indicateur sélectionnable dans la vue graphique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorKind {
    Rsi,
    Ema,
    Sma,
    Macd,
    Bollinger,
}

impl IndicatorKind {
    /// Libellé affiché (et accepté en entrée, sans tenir compte de la casse)
    pub fn label(&self) -> &'static str {
        match self {
            IndicatorKind::Rsi => "RSI",
            IndicatorKind::Ema => "EMA",
            IndicatorKind::Sma => "SMA",
            IndicatorKind::Macd => "MACD",
            IndicatorKind::Bollinger => "Bollinger",
        }
    }

    /// Tous les indicateurs, dans l'ordre du cycle
    pub fn all() -> [IndicatorKind; 5] {
        [
            IndicatorKind::Rsi,
            IndicatorKind::Ema,
            IndicatorKind::Sma,
            IndicatorKind::Macd,
            IndicatorKind::Bollinger,
        ]
    }

    /// Sélection suivante : aucun → RSI → EMA → SMA → MACD → Bollinger → aucun
    pub fn cycle(current: Option<IndicatorKind>) -> Option<IndicatorKind> {
        match current {
            None => Some(IndicatorKind::Rsi),
            Some(IndicatorKind::Rsi) => Some(IndicatorKind::Ema),
            Some(IndicatorKind::Ema) => Some(IndicatorKind::Sma),
            Some(IndicatorKind::Sma) => Some(IndicatorKind::Macd),
            Some(IndicatorKind::Macd) => Some(IndicatorKind::Bollinger),
            Some(IndicatorKind::Bollinger) => None,
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for IndicatorKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndicatorKind::all()
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseError::Indicator(s.to_string()))
    }
}

/// Paramètres de tous les indicateurs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub ema_period: usize,
    pub sma_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_multiplier: f64,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            ema_period: 14,
            sma_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_multiplier: 2.0,
        }
    }
}

/// Sortie d'un indicateur
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorSeries {
    /// RSI, EMA, SMA
    Line(Vec<PricePoint>),
    /// Bollinger
    Bands(Vec<BandPoint>),
    /// MACD (trois lignes)
    Macd(MacdSeries),
}

impl IndicatorSeries {
    pub fn is_empty(&self) -> bool {
        match self {
            IndicatorSeries::Line(points) => points.is_empty(),
            IndicatorSeries::Bands(points) => points.is_empty(),
            IndicatorSeries::Macd(series) => series.macd.is_empty(),
        }
    }
}

/// Calcule l'indicateur demandé sur une série de clôtures
pub fn compute(kind: IndicatorKind, closes: &[PricePoint], params: &IndicatorParams) -> IndicatorSeries {
    match kind {
        IndicatorKind::Rsi => IndicatorSeries::Line(rsi(closes, params.rsi_period)),
        IndicatorKind::Ema => IndicatorSeries::Line(ema(closes, params.ema_period)),
        IndicatorKind::Sma => IndicatorSeries::Line(sma(closes, params.sma_period)),
        IndicatorKind::Macd => IndicatorSeries::Macd(macd(
            closes,
            params.macd_fast,
            params.macd_slow,
            params.macd_signal,
        )),
        IndicatorKind::Bollinger => IndicatorSeries::Bands(bollinger(
            closes,
            params.bollinger_period,
            params.bollinger_multiplier,
        )),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::models::PricePoint;

    pub const TOLERANCE: f64 = 1e-9;

    pub fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= TOLERANCE * a.abs().max(b.abs()).max(1.0)
    }

    /// Série de clôtures avec t = 0, 1, 2, ...
    pub fn series(values: &[f64]) -> Vec<PricePoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| PricePoint::new(i as i64, v))
            .collect()
    }

    /// Série pseudo-aléatoire déterministe (marche autour de 100)
    pub fn wave(len: usize) -> Vec<PricePoint> {
        let values: Vec<f64> = (0..len)
            .map(|i| {
                let x = i as f64;
                100.0 + (x * 0.7).sin() * 5.0 + (x * 0.13).cos() * 3.0 + x * 0.05
            })
            .collect();
        series(&values)
    }
}
