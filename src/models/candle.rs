// ============================================================================
// Structures : Candle, RawCandle, PricePoint, Interval
// ============================================================================
// Données de marché consommées par le pipeline graphique
//
// - RawCandle : forme "fil" renvoyée par /velas (timestamp en millisecondes)
// - Candle : forme canonique (timestamp en secondes, trié, sans doublon)
// - PricePoint : projection {time, value} utilisée par les indicateurs
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Intervalle entre les chandelles, tel que reconnu par le backend
///
/// CONCEPT : Valeurs fermées
/// - Le backend n'accepte que 1m, 5m, 15m, 1h, 4h, 1d
/// - Un enum garantit qu'on n'envoie jamais autre chose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    /// 1 minute
    #[serde(rename = "1m")]
    M1,
    /// 5 minutes
    #[serde(rename = "5m")]
    M5,
    /// 15 minutes
    #[serde(rename = "15m")]
    M15,
    /// 1 heure
    #[serde(rename = "1h")]
    H1,
    /// 4 heures
    #[serde(rename = "4h")]
    H4,
    /// 1 jour
    #[serde(rename = "1d")]
    D1,
}

impl Interval {
    /// Valeur du paramètre `interval` de /velas
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::H1 => "1h",
            Interval::H4 => "4h",
            Interval::D1 => "1d",
        }
    }

    /// Tous les intervalles, dans l'ordre du sélecteur
    pub fn all() -> [Interval; 6] {
        [
            Interval::M1,
            Interval::M5,
            Interval::M15,
            Interval::H1,
            Interval::H4,
            Interval::D1,
        ]
    }

    /// Retourne l'intervalle suivant (cycle)
    pub fn next(&self) -> Interval {
        match self {
            Interval::M1 => Interval::M5,
            Interval::M5 => Interval::M15,
            Interval::M15 => Interval::H1,
            Interval::H1 => Interval::H4,
            Interval::H4 => Interval::D1,
            Interval::D1 => Interval::M1, // Boucle
        }
    }

    /// Retourne l'intervalle précédent (cycle)
    pub fn previous(&self) -> Interval {
        match self {
            Interval::M1 => Interval::D1, // Boucle
            Interval::M5 => Interval::M1,
            Interval::M15 => Interval::M5,
            Interval::H1 => Interval::M15,
            Interval::H4 => Interval::H1,
            Interval::D1 => Interval::H4,
        }
    }
}

impl Default for Interval {
    /// 1 heure, comme le sélecteur du tableau de bord
    fn default() -> Self {
        Interval::H1
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::all()
            .into_iter()
            .find(|interval| interval.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseError::Interval(s.to_string()))
    }
}

/// Chandelle telle que renvoyée par /velas
///
/// `time` est en millisecondes ; rien ne garantit l'ordre ni l'unicité.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCandle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Une chandelle canonique
///
/// Invariant (assuré par `normalizer::normalize`) : dans une séquence,
/// `time` est strictement croissant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Secondes depuis l'epoch (début du bucket)
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Chandelle haussière (close > open)
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Projection sur le prix de clôture
    pub fn close_point(&self) -> PricePoint {
        PricePoint::new(self.time, self.close)
    }
}

/// Point {time, value} : entrée et sortie des indicateurs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub time: i64,
    pub value: f64,
}

impl PricePoint {
    pub fn new(time: i64, value: f64) -> Self {
        Self { time, value }
    }
}

/// Projette une séquence de chandelles sur les prix de clôture
pub fn closes(candles: &[Candle]) -> Vec<PricePoint> {
    candles.iter().map(Candle::close_point).collect()
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_round_trip_through_str() {
        for interval in Interval::all() {
            assert_eq!(interval.as_str().parse::<Interval>().unwrap(), interval);
        }
        assert_eq!(" 4H ".parse::<Interval>().unwrap(), Interval::H4);
    }

    #[test]
    fn test_interval_rejects_unknown() {
        assert!("1wk".parse::<Interval>().is_err());
        assert!("".parse::<Interval>().is_err());
    }

    #[test]
    fn test_interval_cycle() {
        assert_eq!(Interval::M1.next(), Interval::M5);
        assert_eq!(Interval::D1.next(), Interval::M1); // Boucle
        assert_eq!(Interval::M1.previous(), Interval::D1);
        for interval in Interval::all() {
            assert_eq!(interval.next().previous(), interval);
        }
    }

    #[test]
    fn test_interval_default_is_one_hour() {
        assert_eq!(Interval::default(), Interval::H1);
    }

    #[test]
    fn test_raw_candle_deserializes_backend_payload() {
        let json = r#"{"time": 1700000000123, "open": 1.5, "high": 2, "low": 1, "close": 1.75, "volume": 320.5}"#;
        let raw: RawCandle = serde_json::from_str(json).unwrap();
        assert_eq!(raw.time, 1_700_000_000_123);
        assert_eq!(raw.high, 2.0);
    }

    #[test]
    fn test_closes_projection() {
        let candles = [
            Candle::new(0, 9.0, 11.0, 8.0, 10.0, 1.0),
            Candle::new(60, 10.0, 13.0, 9.0, 12.0, 2.0),
        ];
        let points = closes(&candles);
        assert_eq!(points, vec![PricePoint::new(0, 10.0), PricePoint::new(60, 12.0)]);
        assert!(candles[1].is_bullish());
    }
}
