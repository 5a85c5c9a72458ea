// ============================================================================
// Contrat de la surface de rendu
// ============================================================================
// La session graphique ne dessine rien elle-même : elle pilote une surface
// opaque via le trait RenderSurface (ajout/suppression de séries, envoi de
// données, largeur). Le terminal en fournit une implémentation
// (ui::surface::TerminalSurface) ; les tests utilisent une surface
// d'enregistrement.
// ============================================================================

use std::fmt;

use ratatui::style::Color;
use thiserror::Error;

use crate::chart::theme::Palette;
use crate::indicators::IndicatorKind;
use crate::models::{Candle, PricePoint};

/// Taille de la surface, en cellules du terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimensions {
    pub width: u16,
    pub height: u16,
}

impl Dimensions {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// Identifiant d'une série, attribué par la surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeriesId(pub u64);

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Forme de la série
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Candlestick,
    Histogram,
    Line,
}

/// Zone verticale où la série est dessinée
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Pane {
    /// Prix (chandelles + moyennes + bandes)
    Price,
    /// Volume sous le prix
    Volume,
    /// Oscillateurs (RSI, MACD) sur leur propre échelle
    Oscillator,
}

/// Rôle d'une série dans la session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SeriesRole {
    Candles,
    Volume,
    Rsi,
    Ema,
    Sma,
    Macd,
    MacdSignal,
    MacdHistogram,
    BollingerUpper,
    BollingerLower,
    BollingerMiddle,
}

impl SeriesRole {
    /// Séries d'indicateur à attacher pour une sélection donnée
    pub fn overlays_for(indicator: Option<IndicatorKind>) -> &'static [SeriesRole] {
        match indicator {
            None => &[],
            Some(IndicatorKind::Rsi) => &[SeriesRole::Rsi],
            Some(IndicatorKind::Ema) => &[SeriesRole::Ema],
            Some(IndicatorKind::Sma) => &[SeriesRole::Sma],
            Some(IndicatorKind::Macd) => &[
                SeriesRole::Macd,
                SeriesRole::MacdSignal,
                SeriesRole::MacdHistogram,
            ],
            Some(IndicatorKind::Bollinger) => &[
                SeriesRole::BollingerUpper,
                SeriesRole::BollingerLower,
                SeriesRole::BollingerMiddle,
            ],
        }
    }

    pub fn kind(&self) -> SeriesKind {
        match self {
            SeriesRole::Candles => SeriesKind::Candlestick,
            SeriesRole::Volume | SeriesRole::MacdHistogram => SeriesKind::Histogram,
            _ => SeriesKind::Line,
        }
    }

    pub fn pane(&self) -> Pane {
        match self {
            SeriesRole::Candles
            | SeriesRole::Ema
            | SeriesRole::Sma
            | SeriesRole::BollingerUpper
            | SeriesRole::BollingerLower
            | SeriesRole::BollingerMiddle => Pane::Price,
            SeriesRole::Volume => Pane::Volume,
            SeriesRole::Rsi | SeriesRole::Macd | SeriesRole::MacdSignal | SeriesRole::MacdHistogram => {
                Pane::Oscillator
            }
        }
    }

    pub fn color(&self, palette: &Palette) -> Color {
        match self {
            SeriesRole::Candles | SeriesRole::Volume => palette.candle_up,
            SeriesRole::Rsi => palette.accent,
            SeriesRole::Ema => palette.ema,
            SeriesRole::Sma => palette.sma,
            SeriesRole::Macd => palette.macd,
            SeriesRole::MacdSignal => palette.signal,
            SeriesRole::MacdHistogram => palette.histogram,
            SeriesRole::BollingerUpper | SeriesRole::BollingerLower => palette.bands,
            SeriesRole::BollingerMiddle => palette.band_middle,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SeriesRole::Candles => "candles",
            SeriesRole::Volume => "volume",
            SeriesRole::Rsi => "RSI",
            SeriesRole::Ema => "EMA",
            SeriesRole::Sma => "SMA",
            SeriesRole::Macd => "MACD",
            SeriesRole::MacdSignal => "signal",
            SeriesRole::MacdHistogram => "histogram",
            SeriesRole::BollingerUpper => "BB upper",
            SeriesRole::BollingerLower => "BB lower",
            SeriesRole::BollingerMiddle => "BB middle",
        }
    }
}

/// Description d'une série à créer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesSpec {
    pub role: SeriesRole,
    pub kind: SeriesKind,
    pub pane: Pane,
    pub color: Color,
}

impl SeriesSpec {
    pub fn for_role(role: SeriesRole, palette: &Palette) -> Self {
        Self {
            role,
            kind: role.kind(),
            pane: role.pane(),
            color: role.color(palette),
        }
    }
}

/// Barre d'histogramme (volume, histogramme MACD)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramPoint {
    pub time: i64,
    pub value: f64,
    pub color: Color,
}

/// Données envoyées à une série
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesData {
    Candles(Vec<Candle>),
    Histogram(Vec<HistogramPoint>),
    Line(Vec<PricePoint>),
}

impl SeriesData {
    pub fn kind(&self) -> SeriesKind {
        match self {
            SeriesData::Candles(_) => SeriesKind::Candlestick,
            SeriesData::Histogram(_) => SeriesKind::Histogram,
            SeriesData::Line(_) => SeriesKind::Line,
        }
    }

    /// Données vides du type attendu par une série
    pub fn empty(kind: SeriesKind) -> Self {
        match kind {
            SeriesKind::Candlestick => SeriesData::Candles(Vec::new()),
            SeriesKind::Histogram => SeriesData::Histogram(Vec::new()),
            SeriesKind::Line => SeriesData::Line(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SeriesData::Candles(c) => c.len(),
            SeriesData::Histogram(h) => h.len(),
            SeriesData::Line(l) => l.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Erreurs de la surface ou de la session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("no active chart session")]
    NoSession,

    #[error("unknown series {0}")]
    UnknownSeries(SeriesId),

    #[error("series {id} expects {expected:?} data, got {found:?}")]
    KindMismatch {
        id: SeriesId,
        expected: SeriesKind,
        found: SeriesKind,
    },

    #[error("rendering surface unavailable: {0}")]
    Unavailable(String),
}

/// Surface de rendu pilotée par la session
pub trait RenderSurface {
    /// Ajoute une série vide et retourne son identifiant
    fn add_series(&mut self, spec: SeriesSpec) -> SeriesId;

    /// Remplace le contenu d'une série
    fn set_data(&mut self, id: SeriesId, data: SeriesData) -> Result<(), SurfaceError>;

    /// Libère une série
    fn remove_series(&mut self, id: SeriesId) -> Result<(), SurfaceError>;

    /// Applique une nouvelle largeur sans recréer la surface
    fn apply_width(&mut self, width: u16);

    /// Nombre de séries vivantes
    fn series_count(&self) -> usize;

    /// Libère la surface et toutes ses séries
    fn remove(self)
    where
        Self: Sized;
}

/// Fabrique de surfaces, une par session
pub trait SurfaceFactory {
    type Surface: RenderSurface;

    fn create(&mut self, dimensions: Dimensions, palette: &Palette) -> Result<Self::Surface, SurfaceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_counts_per_indicator() {
        assert_eq!(SeriesRole::overlays_for(None).len(), 0);
        assert_eq!(SeriesRole::overlays_for(Some(IndicatorKind::Rsi)).len(), 1);
        assert_eq!(SeriesRole::overlays_for(Some(IndicatorKind::Ema)).len(), 1);
        assert_eq!(SeriesRole::overlays_for(Some(IndicatorKind::Sma)).len(), 1);
        assert_eq!(SeriesRole::overlays_for(Some(IndicatorKind::Macd)).len(), 3);
        assert_eq!(SeriesRole::overlays_for(Some(IndicatorKind::Bollinger)).len(), 3);
    }

    #[test]
    fn test_role_layout() {
        assert_eq!(SeriesRole::Candles.kind(), SeriesKind::Candlestick);
        assert_eq!(SeriesRole::MacdHistogram.kind(), SeriesKind::Histogram);
        assert_eq!(SeriesRole::Rsi.pane(), Pane::Oscillator);
        assert_eq!(SeriesRole::BollingerMiddle.pane(), Pane::Price);
        assert_eq!(SeriesRole::Volume.pane(), Pane::Volume);
    }

    #[test]
    fn test_empty_data_matches_kind() {
        for kind in [SeriesKind::Candlestick, SeriesKind::Histogram, SeriesKind::Line] {
            let data = SeriesData::empty(kind);
            assert_eq!(data.kind(), kind);
            assert!(data.is_empty());
        }
    }
}
