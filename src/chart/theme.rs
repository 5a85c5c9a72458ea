// ============================================================================
// Thème du graphique
// ============================================================================
// Deux palettes (sombre / claire) + couleurs fixes des indicateurs.
// Changer de thème impose de reconstruire la session graphique.
// ============================================================================

use clap::ValueEnum;
use ratatui::style::Color;

/// Thème de l'interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    /// Bascule sombre ↔ clair
    pub fn toggle(self) -> Theme {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            Theme::Dark => Palette::DARK,
            Theme::Light => Palette::LIGHT,
        }
    }
}

/// Couleurs utilisées par la surface de rendu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub text: Color,
    pub grid: Color,
    pub candle_up: Color,
    pub candle_down: Color,
    pub accent: Color,
    pub ema: Color,
    pub sma: Color,
    pub macd: Color,
    pub signal: Color,
    pub histogram: Color,
    pub bands: Color,
    pub band_middle: Color,
}

impl Palette {
    pub const DARK: Palette = Palette {
        background: Color::Rgb(0x1e, 0x1e, 0x1e),
        text: Color::Rgb(0xd1, 0xd4, 0xdc),
        grid: Color::Rgb(0x2e, 0x34, 0x40),
        candle_up: Color::Rgb(0x26, 0xa6, 0x9a),
        candle_down: Color::Rgb(0xef, 0x53, 0x50),
        accent: Color::Rgb(0xf0, 0xb9, 0x0b),
        ..Palette::INDICATORS
    };

    pub const LIGHT: Palette = Palette {
        background: Color::Rgb(0xff, 0xff, 0xff),
        text: Color::Rgb(0x2c, 0x3e, 0x50),
        grid: Color::Rgb(0xdf, 0xe6, 0xe9),
        candle_up: Color::Rgb(0x4c, 0xaf, 0x50),
        candle_down: Color::Rgb(0xe5, 0x39, 0x35),
        accent: Color::Rgb(0xf0, 0xb9, 0x0b),
        ..Palette::INDICATORS
    };

    /// Couleurs des indicateurs, identiques dans les deux thèmes
    const INDICATORS: Palette = Palette {
        background: Color::Reset,
        text: Color::Reset,
        grid: Color::Reset,
        candle_up: Color::Reset,
        candle_down: Color::Reset,
        accent: Color::Reset,
        ema: Color::Rgb(0xf3, 0x9c, 0x12),
        sma: Color::Rgb(0x34, 0x98, 0xdb),
        macd: Color::Rgb(0x9b, 0x59, 0xb6),
        signal: Color::Rgb(0x2e, 0xcc, 0x71),
        histogram: Color::Rgb(0xe7, 0x4c, 0x3c),
        bands: Color::Rgb(0x8e, 0x44, 0xad),
        band_middle: Color::Rgb(0x16, 0xa0, 0x85),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_round_trip() {
        assert_eq!(Theme::Dark.toggle(), Theme::Light);
        assert_eq!(Theme::Dark.toggle().toggle(), Theme::Dark);
        assert_eq!(Theme::default(), Theme::Dark);
    }

    #[test]
    fn test_palettes_differ_on_candles_share_indicators() {
        let dark = Theme::Dark.palette();
        let light = Theme::Light.palette();
        assert_ne!(dark.candle_up, light.candle_up);
        assert_ne!(dark.grid, light.grid);
        assert_eq!(dark.macd, light.macd);
        assert_eq!(dark.candle_up, Color::Rgb(0x26, 0xa6, 0x9a));
    }
}
