// ============================================================================
// Candlestick Chart - Rendu texte ligne par ligne
// ============================================================================
// Implémentation inspirée de cli-candlestick-chart mais intégrée à ratatui
// Utilise des caractères Unicode pour dessiner les chandeliers japonais
//
// ALGORITHME :
// - Rendu vertical : ligne par ligne de haut en bas
// - Pour chaque ligne, on détermine quel caractère Unicode afficher
// - Logique des 3 zones : mèche supérieure, corps, mèche inférieure
// - Seuils fractionnaires (0.25, 0.75) pour précision sub-caractère
// - Les moyennes et bandes sont posées par-dessus avec '•' là où la
//   colonne est vide
//
// CARACTÈRES UNICODE :
// ┃ Corps plein          │ Mèche pleine
// ╻ Demi-corps (bas)     ╹ Demi-corps (haut)
// ╽ Transition top       ╿ Transition bottom
// ╷ Demi-mèche sup       ╵ Demi-mèche inf
// ============================================================================

use chrono::DateTime;
use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};

use crate::chart::{HistogramPoint, Palette};
use crate::models::{Candle, PricePoint};

// ============================================================================
// Constantes
// ============================================================================

const UNICODE_VOID: char = ' ';
const UNICODE_BODY: char = '┃';              // Corps plein
const UNICODE_HALF_BODY_BOTTOM: char = '╻';  // Corps avec espace en bas
const UNICODE_HALF_BODY_TOP: char = '╹';     // Corps avec espace en haut
const UNICODE_WICK: char = '│';              // Mèche pleine
const UNICODE_TOP: char = '╽';               // Transition corps→mèche (haut)
const UNICODE_BOTTOM: char = '╿';            // Transition corps→mèche (bas)
const UNICODE_UPPER_WICK: char = '╷';        // Demi-mèche supérieure
const UNICODE_LOWER_WICK: char = '╵';        // Demi-mèche inférieure
const UNICODE_OVERLAY: char = '•';

/// Huit niveaux pour une barre de volume d'une ligne
const VOLUME_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Largeur de l'axe Y : "{:>9.2} │ "
const Y_AXIS_WIDTH: u16 = 12;

/// En dessous de cette largeur, l'axe Y passe en mode étroit
const ADAPTIVE_Y_AXIS_THRESHOLD: u16 = 80;
const NARROW_Y_AXIS_WIDTH: u16 = 8;

/// Lignes réservées à l'axe X (ticks + labels)
pub const X_AXIS_ROWS: u16 = 2;

/// Série superposée aux chandeliers (EMA, SMA, bandes de Bollinger)
#[derive(Debug, Clone, Copy)]
pub struct Overlay<'a> {
    pub points: &'a [PricePoint],
    pub color: Color,
}

impl Overlay<'_> {
    /// Valeur au timestamp exact (points triés par temps)
    fn value_at(&self, time: i64) -> Option<f64> {
        self.points
            .binary_search_by_key(&time, |p| p.time)
            .ok()
            .map(|i| self.points[i].value)
    }
}

// ============================================================================
// Structure principale
// ============================================================================

/// Renderer de chandeliers japonais en mode texte
pub struct CandlestickRenderer<'a> {
    /// Chandeliers visibles (les N derniers qui tiennent à l'écran)
    candles: &'a [Candle],
    overlays: &'a [Overlay<'a>],
    palette: Palette,
    min_price: f64,
    max_price: f64,
    height: u16,
    width: u16,
    y_axis_width: u16,
    columns: Vec<usize>,
}

impl<'a> CandlestickRenderer<'a> {
    /// `width` / `height` : zone complète (axe Y et axe X compris)
    pub fn new(candles: &'a [Candle], overlays: &'a [Overlay<'a>], palette: Palette, width: u16, height: u16) -> Self {
        let y_axis_width = if width < ADAPTIVE_Y_AXIS_THRESHOLD {
            NARROW_Y_AXIS_WIDTH
        } else {
            Y_AXIS_WIDTH
        };
        let chart_width = width.saturating_sub(y_axis_width);

        let max_visible = chart_width as usize;
        let visible = if candles.len() <= max_visible {
            candles
        } else {
            &candles[candles.len() - max_visible..]
        };

        let (min_price, max_price) = Self::compute_price_bounds(visible, overlays);

        Self {
            candles: visible,
            overlays,
            palette,
            min_price,
            max_price,
            height: height.saturating_sub(X_AXIS_ROWS),
            width: chart_width,
            y_axis_width,
            columns: compute_candle_positions(chart_width as usize, visible.len()),
        }
    }

    pub fn visible(&self) -> &[Candle] {
        self.candles
    }

    pub fn y_axis_width(&self) -> u16 {
        self.y_axis_width
    }

    /// Bornes de prix des chandeliers visibles et des overlays sur la même période
    fn compute_price_bounds(candles: &[Candle], overlays: &[Overlay]) -> (f64, f64) {
        let first_time = candles.first().map(|c| c.time).unwrap_or(i64::MIN);
        let overlay_values = overlays
            .iter()
            .flat_map(|o| o.points.iter())
            .filter(|p| p.time >= first_time)
            .map(|p| p.value);

        let (min_price, max_price) = candles
            .iter()
            .flat_map(|c| [c.low, c.high])
            .chain(overlay_values)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| (min.min(v), max.max(v)));

        if !min_price.is_finite() || !max_price.is_finite() {
            return (0.0, 1.0);
        }

        // Marge de 2%
        let margin = (max_price - min_price) * 0.02;
        ((min_price - margin).max(0.0), max_price + margin)
    }

    /// Convertit un prix en coordonnée de hauteur
    fn price_to_height(&self, price: f64) -> f64 {
        if self.max_price == self.min_price {
            return self.height as f64 / 2.0;
        }

        (price - self.min_price) / (self.max_price - self.min_price) * self.height as f64
    }

    fn candle_color(&self, candle: &Candle) -> Color {
        if candle.close >= candle.open {
            self.palette.candle_up
        } else {
            self.palette.candle_down
        }
    }

    /// Rend un chandelier à une hauteur donnée
    ///
    /// Cœur de l'algorithme, adapté de cli-candlestick-chart.
    fn render_candle(&self, candle: &Candle, y: u16) -> char {
        let height_unit = y as f64;

        let high_y = self.price_to_height(candle.high);
        let low_y = self.price_to_height(candle.low);
        let max_y = self.price_to_height(candle.open.max(candle.close));
        let min_y = self.price_to_height(candle.close.min(candle.open));

        let mut output = UNICODE_VOID;

        // ZONE 1 : Mèche supérieure (high → max)
        if high_y.ceil() >= height_unit && height_unit >= max_y.floor() {
            if max_y - height_unit > 0.75 {
                output = UNICODE_BODY;
            } else if (max_y - height_unit) > 0.25 {
                if (high_y - height_unit) > 0.75 {
                    output = UNICODE_TOP;
                } else {
                    output = UNICODE_HALF_BODY_BOTTOM;
                }
            } else if (high_y - height_unit) > 0.75 {
                output = UNICODE_WICK;
            } else if (high_y - height_unit) > 0.25 {
                output = UNICODE_UPPER_WICK;
            }
        }
        // ZONE 2 : Corps (min → max)
        else if max_y.floor() >= height_unit && height_unit >= min_y.ceil() {
            output = UNICODE_BODY;
        }
        // ZONE 3 : Mèche inférieure (min → low)
        else if min_y.ceil() >= height_unit && height_unit >= low_y.floor() {
            if (min_y - height_unit) < 0.25 {
                output = UNICODE_BODY;
            } else if (min_y - height_unit) < 0.75 {
                if (low_y - height_unit) < 0.25 {
                    output = UNICODE_BOTTOM;
                } else {
                    output = UNICODE_HALF_BODY_TOP;
                }
            } else if low_y - height_unit < 0.25 {
                output = UNICODE_WICK;
            } else if low_y - height_unit < 0.75 {
                output = UNICODE_LOWER_WICK;
            }
        }

        output
    }

    /// Ligne de l'axe Y, prix affiché toutes les 4 lignes
    fn render_y_axis(&self, y: u16) -> String {
        let label_width = self.y_axis_width.saturating_sub(3) as usize;
        if y % 4 == 0 {
            let price = self.min_price + (y as f64 * (self.max_price - self.min_price) / self.height as f64);
            if label_width >= 9 {
                format!("{:>w$.2} │ ", price, w = label_width)
            } else {
                format!("{:>w$.0} │ ", price, w = label_width)
            }
        } else {
            format!("{:>w$} │ ", "", w = label_width)
        }
    }

    /// Ligne où tombe une valeur d'overlay
    fn overlay_row(&self, value: f64) -> u16 {
        (self.price_to_height(value).round() as u16).clamp(1, self.height.max(1))
    }

    fn blank_row(&self) -> Vec<(char, Color)> {
        vec![(UNICODE_VOID, self.palette.text); self.width as usize]
    }

    /// Lignes du graphique : chandeliers puis axe X
    pub fn render_lines(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        if self.candles.is_empty() || self.height == 0 {
            return lines;
        }

        // De haut en bas
        for y in (1..=self.height).rev() {
            let mut cells = self.blank_row();

            for (candle, &column) in self.candles.iter().zip(&self.columns) {
                let ch = self.render_candle(candle, y);
                if ch != UNICODE_VOID {
                    cells[column] = (ch, self.candle_color(candle));
                    continue;
                }
                let overlay = self
                    .overlays
                    .iter()
                    .find(|o| o.value_at(candle.time).is_some_and(|v| self.overlay_row(v) == y));
                if let Some(overlay) = overlay {
                    cells[column] = (UNICODE_OVERLAY, overlay.color);
                }
            }

            lines.push(cells_to_line(self.render_y_axis(y), self.palette.grid, cells));
        }

        lines.extend(self.render_x_axis());
        lines
    }

    /// Bande de volume d'une ligne, alignée sur les chandeliers
    pub fn render_volume_line(&self, bars: &[HistogramPoint]) -> Line<'static> {
        let mut cells = self.blank_row();
        let visible_bars: Vec<Option<&HistogramPoint>> = self
            .candles
            .iter()
            .map(|c| {
                bars.binary_search_by_key(&c.time, |b| b.time)
                    .ok()
                    .map(|i| &bars[i])
            })
            .collect();

        let max_volume = visible_bars
            .iter()
            .flatten()
            .fold(0.0_f64, |max, b| max.max(b.value));

        if max_volume > 0.0 {
            for (bar, &column) in visible_bars.iter().zip(&self.columns) {
                if let Some(bar) = bar {
                    let level = ((bar.value / max_volume) * (VOLUME_LEVELS.len() - 1) as f64).round() as usize;
                    cells[column] = (VOLUME_LEVELS[level.min(VOLUME_LEVELS.len() - 1)], bar.color);
                }
            }
        }

        let prefix = format!("{:>w$} │ ", "vol", w = self.y_axis_width.saturating_sub(3) as usize);
        cells_to_line(prefix, self.palette.grid, cells)
    }

    /// Format des labels selon l'écart entre deux chandeliers
    fn label_format(&self) -> &'static str {
        match self.candles {
            [first, second, ..] if second.time - first.time < 24 * 60 * 60 => "%H:%M",
            _ => "%d/%m",
        }
    }

    /// Axe X : ligne de ticks puis ligne de labels
    fn render_x_axis(&self) -> Vec<Line<'static>> {
        let format = self.label_format();
        let label_width = 5;

        // +2 : au moins deux espaces entre labels
        let max_labels = (self.width as usize / (label_width + 2)).clamp(1, 10);
        let label_interval = self.candles.len().div_ceil(max_labels).max(1);

        let mut ticks = self.blank_row();
        let mut labels = self.blank_row();
        let mut next_free = 0;

        for (i, (candle, &column)) in self.candles.iter().zip(&self.columns).enumerate() {
            if i % label_interval != 0 {
                continue;
            }
            ticks[column] = ('│', self.palette.grid);

            let Some(label) = DateTime::from_timestamp(candle.time, 0).map(|t| t.format(format).to_string()) else {
                continue;
            };
            let start = column.min((self.width as usize).saturating_sub(label.chars().count()));
            if start < next_free || start + label.chars().count() > self.width as usize {
                continue;
            }
            for (offset, ch) in label.chars().enumerate() {
                labels[start + offset] = (ch, self.palette.text);
            }
            next_free = start + label.chars().count() + 2;
        }

        let padding = " ".repeat(self.y_axis_width as usize);
        vec![
            cells_to_line(padding.clone(), self.palette.grid, ticks),
            cells_to_line(padding, self.palette.grid, labels),
        ]
    }
}

/// Positions des chandeliers dans la zone graphique
///
/// CONCEPT : Accumulator pattern pour éviter le drift
/// - position = index × spacing (pas position_précédente + spacing)
/// - chandeliers, ticks et labels partagent ces positions
/// - chandelier unique : centré
fn compute_candle_positions(chart_width: usize, num_candles: usize) -> Vec<usize> {
    if num_candles == 0 || chart_width == 0 {
        return Vec::new();
    }

    if num_candles == 1 {
        return vec![chart_width / 2];
    }

    let spacing = chart_width as f64 / num_candles as f64;
    (0..num_candles)
        .map(|i| ((i as f64 * spacing).round() as usize).min(chart_width - 1))
        .collect()
}

/// Regroupe des cellules de même couleur en Spans
fn cells_to_line(prefix: String, prefix_color: Color, cells: Vec<(char, Color)>) -> Line<'static> {
    let mut spans = vec![Span::styled(prefix, Style::default().fg(prefix_color))];
    let mut run = String::new();
    let mut run_color: Option<Color> = None;

    for (ch, color) in cells {
        if run_color != Some(color) && !run.is_empty() {
            spans.push(Span::styled(std::mem::take(&mut run), Style::default().fg(run_color.unwrap_or(color))));
        }
        run_color = Some(color);
        run.push(ch);
    }
    if let Some(color) = run_color {
        spans.push(Span::styled(run, Style::default().fg(color)));
    }

    Line::from(spans)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Theme;

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn candles() -> Vec<Candle> {
        vec![
            Candle::new(0, 10.0, 14.0, 9.0, 13.0, 100.0),
            Candle::new(3600, 13.0, 13.5, 8.0, 9.0, 50.0),
            Candle::new(7200, 9.0, 12.0, 8.5, 11.0, 10.0),
        ]
    }

    #[test]
    fn test_positions_spread_over_width() {
        assert!(compute_candle_positions(10, 0).is_empty());
        assert_eq!(compute_candle_positions(10, 1), vec![5]);
        assert_eq!(compute_candle_positions(10, 5), vec![0, 2, 4, 6, 8]);
        // Plus de chandeliers que de colonnes : jamais hors de la zone
        assert!(compute_candle_positions(3, 6).iter().all(|&c| c < 3));
    }

    #[test]
    fn test_render_lines_height_and_width() {
        let candles = candles();
        let renderer = CandlestickRenderer::new(&candles, &[], Theme::Dark.palette(), 100, 22);
        let lines = renderer.render_lines();

        assert_eq!(lines.len(), 22);
        for line in &lines {
            assert_eq!(line_text(line).chars().count(), 100);
        }
    }

    #[test]
    fn test_candles_use_palette_colors() {
        let candles = candles();
        let palette = Theme::Light.palette();
        let renderer = CandlestickRenderer::new(&candles, &[], palette, 100, 22);
        let lines = renderer.render_lines();

        let colors: Vec<Color> = lines
            .iter()
            .flat_map(|l| l.spans.iter())
            .filter(|s| s.content.contains(UNICODE_BODY))
            .filter_map(|s| s.style.fg)
            .collect();
        assert!(colors.contains(&palette.candle_up));
        assert!(colors.contains(&palette.candle_down));
    }

    #[test]
    fn test_overlay_is_drawn_in_its_color() {
        let candles = candles();
        // Bien au-dessus des chandeliers : jamais masqué par un corps
        let points = [PricePoint::new(0, 20.0), PricePoint::new(3600, 20.0), PricePoint::new(7200, 20.0)];
        let overlays = [Overlay { points: &points, color: Color::Magenta }];
        let renderer = CandlestickRenderer::new(&candles, &overlays, Theme::Dark.palette(), 100, 22);

        let overlay_spans: Vec<_> = renderer
            .render_lines()
            .iter()
            .flat_map(|l| l.spans.clone())
            .filter(|s| s.content.contains(UNICODE_OVERLAY))
            .collect();
        assert!(!overlay_spans.is_empty());
        assert!(overlay_spans.iter().all(|s| s.style.fg == Some(Color::Magenta)));
    }

    #[test]
    fn test_only_last_candles_fit() {
        let many: Vec<Candle> = (0..500).map(|i| Candle::new(i * 60, 1.0, 2.0, 0.5, 1.5, 1.0)).collect();
        let renderer = CandlestickRenderer::new(&many, &[], Theme::Dark.palette(), 100, 20);
        assert_eq!(renderer.visible().len(), 88);
        assert_eq!(renderer.visible().last().map(|c| c.time), Some(499 * 60));
    }

    #[test]
    fn test_x_axis_label_format_follows_spacing() {
        let intraday = candles();
        let renderer = CandlestickRenderer::new(&intraday, &[], Theme::Dark.palette(), 100, 20);
        assert_eq!(renderer.label_format(), "%H:%M");
        let labels = line_text(&renderer.render_lines()[19]);
        assert!(labels.contains("00:00"));

        let daily = [Candle::new(0, 1.0, 2.0, 0.5, 1.5, 1.0), Candle::new(86_400, 1.0, 2.0, 0.5, 1.5, 1.0)];
        let renderer = CandlestickRenderer::new(&daily, &[], Theme::Dark.palette(), 100, 20);
        assert_eq!(renderer.label_format(), "%d/%m");
    }

    #[test]
    fn test_volume_line_scales_to_max() {
        let candles = candles();
        let bars: Vec<HistogramPoint> = candles
            .iter()
            .map(|c| HistogramPoint { time: c.time, value: c.volume, color: Color::Green })
            .collect();
        let renderer = CandlestickRenderer::new(&candles, &[], Theme::Dark.palette(), 100, 20);
        let text = line_text(&renderer.render_volume_line(&bars));
        assert!(text.contains('█'));
        assert!(text.starts_with("      vol │ "));
    }

    #[test]
    fn test_empty_input_renders_nothing() {
        let renderer = CandlestickRenderer::new(&[], &[], Theme::Dark.palette(), 100, 20);
        assert!(renderer.render_lines().is_empty());
    }
}
