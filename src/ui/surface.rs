// ============================================================================
// Surface terminal
// ============================================================================
// Implémentation de RenderSurface pour ratatui : la session y enregistre
// ses séries, le rendu les dessine à chaque frame.
//
// Disposition verticale :
//   ┌ Prix : chandeliers + overlays (EMA/SMA/Bollinger)
//   ├ Volume : une ligne de barres ▁..█
//   └ Oscillateur : RSI ou MACD (seulement si une série l'utilise)
// ============================================================================

use std::collections::BTreeMap;

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, Paragraph, Widget},
};
use tracing::debug;

use crate::chart::{
    Dimensions, HistogramPoint, Palette, Pane, RenderSurface, SeriesData, SeriesId, SeriesRole,
    SeriesSpec, SurfaceError, SurfaceFactory,
};
use crate::models::{Candle, PricePoint};
use crate::ui::candlestick_text::{CandlestickRenderer, Overlay};
use crate::ui::chart::render_oscillator;

/// Hauteur minimale du volet oscillateur
const OSCILLATOR_MIN_ROWS: u16 = 6;

/// Surface dessinée dans le terminal
#[derive(Debug)]
pub struct TerminalSurface {
    dimensions: Dimensions,
    palette: Palette,
    next_id: u64,
    series: BTreeMap<SeriesId, (SeriesSpec, SeriesData)>,
}

impl TerminalSurface {
    pub fn new(dimensions: Dimensions, palette: Palette) -> Self {
        Self {
            dimensions,
            palette,
            next_id: 0,
            series: BTreeMap::new(),
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    fn find(&self, role: SeriesRole) -> Option<&SeriesData> {
        self.series
            .values()
            .find(|(spec, _)| spec.role == role)
            .map(|(_, data)| data)
    }

    /// Chandelles affichées
    pub fn candles(&self) -> &[Candle] {
        match self.find(SeriesRole::Candles) {
            Some(SeriesData::Candles(candles)) => candles,
            _ => &[],
        }
    }

    fn volume(&self) -> &[HistogramPoint] {
        match self.find(SeriesRole::Volume) {
            Some(SeriesData::Histogram(bars)) => bars,
            _ => &[],
        }
    }

    /// Séries ligne d'un volet, avec leur SeriesSpec
    pub fn lines_in(&self, pane: Pane) -> Vec<(&SeriesSpec, &[PricePoint])> {
        self.series
            .values()
            .filter(|(spec, _)| spec.pane == pane)
            .filter_map(|(spec, data)| match data {
                SeriesData::Line(points) => Some((spec, points.as_slice())),
                _ => None,
            })
            .collect()
    }

    /// Histogrammes du volet oscillateur (histogramme MACD)
    pub fn oscillator_bars(&self) -> Vec<(&SeriesSpec, &[HistogramPoint])> {
        self.series
            .values()
            .filter(|(spec, _)| spec.pane == Pane::Oscillator)
            .filter_map(|(spec, data)| match data {
                SeriesData::Histogram(bars) => Some((spec, bars.as_slice())),
                _ => None,
            })
            .collect()
    }

    fn has_oscillator(&self) -> bool {
        self.series.values().any(|(spec, _)| spec.pane == Pane::Oscillator)
    }

    /// Découpe la zone : prix, volume, oscillateur éventuel
    fn layout(&self, area: Rect) -> (Rect, Rect, Option<Rect>) {
        if self.has_oscillator() && area.height >= 3 * OSCILLATOR_MIN_ROWS {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Percentage(62),
                    Constraint::Length(1),
                    Constraint::Min(OSCILLATOR_MIN_ROWS),
                ])
                .split(area);
            (chunks[0], chunks[1], Some(chunks[2]))
        } else {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(1)])
                .split(area);
            (chunks[0], chunks[1], None)
        }
    }
}

impl RenderSurface for TerminalSurface {
    fn add_series(&mut self, spec: SeriesSpec) -> SeriesId {
        self.next_id += 1;
        let id = SeriesId(self.next_id);
        self.series.insert(id, (spec, SeriesData::empty(spec.kind)));
        id
    }

    fn set_data(&mut self, id: SeriesId, data: SeriesData) -> Result<(), SurfaceError> {
        let (spec, slot) = self.series.get_mut(&id).ok_or(SurfaceError::UnknownSeries(id))?;
        if spec.kind != data.kind() {
            return Err(SurfaceError::KindMismatch {
                id,
                expected: spec.kind,
                found: data.kind(),
            });
        }
        *slot = data;
        Ok(())
    }

    fn remove_series(&mut self, id: SeriesId) -> Result<(), SurfaceError> {
        self.series.remove(&id).map(|_| ()).ok_or(SurfaceError::UnknownSeries(id))
    }

    fn apply_width(&mut self, width: u16) {
        self.dimensions.width = width;
    }

    fn series_count(&self) -> usize {
        self.series.len()
    }

    fn remove(self) {
        debug!(series = self.series.len(), "Terminal surface released");
    }
}

// ============================================================================
// Rendu
// ============================================================================
// CONCEPT RATATUI : Widget pour une référence
// - la surface reste possédée par la session
// - le rendu ne fait que l'emprunter à chaque frame
// ============================================================================

impl Widget for &TerminalSurface {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // La largeur appliquée par la session borne la zone dessinée
        let area = Rect {
            width: area.width.min(self.dimensions.width.max(1)),
            ..area
        };
        Block::default()
            .style(Style::default().bg(self.palette.background))
            .render(area, buf);

        let (price_area, volume_area, oscillator_area) = self.layout(area);

        let price_lines = self.lines_in(Pane::Price);
        let overlays: Vec<Overlay> = price_lines
            .iter()
            .map(|&(spec, points)| Overlay {
                points,
                color: spec.color,
            })
            .collect();

        let renderer = CandlestickRenderer::new(
            self.candles(),
            &overlays,
            self.palette,
            price_area.width,
            price_area.height,
        );
        Paragraph::new(renderer.render_lines()).render(price_area, buf);
        Paragraph::new(renderer.render_volume_line(self.volume())).render(volume_area, buf);

        if let Some(oscillator_area) = oscillator_area {
            render_oscillator(self, renderer.visible(), oscillator_area, buf);
        }
    }
}

/// Fabrique de surfaces terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalSurfaceFactory;

impl SurfaceFactory for TerminalSurfaceFactory {
    type Surface = TerminalSurface;

    fn create(&mut self, dimensions: Dimensions, palette: &Palette) -> Result<TerminalSurface, SurfaceError> {
        if dimensions.width == 0 || dimensions.height == 0 {
            return Err(SurfaceError::Unavailable(format!(
                "terminal area {}x{} is empty",
                dimensions.width, dimensions.height
            )));
        }
        Ok(TerminalSurface::new(dimensions, *palette))
    }
}

// ============================================================================
// Tests
// ============================================================================
