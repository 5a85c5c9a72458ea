// ============================================================================
// Chart - Écran graphique
// ============================================================================
// Header (symbole, intervalle, indicateur, thème, erreur éventuelle) puis
// la surface terminal de la session. Le volet oscillateur (RSI, MACD) est
// un widget Chart de ratatui, appelé par la surface.
//
// CONCEPTS RATATUI :
// 1. Chart widget : Dataset + Axis
// 2. Widget::render directement dans un Buffer (volet de la surface)
// ============================================================================

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Widget},
    Frame,
};

use crate::app::App;
use crate::chart::{Pane, SeriesRole};
use crate::models::Candle;
use crate::ui::dashboard::{key_hint, quit_confirmation_line};
use crate::ui::surface::TerminalSurface;

/// Niveaux de surachat / survente affichés avec le RSI
const RSI_GUIDES: [f64; 2] = [30.0, 70.0];

fn layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Header : 2 lignes + bordures
            Constraint::Min(0),    // Graphique
        ])
        .split(area)
        .to_vec()
}

fn body_block(app: &App) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.palette().grid))
        .title(format!(
            " 🕯️ {} · {} · {} ",
            app.selected_symbol().unwrap_or("?"),
            app.interval,
            app.indicator.map(|i| i.label()).unwrap_or("no indicator"),
        ))
}

/// Zone où la surface est dessinée ; sert aussi à dimensionner la session
pub fn chart_body_area(app: &App, area: Rect) -> Rect {
    body_block(app).inner(layout(area)[1])
}

/// Dessine l'écran graphique
pub fn render_chart(frame: &mut Frame, app: &App, surface: Option<&TerminalSurface>, last_error: Option<&str>) {
    let chunks = layout(frame.size());
    render_header(frame, app, surface, last_error, chunks[0]);

    let block = body_block(app);
    let inner = block.inner(chunks[1]);

    match surface {
        Some(surface) if !surface.candles().is_empty() => {
            frame.render_widget(block, chunks[1]);
            frame.render_widget(surface, inner);
        }
        Some(_) => {
            let message = match last_error {
                Some(err) => format!("Pas de données : {}", err),
                None => "Chargement des chandelles...".to_string(),
            };
            render_no_data(frame, chunks[1], &message);
        }
        None => render_no_data(frame, chunks[1], "Graphique indisponible"),
    }
}

// ============================================================================
// Header
// ============================================================================

fn render_header(
    frame: &mut Frame,
    app: &App,
    surface: Option<&TerminalSurface>,
    last_error: Option<&str>,
    area: Rect,
) {
    let palette = app.theme.palette();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent))
        .title(format!(" {} ", app.selected_symbol().unwrap_or("?")));

    let status = if app.is_awaiting_quit_confirmation() {
        quit_confirmation_line()
    } else if let Some(err) = last_error {
        Line::from(Span::styled(
            format!("⚠ {}", err),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))
    } else {
        price_line(surface.map(TerminalSurface::candles).unwrap_or(&[]), app)
    };

    let hints = Line::from(vec![
        key_hint("[h/l]"),
        Span::raw(" Interval  "),
        key_hint("[↑↓ / j k]"),
        Span::raw(" Symbol  "),
        key_hint("[i]"),
        Span::raw(" Indicator  "),
        key_hint("[t]"),
        Span::raw(" Theme  "),
        key_hint("[Esc]"),
        Span::raw(" Back  "),
        key_hint("[q]"),
        Span::raw(" Quit"),
    ]);

    let paragraph = Paragraph::new(vec![status, hints])
        .block(block)
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

/// Dernier prix et variation par rapport à la chandelle précédente
fn price_line(candles: &[Candle], app: &App) -> Line<'static> {
    let settings = format!(
        "  │ {} │ {} │ {}",
        app.interval,
        app.indicator.map(|i| i.label()).unwrap_or("-"),
        app.theme.label()
    );

    let [.., previous, last] = candles else {
        return Line::from(vec![Span::raw("Chargement..."), Span::raw(settings)]);
    };

    let change = if previous.close != 0.0 {
        (last.close - previous.close) / previous.close * 100.0
    } else {
        0.0
    };
    let palette = app.theme.palette();
    let color = if change >= 0.0 { palette.candle_up } else { palette.candle_down };
    let arrow = if change >= 0.0 { "▲" } else { "▼" };

    Line::from(vec![
        Span::raw("Prix: "),
        Span::styled(
            format!("{:.4}", last.close),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(format!("{} {:+.2}%", arrow, change), Style::default().fg(color)),
        Span::raw(settings),
    ])
}

// ============================================================================
// Volet oscillateur
// ============================================================================

/// Dessine RSI ou MACD sur les mêmes chandelles visibles que le volet prix
pub fn render_oscillator(surface: &TerminalSurface, visible: &[Candle], area: Rect, buf: &mut Buffer) {
    let palette = surface.palette();

    // x = index de la chandelle visible
    let x_of = |time: i64| {
        visible
            .binary_search_by_key(&time, |c| c.time)
            .ok()
            .map(|i| i as f64)
    };

    let mut series: Vec<(SeriesRole, Color, GraphType, Vec<(f64, f64)>)> = Vec::new();
    for (spec, points) in surface.lines_in(Pane::Oscillator) {
        let data = points.iter().filter_map(|p| x_of(p.time).map(|x| (x, p.value))).collect();
        series.push((spec.role, spec.color, GraphType::Line, data));
    }
    for (spec, bars) in surface.oscillator_bars() {
        let data = bars.iter().filter_map(|b| x_of(b.time).map(|x| (x, b.value))).collect();
        series.push((spec.role, spec.color, GraphType::Scatter, data));
    }
    series.sort_by_key(|(role, ..)| *role);

    let is_rsi = series.iter().any(|(role, ..)| *role == SeriesRole::Rsi);
    let x_max = visible.len().saturating_sub(1).max(1) as f64;

    let guides: Vec<Vec<(f64, f64)>> = if is_rsi {
        RSI_GUIDES.iter().map(|&level| vec![(0.0, level), (x_max, level)]).collect()
    } else {
        Vec::new()
    };

    let (y_min, y_max) = if is_rsi {
        (0.0, 100.0)
    } else {
        value_bounds(series.iter().flat_map(|(.., data)| data.iter().map(|&(_, y)| y)))
    };

    let mut datasets: Vec<Dataset> = guides
        .iter()
        .map(|points| {
            Dataset::default()
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(palette.grid))
                .data(points)
        })
        .collect();
    datasets.extend(series.iter().map(|(_, color, graph_type, data)| {
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(*graph_type)
            .style(Style::default().fg(*color))
            .data(data)
    }));

    let title = series
        .iter()
        .map(|(role, ..)| role.label())
        .collect::<Vec<_>>()
        .join(" · ");

    let y_labels = [y_min, (y_min + y_max) / 2.0, y_max]
        .iter()
        .map(|v| Span::styled(format!("{:.1}", v), Style::default().fg(palette.text)))
        .collect();

    Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(palette.grid))
                .title(Span::styled(format!(" {} ", title), Style::default().fg(palette.text))),
        )
        .x_axis(Axis::default().bounds([0.0, x_max]))
        .y_axis(
            Axis::default()
                .style(Style::default().fg(palette.grid))
                .bounds([y_min, y_max])
                .labels(y_labels),
        )
        .render(area, buf);
}

/// Bornes verticales avec le zéro inclus et 10% de marge
fn value_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((0.0_f64, 0.0_f64), |(min, max), v| (min.min(v), max.max(v)));
    if min == max {
        return (min - 1.0, max + 1.0);
    }
    let margin = (max - min) * 0.1;
    (min - margin, max + margin)
}

// ============================================================================
// Helper : Message quand pas de données
// ============================================================================

fn render_no_data(frame: &mut Frame, area: Rect, message: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" ⏳ ");

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::Yellow))),
        Line::from(""),
        Line::from(Span::styled("[Esc] Retour", Style::default().fg(Color::Gray))),
    ];

    let paragraph = Paragraph::new(text).block(block).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_bounds_include_zero() {
        let (min, max) = value_bounds([2.0, 4.0].into_iter());
        assert!(min < 0.0 && max > 4.0);

        let (min, max) = value_bounds([-3.0, -1.0].into_iter());
        assert!(min < -3.0 && max > 0.0);
    }

    #[test]
    fn test_value_bounds_flat_series() {
        assert_eq!(value_bounds(std::iter::empty()), (-1.0, 1.0));
    }

    #[test]
    fn test_body_area_is_inside_screen() {
        let app = App::new(vec!["ETHUSDT".to_string()], Default::default(), None, Default::default());
        let area = chart_body_area(&app, Rect::new(0, 0, 120, 40));
        assert_eq!(area, Rect::new(1, 5, 118, 34));
    }
}
