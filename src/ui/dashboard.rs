// ============================================================================
// Dashboard - Rendu de l'interface principale
// ============================================================================
// Dessine le tableau de bord du bot avec les widgets de ratatui
//
// Disposition :
//   ┌──────────────── Header ────────────────┐
//   │ Symboles │ Positions        │ Gains    │
//   │          │ Historique       │ Stats    │
//   └──────────────── Footer ────────────────┘
//
// CONCEPTS RATATUI :
// 1. Table : lignes + largeurs de colonnes (Row, Cell, Constraint)
// 2. List : symboles suivis, sélection en REVERSED
// 3. Layout imbriqués : vertical puis horizontal
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table},
    Frame,
};
use serde_json::Value;

use crate::app::{App, PositionRow, Screen};
use crate::ui::chart::render_chart;
use crate::ui::surface::TerminalSurface;

/// Dessine l'interface complète
///
/// CONCEPT RUST : Routing avec match sur enum
/// - Le compilateur garantit l'exhaustivité (tous les écrans gérés)
pub fn render(frame: &mut Frame, app: &App, surface: Option<&TerminalSurface>, last_error: Option<&str>) {
    match app.current_screen {
        Screen::Dashboard => render_dashboard(frame, app),
        Screen::ChartView => render_chart(frame, app, surface, last_error),
    }
}

fn render_dashboard(frame: &mut Frame, app: &App) {
    let chunks = create_layout(frame.size());

    render_header(frame, app, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(24), // Symboles
            Constraint::Min(0),     // Positions + historique
            Constraint::Length(34), // Gains + statistiques
        ])
        .split(chunks[1]);

    let center = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Min(0)])
        .split(columns[1]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0)])
        .split(columns[2]);

    render_symbols(frame, app, columns[0]);
    render_positions(frame, app, center[0]);
    render_history(frame, app, center[1]);
    render_profit_summary(frame, app, right[0]);
    render_statistics(frame, app, right[1]);

    render_footer(frame, app, chunks[2]);
}

/// Header, contenu, footer
fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Contenu
            Constraint::Length(3), // Footer
        ])
        .split(area)
        .to_vec()
}

fn panel(title: &str, app: &App) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.palette().accent))
        .title(format!(" {} ", title))
}

fn header_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

fn signed_color(value: f64) -> Color {
    if value >= 0.0 {
        Color::Green
    } else {
        Color::Red
    }
}

fn format_price(price: Option<f64>) -> String {
    price.map(|p| format!("{:.4}", p)).unwrap_or_else(|| "-".to_string())
}

// ============================================================================
// Header
// ============================================================================

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" TradeWatch ")
        .title_alignment(Alignment::Center);

    let bot_state = match &app.status {
        Some(status) => {
            let open = status.values().filter(|p| p.in_position).count();
            Span::styled(
                format!("● Bot connecté : {} symboles, {} positions ouvertes", status.len(), open),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )
        }
        None => Span::styled(
            "○ En attente de /status",
            Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
        ),
    };

    let paragraph = Paragraph::new(Line::from(bot_state))
        .block(block)
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Symboles suivis
// ============================================================================

fn render_symbols(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel("📊 Symboles", app);

    if app.symbols.is_empty() {
        let paragraph = Paragraph::new(Line::from(Span::styled("Aucun symbole", Style::default().fg(Color::Gray))))
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app
        .symbols
        .iter()
        .enumerate()
        .map(|(index, symbol)| {
            let price = app.prices.get(symbol).copied();
            let line = format!(" {:<9} {:>10}", symbol, format_price(price));

            let style = if price.is_some() {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::Gray)
            };

            if index == app.selected_index {
                ListItem::new(line).style(style.add_modifier(Modifier::BOLD).add_modifier(Modifier::REVERSED))
            } else {
                ListItem::new(line).style(style)
            }
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

// ============================================================================
// Positions
// ============================================================================

fn position_cells(row: &PositionRow<'_>) -> Row<'static> {
    let (state, state_style) = if row.status.in_position {
        ("OUI", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        ("non", Style::default().fg(Color::Gray))
    };

    let change = match row.change_pct {
        Some(pct) => Cell::from(format!("{:+.2}%", pct)).style(Style::default().fg(signed_color(pct))),
        None => Cell::from("-"),
    };

    let entry = if row.status.in_position {
        format_price(Some(row.status.entry_price))
    } else {
        "-".to_string()
    };

    Row::new(vec![
        Cell::from(row.symbol.to_string()),
        Cell::from(state).style(state_style),
        Cell::from(entry),
        Cell::from(format_price(row.price)),
        change,
        Cell::from(format_price(row.status.max_price)),
        Cell::from(row.status.rsi.map(|r| format!("{:.1}", r)).unwrap_or_else(|| "-".to_string())),
    ])
}

fn render_positions(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel("Positions", app);

    if app.status.is_none() {
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("Statut du bot indisponible", Style::default().fg(Color::Yellow))),
        ])
        .block(block)
        .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
        return;
    }

    let selected = app.selected_symbol();
    let rows: Vec<Row> = app
        .position_rows()
        .iter()
        .map(|row| {
            let cells = position_cells(row);
            if Some(row.symbol) == selected {
                cells.style(Style::default().add_modifier(Modifier::BOLD))
            } else {
                cells
            }
        })
        .collect();

    let header = Row::new(vec!["Symbole", "Position", "Entrée", "Prix", "Var.", "Max", "RSI"]).style(header_style());

    let widths = [
        Constraint::Length(10),
        Constraint::Length(9),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(9),
        Constraint::Length(12),
        Constraint::Length(6),
    ];

    let table = Table::new(rows, widths).header(header).block(block);
    frame.render_widget(table, area);
}

// ============================================================================
// Historique des trades
// ============================================================================

fn render_history(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel("Historique", app);

    if app.history.is_empty() {
        let paragraph = Paragraph::new(Line::from(Span::styled("Aucun trade", Style::default().fg(Color::Gray))))
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
        return;
    }

    // Les plus récents en premier
    let rows: Vec<Row> = app
        .history
        .iter()
        .rev()
        .map(|trade| {
            let change = match trade.change_pct {
                Some(pct) => Cell::from(format!("{:+.2}%", pct)).style(Style::default().fg(signed_color(pct))),
                None => Cell::from("-"),
            };
            Row::new(vec![
                Cell::from(trade.date.clone()),
                Cell::from(trade.symbol.clone()),
                Cell::from(trade.action.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
                Cell::from(format_price(trade.price)),
                Cell::from(trade.rsi.map(|r| format!("{:.1}", r)).unwrap_or_else(|| "-".to_string())),
                change,
            ])
        })
        .collect();

    let header = Row::new(vec!["Date", "Symbole", "Action", "Prix", "RSI", "Var."]).style(header_style());

    let widths = [
        Constraint::Length(19),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(12),
        Constraint::Length(6),
        Constraint::Length(9),
    ];

    frame.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

// ============================================================================
// Gains et statistiques
// ============================================================================

fn render_profit_summary(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel("Gains", app);

    let lines = match app.profit_summary() {
        None => vec![Line::from(Span::styled("-", Style::default().fg(Color::Gray)))],
        Some(summary) => {
            let average = match summary.average_pct {
                Some(avg) => Span::styled(format!("{:+.2}%", avg), Style::default().fg(signed_color(avg))),
                None => Span::raw("-"),
            };
            vec![
                Line::from(vec![
                    Span::raw("Total     : "),
                    Span::styled(
                        format!("{:+.2}%", summary.total_pct),
                        Style::default()
                            .fg(signed_color(summary.total_pct))
                            .add_modifier(Modifier::BOLD),
                    ),
                ]),
                Line::from(vec![Span::raw("Moyenne   : "), average]),
                Line::from(format!("Actives   : {}", summary.active)),
                Line::from(format!("Sans prix : {}", summary.unpriced)),
            ]
        }
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Valeur de /estadisticas sans les guillemets JSON
fn format_statistic(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{:.2}", f),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

fn render_statistics(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel("Statistiques", app);

    let lines: Vec<Line> = if app.statistics.is_empty() {
        vec![Line::from(Span::styled("-", Style::default().fg(Color::Gray)))]
    } else {
        app.statistics
            .iter()
            .map(|(key, value)| {
                Line::from(vec![
                    Span::styled(format!("{}: ", key), Style::default().fg(Color::Cyan)),
                    Span::raw(format_statistic(value)),
                ])
            })
            .collect()
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

// ============================================================================
// Footer : raccourcis, message du bot, confirmation de quit
// ============================================================================

/// Raccourci clavier en jaune gras
pub(crate) fn key_hint(label: &str) -> Span<'static> {
    Span::styled(
        label.to_string(),
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    )
}

/// CONCEPT : Style avec BLINK pour attirer l'attention
pub(crate) fn quit_confirmation_line() -> Line<'static> {
    Line::from(vec![
        Span::styled(
            "⚠  Appuyez sur ",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "[q]",
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::SLOW_BLINK),
        ),
        Span::styled(
            " à nouveau pour quitter, ou n'importe quelle autre touche pour annuler ⚠",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
    ])
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let line = if app.is_awaiting_quit_confirmation() {
        quit_confirmation_line()
    } else {
        let mut spans = vec![
            key_hint("[q]"),
            Span::raw(" Quit  "),
            key_hint("[↑↓ / j k]"),
            Span::raw(" Navigate  "),
            key_hint("[Enter]"),
            Span::raw(" Chart  "),
            Span::styled("[s]", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw(" Start  "),
            Span::styled("[x]", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(" Stop  "),
            key_hint("[t]"),
            Span::raw(" Theme"),
        ];
        if let Some(message) = &app.message {
            spans.push(Span::raw("  │ "));
            spans.push(Span::styled(message.clone(), Style::default().fg(Color::Cyan)));
        }
        Line::from(spans)
    };

    let paragraph = Paragraph::new(vec![line])
        .block(block)
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::DashboardUpdate;
    use crate::chart::Theme;
    use crate::models::{Interval, PositionStatus, PriceMap, StatusMap, TradeRecord};
    use ratatui::{backend::TestBackend, Terminal};

    fn app() -> App {
        App::new(
            vec!["ETHUSDT".to_string(), "ADAUSDT".to_string()],
            Interval::H1,
            None,
            Theme::Dark,
        )
    }

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal.draw(|frame| render(frame, app, None, None)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_dashboard_without_status() {
        let text = draw(&app());
        assert!(text.contains("Statut du bot indisponible"));
        assert!(text.contains("ETHUSDT"));
        assert!(text.contains("Aucun trade"));
    }

    #[test]
    fn test_dashboard_positions_and_history() {
        let mut app = app();
        let mut status = StatusMap::new();
        status.insert(
            "ETHUSDT".to_string(),
            PositionStatus {
                in_position: true,
                entry_price: 100.0,
                ..Default::default()
            },
        );
        app.apply_update(DashboardUpdate::Status(Some(status)));

        let mut prices = PriceMap::new();
        prices.insert("ETHUSDT".to_string(), 110.0);
        app.apply_update(DashboardUpdate::Prices(prices));

        app.apply_update(DashboardUpdate::History(vec![TradeRecord {
            date: "2024-05-01 10:00:00".to_string(),
            symbol: "ETHUSDT".to_string(),
            action: "VENTA".to_string(),
            ..Default::default()
        }]));

        let text = draw(&app);
        assert!(text.contains("OUI"));
        assert!(text.contains("+10.00%"));
        assert!(text.contains("VENTA"));
    }

    #[test]
    fn test_footer_shows_quit_confirmation_and_message() {
        let mut app = app();
        app.set_message("Bot detenido");
        assert!(draw(&app).contains("Bot detenido"));

        app.request_quit();
        assert!(draw(&app).contains("à nouveau pour quitter"));
    }

    #[test]
    fn test_chart_screen_without_surface() {
        let mut app = app();
        app.show_chart();
        assert!(draw(&app).contains("Graphique indisponible"));
    }

    #[test]
    fn test_format_statistic() {
        assert_eq!(format_statistic(&Value::from("ok")), "ok");
        assert_eq!(format_statistic(&Value::from(3)), "3");
        assert_eq!(format_statistic(&Value::from(1.5)), "1.50");
    }
}
