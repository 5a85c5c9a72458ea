// ============================================================================
// Structure : App
// ============================================================================
// État global de l'application TUI : écran courant, symbole sélectionné,
// réglages du graphique et dernières données du tableau de bord.
//
// PATTERN : "Application State"
// - l'UI ne fait que lire App
// - toutes les modifications passent par les méthodes de App
// - les ressources vivantes (ChartView, tâches tokio) restent dans main.rs
// ============================================================================

use crate::api::DashboardUpdate;
use crate::chart::Theme;
use crate::indicators::IndicatorKind;
use crate::models::{
    change_percent, Interval, PositionStatus, PriceMap, ProfitSummary, Statistics, StatusMap, TradeRecord,
};

/// Écrans de l'application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Vue principale : positions, prix, historique
    Dashboard,

    /// Vue graphique du symbole sélectionné
    ChartView,
}

/// Une ligne du tableau des positions
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRow<'a> {
    pub symbol: &'a str,
    pub status: &'a PositionStatus,
    pub price: Option<f64>,
    /// None sans prix courant ou avec un prix d'entrée nul
    pub change_pct: Option<f64>,
}

/// État principal de l'application
pub struct App {
    pub running: bool,

    /// Symboles suivis, dans l'ordre d'affichage
    pub symbols: Vec<String>,
    pub selected_index: usize,
    pub current_screen: Screen,

    /// Réglages du graphique
    pub interval: Interval,
    pub indicator: Option<IndicatorKind>,
    pub theme: Theme,

    /// Two-step quit : première pression de 'q' → true, deuxième → quit
    pub confirm_quit: bool,

    /// Dernier /status ; None tant qu'il n'est pas disponible ou après un échec
    pub status: Option<StatusMap>,
    pub prices: PriceMap,
    pub history: Vec<TradeRecord>,
    pub statistics: Statistics,

    /// Message affiché dans le footer (réponse du bot, erreur)
    pub message: Option<String>,
}

impl App {
    pub fn new(symbols: Vec<String>, interval: Interval, indicator: Option<IndicatorKind>, theme: Theme) -> Self {
        Self {
            running: true,
            symbols,
            selected_index: 0,
            current_screen: Screen::Dashboard,
            interval,
            indicator,
            theme,
            confirm_quit: false,
            status: None,
            prices: PriceMap::new(),
            history: Vec::new(),
            statistics: Statistics::new(),
            message: None,
        }
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// CONCEPT RUST : saturating_sub, jamais de panic sur un usize
    pub fn navigate_up(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn navigate_down(&mut self) {
        let max_index = self.symbols.len().saturating_sub(1);
        self.selected_index = (self.selected_index + 1).min(max_index);
    }

    pub fn selected_symbol(&self) -> Option<&str> {
        self.symbols.get(self.selected_index).map(String::as_str)
    }

    pub fn show_chart(&mut self) {
        self.current_screen = Screen::ChartView;
    }

    pub fn show_dashboard(&mut self) {
        self.current_screen = Screen::Dashboard;
    }

    pub fn is_on_dashboard(&self) -> bool {
        self.current_screen == Screen::Dashboard
    }

    pub fn is_on_chart(&self) -> bool {
        self.current_screen == Screen::ChartView
    }

    /// 1m → 5m → 15m → 1h → 4h → 1d → 1m
    pub fn next_interval(&mut self) {
        self.interval = self.interval.next();
    }

    pub fn previous_interval(&mut self) {
        self.interval = self.interval.previous();
    }

    /// Aucun → RSI → EMA → SMA → MACD → Bollinger → aucun
    pub fn cycle_indicator(&mut self) {
        self.indicator = IndicatorKind::cycle(self.indicator);
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggle();
    }

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    /// Applique une mise à jour du poller ou d'une commande du bot
    pub fn apply_update(&mut self, update: DashboardUpdate) {
        match update {
            DashboardUpdate::Status(status) => self.status = status,
            DashboardUpdate::Prices(prices) => self.prices = prices,
            DashboardUpdate::History(history) => self.history = history,
            DashboardUpdate::Statistics(statistics) => self.statistics = statistics,
            DashboardUpdate::Message(message) => self.message = Some(message),
        }
    }

    /// Lignes du tableau des positions, dans l'ordre de /status
    pub fn position_rows(&self) -> Vec<PositionRow<'_>> {
        let Some(status) = &self.status else {
            return Vec::new();
        };
        status
            .iter()
            .map(|(symbol, position)| {
                let price = self.prices.get(symbol).copied();
                PositionRow {
                    symbol,
                    status: position,
                    price,
                    change_pct: price.and_then(|p| change_percent(p, position.entry_price)),
                }
            })
            .collect()
    }

    /// Résumé des gains, None tant que /status n'est pas disponible
    pub fn profit_summary(&self) -> Option<ProfitSummary> {
        self.status
            .as_ref()
            .map(|status| ProfitSummary::derive(status, &self.prices))
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(
            vec!["ETHUSDT".to_string(), "ADAUSDT".to_string(), "SOLUSDT".to_string()],
            Interval::H1,
            None,
            Theme::Dark,
        )
    }

    fn open(entry: f64) -> PositionStatus {
        PositionStatus {
            in_position: true,
            entry_price: entry,
            ..Default::default()
        }
    }

    #[test]
    fn test_app_creation() {
        let app = app();
        assert!(app.is_running());
        assert!(app.is_on_dashboard());
        assert_eq!(app.selected_symbol(), Some("ETHUSDT"));
        assert!(app.status.is_none());
    }

    #[test]
    fn test_two_step_quit() {
        let mut app = app();
        app.request_quit();
        assert!(app.is_awaiting_quit_confirmation());
        app.cancel_quit();
        assert!(!app.is_awaiting_quit_confirmation());
        app.quit();
        assert!(!app.is_running());
    }

    #[test]
    fn test_navigation() {
        let mut app = app();
        app.navigate_down();
        app.navigate_down();
        assert_eq!(app.selected_symbol(), Some("SOLUSDT"));

        // Au max : reste sur le dernier
        app.navigate_down();
        assert_eq!(app.selected_index, 2);

        app.navigate_up();
        app.navigate_up();
        app.navigate_up();
        assert_eq!(app.selected_index, 0);
    }

    #[test]
    fn test_navigation_without_symbols() {
        let mut app = App::new(Vec::new(), Interval::H1, None, Theme::Dark);
        app.navigate_down();
        assert_eq!(app.selected_index, 0);
        assert_eq!(app.selected_symbol(), None);
    }

    #[test]
    fn test_chart_settings_cycle() {
        let mut app = app();
        app.next_interval();
        assert_eq!(app.interval, Interval::H4);
        app.previous_interval();
        app.previous_interval();
        assert_eq!(app.interval, Interval::M15);

        app.cycle_indicator();
        assert_eq!(app.indicator, Some(IndicatorKind::Rsi));

        app.toggle_theme();
        assert_eq!(app.theme, Theme::Light);
    }

    #[test]
    fn test_status_failure_clears_table() {
        let mut app = app();
        let mut status = StatusMap::new();
        status.insert("ETHUSDT".to_string(), open(100.0));
        app.apply_update(DashboardUpdate::Status(Some(status)));
        assert_eq!(app.position_rows().len(), 1);

        app.apply_update(DashboardUpdate::Status(None));
        assert!(app.position_rows().is_empty());
        assert!(app.profit_summary().is_none());
    }

    #[test]
    fn test_position_rows_change_percent() {
        let mut app = app();
        let mut status = StatusMap::new();
        status.insert("ETHUSDT".to_string(), open(100.0));
        status.insert("ADAUSDT".to_string(), open(0.0));
        status.insert("SOLUSDT".to_string(), open(50.0));
        app.apply_update(DashboardUpdate::Status(Some(status)));

        let mut prices = PriceMap::new();
        prices.insert("ETHUSDT".to_string(), 112.0);
        prices.insert("ADAUSDT".to_string(), 0.5);
        app.apply_update(DashboardUpdate::Prices(prices));

        let rows = app.position_rows();
        let row = |symbol: &str| rows.iter().find(|r| r.symbol == symbol).cloned().unwrap();
        assert!((row("ETHUSDT").change_pct.unwrap() - 12.0).abs() < 1e-9);
        // Prix d'entrée nul : pas de pourcentage
        assert_eq!(row("ADAUSDT").change_pct, None);
        // Pas de prix courant
        assert_eq!(row("SOLUSDT").price, None);
        assert_eq!(row("SOLUSDT").change_pct, None);

        let summary = app.profit_summary().unwrap();
        assert_eq!(summary.active, 1);
        assert_eq!(summary.unpriced, 2);
    }

    #[test]
    fn test_message_update() {
        let mut app = app();
        app.apply_update(DashboardUpdate::Message("Bot iniciado".to_string()));
        assert_eq!(app.message.as_deref(), Some("Bot iniciado"));
    }
}
