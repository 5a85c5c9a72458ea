// ============================================================================
// TradeWatch - Tableau de bord terminal du bot de trading
// ============================================================================
// Programme TUI : positions, prix et historique du bot, graphique en
// chandeliers avec indicateurs pour le symbole sélectionné.
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode : contrôle total du terminal
// 2. Event loop synchrone : événements, canaux tokio drainés, rendu
// 3. Runtime tokio à côté : fetchs et polling dans des tâches
// 4. RAII : annuler une Subscription arrête sa tâche
// ============================================================================

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use tradewatch::api::{spawn_dashboard_poller, BackendClient, BotController, DashboardUpdate};
use tradewatch::app::App;
use tradewatch::chart::view::OutcomeStatus;
use tradewatch::chart::{ChartSessionManager, ChartView, Dimensions};
use tradewatch::config::Config;
use tradewatch::indicators::IndicatorParams;
use tradewatch::models::Credentials;
use tradewatch::refresh::{FetchOutcome, RefreshController, Selection};
use tradewatch::ui::events::{
    is_down_event, is_enter_event, is_escape_event, is_indicator_event, is_next_interval_event,
    is_previous_interval_event, is_quit_event, is_start_bot_event, is_stop_bot_event, is_theme_event,
    is_up_event, Event,
};
use tradewatch::ui::{chart_body_area, render, EventHandler, TerminalSurfaceFactory};

type Tui = Terminal<CrosstermBackend<io::Stdout>>;
type TerminalChartView = ChartView<BackendClient, TerminalSurfaceFactory>;

// ============================================================================
// Initialisation du logging
// ============================================================================
// CONCEPT : Logging dans une app TUI
// - stdout appartient au TUI : on log vers un fichier
// - Rotation quotidienne automatique des logs
// ============================================================================

/// Initialise le système de logging vers fichier
///
/// Les logs sont écrits dans `--log-dir`, sinon
/// `~/.local/share/tradewatch/logs/tradewatch.log` (Linux).
///
/// ```bash
/// tail -f ~/.local/share/tradewatch/logs/tradewatch.log
/// RUST_LOG=tradewatch=trace tradewatch
/// ```
fn init_logging(log_dir: &Path) -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    std::fs::create_dir_all(log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "tradewatch.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false) // Pas de codes couleur dans le fichier
                .with_target(true)
                .with_thread_ids(true) // Les fetchs tournent sur les workers tokio
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradewatch=debug,info".into()),
        )
        .init();

    info!(?log_dir, "Logging initialized");
    Ok(())
}

// ============================================================================
// Ressources vivantes de la boucle UI
// ============================================================================
// App ne contient que de l'état affichable ; la vue graphique montée,
// le client et les canaux vivent ici.
// ============================================================================

struct Resources {
    client: Arc<BackendClient>,
    runtime: Handle,
    candle_period: Duration,
    params: IndicatorParams,
    credentials: Option<Credentials>,
    outcomes: UnboundedSender<FetchOutcome>,
    updates: UnboundedSender<DashboardUpdate>,

    /// Taille actuelle du terminal
    screen: Rect,

    /// Vue graphique, Some seulement sur l'écran graphique
    view: Option<TerminalChartView>,
}

impl Resources {
    fn chart_dimensions(&self, app: &App) -> Dimensions {
        let area = chart_body_area(app, self.screen);
        Dimensions::new(area.width, area.height)
    }

    /// Monte une vue graphique pour le symbole sélectionné
    fn open_chart(&mut self, app: &mut App) {
        let Some(symbol) = app.selected_symbol() else {
            app.set_message("Aucun symbole sélectionné");
            return;
        };
        let selection = Selection::new(symbol, app.interval);

        let refresh = RefreshController::new(
            Arc::clone(&self.client),
            self.runtime.clone(),
            self.candle_period,
            self.outcomes.clone(),
        );
        let session = ChartSessionManager::new(TerminalSurfaceFactory, self.params, app.indicator);
        let mut view = ChartView::new(refresh, session, selection);

        match view.mount(self.chart_dimensions(app), app.theme) {
            Ok(token) => {
                info!(selection = %view.selection(), token = token.0, "User opened chart view");
                self.view = Some(view);
                app.show_chart();
            }
            Err(e) => {
                error!(error = %e, "Failed to mount chart view");
                app.set_message(format!("Graphique indisponible : {}", e));
            }
        }
    }

    /// Démonte la vue : timer annulé, session détruite
    fn close_chart(&mut self) {
        if let Some(mut view) = self.view.take() {
            view.unmount();
        }
    }

    fn resize(&mut self, app: &App, columns: u16, rows: u16) {
        self.screen = Rect::new(0, 0, columns, rows);
        let dimensions = self.chart_dimensions(app);
        if let Some(view) = self.view.as_mut() {
            if let Err(e) = view.resize(dimensions) {
                warn!(error = %e, "Failed to resize chart session");
            }
        }
    }

    fn start_bot(&self, app: &mut App) {
        let Some(credentials) = self.credentials.clone() else {
            warn!("Bot start requested without credentials");
            app.set_message("Clé API manquante (--api-key / --api-secret)");
            return;
        };
        info!(testnet = credentials.use_testnet, "User requested bot start");
        app.set_message("Démarrage du bot...");

        let client = Arc::clone(&self.client);
        let updates = self.updates.clone();
        self.runtime.spawn(async move {
            let message = match client.start(&credentials).await {
                Ok(message) => {
                    info!(%message, "Bot started");
                    message
                }
                Err(e) => {
                    error!(error = %e, "Failed to start bot");
                    e.user_message()
                }
            };
            let _ = updates.send(DashboardUpdate::Message(message));
        });
    }

    fn stop_bot(&self, app: &mut App) {
        info!("User requested bot stop");
        app.set_message("Arrêt du bot...");

        let client = Arc::clone(&self.client);
        let updates = self.updates.clone();
        self.runtime.spawn(async move {
            let message = match client.stop().await {
                Ok(message) => {
                    info!(%message, "Bot stopped");
                    message
                }
                Err(e) => {
                    error!(error = %e, "Failed to stop bot");
                    e.user_message()
                }
            };
            let _ = updates.send(DashboardUpdate::Message(message));
        });
    }
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    let config = Config::parse();

    // Logging avant tout le reste ; un échec n'empêche pas de démarrer
    init_logging(&config.log_dir()).unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    config.validate().context("Configuration invalide")?;
    info!(backend = %config.backend_url, symbols = ?config.symbol_list(), "TradeWatch starting up");

    // CONCEPT : Async à côté du sync
    // - la boucle UI reste synchrone
    // - les fetchs tournent sur les workers du runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("tradewatch-worker")
        .build()
        .context("Échec de la création du runtime tokio")?;

    let client = Arc::new(
        BackendClient::new(&config.backend_url, config.timeout()).context("Échec de la création du client HTTP")?,
    );

    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel::<FetchOutcome>();
    let (update_tx, update_rx) = mpsc::unbounded_channel::<DashboardUpdate>();

    let poller = spawn_dashboard_poller(Arc::clone(&client), runtime.handle(), config.poll_periods(), update_tx.clone());

    let mut app = App::new(config.symbol_list(), config.interval, config.indicator, config.theme);

    debug!("Setting up terminal");
    let mut terminal = setup_terminal().context("Échec de l'initialisation du terminal")?;
    let screen = terminal.size().context("Taille du terminal inconnue")?;

    let mut resources = Resources {
        client,
        runtime: runtime.handle().clone(),
        candle_period: config.candle_period(),
        params: config.indicator_params(),
        credentials: config.credentials(),
        outcomes: outcome_tx,
        updates: update_tx,
        screen,
        view: None,
    };

    let events = EventHandler::default();

    info!("Starting event loop");
    let result = run(&mut terminal, &mut app, &mut resources, &events, outcome_rx, update_rx);

    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    resources.close_chart();
    poller.cancel();
    drop(resources);
    runtime.shutdown_timeout(Duration::from_secs(1));

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

// ============================================================================
// Event loop
// ============================================================================
// À chaque tour :
// 1. draine les résultats de fetch → vue graphique (filtre stale)
// 2. draine les mises à jour du poller → App
// 3. dessine
// 4. attend un événement (au plus tick_rate)
// ============================================================================

fn run(
    terminal: &mut Tui,
    app: &mut App,
    resources: &mut Resources,
    events: &EventHandler,
    mut outcome_rx: UnboundedReceiver<FetchOutcome>,
    mut update_rx: UnboundedReceiver<DashboardUpdate>,
) -> Result<()> {
    while app.is_running() {
        while let Ok(outcome) = outcome_rx.try_recv() {
            // Sans vue montée, le résultat n'a plus de destinataire
            let Some(view) = resources.view.as_mut() else {
                debug!(selection = %outcome.selection, "Dropping candle outcome, no chart mounted");
                continue;
            };
            match view.handle_outcome(outcome) {
                OutcomeStatus::Applied { candles } => debug!(candles, "Chart updated"),
                OutcomeStatus::Stale => {}
                OutcomeStatus::FetchFailed(message) => debug!(%message, "Chart refresh failed"),
            }
        }

        while let Ok(update) = update_rx.try_recv() {
            app.apply_update(update);
        }

        terminal.draw(|frame| {
            let view = resources.view.as_ref();
            render(
                frame,
                app,
                view.and_then(|v| v.session().surface()),
                view.and_then(|v| v.last_error()),
            );
        })?;

        match events.next() {
            Ok(event) => handle_event(app, resources, event),
            Err(e) => warn!(error = %e, "Failed to read terminal event"),
        }
    }

    Ok(())
}

/// Applique un événement ; toute touche non gérée annule la confirmation de quit
fn handle_event(app: &mut App, resources: &mut Resources, event: Event) {
    match event {
        Event::Key(_) if is_quit_event(&event) => {
            if app.is_awaiting_quit_confirmation() {
                info!("User confirmed quit");
                app.quit();
            } else {
                info!("User requested quit (awaiting confirmation)");
                app.request_quit();
            }
        }

        Event::Resize(columns, rows) => {
            debug!(columns, rows, "Terminal resized");
            resources.resize(app, columns, rows);
        }

        // ---------------------------------------------------------------
        // Dashboard
        // ---------------------------------------------------------------
        Event::Key(_) if is_up_event(&event) && app.is_on_dashboard() => {
            app.cancel_quit();
            app.navigate_up();
        }

        Event::Key(_) if is_down_event(&event) && app.is_on_dashboard() => {
            app.cancel_quit();
            app.navigate_down();
        }

        Event::Key(_) if is_enter_event(&event) && app.is_on_dashboard() => {
            app.cancel_quit();
            resources.open_chart(app);
        }

        Event::Key(_) if is_start_bot_event(&event) && app.is_on_dashboard() => {
            app.cancel_quit();
            resources.start_bot(app);
        }

        Event::Key(_) if is_stop_bot_event(&event) && app.is_on_dashboard() => {
            app.cancel_quit();
            resources.stop_bot(app);
        }

        Event::Key(_) if is_theme_event(&event) => {
            app.cancel_quit();
            app.toggle_theme();
            info!(theme = app.theme.label(), "User toggled theme");
            if let Some(view) = resources.view.as_mut() {
                if let Err(e) = view.set_theme(app.theme) {
                    error!(error = %e, "Failed to rebuild chart session with new theme");
                }
            }
        }

        // ---------------------------------------------------------------
        // Graphique
        // ---------------------------------------------------------------
        Event::Key(_) if is_escape_event(&event) && app.is_on_chart() => {
            app.cancel_quit();
            debug!("User returned to dashboard");
            resources.close_chart();
            app.show_dashboard();
        }

        Event::Key(_) if is_next_interval_event(&event) && app.is_on_chart() => {
            app.cancel_quit();
            app.next_interval();
            info!(interval = %app.interval, "User changed to next interval");
            if let Some(view) = resources.view.as_mut() {
                view.set_interval(app.interval);
            }
        }

        Event::Key(_) if is_previous_interval_event(&event) && app.is_on_chart() => {
            app.cancel_quit();
            app.previous_interval();
            info!(interval = %app.interval, "User changed to previous interval");
            if let Some(view) = resources.view.as_mut() {
                view.set_interval(app.interval);
            }
        }

        Event::Key(_) if (is_up_event(&event) || is_down_event(&event)) && app.is_on_chart() => {
            app.cancel_quit();
            if is_up_event(&event) {
                app.navigate_up();
            } else {
                app.navigate_down();
            }
            if let (Some(view), Some(symbol)) = (resources.view.as_mut(), app.selected_symbol()) {
                info!(symbol, "User changed chart symbol");
                view.set_symbol(symbol);
            }
        }

        Event::Key(_) if is_indicator_event(&event) && app.is_on_chart() => {
            app.cancel_quit();
            app.cycle_indicator();
            let label = app.indicator.map(|i| i.label()).unwrap_or("none");
            info!(indicator = label, "User changed indicator");
            if let Some(view) = resources.view.as_mut() {
                if let Err(e) = view.set_indicator(app.indicator) {
                    error!(error = %e, "Failed to switch indicator");
                }
            }
        }

        Event::Tick => {}

        Event::Key(_) => app.cancel_quit(),

        Event::Error => warn!("Terminal event error"),
    }
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| e.into())
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}
