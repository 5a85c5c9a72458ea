// ============================================================================
// Vue graphique : assemblage du pipeline pour une vue montée
// ============================================================================
// ChartView possède son propre RefreshController et sa propre session :
// deux vues montées ne partagent ni timer ni surface.
//
// Flux : FetchOutcome ─accept─▶ normalize ─▶ ChartSessionManager::update_data
// ============================================================================

use tracing::{debug, info, warn};

use crate::chart::session::ChartSessionManager;
use crate::chart::surface::{Dimensions, SurfaceError, SurfaceFactory};
use crate::chart::theme::Theme;
use crate::error::RefreshError;
use crate::indicators::IndicatorKind;
use crate::models::Interval;
use crate::normalizer::normalize;
use crate::refresh::{CandleSource, FetchOutcome, FetchToken, RefreshController, Selection};

/// Ce qu'il est advenu d'un résultat de fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Données appliquées à la session
    Applied { candles: usize },
    /// Résultat d'une sélection remplacée, ignoré
    Stale,
    /// Échec du fetch : les données affichées sont conservées
    FetchFailed(String),
}

/// Une vue graphique montée (ou prête à l'être)
pub struct ChartView<S: CandleSource, F: SurfaceFactory> {
    refresh: RefreshController<S>,
    session: ChartSessionManager<F>,
    selection: Selection,
    mounted: bool,
    last_error: Option<String>,
}

impl<S: CandleSource, F: SurfaceFactory> ChartView<S, F> {
    pub fn new(refresh: RefreshController<S>, session: ChartSessionManager<F>, selection: Selection) -> Self {
        Self {
            refresh,
            session,
            selection,
            mounted: false,
            last_error: None,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn session(&self) -> &ChartSessionManager<F> {
        &self.session
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Dernière erreur de fetch pour la sélection courante
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Crée la session et démarre le rafraîchissement
    pub fn mount(&mut self, dimensions: Dimensions, theme: Theme) -> Result<FetchToken, SurfaceError> {
        self.session.create(dimensions, theme)?;
        let token = self.refresh.select(self.selection.clone());
        self.mounted = true;
        info!(selection = %self.selection, "Chart view mounted");
        Ok(token)
    }

    /// Arrête le timer et détruit la session
    pub fn unmount(&mut self) {
        self.refresh.stop();
        self.session.destroy();
        self.mounted = false;
        info!(selection = %self.selection, "Chart view unmounted");
    }

    pub fn set_symbol(&mut self, symbol: &str) {
        if self.selection.symbol == symbol {
            return;
        }
        self.selection.symbol = symbol.to_string();
        self.reselect();
    }

    pub fn set_interval(&mut self, interval: Interval) {
        if self.selection.interval == interval {
            return;
        }
        self.selection.interval = interval;
        self.reselect();
    }

    /// Nouvelle sélection : séries vidées, ancien abonnement remplacé
    fn reselect(&mut self) {
        self.last_error = None;
        if !self.mounted {
            return;
        }
        if let Err(e) = self.session.clear_data() {
            warn!(error = %e, "Failed to clear chart series");
        }
        self.refresh.select(self.selection.clone());
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), SurfaceError> {
        self.session.set_theme(theme)
    }

    pub fn set_indicator(&mut self, indicator: Option<IndicatorKind>) -> Result<(), SurfaceError> {
        self.session.set_indicator(indicator)
    }

    pub fn resize(&mut self, dimensions: Dimensions) -> Result<(), SurfaceError> {
        self.session.resize(dimensions)
    }

    /// Traite un résultat de fetch reçu par la boucle UI
    pub fn handle_outcome(&mut self, outcome: FetchOutcome) -> OutcomeStatus {
        match self.refresh.accept(outcome) {
            Ok(raw) => {
                let candles = normalize(raw);
                let count = candles.len();
                self.last_error = None;
                if let Err(e) = self.session.update_data(candles) {
                    warn!(error = %e, "Chart session rejected candle update");
                }
                OutcomeStatus::Applied { candles: count }
            }
            Err(RefreshError::Stale { expected, received }) => {
                debug!(expected = %expected, received = %received, "Discarding stale candle response");
                OutcomeStatus::Stale
            }
            Err(RefreshError::Fetch(e)) => {
                warn!(selection = %self.selection, error = %e, "Keeping previous candles after fetch failure");
                let message = e.user_message();
                self.last_error = Some(message.clone());
                OutcomeStatus::FetchFailed(message)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::runtime::Handle;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use super::*;
    use crate::chart::session::SessionPhase;
    use crate::chart::surface::{RenderSurface, SeriesData, SeriesRole};
    use crate::chart::testing::RecordingFactory;
    use crate::indicators::IndicatorParams;
    use crate::refresh::testing::ScriptedSource;

    const WAIT: Duration = Duration::from_secs(2);

    type TestView = ChartView<ScriptedSource, RecordingFactory>;

    fn view(
        source: ScriptedSource,
        period: Duration,
        symbol: &str,
    ) -> (TestView, mpsc::UnboundedReceiver<FetchOutcome>, Arc<ScriptedSource>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Arc::new(source);
        let refresh = RefreshController::new(Arc::clone(&source), Handle::current(), period, tx);
        let session = ChartSessionManager::new(
            RecordingFactory::default(),
            IndicatorParams::default(),
            Some(IndicatorKind::Rsi),
        );
        let view = ChartView::new(refresh, session, Selection::new(symbol, Interval::H1));
        (view, rx, source)
    }

    fn displayed_closes(view: &TestView) -> Vec<f64> {
        match view.session().surface().and_then(|s| s.data(SeriesRole::Candles)) {
            Some(SeriesData::Candles(candles)) => candles.iter().map(|c| c.close).collect(),
            _ => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_mount_creates_session_and_applies_first_fetch() {
        let (mut view, mut rx, _source) = view(
            ScriptedSource::with("ETHUSDT", &[1.0, 2.0, 3.0]),
            Duration::from_secs(3600),
            "ETHUSDT",
        );
        view.mount(Dimensions::new(120, 40), Theme::Dark).unwrap();
        assert_eq!(view.session().phase(), SessionPhase::Active);

        let outcome = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(view.handle_outcome(outcome), OutcomeStatus::Applied { candles: 3 });
        assert_eq!(displayed_closes(&view), vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn test_late_response_for_previous_symbol_is_discarded() {
        let source = ScriptedSource::with("ETHUSDT", &[3000.0, 3010.0]);
        source.set("ADAUSDT", &[0.45, 0.46, 0.47]);
        let (mut view, mut rx, _source) = view(source, Duration::from_secs(3600), "ETHUSDT");
        view.mount(Dimensions::new(120, 40), Theme::Dark).unwrap();

        // La réponse ETH est encore en attente côté UI quand l'opérateur change de symbole
        let eth = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        view.set_symbol("ADAUSDT");

        let ada = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(view.handle_outcome(ada), OutcomeStatus::Applied { candles: 3 });
        assert_eq!(view.handle_outcome(eth), OutcomeStatus::Stale);

        assert_eq!(view.selection().symbol, "ADAUSDT");
        assert_eq!(displayed_closes(&view), vec![0.45, 0.46, 0.47]);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_data() {
        let (mut view, mut rx, source) = view(
            ScriptedSource::with("ETHUSDT", &[5.0, 6.0]),
            Duration::from_millis(100),
            "ETHUSDT",
        );
        view.mount(Dimensions::new(120, 40), Theme::Dark).unwrap();
        let first = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        view.handle_outcome(first);

        source.fail("ETHUSDT");
        let status = loop {
            let outcome = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
            match view.handle_outcome(outcome) {
                OutcomeStatus::FetchFailed(message) => break message,
                _ => continue,
            }
        };
        assert!(status.contains("500"));
        assert!(view.last_error().is_some());
        assert_eq!(displayed_closes(&view), vec![5.0, 6.0]);
    }

    #[tokio::test]
    async fn test_interval_change_clears_series_until_new_data() {
        let (mut view, mut rx, _source) = view(
            ScriptedSource::with("ETHUSDT", &[1.0, 2.0]),
            Duration::from_secs(3600),
            "ETHUSDT",
        );
        view.mount(Dimensions::new(120, 40), Theme::Dark).unwrap();
        let outcome = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        view.handle_outcome(outcome);

        view.set_interval(Interval::H4);
        assert!(displayed_closes(&view).is_empty());
        // Mêmes séries, pas de recréation
        assert_eq!(view.session().surface().map(|s| s.series_count()), Some(3));

        let outcome = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(outcome.selection.interval, Interval::H4);
        assert_eq!(view.handle_outcome(outcome), OutcomeStatus::Applied { candles: 2 });
    }

    #[tokio::test]
    async fn test_unmount_destroys_session_and_discards_in_flight() {
        let (mut view, mut rx, _source) = view(
            ScriptedSource::with("ETHUSDT", &[1.0]),
            Duration::from_secs(3600),
            "ETHUSDT",
        );
        view.mount(Dimensions::new(120, 40), Theme::Dark).unwrap();
        let outcome = timeout(WAIT, rx.recv()).await.unwrap().unwrap();

        view.unmount();
        assert!(!view.is_mounted());
        assert_eq!(view.session().phase(), SessionPhase::Destroyed);
        assert_eq!(view.handle_outcome(outcome), OutcomeStatus::Stale);
    }

    #[tokio::test]
    async fn test_two_views_have_independent_timers() {
        let (mut eth, mut eth_rx, _) = view(ScriptedSource::with("ETHUSDT", &[1.0]), Duration::from_secs(3600), "ETHUSDT");
        let (mut ada, mut ada_rx, _) = view(ScriptedSource::with("ADAUSDT", &[2.0]), Duration::from_secs(3600), "ADAUSDT");
        eth.mount(Dimensions::new(80, 30), Theme::Dark).unwrap();
        ada.mount(Dimensions::new(80, 30), Theme::Light).unwrap();

        let eth_outcome = timeout(WAIT, eth_rx.recv()).await.unwrap().unwrap();
        let ada_outcome = timeout(WAIT, ada_rx.recv()).await.unwrap().unwrap();

        eth.unmount();
        assert_eq!(ada.handle_outcome(ada_outcome), OutcomeStatus::Applied { candles: 1 });
        assert_eq!(eth.handle_outcome(eth_outcome), OutcomeStatus::Stale);
        assert!(ada.session().is_active());
    }
}
