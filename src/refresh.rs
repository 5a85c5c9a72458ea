// ============================================================================
// Contrôleur de rafraîchissement des chandelles
// ============================================================================
// Un contrôleur par vue graphique montée. Pour la sélection active
// (symbole, intervalle) il fait tourner UNE tâche tokio :
//   fetch immédiat, puis un fetch à chaque période.
//
// Les résultats partent sur un canal mpsc vers la boucle UI, marqués avec
// la sélection et un FetchToken. La boucle UI les soumet à `accept()` :
// seul un résultat dont le token ET la sélection correspondent à
// l'abonnement actif est appliqué. Tout le reste est périmé.
//
// Changement de sélection : la tâche précédente est annulée (abort) AVANT
// que la nouvelle ne démarre, donc jamais deux timers pour la même vue.
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::{FetchError, RefreshError};
use crate::models::{Interval, RawCandle};

/// Période minimale entre deux fetchs
pub const MIN_REFRESH_PERIOD: Duration = Duration::from_millis(100);

/// Source de chandelles brutes (le backend en production)
pub trait CandleSource: Send + Sync + 'static {
    fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> impl Future<Output = Result<Vec<RawCandle>, FetchError>> + Send;
}

/// Paire (symbole, intervalle) affichée par une vue
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    pub symbol: String,
    pub interval: Interval,
}

impl Selection {
    pub fn new(symbol: impl Into<String>, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.symbol, self.interval)
    }
}

/// Identifiant d'un abonnement ; strictement croissant par contrôleur
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchToken(pub u64);

/// Résultat d'un fetch, tel que reçu par la boucle UI
#[derive(Debug)]
pub struct FetchOutcome {
    pub token: FetchToken,
    pub selection: Selection,
    pub result: Result<Vec<RawCandle>, FetchError>,
}

// ============================================================================
// Subscription : tâche de fond annulable
// ============================================================================

/// Tâche périodique en cours ; annulée par `cancel()` ou à la destruction
pub struct Subscription {
    label: String,
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn new(label: impl Into<String>, handle: JoinHandle<()>) -> Self {
        Self {
            label: label.into(),
            handle,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Arrête la tâche (les fetchs en vol sont abandonnés)
    pub fn cancel(self) {
        debug!(subscription = %self.label, "Cancelling subscription");
        // Drop fait l'abort
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

// ============================================================================
// RefreshController
// ============================================================================

struct ActiveSubscription {
    selection: Selection,
    token: FetchToken,
    subscription: Subscription,
}

/// Pilote le fetch périodique de la sélection active d'une vue
pub struct RefreshController<S: CandleSource> {
    source: Arc<S>,
    runtime: Handle,
    period: Duration,
    outcomes: UnboundedSender<FetchOutcome>,
    active: Option<ActiveSubscription>,
    next_token: u64,
}

impl<S: CandleSource> RefreshController<S> {
    pub fn new(
        source: Arc<S>,
        runtime: Handle,
        period: Duration,
        outcomes: UnboundedSender<FetchOutcome>,
    ) -> Self {
        Self {
            source,
            runtime,
            period: period.max(MIN_REFRESH_PERIOD),
            outcomes,
            active: None,
            next_token: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn active_selection(&self) -> Option<&Selection> {
        self.active.as_ref().map(|a| &a.selection)
    }

    pub fn active_token(&self) -> Option<FetchToken> {
        self.active.as_ref().map(|a| a.token)
    }

    /// Démarre le rafraîchissement d'une nouvelle sélection
    ///
    /// L'abonnement précédent est annulé d'abord.
    pub fn select(&mut self, selection: Selection) -> FetchToken {
        self.stop();

        self.next_token += 1;
        let token = FetchToken(self.next_token);

        let handle = self.runtime.spawn(fetch_loop(
            Arc::clone(&self.source),
            selection.clone(),
            token,
            self.period,
            self.outcomes.clone(),
        ));
        info!(
            selection = %selection,
            token = token.0,
            period_secs = self.period.as_secs_f64(),
            "Candle refresh started"
        );

        self.active = Some(ActiveSubscription {
            subscription: Subscription::new(format!("candles {}", selection), handle),
            selection,
            token,
        });
        token
    }

    /// Arrête le rafraîchissement en cours
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            info!(selection = %active.selection, token = active.token.0, "Candle refresh stopped");
            active.subscription.cancel();
        }
    }

    /// Filtre un résultat reçu par la boucle UI
    ///
    /// Ok : chandelles brutes de la sélection active.
    /// Err(Stale) : résultat d'un abonnement remplacé.
    /// Err(Fetch) : échec réseau de la sélection active.
    pub fn accept(&self, outcome: FetchOutcome) -> Result<Vec<RawCandle>, RefreshError> {
        match &self.active {
            Some(active) if active.token == outcome.token && active.selection == outcome.selection => {
                outcome.result.map_err(RefreshError::from)
            }
            active => Err(RefreshError::Stale {
                expected: active
                    .as_ref()
                    .map(|a| a.selection.to_string())
                    .unwrap_or_else(|| "none".to_string()),
                received: outcome.selection,
            }),
        }
    }
}

impl<S: CandleSource> Drop for RefreshController<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Boucle de fetch d'un abonnement
async fn fetch_loop<S: CandleSource>(
    source: Arc<S>,
    selection: Selection,
    token: FetchToken,
    period: Duration,
    outcomes: UnboundedSender<FetchOutcome>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // Le premier tick est immédiat
        ticker.tick().await;

        debug!(selection = %selection, token = token.0, "Fetching candles");
        let result = source.fetch_candles(&selection.symbol, selection.interval).await;
        if let Err(e) = &result {
            warn!(selection = %selection, error = %e, "Candle fetch failed");
        }

        let outcome = FetchOutcome {
            token,
            selection: selection.clone(),
            result,
        };
        if outcomes.send(outcome).is_err() {
            debug!(selection = %selection, "Outcome receiver closed, stopping refresh");
            break;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================


#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use super::testing::ScriptedSource;
    use super::*;

    const LONG: Duration = Duration::from_secs(3600);
    const WAIT: Duration = Duration::from_secs(2);

    fn controller(
        source: ScriptedSource,
        period: Duration,
    ) -> (
        RefreshController<ScriptedSource>,
        mpsc::UnboundedReceiver<FetchOutcome>,
        Arc<ScriptedSource>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Arc::new(source);
        let controller = RefreshController::new(Arc::clone(&source), Handle::current(), period, tx);
        (controller, rx, source)
    }

    #[tokio::test]
    async fn test_select_fetches_immediately() {
        let (mut controller, mut rx, _source) = controller(ScriptedSource::with("ETHUSDT", &[1.0, 2.0]), LONG);
        let token = controller.select(Selection::new("ETHUSDT", Interval::H1));

        let outcome = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(outcome.token, token);
        assert_eq!(outcome.selection.symbol, "ETHUSDT");
        assert_eq!(controller.accept(outcome).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_refetches_every_period() {
        let (mut controller, mut rx, source) =
            controller(ScriptedSource::with("ETHUSDT", &[1.0]), Duration::from_millis(100));
        controller.select(Selection::new("ETHUSDT", Interval::M1));

        for _ in 0..3 {
            let outcome = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
            assert!(controller.accept(outcome).is_ok());
        }
        assert!(source.calls() >= 3);
    }

    #[tokio::test]
    async fn test_tokens_increase_per_selection() {
        let (mut controller, _rx, _source) = controller(ScriptedSource::default(), LONG);
        let first = controller.select(Selection::new("ETHUSDT", Interval::H1));
        let second = controller.select(Selection::new("ETHUSDT", Interval::H4));
        assert!(second > first);
        assert_eq!(controller.active_token(), Some(second));
    }

    #[tokio::test]
    async fn test_superseded_outcome_is_stale() {
        let source = ScriptedSource::with("ETHUSDT", &[3000.0]);
        source.set("ADAUSDT", &[0.5, 0.6]);
        let (mut controller, mut rx, _source) = controller(source, LONG);

        controller.select(Selection::new("ETHUSDT", Interval::H1));
        let eth = timeout(WAIT, rx.recv()).await.unwrap().unwrap();

        // Sélection changée avant que la réponse ETH ne soit traitée
        controller.select(Selection::new("ADAUSDT", Interval::H1));
        let ada = timeout(WAIT, rx.recv()).await.unwrap().unwrap();

        assert_eq!(controller.accept(ada).unwrap().len(), 2);
        match controller.accept(eth) {
            Err(RefreshError::Stale { expected, received }) => {
                assert_eq!(expected, "ADAUSDT@1h");
                assert_eq!(received.symbol, "ETHUSDT");
            }
            other => panic!("expected stale, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_same_selection_with_old_token_is_stale() {
        let (mut controller, mut rx, _source) = controller(ScriptedSource::with("ETHUSDT", &[1.0]), LONG);
        controller.select(Selection::new("ETHUSDT", Interval::H1));
        let old = timeout(WAIT, rx.recv()).await.unwrap().unwrap();

        // Re-sélection identique : nouvel abonnement, nouveau token
        controller.select(Selection::new("ETHUSDT", Interval::H1));
        assert!(matches!(controller.accept(old), Err(RefreshError::Stale { .. })));
    }

    #[tokio::test]
    async fn test_pending_fetch_is_cancelled_on_selection_change() {
        let source = ScriptedSource::with("ETHUSDT", &[3000.0]);
        source.set("ADAUSDT", &[0.5]);
        let eth_gate = source.gate("ETHUSDT");
        let (mut controller, mut rx, source) = controller(source, LONG);

        controller.select(Selection::new("ETHUSDT", Interval::H1));
        // Laisse la tâche ETH démarrer et se bloquer sur le fetch
        while source.calls() == 0 {
            tokio::task::yield_now().await;
        }

        controller.select(Selection::new("ADAUSDT", Interval::H1));
        let ada = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(ada.selection.symbol, "ADAUSDT");
        assert!(controller.accept(ada).is_ok());

        // La réponse ETH ne doit jamais arriver : sa tâche a été annulée
        eth_gate.notify_waiters();
        let late = timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(late.is_err(), "unexpected outcome after cancellation");
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reported_not_stale() {
        let source = ScriptedSource::default();
        source.fail("ETHUSDT");
        let (mut controller, mut rx, _source) = controller(source, LONG);
        controller.select(Selection::new("ETHUSDT", Interval::H1));

        let outcome = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert!(matches!(controller.accept(outcome), Err(RefreshError::Fetch(_))));
    }

    #[tokio::test]
    async fn test_stop_then_accept_is_stale() {
        let (mut controller, mut rx, _source) = controller(ScriptedSource::with("ETHUSDT", &[1.0]), LONG);
        controller.select(Selection::new("ETHUSDT", Interval::H1));
        let outcome = timeout(WAIT, rx.recv()).await.unwrap().unwrap();

        controller.stop();
        assert!(controller.active_selection().is_none());
        match controller.accept(outcome) {
            Err(RefreshError::Stale { expected, .. }) => assert_eq!(expected, "none"),
            other => panic!("expected stale, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_period_is_clamped() {
        let (controller, _rx, _source) = controller(ScriptedSource::default(), Duration::ZERO);
        assert_eq!(controller.period(), MIN_REFRESH_PERIOD);
    }
}
