// ============================================================================
// Polling du tableau de bord
// ============================================================================
// Une tâche tokio interroge périodiquement :
//   /status        (5 s par défaut)   échec → tableau vidé
//   /precios       (10 s par défaut)  échec → valeurs précédentes gardées
//   /history + /estadisticas (60 s)   échec → valeurs précédentes gardées
//
// Les mises à jour partent vers la boucle UI sur un canal mpsc.
// ============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::backend::BackendClient;
use crate::error::FetchError;
use crate::models::{PriceMap, StatusMap, Statistics, TradeRecord};
use crate::refresh::{Subscription, MIN_REFRESH_PERIOD};

/// Mise à jour envoyée à la boucle UI
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardUpdate {
    /// None : /status a échoué, le tableau doit être vidé
    Status(Option<StatusMap>),
    Prices(PriceMap),
    History(Vec<TradeRecord>),
    Statistics(Statistics),
    /// Message à afficher dans la barre d'état (réponse de /start, /stop, erreurs)
    Message(String),
}

/// Périodes de polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPeriods {
    pub status: Duration,
    pub prices: Duration,
    pub history: Duration,
}

impl Default for PollPeriods {
    fn default() -> Self {
        Self {
            status: Duration::from_secs(5),
            prices: Duration::from_secs(10),
            history: Duration::from_secs(60),
        }
    }
}

/// Endpoints interrogés par le poller
pub trait DashboardSource: Send + Sync + 'static {
    fn status(&self) -> impl Future<Output = Result<StatusMap, FetchError>> + Send;
    fn prices(&self) -> impl Future<Output = Result<PriceMap, FetchError>> + Send;
    fn history(&self) -> impl Future<Output = Result<Vec<TradeRecord>, FetchError>> + Send;
    fn statistics(&self) -> impl Future<Output = Result<Statistics, FetchError>> + Send;
}

impl DashboardSource for BackendClient {
    async fn status(&self) -> Result<StatusMap, FetchError> {
        BackendClient::status(self).await
    }

    async fn prices(&self) -> Result<PriceMap, FetchError> {
        BackendClient::prices(self).await
    }

    async fn history(&self) -> Result<Vec<TradeRecord>, FetchError> {
        BackendClient::history(self).await
    }

    async fn statistics(&self) -> Result<Statistics, FetchError> {
        BackendClient::statistics(self).await
    }
}

/// Démarre le polling ; s'arrête quand la Subscription est annulée
pub fn spawn_dashboard_poller<D: DashboardSource>(
    source: Arc<D>,
    runtime: &Handle,
    periods: PollPeriods,
    updates: UnboundedSender<DashboardUpdate>,
) -> Subscription {
    info!(
        status_secs = periods.status.as_secs_f64(),
        prices_secs = periods.prices.as_secs_f64(),
        history_secs = periods.history.as_secs_f64(),
        "Dashboard polling started"
    );
    let handle = runtime.spawn(poll_loop(source, periods, updates));
    Subscription::new("dashboard", handle)
}

async fn poll_loop<D: DashboardSource>(
    source: Arc<D>,
    periods: PollPeriods,
    updates: UnboundedSender<DashboardUpdate>,
) {
    let ticker = |period: Duration| {
        let mut ticker = interval(period.max(MIN_REFRESH_PERIOD));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    };
    let mut status_tick = ticker(periods.status);
    let mut prices_tick = ticker(periods.prices);
    let mut history_tick = ticker(periods.history);

    loop {
        let batch = tokio::select! {
            _ = status_tick.tick() => vec![poll_status(source.as_ref()).await],
            _ = prices_tick.tick() => poll_prices(source.as_ref()).await.into_iter().collect(),
            _ = history_tick.tick() => poll_history(source.as_ref()).await,
        };

        for update in batch {
            if updates.send(update).is_err() {
                debug!("Dashboard receiver closed, stopping poller");
                return;
            }
        }
    }
}

async fn poll_status<D: DashboardSource>(source: &D) -> DashboardUpdate {
    match source.status().await {
        Ok(status) => DashboardUpdate::Status(Some(status)),
        Err(e) => {
            warn!(error = %e, "Status poll failed, clearing status table");
            DashboardUpdate::Status(None)
        }
    }
}

async fn poll_prices<D: DashboardSource>(source: &D) -> Option<DashboardUpdate> {
    match source.prices().await {
        Ok(prices) => Some(DashboardUpdate::Prices(prices)),
        Err(e) => {
            warn!(error = %e, "Price poll failed, keeping previous prices");
            None
        }
    }
}

async fn poll_history<D: DashboardSource>(source: &D) -> Vec<DashboardUpdate> {
    let mut batch = Vec::with_capacity(2);
    match source.history().await {
        Ok(history) => batch.push(DashboardUpdate::History(history)),
        Err(e) => warn!(error = %e, "History poll failed"),
    }
    match source.statistics().await {
        Ok(stats) => batch.push(DashboardUpdate::Statistics(stats)),
        Err(e) => warn!(error = %e, "Statistics poll failed"),
    }
    batch
}
