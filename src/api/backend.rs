// ============================================================================
// Client HTTP : backend du bot de trading
// ============================================================================
// Endpoints consommés :
//   GET  /velas?symbol=..&interval=..   chandelles brutes (ms)
//   GET  /precios                       symbole → prix
//   GET  /status                        symbole → état de position
//   GET  /estadisticas                  objet de statistiques
//   GET  /history                       historique des opérations
//   POST /start {api_key, api_secret, usar_testnet}  → {message}
//   POST /stop                          → {message}
//
// Toute réponse non 2xx devient une FetchError ; si le corps est un
// `{message}`, ce message est conservé (FetchError::Rejected).
// ============================================================================

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument};

use crate::error::FetchError;
use crate::models::{
    BackendMessage, Credentials, Interval, PriceMap, RawCandle, StatusMap, Statistics, TradeRecord,
};
use crate::refresh::CandleSource;

/// Commandes du bot (démarrage / arrêt)
pub trait BotController: Send + Sync + 'static {
    /// Démarre le bot ; retourne le message du backend
    fn start(&self, credentials: &Credentials) -> impl Future<Output = Result<String, FetchError>> + Send;

    /// Arrête le bot ; retourne le message du backend
    fn stop(&self) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Client du backend ; clonable (le pool de connexions est partagé)
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    /// Crée un client pour `base_url` (ex: http://127.0.0.1:5000)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(concat!("tradewatch/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn candles_request(&self, symbol: &str, interval: Interval) -> RequestBuilder {
        self.http
            .get(self.endpoint("/velas"))
            .query(&[("symbol", symbol), ("interval", interval.as_str())])
    }

    /// GET /velas
    #[instrument(skip(self, interval), fields(interval = %interval))]
    pub async fn candles(&self, symbol: &str, interval: Interval) -> Result<Vec<RawCandle>, FetchError> {
        let body = self.send("/velas", self.candles_request(symbol, interval)).await?;
        let candles: Vec<RawCandle> = decode("/velas", &body)?;
        debug!(candles = candles.len(), "Fetched raw candles");
        Ok(candles)
    }

    /// GET /precios
    pub async fn prices(&self) -> Result<PriceMap, FetchError> {
        self.get_json("/precios").await
    }

    /// GET /status
    pub async fn status(&self) -> Result<StatusMap, FetchError> {
        self.get_json("/status").await
    }

    /// GET /estadisticas
    pub async fn statistics(&self) -> Result<Statistics, FetchError> {
        self.get_json("/estadisticas").await
    }

    /// GET /history
    pub async fn history(&self) -> Result<Vec<TradeRecord>, FetchError> {
        self.get_json("/history").await
    }

    /// POST /start
    #[instrument(skip_all, fields(testnet = credentials.use_testnet))]
    pub async fn start_bot(&self, credentials: &Credentials) -> Result<String, FetchError> {
        let request = self.http.post(self.endpoint("/start")).json(credentials);
        let body = self.send("/start", request).await?;
        let reply: BackendMessage = decode("/start", &body)?;
        info!(message = %reply.message, "Bot start acknowledged");
        Ok(reply.message)
    }

    /// POST /stop
    #[instrument(skip_all)]
    pub async fn stop_bot(&self) -> Result<String, FetchError> {
        let body = self.send("/stop", self.http.post(self.endpoint("/stop"))).await?;
        let reply: BackendMessage = decode("/stop", &body)?;
        info!(message = %reply.message, "Bot stop acknowledged");
        Ok(reply.message)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let body = self.send(path, self.http.get(self.endpoint(path))).await?;
        decode(path, &body)
    }

    /// Envoie la requête et retourne le corps si le statut est 2xx
    async fn send(&self, path: &str, request: RequestBuilder) -> Result<String, FetchError> {
        let transport = |source| FetchError::Transport {
            path: path.to_string(),
            source,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        debug!(path, status = %status, bytes = body.len(), "Backend response");

        if !status.is_success() {
            error!(path, status = %status, "Backend returned error status");
            return Err(rejection(path, status.as_u16(), &body));
        }
        Ok(body)
    }
}

impl CandleSource for BackendClient {
    async fn fetch_candles(&self, symbol: &str, interval: Interval) -> Result<Vec<RawCandle>, FetchError> {
        self.candles(symbol, interval).await
    }
}

impl BotController for BackendClient {
    async fn start(&self, credentials: &Credentials) -> Result<String, FetchError> {
        self.start_bot(credentials).await
    }

    async fn stop(&self) -> Result<String, FetchError> {
        self.stop_bot().await
    }
}

/// Décode un corps JSON
fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|source| FetchError::Decode {
        path: path.to_string(),
        source,
    })
}

/// Erreur pour un statut non 2xx, avec le `{message}` du backend s'il existe
fn rejection(path: &str, status: u16, body: &str) -> FetchError {
    match serde_json::from_str::<BackendMessage>(body) {
        Ok(reply) => FetchError::Rejected {
            path: path.to_string(),
            status,
            message: reply.message,
        },
        Err(_) => FetchError::Status {
            path: path.to_string(),
            status,
        },
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
// Pas d'appel réseau : construction des requêtes et décodage des corps.
// ============================================================================
