// ============================================================================
// Configuration : ligne de commande et variables d'environnement
// ============================================================================
// Toutes les options ont une valeur par défaut ; seules l'URL du backend,
// le répertoire de logs et les identifiants se lisent aussi depuis l'env.
//
// CONCEPT : clap derive
// - chaque champ devient une option `--kebab-case`
// - Interval et IndicatorKind passent par leur FromStr
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use thiserror::Error;

use crate::api::PollPeriods;
use crate::chart::Theme;
use crate::indicators::{IndicatorKind, IndicatorParams};
use crate::models::{Credentials, Interval};

/// Symboles suivis par défaut (ceux du bot)
pub const DEFAULT_SYMBOLS: &[&str] = &["ETHUSDT", "ADAUSDT", "SOLUSDT", "BNBUSDT", "XRPUSDT", "TRXUSDT"];

/// Tableau de bord terminal pour le bot de trading
#[derive(Debug, Clone, Parser)]
#[command(name = "tradewatch", version, about = "Terminal dashboard for the trading bot backend")]
pub struct Config {
    /// URL du backend du bot
    #[arg(long, env = "TRADEWATCH_BACKEND_URL", default_value = "http://127.0.0.1:5000")]
    pub backend_url: String,

    /// Symboles affichés, séparés par des virgules
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "ETHUSDT,ADAUSDT,SOLUSDT,BNBUSDT,XRPUSDT,TRXUSDT"
    )]
    pub symbols: Vec<String>,

    /// Intervalle initial du graphique (1m, 5m, 15m, 1h, 4h, 1d)
    #[arg(long, default_value = "1h")]
    pub interval: Interval,

    /// Indicateur superposé au démarrage (RSI, EMA, SMA, MACD, Bollinger)
    #[arg(long)]
    pub indicator: Option<IndicatorKind>,

    #[arg(long, value_enum, default_value_t = Theme::Dark)]
    pub theme: Theme,

    /// Période de rafraîchissement des chandelles (secondes)
    #[arg(long, default_value_t = 30)]
    pub candle_refresh_secs: u64,

    #[arg(long, default_value_t = 5)]
    pub status_refresh_secs: u64,

    #[arg(long, default_value_t = 10)]
    pub price_refresh_secs: u64,

    #[arg(long, default_value_t = 60)]
    pub history_refresh_secs: u64,

    /// Timeout des requêtes HTTP (millisecondes)
    #[arg(long, default_value_t = 5000)]
    pub timeout_ms: u64,

    #[arg(long, default_value_t = 14)]
    pub rsi_period: usize,

    #[arg(long, default_value_t = 14)]
    pub ema_period: usize,

    #[arg(long, default_value_t = 14)]
    pub sma_period: usize,

    /// Répertoire des fichiers de log
    #[arg(long, env = "TRADEWATCH_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Clé API transmise à /start
    #[arg(long, env = "TRADEWATCH_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "TRADEWATCH_API_SECRET", hide_env_values = true)]
    pub api_secret: Option<String>,

    /// Démarre le bot sur le testnet (--testnet false pour le réel)
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub testnet: bool,
}

/// Configuration incohérente
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("at least one symbol is required")]
    NoSymbols,

    #[error("--{0} must be greater than zero")]
    Zero(&'static str),

    #[error("backend URL must start with http:// or https:// (got '{0}')")]
    BackendUrl(String),
}

impl Config {
    /// Vérifie la cohérence des options
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::NoSymbols);
        }

        let positive = [
            ("candle-refresh-secs", self.candle_refresh_secs as usize),
            ("status-refresh-secs", self.status_refresh_secs as usize),
            ("price-refresh-secs", self.price_refresh_secs as usize),
            ("history-refresh-secs", self.history_refresh_secs as usize),
            ("timeout-ms", self.timeout_ms as usize),
            ("rsi-period", self.rsi_period),
            ("ema-period", self.ema_period),
            ("sma-period", self.sma_period),
        ];
        if let Some(&(name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Zero(name));
        }

        if !(self.backend_url.starts_with("http://") || self.backend_url.starts_with("https://")) {
            return Err(ConfigError::BackendUrl(self.backend_url.clone()));
        }
        Ok(())
    }

    /// Symboles normalisés (majuscules, sans doublons ni vides)
    pub fn symbol_list(&self) -> Vec<String> {
        let mut symbols: Vec<String> = Vec::new();
        for symbol in &self.symbols {
            let symbol = symbol.trim().to_uppercase();
            if !symbol.is_empty() && !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        symbols
    }

    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams {
            rsi_period: self.rsi_period,
            ema_period: self.ema_period,
            sma_period: self.sma_period,
            ..IndicatorParams::default()
        }
    }

    pub fn candle_period(&self) -> Duration {
        Duration::from_secs(self.candle_refresh_secs)
    }

    pub fn poll_periods(&self) -> PollPeriods {
        PollPeriods {
            status: Duration::from_secs(self.status_refresh_secs),
            prices: Duration::from_secs(self.price_refresh_secs),
            history: Duration::from_secs(self.history_refresh_secs),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Identifiants pour /start ; None si la clé ou le secret manque
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.api_key, &self.api_secret) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => Some(Credentials {
                api_key: key.clone(),
                api_secret: secret.clone(),
                use_testnet: self.testnet,
            }),
            _ => None,
        }
    }

    /// Répertoire des logs : option, sinon répertoire de données local, sinon ./logs
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .or_else(|| dirs::data_local_dir().map(|dir| dir.join("tradewatch").join("logs")))
            .unwrap_or_else(|| PathBuf::from("./logs"))
    }
}
