// ============================================================================
// Erreurs typées du pipeline
// ============================================================================
// - FetchError : échec d'un appel au backend (réseau, statut HTTP, JSON)
// - RefreshError : résultat de fetch refusé par le contrôleur de rafraîchissement
// - ParseError : sélecteur textuel inconnu (intervalle, indicateur)
//
// Les erreurs de la surface de rendu vivent dans chart::surface.
//
// Aucune de ces erreurs n'est fatale : le graphique garde simplement
// les dernières données valides.
// ============================================================================

use thiserror::Error;

use crate::refresh::Selection;

/// Échec d'un appel HTTP au backend du bot
#[derive(Debug, Error)]
pub enum FetchError {
    /// Construction du client HTTP impossible
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// Erreur réseau (connexion, timeout)
    #[error("request to {path} failed")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// Statut HTTP non 2xx sans message exploitable
    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: u16 },

    /// Statut HTTP non 2xx avec un corps `{message}`
    #[error("{path} rejected the request (HTTP {status}): {message}")]
    Rejected {
        path: String,
        status: u16,
        message: String,
    },

    /// Corps de réponse illisible
    #[error("invalid JSON payload from {path}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// Message court destiné à la barre d'état
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Résultat de fetch refusé par le contrôleur de rafraîchissement
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Réponse émise pour une sélection qui n'est plus active
    #[error("stale response for {received} (active: {expected})")]
    Stale {
        expected: String,
        received: Selection,
    },
}

/// Sélecteur textuel non reconnu
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown interval '{0}' (expected 1m, 5m, 15m, 1h, 4h or 1d)")]
    Interval(String),

    #[error("unknown indicator '{0}' (expected RSI, EMA, SMA, MACD or Bollinger)")]
    Indicator(String),
}
