// ============================================================================
// TradeWatch - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests
// ============================================================================

pub mod api;        // Client du backend du bot + poller
pub mod app;        // État de l'application
pub mod chart;      // Sessions graphiques, thèmes, surface de rendu
pub mod config;     // Ligne de commande / environnement
pub mod error;      // Erreurs typées
pub mod indicators; // RSI, EMA, SMA, MACD, Bollinger
pub mod models;     // Structures de données
pub mod normalizer; // Nettoyage des chandelles du backend
pub mod refresh;    // Rafraîchissement périodique des chandelles
pub mod ui;         // Interface utilisateur
