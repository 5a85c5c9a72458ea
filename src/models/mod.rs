// ============================================================================
// Module : models
// ============================================================================
// Structures de données de l'application
//
// - candle : chandelles et intervalles (/velas)
// - bot : état du bot, prix, historique, identifiants
// ============================================================================

pub mod bot;    // Données du bot (/status, /precios, /history, /start)
pub mod candle; // Chandelles, intervalles, points de prix

// Re-export des structures principales pour simplifier les imports
pub use bot::{
    change_percent, BackendMessage, Credentials, PositionStatus, PriceMap, ProfitSummary,
    StatusMap, Statistics, TradeRecord,
};
pub use candle::{closes, Candle, Interval, PricePoint, RawCandle};
