// ============================================================================
// Données du bot : état des positions, prix, historique, identifiants
// ============================================================================
// Les noms de champs JSON sont ceux du backend (espagnol), mappés vers
// des noms Rust avec #[serde(rename = "...")].
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// État d'un symbole suivi par le bot (entrée de /status)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionStatus {
    #[serde(rename = "en_posicion", default)]
    pub in_position: bool,

    #[serde(rename = "precio_entrada", default)]
    pub entry_price: f64,

    #[serde(rename = "precio_objetivo", default)]
    pub target_price: Option<f64>,

    /// Plus haut atteint depuis l'entrée (stop suiveur)
    #[serde(rename = "precio_max", default)]
    pub max_price: Option<f64>,

    /// RSI courant calculé par le bot, absent si le calcul a échoué
    #[serde(default)]
    pub rsi: Option<f64>,
}

/// /status : symbole → état
pub type StatusMap = BTreeMap<String, PositionStatus>;

/// /precios : symbole → dernier prix
pub type PriceMap = BTreeMap<String, f64>;

/// /estadisticas : objet libre, affiché tel quel
pub type Statistics = serde_json::Map<String, Value>;

/// Une ligne de /history
///
/// Le backend écrit une chaîne vide pour les valeurs inconnues
/// (`cambio_pct`, `precio_max`, `precio_actual` sur un achat).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    #[serde(rename = "fecha", default)]
    pub date: String,

    #[serde(rename = "simbolo", default)]
    pub symbol: String,

    #[serde(rename = "accion", default)]
    pub action: String,

    #[serde(rename = "precio", default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub rsi: Option<f64>,

    #[serde(rename = "cambio_pct", default, deserialize_with = "lenient_f64")]
    pub change_pct: Option<f64>,

    #[serde(rename = "precio_max", default, deserialize_with = "lenient_f64")]
    pub max_price: Option<f64>,

    #[serde(rename = "precio_actual", default, deserialize_with = "lenient_f64")]
    pub current_price: Option<f64>,
}

/// Accepte un nombre, une chaîne numérique, "" ou null
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Corps `{message}` de /start, /stop et des refus
#[derive(Debug, Clone, Deserialize)]
pub struct BackendMessage {
    pub message: String,
}

/// Identifiants envoyés à /start
///
/// Debug masque les secrets : la structure peut apparaître dans les logs.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    #[serde(rename = "usar_testnet")]
    pub use_testnet: bool,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .field("use_testnet", &self.use_testnet)
            .finish()
    }
}

/// Variation en pourcentage entre le prix d'entrée et le prix courant
///
/// None si le prix d'entrée est nul (pas de base de calcul).
pub fn change_percent(current: f64, entry: f64) -> Option<f64> {
    if entry == 0.0 {
        return None;
    }
    Some((current - entry) / entry * 100.0)
}

/// Résumé des gains sur les positions ouvertes
///
/// Dérivé uniquement de /status et /precios.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProfitSummary {
    /// Somme des variations (%)
    pub total_pct: f64,
    /// Moyenne des variations (%), None sans position valorisée
    pub average_pct: Option<f64>,
    /// Positions ouvertes valorisées
    pub active: usize,
    /// Positions ouvertes sans prix courant (ou sans prix d'entrée)
    pub unpriced: usize,
}

impl ProfitSummary {
    pub fn derive(status: &StatusMap, prices: &PriceMap) -> Self {
        let mut summary = ProfitSummary::default();

        for (symbol, position) in status.iter().filter(|(_, p)| p.in_position) {
            let pct = prices
                .get(symbol)
                .and_then(|&price| change_percent(price, position.entry_price));
            match pct {
                Some(pct) => {
                    summary.total_pct += pct;
                    summary.active += 1;
                }
                None => summary.unpriced += 1,
            }
        }

        if summary.active > 0 {
            summary.average_pct = Some(summary.total_pct / summary.active as f64);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_payload_decodes() {
        let json = r#"{
            "ETHUSDT": {"en_posicion": true, "precio_entrada": 2000.0, "precio_max": 2100.5, "rsi": 41.2},
            "ADAUSDT": {"en_posicion": false, "precio_entrada": 0.0, "precio_max": 0.0, "rsi": null}
        }"#;
        let status: StatusMap = serde_json::from_str(json).unwrap();
        let eth = &status["ETHUSDT"];
        assert!(eth.in_position);
        assert_eq!(eth.entry_price, 2000.0);
        assert_eq!(eth.target_price, None);
        assert_eq!(eth.rsi, Some(41.2));
        assert_eq!(status["ADAUSDT"].rsi, None);
    }

    #[test]
    fn test_history_empty_strings_become_none() {
        let json = r#"[{"fecha": "2024-05-01 10:00:00", "simbolo": "SOLUSDT", "accion": "COMPRA",
                        "precio": 140.5, "rsi": 28.1, "cambio_pct": "", "precio_max": "", "precio_actual": ""}]"#;
        let history: Vec<TradeRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(history[0].action, "COMPRA");
        assert_eq!(history[0].price, Some(140.5));
        assert_eq!(history[0].change_pct, None);
        assert_eq!(history[0].current_price, None);
    }

    #[test]
    fn test_history_numeric_strings_are_parsed() {
        let json = r#"{"simbolo": "ETHUSDT", "accion": "VENTA", "precio": "2050.1", "cambio_pct": "2.5"}"#;
        let record: TradeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.price, Some(2050.1));
        assert_eq!(record.change_pct, Some(2.5));
        assert_eq!(record.max_price, None);
    }

    #[test]
    fn test_credentials_serialize_backend_names_and_redact_debug() {
        let creds = Credentials {
            api_key: "key-123".to_string(),
            api_secret: "secret-456".to_string(),
            use_testnet: true,
        };
        let json = serde_json::to_value(&creds).unwrap();
        assert_eq!(json["usar_testnet"], Value::Bool(true));
        assert_eq!(json["api_key"], Value::from("key-123"));

        let debug = format!("{:?}", creds);
        assert!(!debug.contains("key-123"));
        assert!(!debug.contains("secret-456"));
    }

    #[test]
    fn test_change_percent_zero_entry_is_none() {
        assert_eq!(change_percent(110.0, 100.0), Some(10.0));
        assert_eq!(change_percent(110.0, 0.0), None);
    }

    #[test]
    fn test_profit_summary_over_open_positions() {
        let mut status = StatusMap::new();
        status.insert(
            "ETHUSDT".into(),
            PositionStatus { in_position: true, entry_price: 100.0, ..Default::default() },
        );
        status.insert(
            "ADAUSDT".into(),
            PositionStatus { in_position: true, entry_price: 200.0, ..Default::default() },
        );
        status.insert(
            "SOLUSDT".into(),
            PositionStatus { in_position: true, entry_price: 50.0, ..Default::default() },
        );
        status.insert("BNBUSDT".into(), PositionStatus::default());

        let mut prices = PriceMap::new();
        prices.insert("ETHUSDT".into(), 110.0); // +10 %
        prices.insert("ADAUSDT".into(), 190.0); // -5 %
        prices.insert("BNBUSDT".into(), 600.0); // pas en position

        let summary = ProfitSummary::derive(&status, &prices);
        assert_eq!(summary.active, 2);
        assert_eq!(summary.unpriced, 1);
        assert!((summary.total_pct - 5.0).abs() < 1e-9);
        assert!((summary.average_pct.unwrap() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_profit_summary_without_positions() {
        let summary = ProfitSummary::derive(&StatusMap::new(), &PriceMap::new());
        assert_eq!(summary.average_pct, None);
        assert_eq!(summary.total_pct, 0.0);
    }
}
