// ============================================================================
// Normalisation des chandelles
// ============================================================================
// Transforme la réponse brute de /velas en séquence canonique :
//
// 1. timestamp ms → secondes (floor, y compris pour les valeurs négatives)
// 2. rejet des enregistrements non finis ou à volume négatif
// 3. tri stable par temps
// 4. un seul enregistrement par seconde : le dernier reçu l'emporte
//
// Résultat : `time` strictement croissant, ce que les indicateurs et
// la surface de rendu supposent.
// ============================================================================

use tracing::{debug, warn};

use crate::models::{Candle, RawCandle};

/// Normalise une réponse brute de /velas
pub fn normalize(raw: Vec<RawCandle>) -> Vec<Candle> {
    let received = raw.len();

    let mut candles: Vec<Candle> = raw
        .into_iter()
        .filter(is_well_formed)
        .map(|r| Candle::new(r.time.div_euclid(1000), r.open, r.high, r.low, r.close, r.volume))
        .collect();
    let dropped = received - candles.len();

    // sort_by_key est stable : l'ordre d'arrivée est conservé dans un même bucket
    candles.sort_by_key(|c| c.time);

    // Dédoublonnage en gardant le dernier de chaque bucket
    let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match deduped.last_mut() {
            Some(last) if last.time == candle.time => *last = candle,
            _ => deduped.push(candle),
        }
    }

    let duplicates = received - dropped - deduped.len();
    if dropped > 0 || duplicates > 0 {
        warn!(
            received,
            dropped,
            duplicates,
            "Backend candles needed cleanup"
        );
    }
    debug!(candles = deduped.len(), "Normalized candles");

    deduped
}

fn is_well_formed(raw: &RawCandle) -> bool {
    [raw.open, raw.high, raw.low, raw.close].iter().all(|v| v.is_finite())
        && raw.volume.is_finite()
        && raw.volume >= 0.0
}

// ============================================================================
// Tests unitaires
// ============================================================================
