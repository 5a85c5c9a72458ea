// ============================================================================
// Gestion des événements
// ============================================================================
// Lit les événements terminal (clavier, redimensionnement) avec un timeout :
// sans événement, la boucle reçoit un Tick et peut drainer les canaux tokio.
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind};

/// Événements de l'application
#[derive(Debug, Clone)]
pub enum Event {
    /// Touche pressée
    Key(KeyEvent),

    /// Terminal redimensionné (colonnes, lignes)
    Resize(u16, u16),

    /// Aucun événement pendant le timeout
    Tick,

    /// Erreur survenue
    Error,
}

/// Gestionnaire d'événements
pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        Self { tick_rate }
    }

    /// Lit le prochain événement (bloquant au plus `tick_rate`)
    pub fn next(&self) -> Result<Event> {
        if !event::poll(self.tick_rate)? {
            return Ok(Event::Tick);
        }

        Ok(match event::read()? {
            // Sur certains OS on reçoit Press ET Release : seul Press compte
            CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Event::Key(key),
            CrosstermEvent::Resize(columns, rows) => Event::Resize(columns, rows),
            _ => Event::Tick,
        })
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}

fn key_code(event: &Event) -> Option<KeyCode> {
    match event {
        Event::Key(key) => Some(key.code),
        _ => None,
    }
}

/// 'q' : quitter (avec confirmation)
pub fn is_quit_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('q') | KeyCode::Char('Q')))
}

pub fn is_escape_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Esc))
}

pub fn is_enter_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Enter))
}

/// Flèche haut ou 'k' (vim)
pub fn is_up_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('K')))
}

/// Flèche bas ou 'j' (vim)
pub fn is_down_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('J')))
}

/// 'l' : intervalle suivant
pub fn is_next_interval_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('l') | KeyCode::Right))
}

/// 'h' : intervalle précédent
pub fn is_previous_interval_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('h') | KeyCode::Left))
}

/// 'i' : indicateur suivant
pub fn is_indicator_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('i') | KeyCode::Char('I')))
}

/// 't' : bascule du thème
pub fn is_theme_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('t') | KeyCode::Char('T')))
}

/// 's' : démarrer le bot
pub fn is_start_bot_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('s') | KeyCode::Char('S')))
}

/// 'x' : arrêter le bot
pub fn is_stop_bot_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('x') | KeyCode::Char('X')))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::empty()))
    }

    #[test]
    fn test_is_quit_event() {
        assert!(is_quit_event(&key(KeyCode::Char('q'))));
        assert!(!is_quit_event(&key(KeyCode::Char('a'))));
        assert!(!is_quit_event(&Event::Tick));
    }

    #[test]
    fn test_navigation_keys() {
        assert!(is_up_event(&key(KeyCode::Up)));
        assert!(is_up_event(&key(KeyCode::Char('k'))));
        assert!(is_down_event(&key(KeyCode::Char('j'))));
        assert!(is_next_interval_event(&key(KeyCode::Char('l'))));
        assert!(is_previous_interval_event(&key(KeyCode::Char('h'))));
        assert!(!is_next_interval_event(&key(KeyCode::Char('h'))));
    }

    #[test]
    fn test_chart_and_bot_keys() {
        assert!(is_indicator_event(&key(KeyCode::Char('i'))));
        assert!(is_theme_event(&key(KeyCode::Char('t'))));
        assert!(is_start_bot_event(&key(KeyCode::Char('s'))));
        assert!(is_stop_bot_event(&key(KeyCode::Char('x'))));
        assert!(is_escape_event(&key(KeyCode::Esc)));
        assert!(is_enter_event(&key(KeyCode::Enter)));
    }

    #[test]
    fn test_resize_is_not_a_key() {
        let resize = Event::Resize(120, 40);
        assert!(!is_quit_event(&resize));
        assert!(!is_escape_event(&resize));
    }
}
