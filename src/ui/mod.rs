// ============================================================================
// Module : ui
// ============================================================================
// Gère toute l'interface utilisateur (Terminal User Interface)
// ============================================================================

pub mod candlestick_text; // Chandeliers japonais en texte Unicode
pub mod chart;            // Écran graphique et volet oscillateur
pub mod dashboard;        // Tableau de bord du bot
pub mod events;           // Gestion des événements clavier
pub mod surface;          // RenderSurface dessinée par ratatui

// Re-exports pour simplifier les imports
pub use chart::chart_body_area;
pub use dashboard::render;
pub use events::{Event, EventHandler};
pub use surface::{TerminalSurface, TerminalSurfaceFactory};
