// ============================================================================
// Module : api
// ============================================================================
// Client HTTP du backend du bot et polling du tableau de bord
// ============================================================================

pub mod backend; // Client du backend (velas, precios, status, start/stop...)
pub mod poller;  // Polling périodique du tableau de bord

pub use backend::{BackendClient, BotController};
pub use poller::{spawn_dashboard_poller, DashboardSource, DashboardUpdate, PollPeriods};
