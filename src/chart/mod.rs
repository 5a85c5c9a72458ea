// ============================================================================
// Module : chart
// ============================================================================
// Pipeline graphique :
//   RefreshController → normalize → indicateurs → ChartSessionManager → surface
//
// - theme : palettes sombre / claire
// - surface : contrat de la surface de rendu (trait)
// - session : cycle de vie de la session (création, thème, taille, données)
// - view : assemble le tout pour une vue graphique montée
// ============================================================================

pub mod session;
pub mod surface;
pub mod theme;
pub mod view;

pub use session::{ChartSession, ChartSessionManager, SessionPhase};
pub use surface::{
    Dimensions, HistogramPoint, Pane, RenderSurface, SeriesData, SeriesId, SeriesKind, SeriesRole,
    SeriesSpec, SurfaceError, SurfaceFactory,
};
pub use theme::{Palette, Theme};
pub use view::ChartView;

// ============================================================================
// Surface d'enregistrement pour les tests
// ============================================================================
