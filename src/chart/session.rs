// ============================================================================
// Session graphique
// ============================================================================
// Une session = une surface de rendu + ses séries (chandelles, volume,
// séries de l'indicateur sélectionné). Elle appartient exclusivement au
// ChartSessionManager.
//
// MACHINE À ÉTATS :
//   Absent ──create──▶ Active ──update_data / set_indicator / resize(largeur)──▶ Active
//   Active ──destroy──▶ Destroyed ──create──▶ Active
//   Active ──set_theme / resize(hauteur)──▶ destroy + create ──▶ Active
//   reconstruction échouée ──resize / set_theme──▶ create (nouvel essai)
//
// Règles :
// - changement de thème : surface détruite et recréée, données renvoyées
// - changement d'indicateur : anciennes séries d'indicateur libérées AVANT
//   d'attacher les nouvelles
// - données : contenu des séries remplacé, jamais de recréation
// ============================================================================

use tracing::{debug, info, instrument, warn};

use crate::chart::surface::{
    Dimensions, HistogramPoint, RenderSurface, SeriesData, SeriesId, SeriesRole, SeriesSpec,
    SurfaceError, SurfaceFactory,
};
use crate::chart::theme::{Palette, Theme};
use crate::indicators::{self, IndicatorKind, IndicatorParams, IndicatorSeries};
use crate::models::{closes, Candle, PricePoint};

/// Ressources d'une session active
pub struct ChartSession<S: RenderSurface> {
    surface: S,
    theme: Theme,
    palette: Palette,
    dimensions: Dimensions,
    candles: SeriesId,
    volume: SeriesId,
    overlays: Vec<(SeriesRole, SeriesId)>,
}

impl<S: RenderSurface> ChartSession<S> {
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Rôles des séries attachées (chandelles et volume en tête)
    pub fn roles(&self) -> Vec<SeriesRole> {
        let mut roles = vec![SeriesRole::Candles, SeriesRole::Volume];
        roles.extend(self.overlays.iter().map(|(role, _)| *role));
        roles
    }

    /// Libère les séries d'indicateur puis attache celles de la nouvelle sélection
    fn replace_overlays(&mut self, indicator: Option<IndicatorKind>) -> Result<(), SurfaceError> {
        for (role, id) in self.overlays.drain(..) {
            debug!(series = %id, role = role.label(), "Disposing indicator series");
            self.surface.remove_series(id)?;
        }

        for &role in SeriesRole::overlays_for(indicator) {
            let id = self.surface.add_series(SeriesSpec::for_role(role, &self.palette));
            self.overlays.push((role, id));
        }
        Ok(())
    }

    /// Envoie chandelles, volume et indicateur à la surface
    fn push(
        &mut self,
        candles: &[Candle],
        indicator: Option<IndicatorKind>,
        params: &IndicatorParams,
    ) -> Result<(), SurfaceError> {
        self.surface
            .set_data(self.candles, SeriesData::Candles(candles.to_vec()))?;
        self.surface
            .set_data(self.volume, SeriesData::Histogram(volume_bars(candles, &self.palette)))?;
        self.push_overlays(candles, indicator, params)
    }

    fn push_overlays(
        &mut self,
        candles: &[Candle],
        indicator: Option<IndicatorKind>,
        params: &IndicatorParams,
    ) -> Result<(), SurfaceError> {
        let Some(kind) = indicator else {
            return Ok(());
        };
        let series = indicators::compute(kind, &closes(candles), params);
        for &(role, id) in &self.overlays {
            let data = overlay_data(role, &series, &self.palette);
            self.surface.set_data(id, data)?;
        }
        Ok(())
    }

    /// Vide toutes les séries sans les détacher
    fn clear(&mut self) -> Result<(), SurfaceError> {
        self.surface.set_data(self.candles, SeriesData::Candles(Vec::new()))?;
        self.surface.set_data(self.volume, SeriesData::Histogram(Vec::new()))?;
        for &(role, id) in &self.overlays {
            self.surface.set_data(id, SeriesData::empty(role.kind()))?;
        }
        Ok(())
    }
}

/// Barres de volume colorées selon le sens de la chandelle
fn volume_bars(candles: &[Candle], palette: &Palette) -> Vec<HistogramPoint> {
    candles
        .iter()
        .map(|c| HistogramPoint {
            time: c.time,
            value: c.volume,
            color: if c.close >= c.open {
                palette.candle_up
            } else {
                palette.candle_down
            },
        })
        .collect()
}

/// Extrait la part de la sortie d'indicateur destinée à une série
fn overlay_data(role: SeriesRole, series: &IndicatorSeries, palette: &Palette) -> SeriesData {
    let line = |points: Vec<PricePoint>| SeriesData::Line(points);
    match (role, series) {
        (SeriesRole::Rsi | SeriesRole::Ema | SeriesRole::Sma, IndicatorSeries::Line(points)) => {
            line(points.clone())
        }
        (SeriesRole::Macd, IndicatorSeries::Macd(m)) => line(m.macd.clone()),
        (SeriesRole::MacdSignal, IndicatorSeries::Macd(m)) => line(m.signal.clone()),
        (SeriesRole::MacdHistogram, IndicatorSeries::Macd(m)) => SeriesData::Histogram(
            m.histogram
                .iter()
                .map(|p| HistogramPoint {
                    time: p.time,
                    value: p.value,
                    color: palette.histogram,
                })
                .collect(),
        ),
        (SeriesRole::BollingerUpper, IndicatorSeries::Bands(bands)) => {
            line(bands.iter().map(|b| PricePoint::new(b.time, b.upper)).collect())
        }
        (SeriesRole::BollingerLower, IndicatorSeries::Bands(bands)) => {
            line(bands.iter().map(|b| PricePoint::new(b.time, b.lower)).collect())
        }
        (SeriesRole::BollingerMiddle, IndicatorSeries::Bands(bands)) => {
            line(bands.iter().map(|b| PricePoint::new(b.time, b.middle)).collect())
        }
        (role, _) => SeriesData::empty(role.kind()),
    }
}

/// État observable du gestionnaire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Absent,
    Active,
    Destroyed,
}

enum SessionState<S: RenderSurface> {
    Absent,
    Active(ChartSession<S>),
    Destroyed,
}

/// Propriétaire unique de la session graphique d'une vue
pub struct ChartSessionManager<F: SurfaceFactory> {
    factory: F,
    state: SessionState<F::Surface>,
    params: IndicatorParams,
    theme: Theme,
    dimensions: Dimensions,
    indicator: Option<IndicatorKind>,
    /// Dernières données affichées, renvoyées après une reconstruction
    candles: Vec<Candle>,
    /// Une session est voulue : vrai de create jusqu'à destroy
    live: bool,
}

impl<F: SurfaceFactory> ChartSessionManager<F> {
    pub fn new(factory: F, params: IndicatorParams, indicator: Option<IndicatorKind>) -> Self {
        Self {
            factory,
            state: SessionState::Absent,
            params,
            theme: Theme::default(),
            dimensions: Dimensions::default(),
            indicator,
            candles: Vec::new(),
            live: false,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match self.state {
            SessionState::Absent => SessionPhase::Absent,
            SessionState::Active(_) => SessionPhase::Active,
            SessionState::Destroyed => SessionPhase::Destroyed,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase() == SessionPhase::Active
    }

    pub fn session(&self) -> Option<&ChartSession<F::Surface>> {
        match &self.state {
            SessionState::Active(session) => Some(session),
            _ => None,
        }
    }

    pub fn surface(&self) -> Option<&F::Surface> {
        self.session().map(ChartSession::surface)
    }

    /// Rôles des séries de la session active (vide sans session)
    pub fn roles(&self) -> Vec<SeriesRole> {
        self.session().map(ChartSession::roles).unwrap_or_default()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn indicator(&self) -> Option<IndicatorKind> {
        self.indicator
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Crée la session (en détruisant d'abord celle qui existerait)
    ///
    /// Les dernières données connues sont renvoyées dans la nouvelle session.
    #[instrument(skip(self, theme), fields(theme = theme.label()))]
    pub fn create(&mut self, dimensions: Dimensions, theme: Theme) -> Result<(), SurfaceError> {
        self.live = true;
        if self.is_active() {
            self.release();
        }
        self.theme = theme;
        self.dimensions = dimensions;

        let palette = theme.palette();
        let mut surface = self.factory.create(dimensions, &palette)?;
        let candles = surface.add_series(SeriesSpec::for_role(SeriesRole::Candles, &palette));
        let volume = surface.add_series(SeriesSpec::for_role(SeriesRole::Volume, &palette));

        let mut session = ChartSession {
            surface,
            theme,
            palette,
            dimensions,
            candles,
            volume,
            overlays: Vec::new(),
        };
        let populated = match session.replace_overlays(self.indicator) {
            Ok(()) if !self.candles.is_empty() => session.push(&self.candles, self.indicator, &self.params),
            other => other,
        };
        if let Err(e) = populated {
            warn!(error = %e, "Chart session setup failed, releasing surface");
            session.surface.remove();
            return Err(e);
        }

        info!(
            series = session.surface.series_count(),
            width = dimensions.width,
            height = dimensions.height,
            "Chart session created"
        );
        self.state = SessionState::Active(session);
        Ok(())
    }

    /// Libère la surface et toutes ses séries ; plus aucune session voulue
    pub fn destroy(&mut self) {
        self.live = false;
        self.release();
    }

    fn release(&mut self) {
        match std::mem::replace(&mut self.state, SessionState::Destroyed) {
            SessionState::Active(session) => {
                let series = session.surface.series_count();
                session.surface.remove();
                info!(series, "Chart session destroyed");
            }
            SessionState::Absent => self.state = SessionState::Absent,
            SessionState::Destroyed => {}
        }
    }

    /// Changement de thème : reconstruction complète
    pub fn set_theme(&mut self, theme: Theme) -> Result<(), SurfaceError> {
        if theme == self.theme && self.is_active() {
            return Ok(());
        }
        self.theme = theme;
        if self.live {
            info!(theme = theme.label(), "Theme changed, rebuilding chart session");
            let dimensions = self.dimensions;
            self.create(dimensions, theme)?;
        }
        Ok(())
    }

    /// Changement de taille
    ///
    /// Largeur seule : appliquée sur la surface vivante.
    /// Hauteur, ou session perdue par une reconstruction échouée : création.
    pub fn resize(&mut self, dimensions: Dimensions) -> Result<(), SurfaceError> {
        let previous = self.dimensions;
        if dimensions == previous {
            return Ok(());
        }
        self.dimensions = dimensions;

        if !self.live {
            return Ok(());
        }
        if dimensions.height != previous.height || !self.is_active() {
            debug!(height = dimensions.height, "Rebuilding chart session for new size");
            let theme = self.theme;
            return self.create(dimensions, theme);
        }

        if let SessionState::Active(session) = &mut self.state {
            debug!(width = dimensions.width, "Applying new chart width");
            session.surface.apply_width(dimensions.width);
            session.dimensions = dimensions;
        }
        Ok(())
    }

    /// Change l'indicateur affiché sans recréer la surface
    pub fn set_indicator(&mut self, indicator: Option<IndicatorKind>) -> Result<(), SurfaceError> {
        self.indicator = indicator;
        if let SessionState::Active(session) = &mut self.state {
            session.replace_overlays(indicator)?;
            session.push_overlays(&self.candles, indicator, &self.params)?;
            debug!(
                indicator = indicator.map(|k| k.label()).unwrap_or("none"),
                series = session.surface.series_count(),
                "Indicator series replaced"
            );
        }
        Ok(())
    }

    /// Nouvelles données : remplace le contenu des séries
    ///
    /// Sans session active, les données sont gardées pour la prochaine
    /// création et `SurfaceError::NoSession` est retourné.
    pub fn update_data(&mut self, candles: Vec<Candle>) -> Result<(), SurfaceError> {
        self.candles = candles;
        match &mut self.state {
            SessionState::Active(session) => {
                session.push(&self.candles, self.indicator, &self.params)?;
                debug!(candles = self.candles.len(), "Chart series updated");
                Ok(())
            }
            _ => {
                warn!(candles = self.candles.len(), "Chart data received without an active session");
                Err(SurfaceError::NoSession)
            }
        }
    }

    /// Vide les séries (changement de sélection en attente de données)
    pub fn clear_data(&mut self) -> Result<(), SurfaceError> {
        self.candles.clear();
        if let SessionState::Active(session) = &mut self.state {
            session.clear()?;
        }
        Ok(())
    }
}

impl<F: SurfaceFactory> Drop for ChartSessionManager<F> {
    fn drop(&mut self) {
        self.destroy();
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
