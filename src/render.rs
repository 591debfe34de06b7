use std::sync::Arc;

use crate::cache::{CommitOutcome, SnapshotCache};
use crate::geometry::Rect;
use crate::provider::Timestep;
use crate::snapshot::{BuildError, DrawableItem, SnapshotKey};

/// Which compiled buffer a batch of items belongs to. Carries the
/// persistent-vs-per-frame rebuild hint for the external renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Rarely-changing layer (network geometry); recompiled only when its
    /// item sequence identity changes.
    Static,
    /// Per-frame layer (agents); recompiled every draw.
    Dynamic,
}

/// Renderer boundary. The coordinator hands over two ordered item sequences
/// per frame; everything drawing-API specific lives behind this trait.
pub trait LayerRenderer {
    fn draw_layer(&mut self, layer: LayerKind, items: &[DrawableItem]);
}

/// A render-ready persistent copy of one layer, rebuilt in place.
#[derive(Debug, Default)]
struct CompiledLayer {
    items: Vec<DrawableItem>,
    rebuild_count: u64,
}

impl CompiledLayer {
    fn recompile(&mut self, items: &[DrawableItem]) {
        self.items.clear();
        self.items.extend_from_slice(items);
        self.rebuild_count += 1;
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}

/// Per-frame counters handed back to the render loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub static_items: usize,
    pub dynamic_items: usize,
    pub static_rebuilt: bool,
    /// Time of the snapshot drawn this frame, `None` for an empty frame.
    pub snapshot_time: Option<Timestep>,
}

#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    /// Largest viewport corner displacement (world units) treated as "the
    /// same viewport". Zero means any change triggers a refetch.
    pub viewport_tolerance: f64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            viewport_tolerance: 0.0,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_viewport_tolerance(mut self, tolerance: f64) -> Self {
        self.viewport_tolerance = tolerance;
        self
    }
}

/// Owns the two compiled layer buffers and decides when the cache needs a
/// new snapshot. Lives on the render path; never shared with the fetch path.
pub struct RenderCoordinator {
    cache: Arc<SnapshotCache>,
    config: CoordinatorConfig,
    static_layer: CompiledLayer,
    dynamic_layer: CompiledLayer,
    compiled_fingerprint: Option<u64>,
    last_requested: Option<SnapshotKey>,
    force_refresh: bool,
}

impl RenderCoordinator {
    pub fn new(cache: Arc<SnapshotCache>) -> Self {
        Self::with_config(cache, CoordinatorConfig::default())
    }

    pub fn with_config(cache: Arc<SnapshotCache>, config: CoordinatorConfig) -> Self {
        Self {
            cache,
            config,
            static_layer: CompiledLayer::default(),
            dynamic_layer: CompiledLayer::default(),
            compiled_fingerprint: None,
            last_requested: None,
            force_refresh: false,
        }
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    /// Single control-boundary entry point, called once per tick by the
    /// surrounding application. `force` bypasses the materially-different
    /// check for this request.
    pub fn request_frame(
        &mut self,
        time: Timestep,
        rect: Rect,
        force: bool,
    ) -> Result<CommitOutcome, BuildError> {
        if force {
            self.force_refresh = true;
        }
        self.on_frame(time, rect)
    }

    /// Invalidates the cache when `(time, rect)` differs materially from the
    /// last requested key; otherwise leaves the committed snapshot alone.
    pub fn on_frame(&mut self, time: Timestep, rect: Rect) -> Result<CommitOutcome, BuildError> {
        let key = SnapshotKey::new(time, rect);
        if !self.needs_refresh(&key) {
            return Ok(CommitOutcome::Coalesced);
        }
        let outcome = self.cache.invalidate(time, rect)?;
        self.last_requested = Some(key);
        self.force_refresh = false;
        Ok(outcome)
    }

    fn needs_refresh(&self, key: &SnapshotKey) -> bool {
        if self.force_refresh {
            return true;
        }
        let Some(last) = self.last_requested.as_ref() else {
            return true;
        };
        last.time != key.time
            || last.region.max_axis_delta(&key.region) > self.config.viewport_tolerance
    }

    /// Draws the current snapshot through `renderer`: static layer first
    /// (recompiled only when its identity changed), then the dynamic layer
    /// (recompiled every call). With no snapshot committed yet this renders
    /// an empty frame, not an error.
    pub fn draw(&mut self, renderer: &mut impl LayerRenderer) -> FrameStats {
        let Some(snapshot) = self.cache.current() else {
            self.static_layer.clear();
            self.dynamic_layer.clear();
            self.compiled_fingerprint = None;
            renderer.draw_layer(LayerKind::Static, &self.static_layer.items);
            renderer.draw_layer(LayerKind::Dynamic, &self.dynamic_layer.items);
            return FrameStats {
                static_items: 0,
                dynamic_items: 0,
                static_rebuilt: false,
                snapshot_time: None,
            };
        };

        let static_rebuilt = self.compiled_fingerprint != Some(snapshot.static_fingerprint);
        if static_rebuilt {
            self.static_layer.recompile(&snapshot.static_items);
            self.compiled_fingerprint = Some(snapshot.static_fingerprint);
            tracing::debug!(
                items = self.static_layer.items.len(),
                "static layer recompiled"
            );
        }
        self.dynamic_layer.recompile(&snapshot.dynamic_items);

        renderer.draw_layer(LayerKind::Static, &self.static_layer.items);
        renderer.draw_layer(LayerKind::Dynamic, &self.dynamic_layer.items);

        FrameStats {
            static_items: self.static_layer.items.len(),
            dynamic_items: self.dynamic_layer.items.len(),
            static_rebuilt,
            snapshot_time: Some(snapshot.time),
        }
    }

    /// How many times the static buffer has been recompiled.
    pub fn static_rebuilds(&self) -> u64 {
        self.static_layer.rebuild_count
    }

    /// How many times the dynamic buffer has been recompiled.
    pub fn dynamic_rebuilds(&self) -> u64 {
        self.dynamic_layer.rebuild_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::geometry::Point;
    use crate::provider::{
        DynamicElement, ElementKind, ElementProvider, ProviderError, StaticElement,
    };
    use crate::snapshot::SnapshotBuilder;

    struct GridProvider;

    impl ElementProvider for GridProvider {
        fn static_elements(&self) -> Result<Vec<StaticElement>, ProviderError> {
            let mut elements = Vec::new();
            for x in 0..10 {
                for y in 0..10 {
                    elements.push(StaticElement {
                        id: format!("link-{x}-{y}"),
                        pos: Point::new(x as f64 * 100.0, y as f64 * 100.0),
                        kind: ElementKind::NetworkLink,
                    });
                }
            }
            Ok(elements)
        }

        fn dynamic_elements(
            &self,
            time: Timestep,
            rect: Rect,
        ) -> Result<Vec<DynamicElement>, ProviderError> {
            let pos = Point::new(time as f64, time as f64);
            Ok(if rect.contains(pos) {
                vec![DynamicElement {
                    id: "veh-1".to_string(),
                    pos,
                    state_value: 0.4,
                    kind: ElementKind::Vehicle,
                }]
            } else {
                Vec::new()
            })
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        static_draws: Vec<usize>,
        dynamic_draws: Vec<usize>,
    }

    impl LayerRenderer for RecordingRenderer {
        fn draw_layer(&mut self, layer: LayerKind, items: &[DrawableItem]) {
            match layer {
                LayerKind::Static => self.static_draws.push(items.len()),
                LayerKind::Dynamic => self.dynamic_draws.push(items.len()),
            }
        }
    }

    fn coordinator() -> RenderCoordinator {
        let builder = SnapshotBuilder::for_provider(Arc::new(GridProvider)).expect("builder");
        RenderCoordinator::new(Arc::new(SnapshotCache::new(builder)))
    }

    fn viewport() -> Rect {
        Rect::new(0.0, 0.0, 500.0, 500.0)
    }

    #[test]
    fn draw_before_first_build_is_an_empty_frame() {
        let mut coordinator = coordinator();
        let mut renderer = RecordingRenderer::default();
        let stats = coordinator.draw(&mut renderer);
        assert_eq!(stats.static_items, 0);
        assert_eq!(stats.dynamic_items, 0);
        assert_eq!(stats.snapshot_time, None);
        assert!(!stats.static_rebuilt);
        assert_eq!(renderer.static_draws, vec![0]);
        assert_eq!(renderer.dynamic_draws, vec![0]);
    }

    #[test]
    fn static_layer_compiles_once_while_dynamic_recompiles_every_draw() {
        let mut coordinator = coordinator();
        let mut renderer = RecordingRenderer::default();

        coordinator.on_frame(0, viewport()).expect("frame 0");
        let first = coordinator.draw(&mut renderer);
        let second = coordinator.draw(&mut renderer);

        assert!(first.static_rebuilt);
        assert!(!second.static_rebuilt);
        assert_eq!(coordinator.static_rebuilds(), 1);
        assert_eq!(coordinator.dynamic_rebuilds(), 2);
        // 6x6 grid points fall inside the 500x500 viewport.
        assert_eq!(first.static_items, 36);
        assert_eq!(first.dynamic_items, 1);
    }

    #[test]
    fn time_advance_rebuilds_dynamic_but_not_static() {
        let mut coordinator = coordinator();
        let mut renderer = RecordingRenderer::default();

        coordinator.on_frame(10, viewport()).expect("frame 10");
        coordinator.draw(&mut renderer);
        coordinator.on_frame(11, viewport()).expect("frame 11");
        let stats = coordinator.draw(&mut renderer);

        assert!(!stats.static_rebuilt, "same viewport keeps the static buffer");
        assert_eq!(coordinator.static_rebuilds(), 1);
        assert_eq!(stats.snapshot_time, Some(11));
    }

    #[test]
    fn viewport_change_beyond_tolerance_rebuilds_static() {
        let config = CoordinatorConfig::default().with_viewport_tolerance(5.0);
        let builder = SnapshotBuilder::for_provider(Arc::new(GridProvider)).expect("builder");
        let mut coordinator =
            RenderCoordinator::with_config(Arc::new(SnapshotCache::new(builder)), config);
        let mut renderer = RecordingRenderer::default();

        coordinator.on_frame(0, viewport()).expect("initial frame");
        coordinator.draw(&mut renderer);

        // Within tolerance: no new invalidate, nothing recompiled.
        let nudged = viewport().translated(2.0, 0.0);
        let outcome = coordinator.on_frame(0, nudged).expect("nudged frame");
        assert_eq!(outcome, CommitOutcome::Coalesced);
        let stats = coordinator.draw(&mut renderer);
        assert!(!stats.static_rebuilt);

        // Beyond tolerance: refetch, and the changed static set recompiles.
        let panned = viewport().translated(150.0, 0.0);
        let outcome = coordinator.on_frame(0, panned).expect("panned frame");
        assert_eq!(outcome, CommitOutcome::Committed);
        let stats = coordinator.draw(&mut renderer);
        assert!(stats.static_rebuilt);
        assert_eq!(coordinator.static_rebuilds(), 2);
    }

    #[test]
    fn force_refresh_bypasses_materially_different_check() {
        let mut coordinator = coordinator();
        coordinator.on_frame(0, viewport()).expect("initial frame");
        let repeat = coordinator.on_frame(0, viewport()).expect("repeat frame");
        assert_eq!(repeat, CommitOutcome::Coalesced);

        let forced = coordinator
            .request_frame(0, viewport(), true)
            .expect("forced frame");
        assert_eq!(forced, CommitOutcome::Committed);
    }

    #[test]
    fn failed_refetch_keeps_drawing_previous_snapshot() {
        struct FlakyProvider {
            fail_after: Timestep,
        }
        impl ElementProvider for FlakyProvider {
            fn static_elements(&self) -> Result<Vec<StaticElement>, ProviderError> {
                GridProvider.static_elements()
            }
            fn dynamic_elements(
                &self,
                time: Timestep,
                rect: Rect,
            ) -> Result<Vec<DynamicElement>, ProviderError> {
                if time >= self.fail_after {
                    return Err(ProviderError::Unavailable("backend gone".to_string()));
                }
                GridProvider.dynamic_elements(time, rect)
            }
        }

        let builder =
            SnapshotBuilder::for_provider(Arc::new(FlakyProvider { fail_after: 5 })).expect("builder");
        let mut coordinator = RenderCoordinator::new(Arc::new(SnapshotCache::new(builder)));
        let mut renderer = RecordingRenderer::default();

        coordinator.on_frame(4, viewport()).expect("healthy frame");
        let healthy = coordinator.draw(&mut renderer);
        assert_eq!(healthy.snapshot_time, Some(4));

        assert!(coordinator.on_frame(5, viewport()).is_err());
        let degraded = coordinator.draw(&mut renderer);
        assert_eq!(degraded.snapshot_time, Some(4), "previous snapshot survives");
    }
}
