pub mod cache;
pub mod colorizer;
pub mod geometry;
pub mod provider;
pub mod quadtree;
pub mod render;
pub mod snapshot;
pub mod viewport;


pub use cache::{CommitOutcome, SnapshotCache};
pub use colorizer::{Color, FastColorizer, ValueColorizer};
pub use geometry::{rect_around, Point, Rect};
pub use provider::{
    DynamicElement, ElementKind, ElementProvider, ProviderError, StaticElement, Timestep,
};
pub use quadtree::QuadTree;
pub use render::{CoordinatorConfig, FrameStats, LayerKind, LayerRenderer, RenderCoordinator};
pub use snapshot::{BuildError, DrawableItem, Snapshot, SnapshotBuilder, SnapshotKey};
pub use viewport::{ViewportTracker, ZOOM_MIN_EXTENT};
