use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Point, Rect};
use crate::provider::{ElementKind, ElementProvider, ProviderError, StaticElement, Timestep};
use crate::quadtree::QuadTree;

/// One drawable element descriptor. Positions are in display coordinates
/// (world coordinates rebased by the builder's origin).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum DrawableItem {
    Network {
        id: String,
        pos: Point,
        state_value: f64,
    },
    Agent {
        id: String,
        pos: Point,
        state_value: f64,
        kind: ElementKind,
    },
}

impl DrawableItem {
    pub fn id(&self) -> &str {
        match self {
            DrawableItem::Network { id, .. } | DrawableItem::Agent { id, .. } => id,
        }
    }

    pub fn pos(&self) -> Point {
        match self {
            DrawableItem::Network { pos, .. } | DrawableItem::Agent { pos, .. } => *pos,
        }
    }

    pub fn state_value(&self) -> f64 {
        match self {
            DrawableItem::Network { state_value, .. }
            | DrawableItem::Agent { state_value, .. } => *state_value,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            DrawableItem::Network { .. } => ElementKind::NetworkLink,
            DrawableItem::Agent { kind, .. } => *kind,
        }
    }
}

/// The (time, viewport) query a snapshot was built for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotKey {
    pub time: Timestep,
    pub region: Rect,
}

impl SnapshotKey {
    pub fn new(time: Timestep, region: Rect) -> Self {
        Self { time, region }
    }
}

/// A fully-built set of drawable items for one (time, viewport) query.
/// Immutable once built; shared read-only with the render path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: Timestep,
    pub region: Rect,
    pub static_items: Vec<DrawableItem>,
    pub dynamic_items: Vec<DrawableItem>,
    /// Identity of the ordered static item sequence. The render path
    /// recompiles its static buffer only when this changes.
    pub static_fingerprint: u64,
}

impl Snapshot {
    pub fn key(&self) -> SnapshotKey {
        SnapshotKey::new(self.time, self.region)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("snapshot build failed: {0}")]
    Provider(#[from] ProviderError),
}

/// Assembles snapshots from the spatial index and the element provider for
/// a requested (time, viewport) key.
pub struct SnapshotBuilder {
    index: Arc<QuadTree<StaticElement>>,
    provider: Arc<dyn ElementProvider>,
    /// Display origin: world coordinates are rebased to this point so item
    /// positions stay small near the viewer.
    origin: Point,
}

impl SnapshotBuilder {
    /// Loads the static element set, builds the index, and derives the
    /// display origin from the network extent's min corner.
    pub fn for_provider(provider: Arc<dyn ElementProvider>) -> Result<Self, BuildError> {
        let elements = provider.static_elements()?;
        let index = Arc::new(QuadTree::from_entries(
            elements.into_iter().map(|e| (e.pos, e)),
        ));
        let origin = if index.is_empty() {
            Point::new(0.0, 0.0)
        } else {
            let bounds = index.bounds();
            Point::new(bounds.min_easting, bounds.min_northing)
        };
        tracing::debug!(
            static_elements = index.len(),
            ?origin,
            "spatial index built"
        );
        Ok(Self {
            index,
            provider,
            origin,
        })
    }

    pub fn new(index: Arc<QuadTree<StaticElement>>, provider: Arc<dyn ElementProvider>) -> Self {
        Self {
            index,
            provider,
            origin: Point::new(0.0, 0.0),
        }
    }

    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn index(&self) -> &QuadTree<StaticElement> {
        &self.index
    }

    /// Indexed static elements matching `predicate`, without materializing
    /// them. Used to pre-size compiled buffers.
    pub fn static_count(&self, predicate: impl Fn(&StaticElement) -> bool) -> usize {
        self.index.count_matching(predicate)
    }

    /// Builds the snapshot for `time` and the world-coordinate viewport
    /// `rect`. Static items come back in index order, dynamic items in
    /// provider order (frame-to-frame identity stability).
    pub fn build(&self, time: Timestep, rect: Rect) -> Result<Snapshot, BuildError> {
        let static_items: Vec<DrawableItem> = self
            .index
            .query(&rect)
            .into_iter()
            .map(|element| DrawableItem::Network {
                id: element.id.clone(),
                pos: self.rebase(element.pos),
                state_value: 0.0,
            })
            .collect();

        let dynamic_items: Vec<DrawableItem> = self
            .provider
            .dynamic_elements(time, rect)?
            .into_iter()
            .map(|element| DrawableItem::Agent {
                id: element.id,
                pos: self.rebase(element.pos),
                state_value: element.state_value,
                kind: element.kind,
            })
            .collect();

        let static_fingerprint = fingerprint_ids(&static_items);
        Ok(Snapshot {
            time,
            region: rect,
            static_items,
            dynamic_items,
            static_fingerprint,
        })
    }

    fn rebase(&self, pos: Point) -> Point {
        Point::new(pos.easting - self.origin.easting, pos.northing - self.origin.northing)
    }
}

fn fingerprint_ids(items: &[DrawableItem]) -> u64 {
    let mut hasher = DefaultHasher::new();
    items.len().hash(&mut hasher);
    for item in items {
        item.id().hash(&mut hasher);
    }
    hasher.finish()
}
