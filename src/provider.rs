use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Point, Rect};

/// Simulation time in whole timesteps since midnight of the simulated day.
pub type Timestep = u64;

/// Kind of a visual element. Network kinds form the static layer, mobile
/// kinds the dynamic layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    NetworkLink,
    NetworkNode,
    Vehicle,
    Pedestrian,
}

impl ElementKind {
    pub fn is_static(&self) -> bool {
        matches!(self, ElementKind::NetworkLink | ElementKind::NetworkNode)
    }

    pub fn is_dynamic(&self) -> bool {
        !self.is_static()
    }
}

/// A network element as delivered by the provider at session load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticElement {
    pub id: String,
    pub pos: Point,
    pub kind: ElementKind,
}

/// A mobile element present at one timestep. `state_value` is the scalar
/// driving its color (speed fraction, occupancy, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicElement {
    pub id: String,
    pub pos: Point,
    pub state_value: f64,
    pub kind: ElementKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("element provider unavailable: {0}")]
    Unavailable(String),
    #[error("timestep {requested} outside provider range {first}..={last}")]
    TimeOutOfRange {
        requested: Timestep,
        first: Timestep,
        last: Timestep,
    },
}

/// Opaque source of visual elements. Implementations may be slow
/// (network/disk-bound); callers keep provider calls off the render path.
pub trait ElementProvider: Send + Sync {
    /// The full static element set. Called once at session load to build the
    /// spatial index.
    fn static_elements(&self) -> Result<Vec<StaticElement>, ProviderError>;

    /// The dynamic elements present at `time` within `rect`. The returned
    /// order is preserved into the snapshot so per-element identity stays
    /// stable frame to frame.
    fn dynamic_elements(
        &self,
        time: Timestep,
        rect: Rect,
    ) -> Result<Vec<DynamicElement>, ProviderError>;
}
