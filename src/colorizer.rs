use serde::{Deserialize, Serialize};

/// RGBA color with components in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        Color {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }
}

/// Piecewise-linear color ramp over ascending value stops. Values outside
/// the stop range clamp to the end colors.
#[derive(Debug, Clone)]
pub struct ValueColorizer {
    stops: Vec<(f64, Color)>,
}

impl ValueColorizer {
    /// `stops` must be non-empty and ascending in value.
    pub fn new(stops: &[(f64, Color)]) -> Self {
        debug_assert!(!stops.is_empty());
        debug_assert!(stops.windows(2).all(|pair| pair[0].0 <= pair[1].0));
        Self {
            stops: stops.to_vec(),
        }
    }

    pub fn color_of(&self, value: f64) -> Color {
        let first = self.stops[0];
        let last = self.stops[self.stops.len() - 1];
        if value <= first.0 {
            return first.1;
        }
        if value >= last.0 {
            return last.1;
        }
        for pair in self.stops.windows(2) {
            let (lo_val, lo_color) = pair[0];
            let (hi_val, hi_color) = pair[1];
            if value <= hi_val {
                let span = hi_val - lo_val;
                let t = if span > 0.0 {
                    ((value - lo_val) / span) as f32
                } else {
                    0.0
                };
                return lo_color.lerp(hi_color, t);
            }
        }
        last.1
    }
}

/// Bucketed colorizer: the ramp is pre-rendered into `grain` table entries
/// so per-item coloring on the render path is a single lookup.
#[derive(Debug, Clone)]
pub struct FastColorizer {
    table: Vec<Color>,
    min_value: f64,
    range: f64,
}

impl FastColorizer {
    pub const DEFAULT_GRAIN: usize = 1000;

    pub fn new(stops: &[(f64, Color)], grain: usize) -> Self {
        let ramp = ValueColorizer::new(stops);
        let grain = grain.max(1);
        let min_value = stops[0].0;
        let max_value = stops[stops.len() - 1].0;
        let range = max_value - min_value;
        let step = range / grain as f64;
        let table = (0..grain)
            .map(|i| ramp.color_of(min_value + i as f64 * step))
            .collect();
        Self {
            table,
            min_value,
            range,
        }
    }

    /// The speed ramp the viewer uses for agents: red through yellow and
    /// green to blue over 0..75 (anything faster stays blue).
    pub fn speed_default() -> Self {
        Self::new(
            &[
                (0.0, Color::RED),
                (25.0, Color::YELLOW),
                (50.0, Color::GREEN),
                (75.0, Color::BLUE),
            ],
            Self::DEFAULT_GRAIN,
        )
    }

    pub fn color_of(&self, value: f64) -> Color {
        let last = self.table.len() - 1;
        if self.range <= 0.0 || value >= self.min_value + self.range {
            return self.table[last];
        }
        if value < self.min_value {
            return self.table[0];
        }
        let idx = ((value - self.min_value) * self.table.len() as f64 / self.range) as usize;
        self.table[idx.min(last)]
    }
}
