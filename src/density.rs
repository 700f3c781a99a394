//! Count -> circle radius scaling for the heatmap.
//!
//! Radii are `base_radius + normalized * radius_range` with min-max
//! normalisation over the observed per-location counts. When every location
//! has the same count each one gets the full radius.

/// Radius constants, in metres (Leaflet `L.circle` radius unit).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityConfig {
    /// Radius of the least visited location
    pub base_radius: f64,
    /// Extra radius added for the most visited location
    pub radius_range: f64,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            base_radius: 400_000.0,
            radius_range: 600_000.0,
        }
    }
}

/// Min-max scale fitted to one set of counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityScale {
    min: u32,
    max: u32,
    config: DensityConfig,
}

impl DensityScale {
    /// Fit the scale to `counts`. An empty set behaves as a single count of 1.
    pub fn from_counts<I>(counts: I, config: DensityConfig) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        let (min, max) = counts
            .into_iter()
            .fold(None, |acc: Option<(u32, u32)>, c| match acc {
                Some((lo, hi)) => Some((lo.min(c), hi.max(c))),
                None => Some((c, c)),
            })
            .unwrap_or((1, 1));

        Self { min, max, config }
    }

    /// Position of `count` in `[0, 1]`; 1 when all counts are equal.
    pub fn normalized(&self, count: u32) -> f64 {
        if self.max > self.min {
            let clamped = count.clamp(self.min, self.max);
            (clamped - self.min) as f64 / (self.max - self.min) as f64
        } else {
            1.0
        }
    }

    pub fn radius(&self, count: u32) -> f64 {
        self.config.base_radius + self.normalized(count) * self.config.radius_range
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }
}
