//! Layered spring noise.
//!
//! The terrain field is built from three pieces:
//! - [`SpringNoise`]: a circular table of smoothly varying values in `[0, 1]`.
//! - [`BlockNoise`]: three spring tables folded into a continuous 2-D field.
//! - [`LayeredField`]: several block noises at geometrically growing
//!   frequency, multiplied together and power-normalized.
//!
//! Tables are built once and never mutated, so a field can be shared
//! read-only between generator threads.

use fastrand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default spring table length (must be a power of two).
pub const DEFAULT_BUFFER_SIZE: usize = 65_536;

/// Default minimum spring block length.
pub const DEFAULT_MIN_BLOCK_SIZE: usize = 512;

/// Default random extra block length (exclusive upper bound).
pub const DEFAULT_BLOCK_SIZE_RANGE: usize = 1024;

/// Default fraction of the remaining distance covered per sample.
pub const DEFAULT_SMOOTHING: f32 = 0.02;

/// Default number of stacked noise layers.
pub const DEFAULT_LAYERS: usize = 9;

/// Default frequency of the first layer.
pub const DEFAULT_BASE_FREQUENCY: f64 = 0.05;

/// Default frequency multiplier between layers.
pub const DEFAULT_FREQUENCY_GROWTH: f64 = 1.93;

/// Parameters of the noise stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    /// Spring table length (power of two)
    pub buffer_size: usize,
    /// Minimum spring block length
    pub min_block_size: usize,
    /// Random extra block length
    pub block_size_range: usize,
    /// Spring smoothing factor (0-1)
    pub smoothing: f32,
    /// Number of stacked layers
    pub layers: usize,
    /// Frequency of the first layer
    pub base_frequency: f64,
    /// Frequency multiplier between layers
    pub frequency_growth: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            min_block_size: DEFAULT_MIN_BLOCK_SIZE,
            block_size_range: DEFAULT_BLOCK_SIZE_RANGE,
            smoothing: DEFAULT_SMOOTHING,
            layers: DEFAULT_LAYERS,
            base_frequency: DEFAULT_BASE_FREQUENCY,
            frequency_growth: DEFAULT_FREQUENCY_GROWTH,
        }
    }
}

impl NoiseParams {
    /// Validate and clamp parameters to usable ranges.
    pub fn validate(&mut self) {
        self.buffer_size = self.buffer_size.clamp(2, 1 << 24).next_power_of_two();
        // Blocks stay short enough for a table to vary.
        let max_block = (self.buffer_size / 4).max(1);
        self.min_block_size = self.min_block_size.clamp(1, max_block);
        self.block_size_range = self.block_size_range.clamp(1, max_block);
        if !self.smoothing.is_finite() {
            self.smoothing = DEFAULT_SMOOTHING;
        }
        self.smoothing = self.smoothing.clamp(0.0001, 1.0);
        self.layers = self.layers.clamp(1, 32);
        if !self.base_frequency.is_finite() || self.base_frequency <= 0.0 {
            self.base_frequency = DEFAULT_BASE_FREQUENCY;
        }
        if !self.frequency_growth.is_finite() || self.frequency_growth <= 0.0 {
            self.frequency_growth = DEFAULT_FREQUENCY_GROWTH;
        }
    }
}

/// Circular table of smoothly varying values in `[0, 1]`.
///
/// The table is split into blocks of random length, each with a random
/// target. The running value starts at a random level and moves a fixed
/// fraction of the way toward the current target on every sample, so
/// neighbours never differ by more than the smoothing factor. Every table has
/// at least two blocks; the one that reaches the end of the table targets the
/// first sample, which closes the loop without a seam.
#[derive(Debug, Clone)]
pub struct SpringNoise {
    samples: Box<[f32]>,
    mask: usize,
}

impl SpringNoise {
    /// Builds a table, drawing block lengths and targets from `rng`.
    #[must_use]
    pub fn generate(params: &NoiseParams, rng: &mut Rng) -> Self {
        let size = params.buffer_size;
        assert!(
            size.is_power_of_two(),
            "Spring table length must be a power of two"
        );

        let mut samples = vec![0.0_f32; size];
        let mut remaining = 0_usize;
        let mut target = 0.0_f32;
        let mut value = rng.f32();

        for i in 0..size {
            if remaining == 0 {
                remaining =
                    (params.min_block_size + rng.usize(..params.block_size_range.max(1))).max(1);
                target = rng.f32();
                if i == 0 {
                    // Leave room for the closing block.
                    remaining = remaining.min(size / 2).max(1);
                } else if size - i < remaining + params.min_block_size {
                    // Last block: run to the end and steer back to the first sample.
                    remaining = size - i;
                    target = samples[0];
                }
            }
            samples[i] = value;
            value += (target - value) * params.smoothing;
            remaining -= 1;
        }

        Self {
            samples: samples.into_boxed_slice(),
            mask: size - 1,
        }
    }

    /// Table length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the table is empty (never true for a generated table).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All samples in table order.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    /// Reads a sample, wrapping the index around the table.
    #[inline]
    #[must_use]
    pub fn sample(&self, index: usize) -> f32 {
        self.samples[index & self.mask]
    }

    /// Reads the sample at a continuous coordinate.
    ///
    /// The coordinate is scaled by the table length, truncated and masked, so
    /// the table tiles the whole number line, negative values included.
    #[inline]
    #[must_use]
    pub fn at(&self, coord: f64) -> f32 {
        let mask = self.mask as i64;
        let index = (coord * self.mask as f64) as i64 & mask;
        self.samples[index as usize]
    }
}

/// Continuous 2-D field built from three spring tables.
///
/// `x` and `y` index their own tables; the sum of the two samples indexes the
/// `combine` table. Three lookups per evaluation.
#[derive(Debug, Clone)]
pub struct BlockNoise {
    x: SpringNoise,
    y: SpringNoise,
    combine: SpringNoise,
}

impl BlockNoise {
    /// Builds three fresh tables from `rng`.
    #[must_use]
    pub fn new(params: &NoiseParams, rng: &mut Rng) -> Self {
        let x = SpringNoise::generate(params, rng);
        let y = SpringNoise::generate(params, rng);
        let combine = SpringNoise::generate(params, rng);
        Self { x, y, combine }
    }

    /// Evaluates the field at `(x, y)`. Always within `[0, 1]`.
    #[inline]
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> f32 {
        let rx = self.x.at(x);
        let ry = self.y.at(y);
        self.combine.at(f64::from(rx + ry))
    }
}

/// Multiplicative fractal of [`BlockNoise`] layers.
///
/// Layer `i` is sampled at frequency `base * growth^i`. The product of all
/// layers is raised to `2 / layers` so the result does not collapse toward
/// zero as layers are added.
#[derive(Debug, Clone)]
pub struct LayeredField {
    layers: Vec<BlockNoise>,
    base_frequency: f64,
    frequency_growth: f64,
    exponent: f64,
    seed: u64,
}

impl LayeredField {
    /// Builds the field. With no seed, one is drawn from the process RNG.
    #[must_use]
    pub fn new(params: &NoiseParams, seed: Option<u64>) -> Self {
        let layer_count = params.layers.max(1);
        let seed = seed.unwrap_or_else(|| fastrand::u64(..));
        let mut rng = Rng::with_seed(seed);

        let layers: Vec<BlockNoise> = (0..layer_count)
            .map(|_| BlockNoise::new(params, &mut rng))
            .collect();

        debug!(
            seed,
            layers = layer_count,
            table_len = params.buffer_size,
            "Built layered terrain field"
        );

        Self {
            layers,
            base_frequency: params.base_frequency,
            frequency_growth: params.frequency_growth,
            exponent: 2.0 / layer_count as f64,
            seed,
        }
    }

    /// Seed the tables were built from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Evaluates the terrain scalar at world coordinates. Always within `[0, 1]`.
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let mut acc = 1.0_f64;
        let mut freq = self.base_frequency;
        for layer in &self.layers {
            acc *= f64::from(layer.sample(x * freq, y * freq));
            freq *= self.frequency_growth;
        }
        acc.powf(self.exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::OnceLock;

    fn shared_field() -> &'static LayeredField {
        static FIELD: OnceLock<LayeredField> = OnceLock::new();
        FIELD.get_or_init(|| LayeredField::new(&NoiseParams::default(), Some(7)))
    }

    fn spring(seed: u64) -> SpringNoise {
        SpringNoise::generate(&NoiseParams::default(), &mut Rng::with_seed(seed))
    }

    #[test]
    fn test_spring_values_in_range() {
        let noise = spring(1);
        assert_eq!(noise.len(), DEFAULT_BUFFER_SIZE);
        assert!(noise.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_spring_is_continuous() {
        let noise = spring(2);
        let max_step = noise
            .as_slice()
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0_f32, f32::max);
        assert!(max_step <= DEFAULT_SMOOTHING + 1e-6, "step {max_step}");
    }

    #[test]
    fn test_spring_wraps_without_seam() {
        let noise = spring(3);
        let first = noise.sample(0);
        let last = noise.sample(DEFAULT_BUFFER_SIZE - 1);
        assert!((first - last).abs() <= DEFAULT_SMOOTHING, "{first} vs {last}");
        assert!((noise.sample(DEFAULT_BUFFER_SIZE) - first).abs() < f32::EPSILON);
    }

    fn spread(noise: &SpringNoise) -> f32 {
        let min = noise.as_slice().iter().copied().fold(f32::MAX, f32::min);
        let max = noise.as_slice().iter().copied().fold(f32::MIN, f32::max);
        max - min
    }

    #[test]
    fn test_spring_is_not_flat() {
        assert!(spread(&spring(4)) > 0.1);
    }

    #[test]
    fn test_spring_seeded_reproducible() {
        assert_eq!(spring(5).as_slice(), spring(5).as_slice());
        assert_ne!(spring(5).as_slice(), spring(6).as_slice());
    }

    #[test]
    fn test_spring_small_table() {
        let params = NoiseParams {
            buffer_size: 256,
            ..NoiseParams::default()
        };
        let noise = SpringNoise::generate(&params, &mut Rng::with_seed(9));
        assert_eq!(noise.len(), 256);
        assert!(noise.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(spread(&noise) > 0.0);

        // Blocks longer than the table still leave a varying table.
        let varied = (0..8)
            .map(|seed| SpringNoise::generate(&params, &mut Rng::with_seed(seed)))
            .filter(|noise| spread(noise) > 0.1)
            .count();
        assert!(varied > 0);
    }

    #[test]
    fn test_validated_small_table_varies() {
        let mut params = NoiseParams {
            buffer_size: 1024,
            ..NoiseParams::default()
        };
        params.validate();
        assert_eq!(params.min_block_size, 256);
        assert_eq!(params.block_size_range, 256);

        let noise = SpringNoise::generate(&params, &mut Rng::with_seed(9));
        assert!(spread(&noise) > 0.0);
        let max_step = noise
            .as_slice()
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0_f32, f32::max);
        assert!(max_step <= params.smoothing + 1e-6, "step {max_step}");
    }

    #[test]
    fn test_coordinate_folding_wraps() {
        let noise = spring(8);
        assert!((noise.at(0.0) - noise.sample(0)).abs() < f32::EPSILON);
        assert!((noise.at(1.0) - noise.sample(DEFAULT_BUFFER_SIZE - 1)).abs() < f32::EPSILON);
        // Negative coordinates wrap from the top of the table.
        assert!((noise.at(-1.0) - noise.sample(1)).abs() < f32::EPSILON);
        assert!((noise.at(2.0) - noise.sample(DEFAULT_BUFFER_SIZE - 2)).abs() < f32::EPSILON);
    }

    #[test]
    fn test_block_noise_range_at_wrap_points() {
        let mut rng = Rng::with_seed(11);
        let block = BlockNoise::new(&NoiseParams::default(), &mut rng);
        let edge = (DEFAULT_BUFFER_SIZE - 1) as f64;
        for &(x, y) in &[(0.0, 0.0), (edge, edge), (0.0, edge), (-edge, 1.0)] {
            let v = block.sample(x, y);
            assert!((0.0..=1.0).contains(&v), "({x}, {y}) -> {v}");
        }
    }

    #[test]
    fn test_layered_deterministic_within_run() {
        let field = shared_field();
        let a = field.sample(12.345, -67.89);
        let b = field.sample(12.345, -67.89);
        assert!((a - b).abs() < f64::EPSILON);
    }

    #[test]
    fn test_layered_same_seed_same_world() {
        let params = NoiseParams {
            buffer_size: 4096,
            layers: 3,
            ..NoiseParams::default()
        };
        let a = LayeredField::new(&params, Some(99));
        let b = LayeredField::new(&params, Some(99));
        assert_eq!(a.seed(), 99);
        assert_eq!(a.layer_count(), 3);
        for i in 0..100 {
            let x = f64::from(i) * 0.37;
            assert!((a.sample(x, -x) - b.sample(x, -x)).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_layered_random_seed_recorded() {
        let mut params = NoiseParams {
            buffer_size: 1024,
            layers: 2,
            ..NoiseParams::default()
        };
        params.validate();
        let random = LayeredField::new(&params, None);
        let replay = LayeredField::new(&params, Some(random.seed()));
        let points: Vec<f64> = (0..64).map(|i| f64::from(i) * 0.731).collect();
        for &x in &points {
            assert!((random.sample(x, 1.0 - x) - replay.sample(x, 1.0 - x)).abs() < f64::EPSILON);
        }
        let first = random.sample(points[0], 1.0);
        assert!(points.iter().any(|&x| (random.sample(x, 1.0) - first).abs() > 1e-6));
    }

    #[test]
    fn test_params_validate() {
        let mut params = NoiseParams {
            buffer_size: 1000,
            block_size_range: 0,
            smoothing: f32::NAN,
            layers: 0,
            base_frequency: -1.0,
            ..NoiseParams::default()
        };
        params.validate();
        assert_eq!(params.buffer_size, 1024);
        assert_eq!(params.min_block_size, 256);
        assert_eq!(params.block_size_range, 1);
        assert!((params.smoothing - DEFAULT_SMOOTHING).abs() < f32::EPSILON);
        assert_eq!(params.layers, 1);
        assert!((params.base_frequency - DEFAULT_BASE_FREQUENCY).abs() < f64::EPSILON);
    }

    proptest! {
        #[test]
        fn layered_output_in_unit_range(x in -1.0e6f64..1.0e6, y in -1.0e6f64..1.0e6) {
            let v = shared_field().sample(x, y);
            prop_assert!((0.0..=1.0).contains(&v));
        }
    }
}
