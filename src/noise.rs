//! Seeded 2D gradient noise.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Classic coherent gradient noise over a shuffled permutation table.
///
/// Output of [`NoiseField::sample`] and [`NoiseField::sample_octaves`] lies in
/// `[0, 1]`, and is a pure function of the seed and the inputs.
#[derive(Clone)]
pub struct NoiseField {
    // 256 distinct entries repeated twice so corner lookups never wrap.
    permutation: [u8; 512],
}

impl NoiseField {
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Self::from_rng(&mut rng)
    }

    /// Builds the table from an already-seeded generator.
    pub fn from_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut base: Vec<u8> = (0..=255u8).collect();
        base.shuffle(rng);
        let mut permutation = [0u8; 512];
        for (i, value) in base.iter().enumerate() {
            permutation[i] = *value;
            permutation[256 + i] = *value;
        }
        Self { permutation }
    }

    pub fn permutation(&self) -> &[u8; 512] {
        &self.permutation
    }

    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let xi = (x.floor() as i64 & 255) as usize;
        let yi = (y.floor() as i64 & 255) as usize;
        let xf = x - x.floor();
        let yf = y - y.floor();

        let u = fade(xf);
        let v = fade(yf);

        let p = &self.permutation;
        let aa = p[p[xi] as usize + yi];
        let ab = p[p[xi] as usize + yi + 1];
        let ba = p[p[xi + 1] as usize + yi];
        let bb = p[p[xi + 1] as usize + yi + 1];

        let x1 = lerp(grad(aa, xf, yf), grad(ba, xf - 1.0, yf), u);
        let x2 = lerp(grad(ab, xf, yf - 1.0), grad(bb, xf - 1.0, yf - 1.0), u);

        ((lerp(x1, x2, v) + 1.0) * 0.5).clamp(0.0, 1.0)
    }

    /// Sums `octaves` samples, scaling frequency by `lacunarity` and
    /// amplitude by `persistence` each step, normalised by the amplitude total.
    pub fn sample_octaves(
        &self,
        x: f64,
        y: f64,
        octaves: u32,
        persistence: f64,
        lacunarity: f64,
    ) -> f64 {
        let mut total = 0.0;
        let mut frequency = 1.0;
        let mut amplitude = 1.0;
        let mut max_value = 0.0;
        for _ in 0..octaves {
            total += self.sample(x * frequency, y * frequency) * amplitude;
            max_value += amplitude;
            amplitude *= persistence;
            frequency *= lacunarity;
        }
        if max_value <= 0.0 {
            return 0.0;
        }
        (total / max_value).clamp(0.0, 1.0)
    }
}

impl std::fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseField")
            .field("head", &&self.permutation[..8])
            .finish()
    }
}

fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

fn grad(hash: u8, x: f64, y: f64) -> f64 {
    let h = hash & 3;
    let (u, v) = if h < 2 { (x, y) } else { (y, x) };
    let u = if h & 1 != 0 { -u } else { u };
    let v = if h & 2 != 0 { -2.0 * v } else { 2.0 * v };
    u + v
}
