//! Seeded random streams.
//!
//! Every consumer draws from its own named ChaCha stream derived from the
//! game's master seed, so adding draws in one subsystem never shifts the
//! sequence seen by another.

use std::collections::HashMap;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const WORLDGEN_STREAM: &str = "worldgen";
pub const LANDFORM_STREAM: &str = "landform";
pub const COMBAT_STREAM: &str = "combat";

/// A source of uniformly distributed floats.
///
/// Probabilistic map features and combat variance only ever need this one
/// operation, which keeps them trivially stubbable in tests.
pub trait RandomSource {
    /// A value in `[lo, hi)`; returns `lo` when the range is empty.
    fn uniform(&mut self, lo: f32, hi: f32) -> f32;

    fn chance(&mut self, probability: f32) -> bool {
        self.uniform(0.0, 1.0) < probability
    }
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn uniform(&mut self, lo: f32, hi: f32) -> f32 {
        if hi <= lo {
            return lo;
        }
        lo + (hi - lo) * self.gen::<f32>()
    }
}

pub struct RngManager {
    master_seed: u64,
    streams: HashMap<String, ChaCha8Rng>,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self {
            master_seed: seed,
            streams: HashMap::new(),
        }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn stream(&mut self, name: &str) -> SystemRng<'_> {
        let seed = derive_seed(self.master_seed, name);
        let entry = self
            .streams
            .entry(name.to_string())
            .or_insert_with(|| ChaCha8Rng::seed_from_u64(seed));
        SystemRng { inner: entry }
    }
}

fn derive_seed(master_seed: u64, name: &str) -> u64 {
    // FNV-1a over the stream name, then an LCG mix with the master seed.
    let mut name_hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in name.bytes() {
        name_hash ^= u64::from(byte);
        name_hash = name_hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    let mut seed = master_seed;
    seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    seed ^= name_hash;
    seed.wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407)
}

/// Draws a fresh non-zero seed from the operating system's entropy.
pub fn random_seed() -> u64 {
    rand::thread_rng().gen_range(1..=u64::from(u32::MAX))
}

pub struct SystemRng<'a> {
    inner: &'a mut ChaCha8Rng,
}

impl<'a> RngCore for SystemRng<'a> {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

/// Replays a fixed cycle of unit-interval fractions. Handy wherever a test
/// needs combat variance or landform rolls pinned down.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    fractions: Vec<f32>,
    cursor: usize,
}

impl ScriptedRandom {
    pub fn new(fractions: Vec<f32>) -> Self {
        Self {
            fractions,
            cursor: 0,
        }
    }

    pub fn constant(fraction: f32) -> Self {
        Self::new(vec![fraction])
    }
}

impl RandomSource for ScriptedRandom {
    fn uniform(&mut self, lo: f32, hi: f32) -> f32 {
        if self.fractions.is_empty() || hi <= lo {
            return lo;
        }
        let fraction = self.fractions[self.cursor % self.fractions.len()];
        self.cursor += 1;
        lo + (hi - lo) * fraction.clamp(0.0, 1.0)
    }
}
