//! Run-scoped material name disambiguators
//!
//! One generator is created per invocation. Ids are unique within the run and
//! the generator is shared by batch workers without locking.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use std::sync::atomic::{AtomicU32, Ordering};

const BASE_RANGE: u32 = 10_000;

#[derive(Debug)]
pub struct RunIds {
    base: u32,
    next: AtomicU32,
}

impl RunIds {
    /// Seeded generator; the same seed gives the same ids
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        Self {
            base: rng.random_range(0..BASE_RANGE),
            next: AtomicU32::new(0),
        }
    }

    pub fn from_entropy() -> Self {
        Self::from_seed(rand::random())
    }

    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::from_seed(seed),
            None => Self::from_entropy(),
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn next_id(&self) -> u32 {
        self.base
            .wrapping_add(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
