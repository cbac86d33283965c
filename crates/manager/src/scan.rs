//! Visiting order of the status-check pass.
//!
//! The pass stops at the first job it finds still running, so jobs at the
//! end of a fixed order would be checked far less often than jobs at the
//! front. A [`ScanOrder`] decides the order for each pass: shuffled by
//! default, rotated or insertion order when determinism is wanted.

use crawlctl_core::config::ScanOrderKind;
use crawlctl_core::types::JobKey;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Produces the visiting order for one status-check pass.
pub trait ScanOrder: Send + Sync {
    fn order(&mut self, keys: &[JobKey]) -> Vec<JobKey>;
}

/// Uniformly shuffled order, a fresh permutation per pass.
pub struct ShuffledOrder {
    rng: StdRng,
}

impl ShuffledOrder {
    /// Seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible sequence of permutations.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for ShuffledOrder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanOrder for ShuffledOrder {
    fn order(&mut self, keys: &[JobKey]) -> Vec<JobKey> {
        let mut keys = keys.to_vec();
        keys.shuffle(&mut self.rng);
        keys
    }
}

/// Insertion order rotated by one position on every pass, so each job
/// periodically comes first.
#[derive(Debug, Default)]
pub struct RotatingOrder {
    offset: usize,
}

impl RotatingOrder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScanOrder for RotatingOrder {
    fn order(&mut self, keys: &[JobKey]) -> Vec<JobKey> {
        if keys.is_empty() {
            return Vec::new();
        }
        let start = self.offset % keys.len();
        self.offset = self.offset.wrapping_add(1);
        keys[start..].iter().chain(&keys[..start]).cloned().collect()
    }
}

/// Plain insertion order.
#[derive(Debug, Default)]
pub struct InsertionOrder;

impl ScanOrder for InsertionOrder {
    fn order(&mut self, keys: &[JobKey]) -> Vec<JobKey> {
        keys.to_vec()
    }
}

/// Build the configured strategy.
pub fn scan_order_for(kind: ScanOrderKind, seed: Option<u64>) -> Box<dyn ScanOrder> {
    match (kind, seed) {
        (ScanOrderKind::Shuffle, Some(seed)) => Box::new(ShuffledOrder::seeded(seed)),
        (ScanOrderKind::Shuffle, None) => Box::new(ShuffledOrder::new()),
        (ScanOrderKind::Rotate, _) => Box::new(RotatingOrder::new()),
    }
}
