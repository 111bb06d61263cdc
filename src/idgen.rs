//! Identity generation.
//!
//! Image ids are not derived from file names: they are drawn from a wide
//! 10-digit range so that ids produced by independent manifest builds in one
//! run can be concatenated into a combined manifest without remapping.
//!
//! Two draw strategies exist:
//!
//! - [`IdStrategy::Wide`]: uniform over `1_000_000_000..=9_999_999_999`.
//! - [`IdStrategy::Timestamped`]: seven random digits followed by the
//!   current millisecond (`random * 1000 + ms % 1000`), for bursts of ids
//!   generated in quick succession.
//!
//! Drawing alone only makes collisions unlikely. [`IdAllocator`] remembers
//! every id it has issued and redraws on a repeat, so ids from one allocator
//! are unique for as long as it lives. One allocator is shared by every
//! manifest build in a run.
//!
//! The random source is an explicit handle: seed it to make a run's ids
//! reproducible.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ir::{AnnotationId, ImageId};

/// Smallest id either strategy can produce.
pub const MIN_ID: u64 = 1_000_000_000;
/// Largest id either strategy can produce.
pub const MAX_ID: u64 = 9_999_999_999;

const RANDOM_PART_MIN: u64 = 1_000_000;
const RANDOM_PART_MAX: u64 = 9_999_999;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IdStrategy {
    #[default]
    Wide,
    Timestamped,
}

impl IdStrategy {
    /// Draws one candidate id. Always in `MIN_ID..=MAX_ID`.
    pub fn draw<R: Rng + ?Sized>(self, rng: &mut R) -> u64 {
        match self {
            IdStrategy::Wide => rng.random_range(MIN_ID..=MAX_ID),
            IdStrategy::Timestamped => {
                let random_part = rng.random_range(RANDOM_PART_MIN..=RANDOM_PART_MAX);
                random_part * 1000 + current_millis() % 1000
            }
        }
    }
}

fn current_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Collision-checked id allocator over an explicit random source.
#[derive(Debug)]
pub struct IdAllocator<R> {
    rng: R,
    strategy: IdStrategy,
    issued: HashSet<u64>,
    redraws: u64,
}

impl<R: Rng> IdAllocator<R> {
    pub fn new(rng: R, strategy: IdStrategy) -> Self {
        Self {
            rng,
            strategy,
            issued: HashSet::new(),
            redraws: 0,
        }
    }

    /// Returns an id this allocator has never returned before.
    pub fn next_raw(&mut self) -> u64 {
        loop {
            let candidate = self.strategy.draw(&mut self.rng);
            if self.issued.insert(candidate) {
                return candidate;
            }
            self.redraws += 1;
            log::debug!("identifier {} already issued in this run, redrawing", candidate);
        }
    }

    pub fn next_image_id(&mut self) -> ImageId {
        ImageId::new(self.next_raw())
    }

    pub fn issued(&self) -> usize {
        self.issued.len()
    }

    /// Number of draws rejected as repeats.
    pub fn redraws(&self) -> u64 {
        self.redraws
    }
}

impl IdAllocator<StdRng> {
    /// Reproducible allocator: same seed, same id sequence.
    pub fn seeded(seed: u64, strategy: IdStrategy) -> Self {
        Self::new(StdRng::seed_from_u64(seed), strategy)
    }

    /// Allocator seeded from the thread-local generator.
    pub fn from_entropy(strategy: IdStrategy) -> Self {
        Self::new(StdRng::from_rng(&mut rand::rng()), strategy)
    }

    /// Seeded when `seed` is given, otherwise from entropy.
    pub fn from_seed_option(seed: Option<u64>, strategy: IdStrategy) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed, strategy),
            None => Self::from_entropy(strategy),
        }
    }
}

/// Dense annotation ids for one manifest: 1, 2, 3, ...
#[derive(Clone, Debug)]
pub struct SequentialIds {
    next: u64,
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> AnnotationId {
        let id = AnnotationId::new(self.next);
        self.next += 1;
        id
    }

    /// How many ids have been handed out.
    pub fn issued(&self) -> u64 {
        self.next - 1
    }
}
