// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Uniform-random event sampling.
//!
//! Analytics and custom events use the same reservoir: capacity `N`, a
//! `seen` counter over all observations including discarded ones, and the
//! standard reservoir-sampling replacement rule, which retains each of the
//! `seen` events with probability `N / seen`.

use beacon_core::AnalyticsEvent;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::reservoir::Reservoir;

/// Bounded uniform sample of events.
#[derive(Debug)]
pub struct EventReservoir {
    capacity: usize,
    seen: u64,
    samples: Vec<AnalyticsEvent>,
    rng: SmallRng,
}

impl EventReservoir {
    /// Reservoir with the given capacity and an entropy-seeded RNG.
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, SmallRng::from_entropy())
    }

    /// Reservoir with a fixed seed, for reproducible sampling in tests.
    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, rng: SmallRng) -> Self {
        Self {
            capacity,
            seen: 0,
            samples: Vec::new(),
            rng,
        }
    }

    /// Total observations, including ones that were discarded.
    pub fn seen(&self) -> u64 {
        self.seen
    }

    /// Retained samples, in slot order.
    pub fn samples(&self) -> &[AnalyticsEvent] {
        &self.samples
    }
}

impl Reservoir for EventReservoir {
    type Item = AnalyticsEvent;

    fn observe(&mut self, item: AnalyticsEvent) {
        self.seen += 1;
        if self.samples.len() < self.capacity {
            self.samples.push(item);
            return;
        }
        let r = self.rng.gen_range(0..self.seen);
        if r < self.capacity as u64 {
            self.samples[r as usize] = item;
        }
    }

    /// Re-runs the sampling rule over the other reservoir's retained
    /// samples, then accounts for the observations it had already
    /// discarded, so the combined sample stays uniform over the union.
    fn merge(&mut self, other: Self) {
        let absorbed = other.samples.len() as u64;
        for item in other.samples {
            self.observe(item);
        }
        self.seen += other.seen - absorbed;
    }

    fn swap_out(&mut self) -> Self {
        Self {
            capacity: self.capacity,
            seen: std::mem::take(&mut self.seen),
            samples: std::mem::take(&mut self.samples),
            // Derived seed keeps sampling reproducible under a fixed seed.
            rng: SmallRng::seed_from_u64(self.rng.gen()),
        }
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
