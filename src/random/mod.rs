//! Reproducible random number streams.
//!
//! Every consumer of randomness (mortality selection, strategies, each worker of the activity
//! dispatcher) draws from its own stream. A stream is addressed by a key type declared with
//! [`define_rng!`]; its seed is the model's base seed offset by a hash of the key's name, so adding
//! draws to one consumer never shifts the sequence seen by another. Streams are created lazily the
//! first time they are used and are discarded by [`RandomStreams::reseed`].
//!
//! Parallel workers must not share a generator. [`RandomStreams::substream`] hands out an owned
//! generator addressed by `(key, index)`; the same address always yields the same sequence.

mod macros;

use std::any::{Any, TypeId};

pub use macros::define_rng;

use log::trace;

use crate::hashing::hash_str;
use crate::rand::distr::uniform::{SampleRange, SampleUniform};
use crate::rand::{Rng, RngCore, SeedableRng};
use crate::HashMap;

pub trait RngId: Copy + Clone + 'static {
    type RngType: SeedableRng + RngCore + Send + 'static;
    fn get_name() -> &'static str;
}

/// Uniform integer draws over an inclusive range.
///
/// Bounds may be given in either order: `int_value(10, 2)` draws from `2..=10`.
pub trait UniformIntExt: Rng {
    fn int_value(&mut self, a: i64, b: i64) -> i64 {
        let (min, max) = if a <= b { (a, b) } else { (b, a) };
        self.random_range(min..=max)
    }
}

impl<R: Rng> UniformIntExt for R {}

// A wrapper that allows any `SeedableRng` to be stored behind an `RngId`.
struct RngHolder {
    rng: Box<dyn Any + Send>,
}

/// The set of named random streams owned by one simulation.
pub struct RandomStreams {
    base_seed: u64,
    rng_holders: HashMap<TypeId, RngHolder>,
}

impl RandomStreams {
    #[must_use]
    pub fn new(base_seed: u64) -> RandomStreams {
        RandomStreams {
            base_seed,
            rng_holders: HashMap::default(),
        }
    }

    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Sets a new base seed. Existing streams are dropped so they are re-seeded on next use.
    pub fn reseed(&mut self, base_seed: u64) {
        trace!("reseeding random streams with base seed {base_seed}");
        self.base_seed = base_seed;
        self.rng_holders.clear();
    }

    /// Gets the generator associated with the given [`RngId`], creating it if needed.
    pub fn rng<R: RngId>(&mut self, _rng_id: R) -> &mut R::RngType {
        let base_seed = self.base_seed;
        self.rng_holders
            .entry(TypeId::of::<R>())
            .or_insert_with(|| {
                trace!(
                    "creating new RNG (seed={}) for stream {}",
                    base_seed,
                    R::get_name()
                );
                let seed_offset = hash_str(R::get_name());
                RngHolder {
                    rng: Box::new(R::RngType::seed_from_u64(
                        base_seed.wrapping_add(seed_offset),
                    )),
                }
            })
            .rng
            .downcast_mut::<R::RngType>()
            .expect("RngId maps to a single generator type")
    }

    /// Gets a random sample from the stream of the given [`RngId`] by applying `sampler`.
    pub fn sample<R: RngId, T>(
        &mut self,
        rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T {
        sampler(self.rng(rng_id))
    }

    /// Gets a random sample within `range` from the stream of the given [`RngId`].
    pub fn sample_range<R: RngId, S, T>(&mut self, rng_id: R, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.sample(rng_id, |rng| rng.random_range(range))
    }

    /// Gets a random boolean value which is true with probability `p`.
    pub fn sample_bool<R: RngId>(&mut self, rng_id: R, p: f64) -> bool
    where
        R::RngType: Rng,
    {
        self.sample(rng_id, |rng| rng.random_bool(p))
    }

    /// Draws a uniform integer from the inclusive range spanned by `a` and `b`.
    pub fn int_value<R: RngId>(&mut self, rng_id: R, a: i64, b: i64) -> i64
    where
        R::RngType: Rng,
    {
        self.sample(rng_id, |rng| rng.int_value(a, b))
    }

    /// Creates an owned generator for substream `index` of the given [`RngId`].
    ///
    /// Substreams do not touch the parent stream's state, and two calls with the same base seed,
    /// key and index return generators producing the same sequence.
    pub fn substream<R: RngId>(&self, _rng_id: R, index: u64) -> R::RngType {
        let seed_offset = hash_str(&format!("{}/{}", R::get_name(), index));
        trace!(
            "creating substream {} of {} (seed={})",
            index,
            R::get_name(),
            self.base_seed
        );
        R::RngType::seed_from_u64(self.base_seed.wrapping_add(seed_offset))
    }
}

impl Default for RandomStreams {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_rng;

    define_rng!(FooRng);
    define_rng!(BarRng);

    #[test]
    fn get_rng_basic() {
        let mut streams = RandomStreams::new(42);
        assert_ne!(
            streams.sample(FooRng, RngCore::next_u64),
            streams.sample(FooRng, RngCore::next_u64)
        );
    }

    #[test]
    fn multiple_rng_types() {
        let mut streams = RandomStreams::new(42);
        assert_ne!(
            streams.sample(FooRng, RngCore::next_u64),
            streams.sample(BarRng, RngCore::next_u64)
        );
    }

    #[test]
    fn streams_are_independent() {
        let mut a = RandomStreams::new(42);
        let mut b = RandomStreams::new(42);
        // Drawing from BarRng in `a` must not perturb FooRng.
        a.sample(BarRng, RngCore::next_u64);
        assert_eq!(
            a.sample(FooRng, RngCore::next_u64),
            b.sample(FooRng, RngCore::next_u64)
        );
    }

    #[test]
    fn reset_seed() {
        let mut streams = RandomStreams::new(42);
        let run_0 = streams.sample(FooRng, RngCore::next_u64);
        let run_1 = streams.sample(FooRng, RngCore::next_u64);

        streams.reseed(42);
        assert_eq!(run_0, streams.sample(FooRng, RngCore::next_u64));
        assert_eq!(run_1, streams.sample(FooRng, RngCore::next_u64));

        streams.reseed(88);
        assert_ne!(run_0, streams.sample(FooRng, RngCore::next_u64));
    }

    #[test]
    fn substreams_are_reproducible_and_distinct() {
        let streams = RandomStreams::new(7);
        let mut first = streams.substream(FooRng, 3);
        let mut again = streams.substream(FooRng, 3);
        let mut other = streams.substream(FooRng, 4);
        let x = first.next_u64();
        assert_eq!(x, again.next_u64());
        assert_ne!(x, other.next_u64());
    }

    #[test]
    fn int_value_is_inclusive_and_accepts_reversed_bounds() {
        let mut streams = RandomStreams::new(1);
        let mut seen_min = false;
        let mut seen_max = false;
        for _ in 0..1000 {
            let v = streams.int_value(FooRng, 5, 1);
            assert!((1..=5).contains(&v));
            seen_min |= v == 1;
            seen_max |= v == 5;
        }
        assert!(seen_min && seen_max);
        assert_eq!(streams.int_value(FooRng, 3, 3), 3);
    }

    #[test]
    fn sample_range_and_bool() {
        let mut streams = RandomStreams::new(42);
        let result: u32 = streams.sample_range(FooRng, 0..10);
        assert!(result < 10);
        assert!(!streams.sample_bool(FooRng, 0.0));
        assert!(streams.sample_bool(FooRng, 1.0));
    }
}
