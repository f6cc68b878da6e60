use std::any::TypeId;
use std::cell::RefMut;

use log::trace;

use crate::context::Context;
use crate::hashing::hash_str;
use crate::rand::distr::uniform::{SampleRange, SampleUniform};
use crate::rand::{Rng, SeedableRng};
use crate::random::{RngData, RngHolder, RngId, RngPlugin};

/// Gets a mutable reference to the random number generator associated with the given
/// [`RngId`]. If the Rng has not been used before, one will be created with the base seed
/// you defined in `init_random`. Note that this will panic if `init_random` was not called yet.
fn get_rng<R: RngId + 'static>(context: &Context) -> RefMut<R::RngType> {
    let data_container: &RngData = context
        .get_data(RngPlugin)
        .expect("You must initialize the random number generator with a base seed");
    data_container.draws.set(data_container.draws.get() + 1);

    let rng_holders = data_container.rng_holders.borrow_mut();
    RefMut::map(rng_holders, |holders| {
        holders
            .entry(TypeId::of::<R>())
            // Create a new rng holder if it doesn't exist yet
            .or_insert_with(|| {
                let base_seed = data_container.base_seed;
                let seed_offset = hash_str(R::get_name());
                trace!(
                    "creating new RNG {} (seed={base_seed}, offset={seed_offset})",
                    R::get_name()
                );
                RngHolder {
                    rng: Box::new(R::RngType::seed_from_u64(
                        base_seed.wrapping_add(seed_offset),
                    )),
                }
            })
            .rng
            .downcast_mut::<R::RngType>()
            .unwrap()
    })
}

// This is a trait extension on Context for
// random number generation functionality.
pub trait ContextRandomExt {
    /// Initializes the `RngPlugin` data container to store rngs as well as a base
    /// seed. Note that rngs are created lazily when they are first sampled.
    fn init_random(&mut self, base_seed: u64);

    /// The seed passed to the last `init_random` call, if any.
    fn get_base_seed(&self) -> Option<u64>;

    /// Number of sampling calls served since `init_random`. Each call to one of the
    /// `sample*` methods counts once, regardless of how many values the closure pulls.
    fn random_draw_count(&self) -> u64;

    /// Gets a random sample from the random number generator associated with the given
    /// [`RngId`] by applying the specified sampler function. If the Rng has not been used
    /// before, one will be created with the base seed you defined in `init_random`.
    /// Note that this will panic if `init_random` was not called yet.
    fn sample<R: RngId + 'static, T>(
        &self,
        _rng_type: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T;

    /// Gets a random sample within the range provided by `range`
    /// using the generator associated with the given [`RngId`].
    /// Note that this will panic if `init_random` was not called yet.
    fn sample_range<R: RngId + 'static, S, T>(&self, rng_id: R, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform;

    /// Gets one uniform `f64` in `[0, 1)` using the generator associated with the
    /// given [`RngId`]. Comparing the result against a probability `p` with `<` is the
    /// engine's only way of turning a probability into a decision.
    fn sample_uniform<R: RngId + 'static>(&self, rng_id: R) -> f64
    where
        R::RngType: Rng;
}

impl ContextRandomExt for Context {
    fn init_random(&mut self, base_seed: u64) {
        trace!("initializing random module with seed {base_seed}");
        let data_container = self.get_data_mut(RngPlugin);
        data_container.base_seed = base_seed;
        data_container.draws.set(0);

        // Clear any existing Rngs to ensure they get re-seeded on next use
        data_container.rng_holders.get_mut().clear();
    }

    fn get_base_seed(&self) -> Option<u64> {
        self.get_data(RngPlugin).map(|data| data.base_seed)
    }

    fn random_draw_count(&self) -> u64 {
        self.get_data(RngPlugin).map_or(0, |data| data.draws.get())
    }

    fn sample<R: RngId + 'static, T>(
        &self,
        _rng_type: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T {
        let mut rng = get_rng::<R>(self);
        sampler(&mut rng)
    }

    fn sample_range<R: RngId + 'static, S, T>(&self, rng_id: R, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.sample(rng_id, |rng| rng.random_range(range))
    }

    fn sample_uniform<R: RngId + 'static>(&self, rng_id: R) -> f64
    where
        R::RngType: Rng,
    {
        self.sample(rng_id, |rng| rng.random::<f64>())
    }
}
