mod context_ext;
mod macros;

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};

pub use context_ext::ContextRandomExt;
pub use macros::define_rng;

use crate::define_data_plugin;
use crate::hashing::HashMap;
use crate::rand::SeedableRng;

pub trait RngId: Copy + Clone {
    type RngType: SeedableRng;
    fn get_name() -> &'static str;
}

// The single generator every engine decision draws from. Seeded from the run's base seed.
define_rng!(pub EpisimRng);

// Type-erased generator; the concrete type is `R::RngType` of the id it is stored under.
struct RngHolder {
    rng: Box<dyn Any>,
}

struct RngData {
    base_seed: u64,
    rng_holders: RefCell<HashMap<TypeId, RngHolder>>,
    draws: Cell<u64>,
}

// Generators are created on first use from `base_seed` plus a hash of the id name. The map sits
// in a `RefCell` so sampling works through `&Context`.
define_data_plugin!(
    RngPlugin,
    RngData,
    RngData {
        base_seed: 0,
        rng_holders: RefCell::new(HashMap::default()),
        draws: Cell::new(0),
    }
);
