//! Strong-typed identifiers for species and genomes.
//!
//! Both wrap a `u64` and compare/hash/order by that value. `INVALID` is the
//! reserved sentinel used throughout the engine for "no such parent" /
//! "not yet classified".

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const INVALID: $name = $name(u64::MAX);

            #[inline]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", stringify!($name), self.0)
                } else {
                    write!(f, "{}(INVALID)", stringify!($name))
                }
            }
        }

        impl From<u64> for $name {
            fn from(v: u64) -> Self {
                Self(v)
            }
        }
    };
}

opaque_id!(SID);
opaque_id!(GID);

/// Which parent slot a genome's lineage reference occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parent {
    Mother,
    Father,
}

impl Parent {
    pub const ALL: [Parent; 2] = [Parent::Mother, Parent::Father];
}
