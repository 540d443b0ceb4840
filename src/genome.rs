//! The genome capability contract (§6).
//!
//! The engine never constructs, mutates or crosses genomes. It only needs
//! identity, parental links, and a symmetric notion of distance/compatibility.
//! Everything else about `G` is opaque.

use crate::ids::{Parent, GID};

/// Capability set a caller's genome type must expose to be tracked by the tree.
///
/// Distance and compatibility are free-standing rather than methods on `G`
/// alone because `distance` must be symmetric over a *pair* of genomes, and
/// because genomes that carry an alignment type (see [`Aligned`]) need that
/// alignment threaded through both `distance` and `cross`.
pub trait Genome: Sized {
    fn id(&self) -> GID;

    fn has_parent(&self, which: Parent) -> bool;

    /// Panics if `has_parent(which)` is false; callers must check first.
    fn parent(&self, which: Parent) -> GID;

    /// Symmetric, non-negative distance between two genomes of this type.
    fn distance(a: &Self, b: &Self) -> f64;

    /// Unimodal compatibility curve, peaking at `self`'s evolutionary optimum.
    /// Contract: `compatibility(d) in [0, 1]` for all `d >= 0`.
    fn compatibility(&self, distance: f64) -> f64;
}

/// Optional alignment capability for genomes whose distance computation
/// benefits from a precomputed structural alignment (e.g. two variable-length
/// sequences). Genomes without a natural alignment use `Alignment = ()`.
pub trait Aligned: Genome {
    type Alignment;

    fn align(a: &Self, b: &Self) -> Self::Alignment;

    fn distance_aligned(a: &Self, b: &Self, alignment: &Self::Alignment) -> f64;
}

/// A minimal deterministic genome type shared by this crate's own unit
/// tests and by its `tests/` integration suite (enabled there via the
/// `test-support` feature).
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::cell::Cell;

    thread_local! {
        static NEXT_GID: Cell<u64> = const { Cell::new(0) };
    }

    pub fn next_gid() -> GID {
        NEXT_GID.with(|c| {
            let v = c.get();
            c.set(v + 1);
            GID(v)
        })
    }

    /// A minimal test genome: a scalar trait value plus optional parent GIDs.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct ScalarGenome {
        pub id: GID,
        pub value: f64,
        pub optimum: f64,
        pub mother: Option<GID>,
        pub father: Option<GID>,
    }

    impl ScalarGenome {
        pub fn new(value: f64) -> Self {
            Self {
                id: next_gid(),
                value,
                optimum: 0.0,
                mother: None,
                father: None,
            }
        }

        pub fn with_parents(value: f64, mother: GID, father: GID) -> Self {
            Self {
                id: next_gid(),
                value,
                optimum: 0.0,
                mother: Some(mother),
                father: Some(father),
            }
        }
    }

    impl Genome for ScalarGenome {
        fn id(&self) -> GID {
            self.id
        }

        fn has_parent(&self, which: Parent) -> bool {
            match which {
                Parent::Mother => self.mother.is_some(),
                Parent::Father => self.father.is_some(),
            }
        }

        fn parent(&self, which: Parent) -> GID {
            match which {
                Parent::Mother => self.mother.expect("mother checked by caller"),
                Parent::Father => self.father.expect("father checked by caller"),
            }
        }

        fn distance(a: &Self, b: &Self) -> f64 {
            (a.value - b.value).abs()
        }

        fn compatibility(&self, distance: f64) -> f64 {
            // Unimodal, peaking at 0 distance from this genome's own optimum offset.
            (1.0 - (distance - self.optimum).abs() / 10.0).clamp(0.0, 1.0)
        }
    }
}
