//! Online phylogenetic clustering for artificial-life simulations.
//!
//! Feed [`tree::PhyloTree`] a stream of genome births ([`tree::PhyloTree::add_genome`]),
//! deaths ([`tree::PhyloTree::del_genome`]), and simulation clock ticks
//! ([`tree::PhyloTree::step`]); it classifies each genome into a dynamically
//! growing species tree and reports the interesting transitions through an
//! [`events::EventSink`].

pub mod config;
pub mod contributors;
pub mod dccache;
pub mod error;
pub mod events;
pub mod genome;
pub mod ids;
pub mod index;
pub mod judge;
pub mod matching;
pub mod repset;
pub mod snapshot;
pub mod species;
pub mod tree;

pub use config::Config;
pub use error::{PhyloError, Result};
pub use events::EventSink;
pub use genome::{Aligned, Genome};
pub use ids::{Parent, GID, SID};
pub use judge::JudgeRule;
pub use tree::PhyloTree;
