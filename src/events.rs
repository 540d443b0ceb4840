//! Observer hooks (§4.9, C9).
//!
//! Every callback is synchronous and fires inline with the mutation it
//! reports, in the order: enveloppe-leaves, enveloppe-enters, new-species
//! (if one had to be created), principal-contributor-changed (if a
//! reparenting occurred). There is no event queue. A caller with nothing to
//! observe simply passes `None` — `PhyloTree` methods take
//! `Option<&mut dyn EventSink>` and skip all dispatch in that case.

use crate::ids::{GID, SID};

#[allow(unused_variables)]
pub trait EventSink {
    /// Fires once per call to the tree's `step`, after every species
    /// referenced by `alive` has had its `last_appearance` updated.
    fn on_stepped(&mut self, step: u64, alive: &[SID]) {}

    /// Fires when `add_genome` could not find any existing species willing
    /// to host the new genome and had to create `sid` under `parent_sid`.
    fn on_new_species(&mut self, parent_sid: SID, sid: SID) {}

    /// Fires immediately after a genome is appended to or swapped into
    /// `sid`'s representative set.
    fn on_genome_enters_enveloppe(&mut self, sid: SID, gid: GID) {}

    /// Fires immediately before a representative is evicted from `sid`'s
    /// enveloppe.
    fn on_genome_leaves_enveloppe(&mut self, sid: SID, gid: GID) {}

    /// Fires when `sid`'s principal contributor changes from `old` to `new`
    /// (either of which may be `SID::INVALID`).
    fn on_principal_contributor_changed(&mut self, sid: SID, old: SID, new: SID) {}
}

/// A sink that ignores every event; useful as an explicit "no observer"
/// value where threading an `Option<&mut dyn EventSink>` would be awkward.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {}
