//! Species node (§4.6, C6).
//!
//! Composes a bounded representative set, a contributor list, liveness
//! bookkeeping, and parent/children pointers. The tree (C8) owns the node
//! table and resolves SIDs to nodes; a node only ever stores SIDs, never
//! direct references, so there is no possibility of a reference cycle.

use crate::contributors::{Contribution, ContributorList};
use crate::genome::Genome;
use crate::ids::SID;
use crate::repset::{RepresentativeSet, UserData};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpeciesData {
    pub first_appearance: u64,
    pub last_appearance: u64,
    pub count: u64,
}

#[derive(Debug, Clone)]
pub struct SpeciesNode<G, U> {
    pub id: SID,
    pub data: SpeciesData,
    pub rset: RepresentativeSet<G, U>,
    pub contributors: ContributorList,
    pub parent: SID,
    pub children: Vec<SID>,
    /// Tracked by the hosting tree/simulation, not derived here (§4.6).
    pub currently_alive: u64,
    pub pending: u64,
}

impl<G: Genome, U: UserData> SpeciesNode<G, U> {
    pub fn new(id: SID, enveloppe_size: usize, step: u64) -> Self {
        Self {
            id,
            data: SpeciesData {
                first_appearance: step,
                last_appearance: step,
                count: 0,
            },
            rset: RepresentativeSet::new(enveloppe_size),
            contributors: ContributorList::new(id),
            parent: SID::INVALID,
            children: Vec::new(),
            currently_alive: 0,
            pending: 0,
        }
    }

    /// Rebuilds a node from already-materialized parts (used by snapshot
    /// loading). `currently_alive`/`pending` are not persisted and start
    /// at zero; the hosting simulation re-derives them from subsequent
    /// birth/death events.
    pub fn from_raw(
        id: SID,
        data: SpeciesData,
        rset: RepresentativeSet<G, U>,
        contributors: ContributorList,
        parent: SID,
        children: Vec<SID>,
    ) -> Self {
        Self {
            id,
            data,
            rset,
            contributors,
            parent,
            children,
            currently_alive: 0,
            pending: 0,
        }
    }

    pub fn extinct(&self) -> bool {
        self.currently_alive == 0 && self.pending == 0
    }

    pub fn add_child(&mut self, child: SID) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub fn remove_child(&mut self, child: SID) {
        self.children.retain(|&c| c != child);
    }

    /// Registers `contribution` with the contributor list and, if the
    /// resulting principal differs from the node's current `parent`,
    /// updates `parent` in place and returns the new value. Returns `None`
    /// if the principal did not change.
    pub fn update(&mut self, contribution: Contribution) -> Option<SID> {
        if contribution.is_empty() {
            return None;
        }
        let new_principal = self.contributors.update(contribution);
        if new_principal != self.parent {
            self.parent = new_principal;
            Some(new_principal)
        } else {
            None
        }
    }
}
