//! Contributor list (§4.5, C5).
//!
//! Tracks, per species, which other species' genomes have contributed to its
//! gene pool (via hybrid births) and elects a "principal contributor" —
//! the species this one should be parented under in the tree.

use crate::ids::SID;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeContributor {
    pub sid: SID,
    pub count: u64,
}

/// A multiset of contributing SIDs produced by a single birth: one entry per
/// unit of contribution (2 entries of the same SID for a same-species birth,
/// 1 entry each for a cross-species hybrid).
pub type Contribution = Vec<SID>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContributorList {
    owner: SID,
    entries: Vec<NodeContributor>,
}

impl ContributorList {
    pub fn new(owner: SID) -> Self {
        Self {
            owner,
            entries: Vec::new(),
        }
    }

    pub fn owner(&self) -> SID {
        self.owner
    }

    /// Rebuilds a list from already-materialized, already-sorted entries
    /// (used by snapshot loading).
    pub fn from_raw(owner: SID, entries: Vec<NodeContributor>) -> Self {
        Self { owner, entries }
    }

    pub fn entries(&self) -> &[NodeContributor] {
        &self.entries
    }

    /// Registers `contribution`, merging multiplicities into existing
    /// entries and appending new ones, then re-sorts by decreasing count
    /// (stable, so ties keep their relative insertion order). Returns the
    /// resulting principal contributor.
    pub fn update(&mut self, contribution: Contribution) -> SID {
        // Tally in first-occurrence order rather than through a hash map, so
        // brand-new entries are pushed in the order their SIDs first appear
        // in `contribution` — ties among new entries must keep that order
        // through the stable sort below.
        let mut tally: Vec<(SID, u64)> = Vec::new();
        for sid in contribution {
            if !sid.is_valid() {
                continue;
            }
            match tally.iter_mut().find(|(s, _)| *s == sid) {
                Some((_, count)) => *count += 1,
                None => tally.push((sid, 1)),
            }
        }

        for entry in self.entries.iter_mut() {
            if let Some(pos) = tally.iter().position(|(sid, _)| *sid == entry.sid) {
                let (_, count) = tally.remove(pos);
                entry.count += count;
            }
        }
        for (sid, count) in tally {
            self.entries.push(NodeContributor { sid, count });
        }

        self.entries.sort_by(|a, b| b.count.cmp(&a.count));
        self.principal()
    }

    /// The SID of the highest-count entry that isn't the owner itself, or
    /// `SID::INVALID` if none qualifies.
    pub fn principal(&self) -> SID {
        self.entries
            .iter()
            .find(|e| e.sid != self.owner)
            .map(|e| e.sid)
            .unwrap_or(SID::INVALID)
    }

    /// Drops entries for which `is_eligible` returns false (used when a
    /// contributor species itself becomes unreachable) and re-derives the
    /// principal contributor. Returns the (possibly unchanged) principal.
    pub fn elligibility_recheck(&mut self, is_eligible: impl Fn(SID) -> bool) -> SID {
        self.entries.retain(|e| is_eligible(e.sid));
        self.principal()
    }
}
