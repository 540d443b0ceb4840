//! GID → SID index with reference counting (§4.7, C7).
//!
//! Tracks which species owns each live genome id, plus a refcount: the
//! genome itself counts as one reference, and each live child genome citing
//! it as mother or father adds one more. A row is dropped only once its
//! refcount reaches zero. It is an error to look up a GID not present;
//! callers must have inserted the genome or its ancestor previously.

use crate::error::{PhyloError, Result};
use crate::genome::Genome;
use crate::ids::{GID, Parent, SID};
use fxhash::FxHashMap;

#[derive(Debug, Clone, Copy)]
struct Entry {
    sid: SID,
    refcount: u64,
}

#[derive(Debug, Clone, Default)]
pub struct IdToSpeciesIndex {
    entries: FxHashMap<GID, Entry>,
}

impl IdToSpeciesIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, gid: GID) -> bool {
        self.entries.contains_key(&gid)
    }

    /// The species a known genome belongs to, or `SID::INVALID` if unknown.
    /// Unlike [`Self::parent_sid`], this does not touch the refcount.
    pub fn species_of(&self, gid: GID) -> SID {
        self.entries.get(&gid).map(|e| e.sid).unwrap_or(SID::INVALID)
    }

    /// If `genome` lacks `which`, returns `INVALID`. Otherwise looks up the
    /// parent's species, increments the parent's refcount (the new genome
    /// now also cites it), and returns that species. It is a
    /// [`PhyloError::PreconditionViolation`] for a genome to cite a parent
    /// GID that isn't present in the index — callers must have inserted the
    /// parent genome previously.
    pub fn parent_sid<G: Genome>(&mut self, genome: &G, which: Parent) -> Result<SID> {
        if !genome.has_parent(which) {
            return Ok(SID::INVALID);
        }
        let pgid = genome.parent(which);
        let Some(entry) = self.entries.get_mut(&pgid) else {
            return Err(PhyloError::PreconditionViolation(format!(
                "parent_sid: genome {} cites parent {pgid} which is not in the index",
                genome.id()
            )));
        };
        entry.refcount += 1;
        Ok(entry.sid)
    }

    /// Registers `gid` as belonging to `sid` with a fresh refcount of one.
    pub fn insert(&mut self, gid: GID, sid: SID) {
        self.entries.insert(gid, Entry { sid, refcount: 1 });
    }

    /// Releases the reference held by `genome`'s own existence, then, for
    /// each parent it cites, releases that reference too. Rows reaching a
    /// refcount of zero are dropped. Returns the SID the genome belonged to.
    pub fn remove<G: Genome>(&mut self, genome: &G) -> SID {
        let gid = genome.id();
        let sid = self.release(gid);
        for which in Parent::ALL {
            if genome.has_parent(which) {
                self.release(genome.parent(which));
            }
        }
        sid
    }

    fn release(&mut self, gid: GID) -> SID {
        let Some(e) = self.entries.get_mut(&gid) else {
            return SID::INVALID;
        };
        let sid = e.sid;
        e.refcount = e.refcount.saturating_sub(1);
        if e.refcount == 0 {
            self.entries.remove(&gid);
        }
        sid
    }

    /// Dumps every row as `(gid, sid, refcount)`, for snapshotting (§6).
    pub fn entries_snapshot(&self) -> Vec<(GID, SID, u64)> {
        self.entries
            .iter()
            .map(|(&gid, e)| (gid, e.sid, e.refcount))
            .collect()
    }

    /// Rebuilds an index from a prior [`Self::entries_snapshot`] dump
    /// without re-deriving refcounts from genome parent links.
    pub fn from_entries(entries: Vec<(GID, SID, u64)>) -> Self {
        let mut map: FxHashMap<GID, Entry> =
            FxHashMap::with_capacity_and_hasher(entries.len(), Default::default());
        for (gid, sid, refcount) in entries {
            map.insert(gid, Entry { sid, refcount });
        }
        Self { entries: map }
    }
}
