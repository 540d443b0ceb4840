//! Representative set & distance map (§4.2, C3).
//!
//! A fixed-capacity container of exemplar genomes for a species, plus the
//! sparse lower-triangular table of pairwise distances between them.

use crate::genome::Genome;
use crate::ids::GID;
use std::collections::BTreeMap;

/// Per-representative data the engine itself does not interpret. Constructed
/// from the owning genome's id, and must be deep-cloned wherever the
/// representative is cloned (§5).
pub trait UserData: Clone {
    fn for_genome(gid: GID) -> Self;
}

impl UserData for () {
    fn for_genome(_gid: GID) -> Self {}
}

#[derive(Debug, Clone)]
pub struct Representative<G, U> {
    pub genome: G,
    pub user_data: U,
}

impl<G: Genome, U: UserData> Representative<G, U> {
    fn new(genome: G) -> Self {
        let gid = genome.id();
        Self {
            user_data: U::for_genome(gid),
            genome,
        }
    }

    /// Rebuilds a representative from already-materialized parts, bypassing
    /// `U::for_genome` (used when restoring from a snapshot, where the
    /// user data was itself persisted rather than freshly derived).
    pub fn from_parts(genome: G, user_data: U) -> Self {
        Self { genome, user_data }
    }
}

/// Normalizes an unordered pair of representative indices into `(min, max)`.
#[inline]
fn key(i: usize, j: usize) -> (usize, usize) {
    if i < j {
        (i, j)
    } else {
        (j, i)
    }
}

#[derive(Debug, Clone)]
pub struct RepresentativeSet<G, U> {
    capacity: usize,
    representatives: Vec<Representative<G, U>>,
    distances: BTreeMap<(usize, usize), f64>,
}

impl<G: Genome, U: UserData> RepresentativeSet<G, U> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            representatives: Vec::with_capacity(capacity),
            distances: BTreeMap::new(),
        }
    }

    /// Rebuilds a set from already-materialized parts (used by snapshot
    /// loading, which has already validated the distance map's keys).
    pub fn from_raw(
        capacity: usize,
        representatives: Vec<Representative<G, U>>,
        distances: BTreeMap<(usize, usize), f64>,
    ) -> Self {
        Self {
            capacity,
            representatives,
            distances,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn size(&self) -> usize {
        self.representatives.len()
    }

    pub fn is_full(&self) -> bool {
        self.representatives.len() >= self.capacity
    }

    pub fn get(&self, index: usize) -> &Representative<G, U> {
        &self.representatives[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Representative<G, U>> {
        self.representatives.iter()
    }

    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distances[&key(i, j)]
    }

    pub fn distance_map(&self) -> &BTreeMap<(usize, usize), f64> {
        &self.distances
    }

    pub fn gids(&self) -> Vec<GID> {
        self.representatives.iter().map(|r| r.genome.id()).collect()
    }

    /// Appends `genome` as a new representative. Caller must have checked
    /// `!is_full()`. `distances_to_existing[i]` is the distance to the
    /// representative currently at index `i`.
    pub fn append(&mut self, genome: G, distances_to_existing: &[f64]) {
        debug_assert!(!self.is_full(), "append called on a full representative set");
        debug_assert_eq!(distances_to_existing.len(), self.size());

        let new_index = self.representatives.len();
        for (i, &d) in distances_to_existing.iter().enumerate() {
            self.distances.insert(key(i, new_index), d);
        }
        self.representatives.push(Representative::new(genome));
    }

    /// Replaces the representative at `index`. `distances_to_others[i]` is
    /// the new distance to the representative at index `i` (ignored at
    /// `i == index`).
    pub fn replace(&mut self, index: usize, genome: G, distances_to_others: &[f64]) {
        debug_assert_eq!(distances_to_others.len(), self.size());

        for (i, &d) in distances_to_others.iter().enumerate() {
            if i != index {
                self.distances.insert(key(i, index), d);
            }
        }
        self.representatives[index] = Representative::new(genome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::test_support::ScalarGenome;

    #[test]
    fn append_extends_distance_map() {
        let mut set: RepresentativeSet<ScalarGenome, ()> = RepresentativeSet::new(3);
        set.append(ScalarGenome::new(0.0), &[]);
        assert_eq!(set.size(), 1);
        assert_eq!(set.distance_map().len(), 0);

        set.append(ScalarGenome::new(1.0), &[1.0]);
        assert_eq!(set.size(), 2);
        assert_eq!(set.distance_map().len(), 1);
        assert_eq!(set.distance(0, 1), 1.0);
        assert_eq!(set.distance(1, 0), 1.0);
    }

    #[test]
    fn replace_updates_columns_not_own_row() {
        let mut set: RepresentativeSet<ScalarGenome, ()> = RepresentativeSet::new(2);
        set.append(ScalarGenome::new(0.0), &[]);
        set.append(ScalarGenome::new(2.0), &[2.0]);
        assert!(set.is_full());

        set.replace(0, ScalarGenome::new(5.0), &[3.0]);
        assert_eq!(set.distance(0, 1), 3.0);
        assert_eq!(set.size(), 2);
    }

    #[test]
    fn k_representatives_yield_k_choose_2_entries() {
        let mut set: RepresentativeSet<ScalarGenome, ()> = RepresentativeSet::new(5);
        for i in 0..5 {
            let existing: Vec<f64> = (0..i).map(|j| (i - j) as f64).collect();
            set.append(ScalarGenome::new(i as f64), &existing);
        }
        assert_eq!(set.distance_map().len(), 5 * 4 / 2);
    }
}
