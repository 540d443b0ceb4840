//! JSON snapshot format (§6, §12).
//!
//! A tree is dumped as a nested object mirroring the live node table, with
//! every compound type flattened to the tuple/array shapes a hand-rolled
//! JSON reader would expect (pairs as `[a, b]`, not `{"0": a, "1": b}`).
//! Loading rebuilds everything into scratch values first and only returns
//! them once every invariant in §3 has been checked — the caller decides
//! how to swap the result into place, so a failed load never mutates
//! existing state.

use crate::contributors::{ContributorList, NodeContributor};
use crate::genome::Genome;
use crate::ids::{GID, SID};
use crate::repset::{Representative, RepresentativeSet, UserData};
use crate::species::{SpeciesData, SpeciesNode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

type ContributorRepr = (SID, u64);
type DistanceEntryRepr = ((usize, usize), f64);

#[derive(Debug, Serialize, Deserialize)]
struct NodeRepr<G, U> {
    id: SID,
    data: (u64, u64, u64),
    contributors: (SID, Vec<ContributorRepr>),
    rset: Vec<(G, U)>,
    distances: Vec<DistanceEntryRepr>,
    children: Vec<NodeRepr<G, U>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TreeSnapshot<G, U> {
    root: Option<NodeRepr<G, U>>,
    next_sid: u64,
    step: u64,
    hybrids: u64,
    index: HashMap<GID, (SID, u64)>,
}

/// Everything [`crate::tree::PhyloTree`] needs to hand over for a dump, and
/// to receive back after a load. Kept separate from the tree type itself so
/// this module has no dependency on the orchestrator.
pub struct TreeParts<G, U> {
    pub nodes: HashMap<SID, SpeciesNode<G, U>>,
    pub root: SID,
    pub next_sid: u64,
    pub step: u64,
    pub hybrids: u64,
    pub index_entries: Vec<(GID, SID, u64)>,
    pub enveloppe_size: usize,
}

fn build_node<G: Genome + Clone, U: UserData>(
    node: &SpeciesNode<G, U>,
    nodes: &HashMap<SID, SpeciesNode<G, U>>,
) -> NodeRepr<G, U> {
    let data = (
        node.data.first_appearance,
        node.data.last_appearance,
        node.data.count,
    );
    let contributors = (
        node.contributors.owner(),
        node.contributors
            .entries()
            .iter()
            .map(|e| (e.sid, e.count))
            .collect(),
    );
    let rset = node
        .rset
        .iter()
        .map(|r| (r.genome.clone(), r.user_data.clone()))
        .collect();
    let distances = node
        .rset
        .distance_map()
        .iter()
        .map(|(&k, &d)| (k, d))
        .collect();
    let children = node
        .children
        .iter()
        .filter_map(|sid| nodes.get(sid))
        .map(|child| build_node(child, nodes))
        .collect();

    NodeRepr {
        id: node.id,
        data,
        contributors,
        rset,
        distances,
        children,
    }
}

pub fn to_snapshot<G: Genome + Clone, U: UserData>(parts: &TreeParts<G, U>) -> TreeSnapshot<G, U> {
    let root = if parts.root.is_valid() {
        parts.nodes.get(&parts.root).map(|n| build_node(n, &parts.nodes))
    } else {
        None
    };
    let index = parts
        .index_entries
        .iter()
        .map(|&(gid, sid, refcount)| (gid, (sid, refcount)))
        .collect();

    TreeSnapshot {
        root,
        next_sid: parts.next_sid,
        step: parts.step,
        hybrids: parts.hybrids,
        index,
    }
}

pub fn to_json_string<G, U>(parts: &TreeParts<G, U>) -> crate::error::Result<String>
where
    G: Genome + Clone + Serialize,
    U: UserData + Serialize,
{
    Ok(serde_json::to_string_pretty(&to_snapshot(parts))?)
}

fn malformed(msg: impl Into<String>) -> crate::error::PhyloError {
    crate::error::PhyloError::SnapshotMalformed(msg.into())
}

fn unflatten_node<G: Genome + Clone, U: UserData>(
    repr: NodeRepr<G, U>,
    parent: SID,
    enveloppe_size: usize,
    out: &mut HashMap<SID, SpeciesNode<G, U>>,
) -> crate::error::Result<()> {
    if out.contains_key(&repr.id) {
        return Err(malformed(format!("duplicate species id {} in snapshot", repr.id)));
    }

    let rep_count = repr.rset.len();
    if rep_count > enveloppe_size {
        return Err(malformed(format!(
            "species {} has {rep_count} representatives, exceeding the configured enveloppe size {enveloppe_size}",
            repr.id
        )));
    }

    let mut distances = BTreeMap::new();
    for ((i, j), d) in repr.distances {
        if i >= rep_count || j >= rep_count || i == j {
            return Err(malformed(format!(
                "species {} has an out-of-range distance key ({i}, {j}) over {rep_count} representatives",
                repr.id
            )));
        }
        let key = if i < j { (i, j) } else { (j, i) };
        distances.insert(key, d);
    }

    let expected_pairs = rep_count * rep_count.saturating_sub(1) / 2;
    if distances.len() != expected_pairs {
        return Err(malformed(format!(
            "species {} distance map has {} entries, expected {expected_pairs} for {rep_count} representatives",
            repr.id,
            distances.len()
        )));
    }

    let representatives = repr
        .rset
        .into_iter()
        .map(|(genome, user_data)| Representative::from_parts(genome, user_data))
        .collect();
    let rset = RepresentativeSet::from_raw(enveloppe_size, representatives, distances);

    let (owner, entries) = repr.contributors;
    if owner != repr.id {
        return Err(malformed(format!(
            "species {} contributor list owner mismatch ({owner})",
            repr.id
        )));
    }
    let contributors = ContributorList::from_raw(
        owner,
        entries
            .into_iter()
            .map(|(sid, count)| NodeContributor { sid, count })
            .collect(),
    );

    let children_sids: Vec<SID> = repr.children.iter().map(|c| c.id).collect();
    let node = SpeciesNode::from_raw(
        repr.id,
        SpeciesData {
            first_appearance: repr.data.0,
            last_appearance: repr.data.1,
            count: repr.data.2,
        },
        rset,
        contributors,
        parent,
        children_sids,
    );
    let id = node.id;
    out.insert(id, node);

    for child in repr.children {
        unflatten_node(child, id, enveloppe_size, out)?;
    }
    Ok(())
}

pub fn from_json_str<G, U>(text: &str, enveloppe_size: usize) -> crate::error::Result<TreeParts<G, U>>
where
    G: Genome + Clone + for<'de> Deserialize<'de>,
    U: UserData + for<'de> Deserialize<'de>,
{
    let snapshot: TreeSnapshot<G, U> = serde_json::from_str(text)?;
    from_snapshot(snapshot, enveloppe_size)
}

pub fn from_snapshot<G: Genome + Clone, U: UserData>(
    snapshot: TreeSnapshot<G, U>,
    enveloppe_size: usize,
) -> crate::error::Result<TreeParts<G, U>> {
    let mut nodes = HashMap::new();
    let root = match snapshot.root {
        Some(node) => {
            let root_id = node.id;
            unflatten_node(node, SID::INVALID, enveloppe_size, &mut nodes)?;
            root_id
        }
        None => SID::INVALID,
    };

    let index_entries: Vec<(GID, SID, u64)> = snapshot
        .index
        .into_iter()
        .map(|(gid, (sid, refcount))| {
            if !nodes.contains_key(&sid) {
                return Err(malformed(format!("index entry for {gid} references unknown species {sid}")));
            }
            Ok((gid, sid, refcount))
        })
        .collect::<crate::error::Result<_>>()?;

    Ok(TreeParts {
        nodes,
        root,
        next_sid: snapshot.next_sid,
        step: snapshot.step,
        hybrids: snapshot.hybrids,
        index_entries,
        enveloppe_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::test_support::ScalarGenome;

    fn sample_parts() -> TreeParts<ScalarGenome, ()> {
        let mut nodes = HashMap::new();
        let mut root = SpeciesNode::<ScalarGenome, ()>::new(SID(0), 3, 0);
        let g = ScalarGenome::new(1.0);
        root.rset.append(g, &[]);
        nodes.insert(SID(0), root);

        TreeParts {
            nodes,
            root: SID(0),
            next_sid: 1,
            step: 1,
            hybrids: 0,
            index_entries: vec![(g.id(), SID(0), 1)],
            enveloppe_size: 3,
        }
    }

    #[test]
    fn round_trips_through_json() {
        let parts = sample_parts();
        let text = to_json_string(&parts).unwrap();
        let restored: TreeParts<ScalarGenome, ()> = from_json_str(&text, 3).unwrap();
        assert_eq!(restored.root, SID(0));
        assert_eq!(restored.next_sid, 1);
        assert_eq!(restored.nodes[&SID(0)].rset.size(), 1);
        assert_eq!(restored.index_entries.len(), 1);
    }

    #[test]
    fn unknown_index_species_is_rejected() {
        let parts = sample_parts();
        let mut snapshot = to_snapshot(&parts);
        snapshot.index.insert(GID(999), (SID(77), 1));
        let text = serde_json::to_string(&snapshot).unwrap();
        let result: crate::error::Result<TreeParts<ScalarGenome, ()>> = from_json_str(&text, 3);
        assert!(result.is_err());
    }

    #[test]
    fn oversized_representative_set_is_rejected() {
        let parts = sample_parts();
        let text = to_json_string(&parts).unwrap();
        let result: crate::error::Result<TreeParts<ScalarGenome, ()>> = from_json_str(&text, 0);
        assert!(result.is_err());
    }
}
