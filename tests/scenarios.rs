//! Cross-module end-to-end scenarios (E1-E6) and round-trip laws (R1-R2).
//!
//! Uses the crate's own scalar demonstration genome (`test-support` feature,
//! enabled as a dev-dependency) rather than re-deriving a fixture here.

use phylocore::{Config, EventSink, Genome, PhyloTree, SID};
use phylocore::genome::test_support::ScalarGenome;

fn config() -> Config {
    // K=5, compatibility_threshold=0.1, similarity_threshold=0.5, max-average.
    Config::default()
}

fn tree() -> PhyloTree<ScalarGenome, ()> {
    PhyloTree::new(config()).expect("default config validates")
}

// E1: primordial insertion.
#[test]
fn primordial_insertion_creates_root_with_sid_zero() {
    let mut t = tree();
    let g = ScalarGenome::new(0.0);
    let sid = t.add_genome(g, None).unwrap();
    assert_eq!(sid, SID(0));
    assert_eq!(t.root(), SID(0));
    assert_eq!(t.species_count(), 1);
    assert_eq!(t.node(sid).unwrap().rset.size(), 1);
}

// E2: saturation — the enveloppe fills to capacity without ever invoking
// the judge (B2).
#[test]
fn saturation_fills_enveloppe_to_capacity() {
    let mut t = tree();
    let mut sid = SID::INVALID;
    for v in [0.0, 0.1, 0.2, 0.3, 0.4] {
        sid = t.add_genome(ScalarGenome::new(v), None).unwrap();
    }
    assert_eq!(t.species_count(), 1);
    let node = t.node(sid).unwrap();
    assert!(node.rset.is_full());
    assert_eq!(node.rset.size(), 5);
    assert_eq!(node.rset.distance_map().len(), 5 * 4 / 2);
}

// E3: representative replacement — the (K+1)-th close arrival invokes the
// judge and the enveloppe never grows past capacity.
#[test]
fn full_enveloppe_triggers_judge_on_next_close_arrival() {
    let mut t = tree();
    for v in [0.0, 0.1, 0.2, 0.3, 0.4] {
        t.add_genome(ScalarGenome::new(v), None).unwrap();
    }
    let sid = t.add_genome(ScalarGenome::new(0.05), None).unwrap();
    let node = t.node(sid).unwrap();
    assert_eq!(node.rset.size(), 5, "enveloppe never exceeds capacity");
    assert_eq!(node.data.count, 6);
}

// E4: speciation — a genome far outside the root's enveloppe spawns a new
// species parented to the root (B3: non-empty contributor list whose
// highest-count entry is the parent).
#[test]
fn distant_arrival_spawns_new_species_under_root() {
    let mut t = tree();
    let root_genome = ScalarGenome::new(0.0);
    let root = t.add_genome(root_genome, None).unwrap();
    let far = ScalarGenome::with_parents(100.0, root_genome.id(), root_genome.id());
    let child = t.add_genome(far, None).unwrap();
    assert_ne!(root, child);
    assert_eq!(t.species_count(), 2);
    assert_eq!(t.node(child).unwrap().parent, root);
    assert!(t.node(root).unwrap().children.contains(&child));

    let contributors = t.node(child).unwrap().contributors.entries();
    assert!(!contributors.is_empty(), "B3: freshly created species must carry a non-empty contributor list");
    assert_eq!(contributors[0].sid, root, "B3: highest-count entry is the electing parent");
}

// A genome with no recorded parents at all (e.g. an externally-sourced
// founder) that fails to match the root still ends up parented to it, even
// though its contribution is empty by construction (§4.8 step 3) — the one
// case where B3's contributor-list clause is vacuous.
#[test]
fn parentless_distant_arrival_still_parents_to_root() {
    let mut t = tree();
    let root = t.add_genome(ScalarGenome::new(0.0), None).unwrap();
    let child = t.add_genome(ScalarGenome::new(100.0), None).unwrap();
    assert_ne!(root, child);
    assert_eq!(t.node(child).unwrap().parent, root);
    assert!(t.node(root).unwrap().children.contains(&child));
    assert!(t.node(child).unwrap().contributors.entries().is_empty());
}

// E5: hybrid contribution — a cross-species birth increments the hybrid
// counter regardless of which candidate ends up hosting it.
#[test]
fn hybrid_across_species_increments_counter() {
    let mut t = tree();
    let mother = ScalarGenome::new(0.0);
    let father = ScalarGenome::new(100.0);
    t.add_genome(mother, None).unwrap();
    t.add_genome(father, None).unwrap();

    assert_eq!(t.hybrid_count(), 0);
    let hybrid = ScalarGenome::with_parents(50.0, mother.id(), father.id());
    t.add_genome(hybrid, None).unwrap();
    assert_eq!(t.hybrid_count(), 1);
}

// E6: principal-contributor change with tree surgery. Two sibling species
// are created under the root; a hybrid birth lands in one of them but cites
// the other as co-contributor, which becomes its new principal parent.
#[test]
fn hybrid_contribution_reparents_sibling_species() {
    let mut t = tree();
    let root = t.add_genome(ScalarGenome::new(0.0), None).unwrap();
    let mother = ScalarGenome::new(50.0);
    let father = ScalarGenome::new(150.0);
    let left = t.add_genome(mother, None).unwrap();
    let right = t.add_genome(father, None).unwrap();
    assert_eq!(t.node(left).unwrap().parent, root);
    assert_eq!(t.node(right).unwrap().parent, root);

    // Close to `left`'s cluster, so it lands there; contribution credits
    // both `left` and `right`, and `right` (the non-owner entry) becomes
    // `left`'s new principal contributor.
    let hybrid = ScalarGenome::with_parents(50.05, mother.id(), father.id());
    t.add_genome(hybrid, None).unwrap();

    let left_node = t.node(left).unwrap();
    assert_eq!(left_node.parent, right);
    assert!(t.node(right).unwrap().children.contains(&left));
    assert!(!t.node(root).unwrap().children.contains(&left));
}

// R1: a saved-then-loaded tree compares structurally equal to the original.
#[test]
fn snapshot_round_trips_structurally() {
    let mut t = tree();
    for v in [0.0, 0.1, 100.0, 100.1, 0.2, 0.3, 0.4, 0.5] {
        t.add_genome(ScalarGenome::new(v), None).unwrap();
    }
    let text = t.save_to_string().unwrap();
    let restored = PhyloTree::<ScalarGenome, ()>::load_from_str(&text, config()).unwrap();

    assert_eq!(restored.species_count(), t.species_count());
    assert_eq!(restored.root(), t.root());
    assert_eq!(restored.hybrid_count(), t.hybrid_count());
    assert_eq!(restored.current_step(), t.current_step());
    for sid in [t.root()] {
        let a = t.node(sid).unwrap();
        let b = restored.node(sid).unwrap();
        assert_eq!(a.rset.size(), b.rset.size());
        assert_eq!(a.data, b.data);
        assert_eq!(a.parent, b.parent);
        assert_eq!(a.children, b.children);
    }
}

// R2: replaying the same sequence of births against a fresh tree produces a
// structurally equal tree (the engine is deterministic given the same
// inputs — no internal randomness).
#[test]
fn replaying_the_same_births_is_deterministic() {
    let values = [0.0, 0.1, 100.0, 0.2, 100.1, 0.3, 200.0];

    let run = |values: &[f64]| {
        let mut t = tree();
        for &v in values {
            t.add_genome(ScalarGenome::new(v), None).unwrap();
        }
        t
    };

    let a = run(&values);
    let b = run(&values);

    assert_eq!(a.species_count(), b.species_count());
    assert_eq!(a.root(), b.root());
    assert_eq!(a.hybrid_count(), b.hybrid_count());
    for sid in 0..a.species_count() as u64 {
        let sid = SID(sid);
        let na = a.node(sid).unwrap();
        let nb = b.node(sid).unwrap();
        assert_eq!(na.parent, nb.parent);
        assert_eq!(na.rset.size(), nb.rset.size());
        assert_eq!(na.data, nb.data);
    }
}

#[test]
fn step_advances_clock_and_touches_last_appearance_via_sink() {
    #[derive(Default)]
    struct Recorder {
        stepped: Vec<u64>,
    }
    impl EventSink for Recorder {
        fn on_stepped(&mut self, step: u64, _alive: &[SID]) {
            self.stepped.push(step);
        }
    }

    let mut t = tree();
    let g = ScalarGenome::new(0.0);
    t.add_genome(g, None).unwrap();

    let mut sink = Recorder::default();
    t.step(10, [g.id()], Some(&mut sink));
    assert_eq!(t.current_step(), 10);
    assert_eq!(sink.stepped, vec![10]);
    assert_eq!(t.node(t.root()).unwrap().data.last_appearance, 10);
}
