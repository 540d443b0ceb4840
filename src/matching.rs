//! Species-matching scores (§4.3).
//!
//! Scores how well an incoming genome fits an existing species' enveloppe.
//! A score `> 0` means "compatible with this species". Both modes populate
//! the caller's [`DCCache`] with the per-representative `(distance,
//! compatibility)` pairs so a subsequent `insert_into` can reuse them
//! without recomputing distances.

use crate::config::Config;
use crate::dccache::DCCache;
use crate::genome::Genome;
use crate::repset::{RepresentativeSet, UserData};

pub fn matching_score<G, U>(
    config: &Config,
    genome: &G,
    rset: &RepresentativeSet<G, U>,
    cache: &mut DCCache,
) -> f64
where
    G: Genome,
    U: UserData,
{
    cache.clear();
    cache.reserve(rset.size());
    for rep in rset.iter() {
        let d = G::distance(genome, &rep.genome);
        let c = genome.compatibility(d).min(rep.genome.compatibility(d));
        cache.push(d, c);
    }

    if config.full_continuous {
        continuous_score(config, cache)
    } else {
        semi_continuous_score(config, cache)
    }
}

/// `K` here is the number of representatives actually scored (`cache.size()`),
/// not the enveloppe's nominal capacity — a species still filling its
/// enveloppe is judged against the representatives it actually has.
fn semi_continuous_score(config: &Config, cache: &DCCache) -> f64 {
    let matable = cache
        .compatibilities
        .iter()
        .filter(|&&c| c >= config.compatibility_threshold)
        .count() as f64;
    matable - config.similarity_threshold * cache.size() as f64
}

fn continuous_score(config: &Config, cache: &DCCache) -> f64 {
    let n = cache.compatibilities.len();
    let mean = if n == 0 {
        0.0
    } else {
        cache.compatibilities.iter().sum::<f64>() / n as f64
    };
    mean - config.avg_compatibility_threshold
}
