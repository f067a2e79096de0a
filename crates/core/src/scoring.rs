//! Scoring and ranking of traversal candidates.

use std::cmp::Ordering;

use serde::Serialize;

use crate::domain::product::ProductId;
use crate::signals::SignalBundle;

/// One hop level's contribution to a candidate's score.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HopContribution {
    pub hop_distance: u32,
    pub weight: f64,
    pub paths: u64,
}

/// Why a candidate scored what it did. Carries enough for the visualization
/// layer to justify the recommendation without re-querying the store.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Explanation {
    pub hop_distance: u32,
    pub weight_sum: f64,
    pub path_count: u64,
    pub contributions: Vec<HopContribution>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub product_id: ProductId,
    pub score: f64,
    pub explanation: Explanation,
}

/// Deterministic ranker: closer and more heavily co-purchased paths score
/// higher, ties broken by path multiplicity then product id so identical
/// inputs always produce identical output order.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ranker;

impl Ranker {
    pub fn new() -> Self {
        Self
    }

    /// Score one candidate: every path contributes its weight divided by its
    /// hop distance, summed over all paths.
    pub fn score(&self, bundle: &SignalBundle) -> f64 {
        bundle
            .contributions()
            .map(|(hop_distance, signal)| signal.weight / f64::from(hop_distance.max(1)))
            .sum()
    }

    /// Rank candidates and truncate to `top_k`. Fewer candidates than
    /// `top_k` returns all of them; the output is never padded.
    pub fn rank(
        &self,
        candidates: impl IntoIterator<Item = (ProductId, SignalBundle)>,
        top_k: usize,
    ) -> Vec<RankedCandidate> {
        let mut ranked: Vec<RankedCandidate> = candidates
            .into_iter()
            .filter(|(_, bundle)| !bundle.is_empty())
            .map(|(product_id, bundle)| {
                let score = self.score(&bundle);
                RankedCandidate { product_id, score, explanation: explain(&bundle) }
            })
            .collect();

        ranked.sort_by(compare);
        ranked.truncate(top_k);
        ranked
    }
}

fn explain(bundle: &SignalBundle) -> Explanation {
    Explanation {
        hop_distance: bundle.hop_distance().unwrap_or(0),
        weight_sum: bundle.weight_sum(),
        path_count: bundle.path_count(),
        contributions: bundle
            .contributions()
            .map(|(hop_distance, signal)| HopContribution {
                hop_distance,
                weight: signal.weight,
                paths: signal.paths,
            })
            .collect(),
    }
}

fn compare(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.explanation.path_count.cmp(&a.explanation.path_count))
        .then_with(|| a.product_id.cmp(&b.product_id))
}
