//! Defect Matcher
//!
//! Pairs up the defects of one syndrome type. The defects form a complete graph whose edge weights are
//! negated toroidal distances, and a maximum-weight matching under the maximum-cardinality constraint
//! (i.e. a minimum-distance perfect matching) is requested from a [`MatchingSolver`].
//! The solver only sees an abstract weighted graph, so different matching algorithms are interchangeable.
//!

use super::util::*;
use fusion_blossom::util::{
    SolverInitializer, SyndromePattern, VertexIndex as FusionVertexIndex, VertexNum as FusionVertexNum,
    Weight as FusionWeight,
};
use serde::{Deserialize, Serialize};

/// an undirected weighted graph handed to a matching solver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefectGraph {
    /// the number of vertices, one per defect
    pub vertex_num: usize,
    /// weighted edges `(a, b, weight)` with `a < b < vertex_num`
    pub weighted_edges: Vec<(usize, usize, Weight)>,
}

impl DefectGraph {
    /// the complete graph over `defects` with weights `-(100 dx + 101 dy)`
    pub fn new(defects: &[Coordinate], size: usize) -> Self {
        let vertex_num = defects.len();
        let mut weighted_edges = Vec::with_capacity(vertex_num * vertex_num.saturating_sub(1) / 2);
        for (a, &u) in defects.iter().enumerate() {
            for (b, &v) in defects.iter().enumerate().skip(a + 1) {
                weighted_edges.push((a, b, defect_weight(u, v, size)));
            }
        }
        Self {
            vertex_num,
            weighted_edges,
        }
    }

    /// total weight of a matching given as vertex pairs; panics if a pair is not an edge
    pub fn matching_weight(&self, matching: &[(usize, usize)]) -> Weight {
        matching
            .iter()
            .map(|&(a, b)| {
                let (a, b) = if a < b { (a, b) } else { (b, a) };
                self.weighted_edges
                    .iter()
                    .find(|&&(left, right, _)| left == a && right == b)
                    .map(|&(_, _, weight)| weight)
                    .unwrap_or_else(|| panic!("({a}, {b}) is not an edge of the defect graph"))
            })
            .sum()
    }

    /// panics unless every vertex appears in exactly one pair
    pub fn assert_perfect_matching(&self, matching: &[(usize, usize)]) {
        let mut matched = vec![false; self.vertex_num];
        for &(a, b) in matching.iter() {
            assert!(a != b, "vertex {a} is matched to itself");
            for vertex in [a, b] {
                assert!(vertex < self.vertex_num, "vertex {vertex} out of range");
                assert!(!matched[vertex], "vertex {vertex} matched twice");
                matched[vertex] = true;
            }
        }
        assert!(matched.iter().all(|&is_matched| is_matched), "not a perfect matching: {matching:?}");
    }
}

/// common trait that must be implemented for each matching algorithm
pub trait MatchingSolver: Send + Sync {
    /// a maximum-weight matching among those of maximum cardinality; on the complete graph of an even number
    /// of vertices this is a perfect matching. Each pair is reported once.
    fn compute_max_weight_perfect_matching(&self, graph: &DefectGraph) -> Vec<(usize, usize)>;

    /// the largest graph the solver accepts, `None` if unbounded
    fn max_vertex_num(&self) -> Option<usize> {
        None
    }
}

/// the fusion blossom algorithm, a Blossom-based minimum-weight perfect matching solver
#[derive(Debug, Clone, Default)]
pub struct FusionMatcher {}

impl FusionMatcher {
    pub fn new() -> Self {
        Self {}
    }
}

impl MatchingSolver for FusionMatcher {
    fn compute_max_weight_perfect_matching(&self, graph: &DefectGraph) -> Vec<(usize, usize)> {
        let vertex_num = graph.vertex_num;
        if vertex_num == 0 {
            return vec![];
        }
        // minimizing the (positive) distances; fusion blossom requires even weights
        let weighted_edges = graph
            .weighted_edges
            .iter()
            .map(|&(a, b, weight)| (a as FusionVertexIndex, b as FusionVertexIndex, (-2 * weight) as FusionWeight))
            .collect();
        let initializer = SolverInitializer::new(vertex_num as FusionVertexNum, weighted_edges, vec![]);
        let syndrome_pattern = SyndromePattern::new_vertices((0..vertex_num).map(|v| v as FusionVertexIndex).collect());
        let mwpm_result = fusion_blossom::fusion_mwpm(&initializer, &syndrome_pattern);
        assert_eq!(mwpm_result.len(), vertex_num, "fusion blossom must match every defect");
        let mut matching = Vec::with_capacity(vertex_num / 2);
        for (a, &peer) in mwpm_result.iter().enumerate() {
            let b = peer as usize;
            assert!(b < vertex_num, "defect {a} matched to a non-defect vertex {b}");
            assert_eq!(mwpm_result[b] as usize, a, "asymmetric matching between {a} and {b}");
            if a < b {
                matching.push((a, b));
            }
        }
        matching
    }
}

/// exact dynamic programming over subsets of matched vertices, for small graphs only
#[derive(Debug, Clone)]
pub struct ExhaustiveMatcher {
    pub max_vertex_num: usize,
}

impl Default for ExhaustiveMatcher {
    fn default() -> Self {
        Self {
            max_vertex_num: Self::MAX_VERTEX_NUM,
        }
    }
}

impl ExhaustiveMatcher {
    /// the memory usage grows as `2^n`
    pub const MAX_VERTEX_NUM: usize = 20;

    pub fn new() -> Self {
        Self::default()
    }
}

impl MatchingSolver for ExhaustiveMatcher {
    fn max_vertex_num(&self) -> Option<usize> {
        Some(self.max_vertex_num.min(Self::MAX_VERTEX_NUM))
    }

    /// panics on graphs above [`MatchingSolver::max_vertex_num`]; `Simulator::new` rejects codes that could produce them
    fn compute_max_weight_perfect_matching(&self, graph: &DefectGraph) -> Vec<(usize, usize)> {
        let vertex_num = graph.vertex_num;
        let max_vertex_num = self.max_vertex_num.min(Self::MAX_VERTEX_NUM);
        assert!(
            vertex_num <= max_vertex_num,
            "exhaustive matching supports at most {max_vertex_num} vertices, got {vertex_num}"
        );
        assert!(vertex_num % 2 == 0, "no perfect matching of {vertex_num} vertices");
        let mut weights: Vec<Option<Weight>> = vec![None; vertex_num * vertex_num];
        for &(a, b, weight) in graph.weighted_edges.iter() {
            // keep the heavier one among parallel edges
            let best = weights[a * vertex_num + b].map_or(weight, |existing| existing.max(weight));
            weights[a * vertex_num + b] = Some(best);
            weights[b * vertex_num + a] = Some(best);
        }
        let full: usize = (1 << vertex_num) - 1;
        // best[mask]: maximum weight of matching exactly the vertices in `mask`, always pairing the lowest free vertex first
        let mut best: Vec<Option<Weight>> = vec![None; full + 1];
        let mut choice: Vec<(usize, usize)> = vec![(0, 0); full + 1];
        best[0] = Some(0);
        for mask in 0..full {
            let current = match best[mask] {
                Some(current) => current,
                None => continue,
            };
            let a = (!mask).trailing_zeros() as usize;
            for b in (a + 1)..vertex_num {
                if mask & (1 << b) != 0 {
                    continue;
                }
                if let Some(weight) = weights[a * vertex_num + b] {
                    let next = mask | (1 << a) | (1 << b);
                    if best[next].map_or(true, |existing| current + weight > existing) {
                        best[next] = Some(current + weight);
                        choice[next] = (a, b);
                    }
                }
            }
        }
        assert!(best[full].is_some(), "the graph has no perfect matching");
        let mut matching = Vec::with_capacity(vertex_num / 2);
        let mut mask = full;
        while mask != 0 {
            let (a, b) = choice[mask];
            matching.push((a, b));
            mask ^= (1 << a) | (1 << b);
        }
        matching.reverse();
        matching
    }
}

/// available matching backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MatcherType {
    /// fusion blossom, the default
    #[default]
    Fusion,
    /// exact subset dynamic programming, only for small defect sets
    Exhaustive,
}

impl MatcherType {
    pub fn build(&self) -> Box<dyn MatchingSolver> {
        match self {
            MatcherType::Fusion => Box::new(FusionMatcher::new()),
            MatcherType::Exhaustive => Box::new(ExhaustiveMatcher::new()),
        }
    }
}

impl<T: MatchingSolver + ?Sized> MatchingSolver for Box<T> {
    fn compute_max_weight_perfect_matching(&self, graph: &DefectGraph) -> Vec<(usize, usize)> {
        (**self).compute_max_weight_perfect_matching(graph)
    }

    fn max_vertex_num(&self) -> Option<usize> {
        (**self).max_vertex_num()
    }
}

/// pair up all defects of a syndrome such that the total toroidal distance is minimized
pub fn match_defects(solver: &impl MatchingSolver, defects: &[Coordinate], size: usize) -> Vec<(Coordinate, Coordinate)> {
    assert!(defects.len() % 2 == 0, "defects must come in pairs, found {}", defects.len());
    match defects.len() {
        0 => vec![],
        2 => vec![(defects[0], defects[1])],
        _ => {
            let graph = DefectGraph::new(defects, size);
            let matching = solver.compute_max_weight_perfect_matching(&graph);
            graph.assert_perfect_matching(&matching);
            matching.into_iter().map(|(a, b)| (defects[a], defects[b])).collect()
        }
    }
}
