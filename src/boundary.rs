//! Shared boundaries between pairs of adjacent faces.
//!
//! Every undirected edge separating two different faces belongs to exactly
//! one face pair.  The edges of a pair are stored as maximal chains of
//! consecutive half-edges, walked along the lower face id.

use ahash::AHashMap;
use geograph::{FaceId, HalfEdgeId};

use crate::subdivision::SchematicDcel;

/// Unordered face pair, normalized so that `.0 < .1`.
pub type FacePair = (FaceId, FaceId);

fn pair(a: FaceId, b: FaceId) -> FacePair {
    if a < b { (a, b) } else { (b, a) }
}

/// Location of a half-edge inside the list: its pair and chain index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ChainRef {
    pair:  FacePair,
    chain: usize,
}

#[derive(Clone, Debug, Default)]
pub struct FaceFaceBoundaryList {
    chains: AHashMap<FacePair, Vec<Vec<HalfEdgeId>>>,
    /// Both half-edges of every listed edge.
    index:  AHashMap<HalfEdgeId, ChainRef>,
}

impl FaceFaceBoundaryList {
    pub fn new(dcel: &SchematicDcel) -> Self {
        let mut list = Self::default();

        let members = |he: HalfEdgeId| {
            let (f, g) = (dcel.face_of(he), dcel.face_of(dcel.twin(he)));
            (f < g).then(|| pair(f, g))
        };

        let mut visited = ahash::AHashSet::new();
        let mut starts: Vec<HalfEdgeId> = dcel.half_edge_ids().filter(|&he| members(he).is_some()).collect();
        // Chain heads first, so that open chains are walked from their start.
        starts.sort_by_key(|&he| members(dcel.prev(he)) == members(he));

        for start in starts {
            if visited.contains(&start) { continue; }
            let Some(key) = members(start) else { continue };

            let mut chain = Vec::new();
            let mut he = start;
            while members(he) == Some(key) && visited.insert(he) {
                chain.push(he);
                he = dcel.next(he);
            }

            let chains = list.chains.entry(key).or_default();
            let at = ChainRef { pair: key, chain: chains.len() };
            for &he in &chain {
                list.index.insert(he, at);
                list.index.insert(dcel.twin(he), at);
            }
            chains.push(chain);
        }
        list
    }

    pub fn is_empty(&self) -> bool { self.chains.is_empty() }

    /// All adjacent face pairs, sorted.
    pub fn pairs(&self) -> Vec<FacePair> {
        let mut pairs: Vec<_> = self.chains.keys().copied().collect();
        pairs.sort();
        pairs
    }

    /// Chains of the common boundary of `a` and `b` (empty if not adjacent).
    pub fn chains(&self, a: FaceId, b: FaceId) -> &[Vec<HalfEdgeId>] {
        self.chains.get(&pair(a, b)).map_or(&[], Vec::as_slice)
    }

    /// The face pair an edge separates, for either of its half-edges.
    pub fn pair_of(&self, he: HalfEdgeId) -> Option<FacePair> {
        self.index.get(&he).map(|at| at.pair)
    }

    /// Whether two edges lie on one common chain.
    pub fn same_chain(&self, a: HalfEdgeId, b: HalfEdgeId) -> bool {
        match (self.index.get(&a), self.index.get(&b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// One half-edge per undirected boundary edge of `face`, on the side of
    /// `face`.
    pub fn face_boundary(&self, dcel: &SchematicDcel, face: FaceId) -> Vec<HalfEdgeId> {
        self.pairs().into_iter()
            .filter(|&(f, g)| f == face || g == face)
            .flat_map(|key| self.chains[&key].iter().flatten().copied())
            .map(|he| if dcel.face_of(he) == face { he } else { dcel.twin(he) })
            .collect()
    }
}
