//! Road adjacency index
//!
//! Classifies every pair of roads on a map once at load time. Navigation
//! only ever reads the index, so it is shared by all dogs on the map.

use smallvec::SmallVec;

use crate::game::map::Road;

/// How two roads relate to each other. Unrelated ("parallel") pairs are not
/// stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoadRelation {
    /// Same orientation, sharing an endpoint
    Adjacent,
    /// Perpendicular, each road's fixed coordinate inside the other's span
    Crossed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjacencyEntry {
    /// Index of the neighbouring road in the map's road list
    pub road: usize,
    pub relation: RoadRelation,
}

/// Per-road list of related roads, in ascending neighbour index order.
/// Most intersections touch only a handful of roads, so lists stay inline.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyIndex {
    entries: Vec<SmallVec<[AdjacencyEntry; 4]>>,
}

impl AdjacencyIndex {
    /// Classify every unordered pair of roads. O(R²), run once per map.
    pub fn build(roads: &[Road]) -> Self {
        let mut entries: Vec<SmallVec<[AdjacencyEntry; 4]>> = vec![SmallVec::new(); roads.len()];

        for i in 0..roads.len() {
            for j in (i + 1)..roads.len() {
                if let Some(relation) = classify(&roads[i], &roads[j]) {
                    entries[i].push(AdjacencyEntry { road: j, relation });
                    entries[j].push(AdjacencyEntry { road: i, relation });
                }
            }
        }

        Self { entries }
    }

    /// Number of roads covered by the index
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All related roads of `road`; empty for an unknown index
    pub fn neighbours(&self, road: usize) -> &[AdjacencyEntry] {
        self.entries.get(road).map(|e| e.as_slice()).unwrap_or(&[])
    }

    /// Relation between two roads, `None` when unrelated
    pub fn relation(&self, a: usize, b: usize) -> Option<RoadRelation> {
        self.neighbours(a)
            .iter()
            .find(|entry| entry.road == b)
            .map(|entry| entry.relation)
    }

    /// Roads crossing `road`, in index order
    pub fn crossings(&self, road: usize) -> impl Iterator<Item = usize> + '_ {
        self.related(road, RoadRelation::Crossed)
    }

    /// Same-orientation roads sharing an endpoint with `road`, in index order
    pub fn adjacent(&self, road: usize) -> impl Iterator<Item = usize> + '_ {
        self.related(road, RoadRelation::Adjacent)
    }

    fn related(&self, road: usize, relation: RoadRelation) -> impl Iterator<Item = usize> + '_ {
        self.neighbours(road)
            .iter()
            .filter(move |entry| entry.relation == relation)
            .map(|entry| entry.road)
    }
}

/// Classify a single pair of roads
pub fn classify(a: &Road, b: &Road) -> Option<RoadRelation> {
    if a.orientation() == b.orientation() {
        return a.shares_endpoint(b).then_some(RoadRelation::Adjacent);
    }

    let (a_min, a_max) = a.span();
    let (b_min, b_max) = b.span();
    let b_fixed_in_a = (a_min..=a_max).contains(&b.fixed_coord());
    let a_fixed_in_b = (b_min..=b_max).contains(&a.fixed_coord());

    (b_fixed_in_a && a_fixed_in_b).then_some(RoadRelation::Crossed)
}
