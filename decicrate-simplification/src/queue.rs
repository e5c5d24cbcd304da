//! Collapse candidate queue
//!
//! Candidates are never removed when the mesh changes. Each one records the
//! generations of its endpoints at insertion, and a mismatch on pop marks it
//! stale.

use crate::store::MeshStore;
use decicrate_core::Point3f;
use priority_queue::PriorityQueue;
use std::cmp::Ordering;

/// A prospective edge collapse.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    /// Lower endpoint index
    pub a: usize,
    /// Higher endpoint index
    pub b: usize,
    /// Endpoint that survives the collapse
    pub keep: usize,
    pub position: Point3f,
    pub cost: f64,
    pub generations: (u32, u32),
    pub sequence: u64,
}

impl Candidate {
    /// Endpoint that is removed by the collapse
    pub fn remove(&self) -> usize {
        if self.keep == self.a {
            self.b
        } else {
            self.a
        }
    }

    /// Both endpoints alive and unchanged since insertion
    pub fn is_current(&self, store: &MeshStore) -> bool {
        let va = store.vertex(self.a);
        let vb = store.vertex(self.b);
        va.alive && vb.alive && (va.generation, vb.generation) == self.generations
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap reversed: lowest cost, then lowest pair, then oldest entry
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| (other.a, other.b).cmp(&(self.a, self.b)))
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Min-priority queue of collapse candidates keyed by insertion sequence.
#[derive(Debug, Default)]
pub struct CollapseQueue {
    queue: PriorityQueue<u64, Candidate>,
    next_sequence: u64,
}

impl CollapseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a candidate for the edge `(a, b)`, stamping it with the current
    /// generations of both endpoints.
    pub fn push(&mut self, store: &MeshStore, a: usize, b: usize, keep: usize, position: Point3f, cost: f64) {
        let (a, b) = (a.min(b), a.max(b));
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.queue.push(
            sequence,
            Candidate {
                a,
                b,
                keep,
                position,
                cost,
                generations: (store.vertex(a).generation, store.vertex(b).generation),
                sequence,
            },
        );
    }

    pub fn pop(&mut self) -> Option<Candidate> {
        self.queue.pop().map(|(_, candidate)| candidate)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total number of candidates ever pushed
    pub fn pushed(&self) -> u64 {
        self.next_sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decicrate_core::TriangleMesh;

    fn make_tetrahedron() -> MeshStore {
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.5, 1.0, 0.0),
                Point3f::new(0.5, 0.5, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        );
        MeshStore::from_triangle_mesh(&mesh).unwrap()
    }

    #[test]
    fn test_pops_lowest_cost_first() {
        let store = make_tetrahedron();
        let mut queue = CollapseQueue::new();
        queue.push(&store, 0, 1, 0, Point3f::origin(), 3.0);
        queue.push(&store, 1, 2, 1, Point3f::origin(), 1.0);
        queue.push(&store, 2, 3, 2, Point3f::origin(), 2.0);

        let costs: Vec<f64> = std::iter::from_fn(|| queue.pop()).map(|c| c.cost).collect();
        assert_eq!(costs, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_ties_broken_by_pair_then_sequence() {
        let store = make_tetrahedron();
        let mut queue = CollapseQueue::new();
        queue.push(&store, 3, 2, 2, Point3f::origin(), 0.0);
        queue.push(&store, 1, 0, 0, Point3f::origin(), 0.0);
        queue.push(&store, 0, 1, 1, Point3f::origin(), 0.0);

        let first = queue.pop().unwrap();
        assert_eq!((first.a, first.b, first.keep), (0, 1, 0));
        let second = queue.pop().unwrap();
        assert_eq!((second.a, second.b, second.keep), (0, 1, 1));
        let third = queue.pop().unwrap();
        assert_eq!((third.a, third.b), (2, 3));
        assert!(queue.is_empty());
        assert_eq!(queue.pushed(), 3);
    }

    #[test]
    fn test_infinite_cost_sorts_last() {
        let store = make_tetrahedron();
        let mut queue = CollapseQueue::new();
        queue.push(&store, 0, 1, 0, Point3f::origin(), f64::INFINITY);
        queue.push(&store, 2, 3, 2, Point3f::origin(), 1e30);
        assert_eq!(queue.pop().unwrap().cost, 1e30);
        assert!(queue.pop().unwrap().cost.is_infinite());
    }

    #[test]
    fn test_stale_after_generation_bump() {
        let mut store = make_tetrahedron();
        let mut queue = CollapseQueue::new();
        queue.push(&store, 0, 3, 0, Point3f::origin(), 0.0);
        queue.push(&store, 1, 2, 1, Point3f::origin(), 1.0);

        store.collapse(0, 3, Point3f::new(0.5, 0.5, 0.5)).unwrap();

        let first = queue.pop().unwrap();
        assert!(!first.is_current(&store));
        // Vertices 1 and 2 were neighbours of the collapse but kept their generation
        let second = queue.pop().unwrap();
        assert!(second.is_current(&store));
        assert_eq!(second.remove(), 2);
    }
}
