//! Adjacency-list graph of user relationships.
//!
//! Vertices are user ids; an edge means the two users have exchanged at least
//! one message. In undirected mode both directions are inserted and removed
//! by the same call, so `has_edge(u, v) == has_edge(v, u)` holds for every
//! edge created through this API.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct ContactGraph<V> {
    adjacency: HashMap<V, HashSet<V>>,
    directed: bool,
}

impl<V> ContactGraph<V>
where
    V: Eq + Hash + Ord + Clone,
{
    pub fn new(directed: bool) -> Self {
        Self {
            adjacency: HashMap::new(),
            directed,
        }
    }

    pub fn undirected() -> Self {
        Self::new(false)
    }

    pub fn directed() -> Self {
        Self::new(true)
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Insert `vertex` with no neighbors. No-op if already present.
    pub fn add_vertex(&mut self, vertex: V) {
        self.adjacency.entry(vertex).or_default();
    }

    /// Connect `from` to `to`, creating either vertex if missing.
    pub fn add_edge(&mut self, from: V, to: V) {
        self.add_vertex(from.clone());
        self.add_vertex(to.clone());

        if !self.directed {
            self.adjacency.entry(to.clone()).or_default().insert(from.clone());
        }
        self.adjacency.entry(from).or_default().insert(to);
    }

    pub fn remove_edge(&mut self, from: &V, to: &V) {
        if let Some(neighbors) = self.adjacency.get_mut(from) {
            neighbors.remove(to);
        }
        if !self.directed {
            if let Some(neighbors) = self.adjacency.get_mut(to) {
                neighbors.remove(from);
            }
        }
    }

    /// Remove `vertex` and every edge pointing at it.
    pub fn remove_vertex(&mut self, vertex: &V) {
        if self.adjacency.remove(vertex).is_none() {
            return;
        }
        for neighbors in self.adjacency.values_mut() {
            neighbors.remove(vertex);
        }
    }

    /// Neighbors of `vertex` in ascending order; empty if absent.
    pub fn neighbors(&self, vertex: &V) -> Vec<V> {
        self.sorted_neighbors(vertex).into_iter().cloned().collect()
    }

    pub fn has_edge(&self, from: &V, to: &V) -> bool {
        self.adjacency
            .get(from)
            .is_some_and(|neighbors| neighbors.contains(to))
    }

    pub fn has_vertex(&self, vertex: &V) -> bool {
        self.adjacency.contains_key(vertex)
    }

    pub fn degree(&self, vertex: &V) -> usize {
        self.adjacency.get(vertex).map_or(0, HashSet::len)
    }

    /// All vertices in ascending order.
    pub fn vertices(&self) -> Vec<V> {
        let mut vertices: Vec<V> = self.adjacency.keys().cloned().collect();
        vertices.sort();
        vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of edges. Undirected mode halves the summed degree, which
    /// assumes every edge was stored in both directions.
    pub fn edge_count(&self) -> usize {
        let total: usize = self.adjacency.values().map(HashSet::len).sum();
        if self.directed {
            total
        } else {
            total / 2
        }
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn clear(&mut self) {
        self.adjacency.clear();
    }

    /// Breadth-first visiting order from `start`.
    pub fn bfs(&self, start: &V) -> Vec<V> {
        if !self.has_vertex(start) {
            return Vec::new();
        }

        let mut visited: HashSet<&V> = HashSet::from([start]);
        let mut queue: VecDeque<&V> = VecDeque::from([start]);
        let mut order = Vec::new();

        while let Some(vertex) = queue.pop_front() {
            order.push(vertex.clone());
            for neighbor in self.sorted_neighbors(vertex) {
                if visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        order
    }

    /// Depth-first visiting order from `start`, lowest neighbor first.
    pub fn dfs(&self, start: &V) -> Vec<V> {
        if !self.has_vertex(start) {
            return Vec::new();
        }

        let mut visited: HashSet<&V> = HashSet::new();
        let mut stack: Vec<&V> = vec![start];
        let mut order = Vec::new();

        while let Some(vertex) = stack.pop() {
            if !visited.insert(vertex) {
                continue;
            }
            order.push(vertex.clone());
            for neighbor in self.sorted_neighbors(vertex).into_iter().rev() {
                if !visited.contains(neighbor) {
                    stack.push(neighbor);
                }
            }
        }
        order
    }

    /// Fewest-hops path from `start` to `end`, both ends included.
    ///
    /// `None` when either vertex is absent or `end` is unreachable.
    pub fn shortest_path(&self, start: &V, end: &V) -> Option<Vec<V>> {
        if !self.has_vertex(start) || !self.has_vertex(end) {
            return None;
        }

        let mut parent: HashMap<&V, Option<&V>> = HashMap::from([(start, None)]);
        let mut queue: VecDeque<&V> = VecDeque::from([start]);

        while let Some(vertex) = queue.pop_front() {
            if vertex == end {
                let mut path = Vec::new();
                let mut current = Some(vertex);
                while let Some(step) = current {
                    path.push(step.clone());
                    current = parent.get(step).copied().flatten();
                }
                path.reverse();
                return Some(path);
            }

            for neighbor in self.sorted_neighbors(vertex) {
                if !parent.contains_key(neighbor) {
                    parent.insert(neighbor, Some(vertex));
                    queue.push_back(neighbor);
                }
            }
        }
        None
    }

    /// Back-edge cycle check.
    ///
    /// Only meaningful for undirected graphs: on a directed graph the
    /// parent-skip rule misses two-vertex cycles (`a -> b -> a`) and the
    /// check does not track the recursion stack, so results are unreliable.
    pub fn has_cycle(&self) -> bool {
        let mut visited: HashSet<&V> = HashSet::new();

        for root in self.adjacency_order() {
            if visited.contains(root) {
                continue;
            }
            // (vertex, parent) pairs; iterative DFS
            let mut stack: Vec<(&V, Option<&V>)> = vec![(root, None)];
            while let Some((vertex, parent)) = stack.pop() {
                if !visited.insert(vertex) {
                    continue;
                }
                for neighbor in self.sorted_neighbors(vertex) {
                    if !visited.contains(neighbor) {
                        stack.push((neighbor, Some(vertex)));
                    } else if Some(neighbor) != parent {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn adjacency_order(&self) -> Vec<&V> {
        let mut keys: Vec<&V> = self.adjacency.keys().collect();
        keys.sort();
        keys
    }

    fn sorted_neighbors(&self, vertex: &V) -> Vec<&V> {
        let mut neighbors: Vec<&V> = self
            .adjacency
            .get(vertex)
            .map(|set| set.iter().collect())
            .unwrap_or_default();
        neighbors.sort();
        neighbors
    }
}

impl<V> Default for ContactGraph<V>
where
    V: Eq + Hash + Ord + Clone,
{
    fn default() -> Self {
        Self::undirected()
    }
}
