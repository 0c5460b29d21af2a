//! Dependency graph resolver using petgraph::StableDiGraph
//!
//! The graph is a derived, rebuildable view: a pure function of the
//! registered modules at a point in time. Edges point from a module to
//! each of its dependencies. Cycles are reported, never fatal, at build
//! time; they are fatal to any load-order request that cannot be fully
//! ordered.

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};

use crate::error::CoreError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Grey,
    Black,
}

/// Directed dependency graph over module names.
pub struct DependencyGraph {
    inner: StableDiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
    cycles: Vec<Vec<String>>,
    levels: Vec<Vec<String>>,
    missing: Vec<(String, String)>,
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .field("cycle_count", &self.cycles.len())
            .field("level_count", &self.levels.len())
            .finish()
    }
}

impl DependencyGraph {
    /// Build the graph from (module name, dependency names) pairs.
    ///
    /// O(V+E) construction; always succeeds. Dependencies naming modules
    /// absent from the input become `missing` entries rather than edges —
    /// such modules are loadable but not initializable until the names
    /// resolve.
    pub fn build<I>(modules: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut declared: Vec<(String, Vec<String>)> = modules.into_iter().collect();
        declared.sort_by(|a, b| a.0.cmp(&b.0));

        let mut inner = StableDiGraph::new();
        let mut index: HashMap<String, NodeIndex> = HashMap::new();
        for (name, _) in &declared {
            if !index.contains_key(name) {
                let idx = inner.add_node(name.clone());
                index.insert(name.clone(), idx);
            }
        }

        let mut missing = Vec::new();
        for (name, deps) in &declared {
            let from = index[name];
            let mut seen: HashSet<&str> = HashSet::new();
            for dep in deps {
                if !seen.insert(dep.as_str()) {
                    continue;
                }
                match index.get(dep) {
                    Some(&to) => {
                        inner.add_edge(from, to, ());
                    }
                    None => missing.push((name.clone(), dep.clone())),
                }
            }
        }

        let mut graph = DependencyGraph {
            inner,
            index,
            cycles: Vec::new(),
            levels: Vec::new(),
            missing,
        };
        graph.cycles = graph.find_cycles();
        graph.levels = graph.compute_levels();

        if !graph.cycles.is_empty() {
            tracing::warn!(cycles = graph.cycles.len(), "dependency graph contains cycles");
        }

        graph
    }

    /// Cycles found at build time, each a sequence of module names.
    pub fn cycles(&self) -> &[Vec<String>] {
        &self.cycles
    }

    /// Kahn layering: all nodes in level k depend only on nodes in
    /// earlier levels. Cyclic nodes never reach in-degree zero and are
    /// excluded.
    pub fn levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    /// Declared dependencies that named no known module.
    pub fn missing_dependencies(&self) -> &[(String, String)] {
        &self.missing
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// In-graph dependencies of a module, sorted by name.
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        let Some(&idx) = self.index.get(name) else {
            return Vec::new();
        };
        let mut deps: Vec<String> = self
            .inner
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.inner[n].clone())
            .collect();
        deps.sort();
        deps.dedup();
        deps
    }

    /// Topological ordering of `subset` plus any transitive dependencies
    /// present in the graph. Reverse-postorder DFS: a module is appended
    /// only after all of its in-graph dependencies have been appended.
    ///
    /// Subset names unknown to the graph are skipped; the registry
    /// reports those separately. An unbroken cycle among the requested
    /// modules is a hard error naming the modules that could not be
    /// placed.
    pub fn resolve_load_order(&self, subset: &[String]) -> Result<Vec<String>, CoreError> {
        let mut roots: Vec<NodeIndex> = Vec::new();
        for name in subset {
            if let Some(&idx) = self.index.get(name) {
                if !roots.contains(&idx) {
                    roots.push(idx);
                }
            }
        }

        let mut marks: HashMap<NodeIndex, Mark> = HashMap::new();
        let mut stack: Vec<NodeIndex> = Vec::new();
        let mut order: Vec<String> = Vec::new();
        for root in roots {
            if marks.get(&root).copied().unwrap_or(Mark::White) == Mark::White {
                self.order_dfs(root, &mut marks, &mut stack, &mut order)?;
            }
        }
        Ok(order)
    }

    fn order_dfs(
        &self,
        node: NodeIndex,
        marks: &mut HashMap<NodeIndex, Mark>,
        stack: &mut Vec<NodeIndex>,
        order: &mut Vec<String>,
    ) -> Result<(), CoreError> {
        marks.insert(node, Mark::Grey);
        stack.push(node);

        for dep in self.sorted_neighbors(node, Direction::Outgoing) {
            match marks.get(&dep).copied().unwrap_or(Mark::White) {
                Mark::White => self.order_dfs(dep, marks, stack, order)?,
                Mark::Grey => {
                    let pos = stack.iter().position(|&n| n == dep).unwrap_or(0);
                    let unplaced = stack[pos..]
                        .iter()
                        .map(|&n| self.inner[n].clone())
                        .collect();
                    return Err(CoreError::CycleDetected { unplaced });
                }
                Mark::Black => {}
            }
        }

        stack.pop();
        marks.insert(node, Mark::Black);
        order.push(self.inner[node].clone());
        Ok(())
    }

    /// DFS with a recursion-stack set. Revisiting a node still on the
    /// stack records the path from its first occurrence as a cycle and
    /// abandons that branch.
    fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut nodes: Vec<NodeIndex> = self.inner.node_indices().collect();
        nodes.sort_by(|a, b| self.inner[*a].cmp(&self.inner[*b]));

        let mut marks: HashMap<NodeIndex, Mark> = HashMap::new();
        let mut stack: Vec<NodeIndex> = Vec::new();
        let mut cycles: Vec<Vec<String>> = Vec::new();
        for node in nodes {
            if marks.get(&node).copied().unwrap_or(Mark::White) == Mark::White {
                self.cycle_dfs(node, &mut marks, &mut stack, &mut cycles);
            }
        }
        cycles
    }

    fn cycle_dfs(
        &self,
        node: NodeIndex,
        marks: &mut HashMap<NodeIndex, Mark>,
        stack: &mut Vec<NodeIndex>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        marks.insert(node, Mark::Grey);
        stack.push(node);

        for next in self.sorted_neighbors(node, Direction::Outgoing) {
            match marks.get(&next).copied().unwrap_or(Mark::White) {
                Mark::White => self.cycle_dfs(next, marks, stack, cycles),
                Mark::Grey => {
                    if let Some(pos) = stack.iter().position(|&n| n == next) {
                        let cycle = stack[pos..]
                            .iter()
                            .map(|&n| self.inner[n].clone())
                            .collect();
                        cycles.push(cycle);
                    }
                }
                Mark::Black => {}
            }
        }

        stack.pop();
        marks.insert(node, Mark::Black);
    }

    /// Kahn's-algorithm layering over remaining in-graph dependency
    /// counts. Stops early once no node reaches zero.
    fn compute_levels(&self) -> Vec<Vec<String>> {
        let mut remaining: HashMap<NodeIndex, usize> = self
            .inner
            .node_indices()
            .map(|n| (n, self.inner.neighbors_directed(n, Direction::Outgoing).count()))
            .collect();
        let mut placed: HashSet<NodeIndex> = HashSet::new();
        let mut levels: Vec<Vec<String>> = Vec::new();

        loop {
            let mut ready: Vec<NodeIndex> = remaining
                .iter()
                .filter(|&(n, &count)| count == 0 && !placed.contains(n))
                .map(|(&n, _)| n)
                .collect();
            if ready.is_empty() {
                break;
            }
            ready.sort_by(|a, b| self.inner[*a].cmp(&self.inner[*b]));

            for &node in &ready {
                placed.insert(node);
                let dependents: Vec<NodeIndex> = self
                    .inner
                    .neighbors_directed(node, Direction::Incoming)
                    .collect();
                for dependent in dependents {
                    if let Some(count) = remaining.get_mut(&dependent) {
                        *count = count.saturating_sub(1);
                    }
                }
            }

            levels.push(ready.iter().map(|&n| self.inner[n].clone()).collect());
        }

        levels
    }

    fn sorted_neighbors(&self, node: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> =
            self.inner.neighbors_directed(node, direction).collect();
        neighbors.sort_by(|a, b| self.inner[*a].cmp(&self.inner[*b]));
        neighbors.dedup();
        neighbors
    }
}
