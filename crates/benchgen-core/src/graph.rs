use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::entity::EntitySpec;

/// Summary of relation graph structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationGraphSummary {
    pub nodes: usize,
    pub edges: usize,
}

/// Report for relation dependency ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationGraphReport {
    pub summary: RelationGraphSummary,
    pub topo_order: Option<Vec<String>>,
    pub cycle: Option<Vec<String>>,
}

/// Directed graph over entities; an edge `a -> b` means `a` references `b`.
///
/// Nodes are identified by declaration index, which doubles as the
/// tie-breaker for every traversal.
#[derive(Debug, Clone)]
pub struct RelationGraph {
    names: Vec<String>,
    targets: Vec<BTreeSet<usize>>,
}

impl RelationGraph {
    /// Build the graph; relations to unknown entities are ignored here and
    /// reported by model declaration instead.
    pub fn new(entities: &[EntitySpec]) -> Self {
        let index: BTreeMap<&str, usize> = entities
            .iter()
            .enumerate()
            .map(|(idx, entity)| (entity.name.as_str(), idx))
            .collect();

        let targets = entities
            .iter()
            .map(|entity| {
                entity
                    .relations
                    .iter()
                    .filter_map(|relation| index.get(relation.target.as_str()).copied())
                    .collect()
            })
            .collect();

        Self {
            names: entities.iter().map(|entity| entity.name.clone()).collect(),
            targets,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.targets.iter().map(BTreeSet::len).sum()
    }

    /// Kahn's algorithm: targets come before the entities referencing them,
    /// ready nodes are released in declaration order.
    pub fn toposort(&self) -> Result<Vec<String>, Vec<String>> {
        let count = self.names.len();
        let mut pending: Vec<usize> = self.targets.iter().map(BTreeSet::len).collect();
        let mut referrers: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (source, targets) in self.targets.iter().enumerate() {
            for target in targets {
                referrers[*target].push(source);
            }
        }

        let mut ready: BTreeSet<usize> = pending
            .iter()
            .enumerate()
            .filter_map(|(idx, count)| if *count == 0 { Some(idx) } else { None })
            .collect();
        let mut order = Vec::with_capacity(count);

        while let Some(node) = ready.pop_first() {
            order.push(self.names[node].clone());
            for referrer in &referrers[node] {
                let remaining = &mut pending[*referrer];
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    ready.insert(*referrer);
                }
            }
        }

        if order.len() == count {
            Ok(order)
        } else {
            Err(self.find_cycle().unwrap_or_default())
        }
    }

    /// Depth-first search with an explicit recursion stack. Returns the first
    /// cycle found, closed by repeating its entry node.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            OnStack,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.names.len()];

        for start in 0..self.names.len() {
            if marks[start] != Mark::Unvisited {
                continue;
            }

            let mut stack: Vec<(usize, Vec<usize>)> = vec![(start, self.successors(start))];
            marks[start] = Mark::OnStack;

            while let Some((node, remaining)) = stack.last_mut() {
                let node = *node;
                match remaining.pop() {
                    Some(next) => match marks[next] {
                        Mark::OnStack => {
                            let entry = stack
                                .iter()
                                .position(|(idx, _)| *idx == next)
                                .unwrap_or(0);
                            let mut path: Vec<String> = stack[entry..]
                                .iter()
                                .map(|(idx, _)| self.names[*idx].clone())
                                .collect();
                            path.push(self.names[next].clone());
                            return Some(path);
                        }
                        Mark::Unvisited => {
                            marks[next] = Mark::OnStack;
                            stack.push((next, self.successors(next)));
                        }
                        Mark::Done => {}
                    },
                    None => {
                        marks[node] = Mark::Done;
                        stack.pop();
                    }
                }
            }
        }

        None
    }

    /// Successors reversed so that popping visits them in declaration order.
    fn successors(&self, node: usize) -> Vec<usize> {
        self.targets[node].iter().rev().copied().collect()
    }
}

/// Build a deterministic dependency report for a set of entities.
pub fn build_relation_graph_report(entities: &[EntitySpec]) -> RelationGraphReport {
    let graph = RelationGraph::new(entities);
    let summary = RelationGraphSummary {
        nodes: entities.len(),
        edges: graph.edge_count(),
    };

    match graph.toposort() {
        Ok(order) => RelationGraphReport {
            summary,
            topo_order: Some(order),
            cycle: None,
        },
        Err(cycle) => RelationGraphReport {
            summary,
            topo_order: None,
            cycle: Some(cycle),
        },
    }
}
