// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::engine::TaskName;
use crate::errors::{AssetflowError, Result};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct prerequisites, in declaration order.
    deps: Vec<TaskName>,
    /// Registered tasks that list this one as a prerequisite.
    dependents: Vec<TaskName>,
}

/// Adjacency mapping from task name to prerequisites (and back).
///
/// Prerequisites may name tasks that are not registered; that is only an
/// error once such a task is resolved with [`TaskGraph::resolve`].
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    nodes: HashMap<TaskName, DagNode>,
}

impl TaskGraph {
    /// Build a graph from `(task, prerequisites)` pairs.
    pub fn from_edges<'a, I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [TaskName])>,
    {
        let mut nodes: HashMap<TaskName, DagNode> = HashMap::new();

        for (name, deps) in edges {
            nodes.entry(name.to_string()).or_default().deps = deps.to_vec();
        }

        let names: Vec<TaskName> = nodes.keys().cloned().collect();
        for name in names {
            let deps = nodes.get(&name).map(|n| n.deps.clone()).unwrap_or_default();
            for dep in deps {
                if let Some(dep_node) = nodes.get_mut(&dep) {
                    dep_node.dependents.push(name.clone());
                }
            }
        }

        Self { nodes }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate prerequisites of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Task name -> direct prerequisites, for components that only need
    /// plain adjacency (e.g. the watcher's trigger filter).
    pub fn prerequisite_map(&self) -> HashMap<TaskName, Vec<TaskName>> {
        self.nodes
            .iter()
            .map(|(name, node)| (name.clone(), node.deps.clone()))
            .collect()
    }

    /// Resolve the transitive prerequisite closure of `root` into an
    /// execution order.
    ///
    /// Fails without side effects when `root` or any reached prerequisite is
    /// unknown, or when the closure contains a cycle.
    pub fn resolve(&self, root: &str) -> Result<ExecutionPlan> {
        if !self.contains(root) {
            return Err(AssetflowError::UnknownTask(root.to_string()));
        }

        let mut closure: BTreeSet<&str> = BTreeSet::new();
        let mut stack: Vec<&str> = vec![root];

        while let Some(name) = stack.pop() {
            if !closure.insert(name) {
                continue;
            }
            for dep in self.dependencies_of(name) {
                if !self.contains(dep) {
                    return Err(AssetflowError::UnknownPrerequisite {
                        task: name.to_string(),
                        prerequisite: dep.clone(),
                    });
                }
                stack.push(dep.as_str());
            }
        }

        // Edge direction: prerequisite -> task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for &name in closure.iter() {
            graph.add_node(name);
        }
        for &name in closure.iter() {
            for dep in self.dependencies_of(name) {
                graph.add_edge(dep.as_str(), name, ());
            }
        }

        let order = toposort(&graph, None)
            .map_err(|cycle| AssetflowError::Cycle(cycle.node_id().to_string()))?;

        let deps = closure
            .iter()
            .map(|name| (name.to_string(), self.dependencies_of(name).to_vec()))
            .collect();

        Ok(ExecutionPlan {
            root: root.to_string(),
            order: order.into_iter().map(str::to_string).collect(),
            deps,
        })
    }
}

/// The resolved closure of one top-level task.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub root: TaskName,
    /// Every task in the closure, prerequisites before dependents.
    pub order: Vec<TaskName>,
    deps: BTreeMap<TaskName, Vec<TaskName>>,
}

impl ExecutionPlan {
    pub fn deps_of(&self, name: &str) -> &[TaskName] {
        self.deps.get(name).map(|d| d.as_slice()).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.deps.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
