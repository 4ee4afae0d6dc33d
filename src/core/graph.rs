//! Task graph for dependency ordering.
//!
//! This module provides the TaskGraph structure that holds all tasks of a
//! run together with their declared dependencies, and answers the
//! scheduler's readiness queries.
//!
//! Unlike a validating DAG, the graph deliberately tolerates dangling
//! dependency ids and cycles: a task whose dependencies can never all
//! reach Completed simply never becomes ready. The graph builder is
//! trusted for shape; the scheduler only reads and mutates `status`.

use crate::core::task::{Task, TaskStatus};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// The task dependency graph.
///
/// Nodes are tasks; edges connect each resolvable dependency to its
/// dependent and exist only for diagnostics (listing blocked dependents
/// in the run summary). Readiness is computed from the declared
/// `depends_on` id lists so that unresolved ids keep a task unready
/// instead of erroring.
pub struct TaskGraph {
    /// The underlying directed graph (dependency -> dependent).
    graph: DiGraph<Task, ()>,
    /// Index mapping from task id to NodeIndex for fast lookups.
    task_index: HashMap<String, NodeIndex>,
}

impl TaskGraph {
    /// Create a new empty TaskGraph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            task_index: HashMap::new(),
        }
    }

    /// Build a graph from tasks in insertion order.
    ///
    /// Edges are linked after all nodes exist so that forward references
    /// between tasks resolve.
    pub fn from_tasks<I: IntoIterator<Item = Task>>(tasks: I) -> Self {
        let mut graph = Self::new();
        for task in tasks {
            graph.add_task(task);
        }
        graph.link_edges();
        graph
    }

    /// Add a task to the graph.
    ///
    /// Returns the NodeIndex for the added task. If a task with the same
    /// id already exists, returns the existing NodeIndex unchanged.
    pub fn add_task(&mut self, task: Task) -> NodeIndex {
        if let Some(&index) = self.task_index.get(&task.id) {
            return index;
        }

        let id = task.id.clone();
        let index = self.graph.add_node(task);
        self.task_index.insert(id, index);
        index
    }

    /// Add dependency edges for every declared id that resolves to a node.
    ///
    /// Unresolved ids are left alone; they still block readiness through
    /// the declared list.
    pub fn link_edges(&mut self) {
        let mut edges = Vec::new();
        for index in self.graph.node_indices() {
            for dep in &self.graph[index].depends_on {
                if let Some(&dep_index) = self.task_index.get(dep) {
                    edges.push((dep_index, index));
                }
            }
        }
        for (from, to) in edges {
            if self.graph.find_edge(from, to).is_none() {
                self.graph.add_edge(from, to, ());
            }
        }
    }

    /// Get a reference to a task by its id.
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.task_index
            .get(id)
            .and_then(|&index| self.graph.node_weight(index))
    }

    /// Get a mutable reference to a task by its id.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        if let Some(&index) = self.task_index.get(id) {
            self.graph.node_weight_mut(index)
        } else {
            None
        }
    }

    /// Check whether a task id exists in the graph.
    pub fn contains(&self, id: &str) -> bool {
        self.task_index.contains_key(id)
    }

    /// Get the number of tasks in the graph.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Check if the graph has no tasks.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All task ids in insertion order.
    pub fn task_ids(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .map(|index| self.graph[index].id.clone())
            .collect()
    }

    /// Iterate over all tasks in insertion order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.graph.node_indices().map(move |index| &self.graph[index])
    }

    /// Get ready tasks in insertion order.
    ///
    /// A task is ready iff it is Pending and every declared dependency id
    /// resolves to a Completed task. A dependency id absent from the graph
    /// makes the task permanently unready, as does a failed dependency.
    pub fn ready_tasks(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .filter_map(|index| {
                let task = &self.graph[index];
                if task.status != TaskStatus::Pending {
                    return None;
                }
                let deps_met = task.depends_on.iter().all(|dep| {
                    self.task_index
                        .get(dep)
                        .and_then(|&di| self.graph.node_weight(di))
                        .map(|d| d.status == TaskStatus::Completed)
                        .unwrap_or(false)
                });
                deps_met.then(|| task.id.clone())
            })
            .collect()
    }

    /// Ids of tasks currently in the given status, insertion order.
    pub fn ids_with_status(&self, status: TaskStatus) -> Vec<String> {
        self.graph
            .node_indices()
            .filter(|&index| self.graph[index].status == status)
            .map(|index| self.graph[index].id.clone())
            .collect()
    }

    /// Ids of tasks that directly depend on the given task.
    pub fn dependents(&self, id: &str) -> Vec<String> {
        if let Some(&index) = self.task_index.get(id) {
            self.graph
                .neighbors_directed(index, petgraph::Direction::Outgoing)
                .map(|n| self.graph[n].id.clone())
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Check if every task has reached a terminal status.
    pub fn all_finished(&self) -> bool {
        self.graph
            .node_indices()
            .all(|index| self.graph[index].is_finished())
    }
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}
