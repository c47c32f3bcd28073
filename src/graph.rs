//! The dependency graph driving `DependencyAware` scheduling.
//!
//! Edges are declared `dependent depends_on dependency`. The graph is
//! validated once, at build time: every name must resolve against the
//! registry, and the edge set must be acyclic. Declaring the same edge
//! twice is harmless (idempotent), matching how registries tolerate
//! re-declaring an already-registered fact elsewhere in this crate.

use crate::error::ConfigurationError;
use crate::registry::SignalRegistry;

/// A validated, acyclic dependency graph over a [`SignalRegistry`]'s names.
pub struct Graph {
    /// `dependencies[i]` holds the registry indices that signal `i` depends on.
    dependencies: Vec<Vec<usize>>,
    /// `dependents[i]` holds the registry indices that depend on signal `i`.
    dependents: Vec<Vec<usize>>,
    /// Registry names, aligned by index, retained so callers can report
    /// dependency names without holding onto the registry separately.
    names: Vec<String>,
}

impl Graph {
    /// Starts building a graph over `registry`'s signals.
    #[must_use]
    pub fn builder(registry: &SignalRegistry) -> GraphBuilder<'_> {
        GraphBuilder::new(registry)
    }

    /// The indices signal `index` directly depends on.
    #[must_use]
    pub fn dependencies_of(&self, index: usize) -> &[usize] {
        &self.dependencies[index]
    }

    /// The indices that directly depend on signal `index`.
    #[must_use]
    pub fn dependents_of(&self, index: usize) -> &[usize] {
        &self.dependents[index]
    }

    /// The names signal `index` directly depends on, for diagnostic export.
    #[must_use]
    pub fn dependency_names_of(&self, index: usize) -> Vec<String> {
        self.dependencies[index].iter().map(|&d| self.names[d].clone()).collect()
    }

    /// Indices with no dependencies — eligible to start immediately.
    #[must_use]
    pub fn roots(&self) -> Vec<usize> {
        (0..self.dependencies.len())
            .filter(|&i| self.dependencies[i].is_empty())
            .collect()
    }

    /// The number of nodes in the graph (equal to the registry's size).
    #[must_use]
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// True if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}

/// Accumulates dependency edges before a [`Graph`] is validated and built.
pub struct GraphBuilder<'r> {
    registry: &'r SignalRegistry,
    /// Declaration order, not just a set — a reported cycle walks the graph
    /// starting from the order edges were declared in, not registry index
    /// order, so the path reads the way the caller wrote the dependencies.
    edges: Vec<(usize, usize)>,
}

impl<'r> GraphBuilder<'r> {
    fn new(registry: &'r SignalRegistry) -> Self {
        Self {
            registry,
            edges: Vec::new(),
        }
    }

    /// Declares that `dependent` depends on `dependency`; both must already
    /// be registered names. Declaring the same edge twice is a no-op.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::UnknownSignal`] if either name was
    /// never registered.
    pub fn depends_on(
        mut self,
        dependent: &str,
        dependency: &str,
    ) -> Result<Self, ConfigurationError> {
        let dependent_idx = self.resolve(dependent)?;
        let dependency_idx = self.resolve(dependency)?;
        let edge = (dependent_idx, dependency_idx);
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
        Ok(self)
    }

    fn resolve(&self, name: &str) -> Result<usize, ConfigurationError> {
        self.registry
            .position(name)
            .ok_or_else(|| ConfigurationError::UnknownSignal { name: name.to_string() })
    }

    /// Validates the declared edges and builds the graph.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::CycleDetected`] if the edge set
    /// contains a cycle, naming the cycle in declaration order.
    pub fn build(self) -> Result<Graph, ConfigurationError> {
        let n = self.registry.len();
        let mut dependencies = vec![Vec::new(); n];
        let mut dependents = vec![Vec::new(); n];
        for &(dependent, dependency) in &self.edges {
            dependencies[dependent].push(dependency);
            dependents[dependency].push(dependent);
        }

        // Visit nodes in the order they first appear as a dependent in a
        // declared edge, so a reported cycle path starts where the caller's
        // own declarations did, falling back to registry order for any node
        // that never appears on the left-hand side of an edge.
        let mut visit_order = Vec::with_capacity(n);
        for &(dependent, _) in &self.edges {
            if !visit_order.contains(&dependent) {
                visit_order.push(dependent);
            }
        }
        for i in 0..n {
            if !visit_order.contains(&i) {
                visit_order.push(i);
            }
        }

        if let Some(cycle) = detect_cycle(&dependencies, &visit_order) {
            let path = cycle
                .into_iter()
                .map(|i| self.registry_name(i))
                .collect();
            return Err(ConfigurationError::CycleDetected { path });
        }

        let names = (0..n).map(|i| self.registry_name(i)).collect();

        Ok(Graph {
            dependencies,
            dependents,
            names,
        })
    }

    fn registry_name(&self, index: usize) -> String {
        self.registry
            .iter()
            .nth(index)
            .expect("index originated from this registry")
            .name()
            .to_string()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Depth-first cycle detection. On finding a cycle, returns it as a path
/// ending back at its own start, e.g. `[a, b, c, a]`. `order` controls which
/// node each outer pass starts from.
fn detect_cycle(dependencies: &[Vec<usize>], order: &[usize]) -> Option<Vec<usize>> {
    let n = dependencies.len();
    let mut marks = vec![Mark::Unvisited; n];
    let mut stack = Vec::new();

    for &start in order {
        if marks[start] == Mark::Unvisited {
            if let Some(cycle) = visit(start, dependencies, &mut marks, &mut stack) {
                return Some(cycle);
            }
        }
    }
    None
}

fn visit(
    node: usize,
    dependencies: &[Vec<usize>],
    marks: &mut [Mark],
    stack: &mut Vec<usize>,
) -> Option<Vec<usize>> {
    marks[node] = Mark::InProgress;
    stack.push(node);

    for &next in &dependencies[node] {
        match marks[next] {
            Mark::Unvisited => {
                if let Some(cycle) = visit(next, dependencies, marks, stack) {
                    return Some(cycle);
                }
            }
            Mark::InProgress => {
                let start = stack.iter().position(|&n| n == next).expect("in-progress node is on stack");
                let mut cycle: Vec<usize> = stack[start..].to_vec();
                cycle.push(next);
                return Some(cycle);
            }
            Mark::Done => {}
        }
    }

    stack.pop();
    marks[node] = Mark::Done;
    None
}
