// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The recipe graph itself (C1): recipes live in an arena, dependency and
//! dependent edges are indices into it, never raw back-pointers.

use std::collections::HashMap;
use std::path::PathBuf;

use petgraph::graph::DiGraph;
use petgraph::Direction;
use thiserror::Error;

/// A handle into the cookbook's arena. Cheap to copy, cheap to compare.
pub type RecipeId = petgraph::graph::NodeIndex;

/// One process in a task's pipeline: argv[0] is the program, the rest its arguments.
#[derive(Debug, Clone)]
pub struct Step {
    pub argv: Vec<String>,
}

impl Step {
    pub fn new(argv: Vec<String>) -> Self {
        assert!(!argv.is_empty(), "a step needs at least a program name");
        Self { argv }
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }
}

/// One pipeline within a recipe, with optional input/output file redirection.
#[derive(Debug, Clone, Default)]
pub struct Task {
    pub steps: Vec<Step>,
    pub input_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
}

/// Tagged state slot owned by the engine, never by the parser. Traversals and
/// the scheduler read/write disjoint variants of this so the same field never
/// means three different things at once (the source's overloaded `void *state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecipeState {
    #[default]
    Unvisited,
    /// On the current DFS path during cycle detection.
    Visiting,
    /// Fully explored during the current analysis pass.
    Visited,
    /// Assigned to a live worker; the payload is that worker's raw pid.
    Running(i32),
    Done,
}

/// A named build unit: its tasks plus the transient analysis/execution state.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub name: String,
    pub tasks: Vec<Task>,
    state: RecipeState,
}

impl Recipe {
    pub fn state(&self) -> RecipeState {
        self.state
    }
}

/// Ordered collection of recipes plus a name-keyed lookup and the dependency DAG.
///
/// Edges run dependent → dependency: `a`'s outgoing neighbors are `a.depends_on`,
/// `b`'s incoming neighbors are `b.dependents`.
pub struct Cookbook {
    graph: DiGraph<Recipe, ()>,
    by_name: HashMap<String, RecipeId>,
    /// First recipe declared, in source order — the CLI's default target.
    first: Option<RecipeId>,
}

#[derive(Debug, Error)]
#[error("recipe '{recipe}' depends on unknown recipe '{dependency}'")]
pub struct DanglingDependencyError {
    pub recipe: String,
    pub dependency: String,
}

impl Cookbook {
    pub fn find(&self, name: &str) -> Option<RecipeId> {
        self.by_name.get(name).copied()
    }

    /// CLI convenience preserved from the source: an empty or absent recipe
    /// name resolves to the first recipe declared in the cookbook.
    pub fn find_or_first(&self, name: &str) -> Option<RecipeId> {
        if name.is_empty() {
            self.first
        } else {
            self.find(name)
        }
    }

    pub fn recipe(&self, id: RecipeId) -> &Recipe {
        &self.graph[id]
    }

    pub fn name(&self, id: RecipeId) -> &str {
        &self.graph[id].name
    }

    pub fn state(&self, id: RecipeId) -> RecipeState {
        self.graph[id].state
    }

    pub fn set_state(&mut self, id: RecipeId, state: RecipeState) {
        self.graph[id].state = state;
    }

    pub fn depends_on(&self, id: RecipeId) -> impl Iterator<Item = RecipeId> + '_ {
        self.graph.neighbors_directed(id, Direction::Outgoing)
    }

    pub fn dependents(&self, id: RecipeId) -> impl Iterator<Item = RecipeId> + '_ {
        self.graph.neighbors_directed(id, Direction::Incoming)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

/// Builds a [`Cookbook`] from a parser's (or test's) output, resolving
/// `depends-on` names into arena edges. This is the only place a dangling
/// dependency name can be detected, since edges are indices and cannot
/// reference a node that doesn't exist.
#[derive(Default)]
pub struct CookbookBuilder {
    graph: DiGraph<Recipe, ()>,
    by_name: HashMap<String, RecipeId>,
    order: Vec<String>,
    pending_deps: Vec<(String, String)>,
}

impl CookbookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_recipe(&mut self, name: impl Into<String>, tasks: Vec<Task>) -> RecipeId {
        let name = name.into();
        let id = self.graph.add_node(Recipe {
            name: name.clone(),
            tasks,
            state: RecipeState::Unvisited,
        });
        self.by_name.insert(name.clone(), id);
        self.order.push(name);
        id
    }

    /// Record that `recipe` depends on `dependency`, by name. Resolved at [`build`].
    pub fn add_dependency(&mut self, recipe: impl Into<String>, dependency: impl Into<String>) {
        self.pending_deps.push((recipe.into(), dependency.into()));
    }

    pub fn build(mut self) -> Result<Cookbook, DanglingDependencyError> {
        for (recipe, dependency) in &self.pending_deps {
            let a = *self
                .by_name
                .get(recipe)
                .ok_or_else(|| DanglingDependencyError {
                    recipe: recipe.clone(),
                    dependency: dependency.clone(),
                })?;
            let b = *self.by_name.get(dependency).ok_or_else(|| DanglingDependencyError {
                recipe: recipe.clone(),
                dependency: dependency.clone(),
            })?;
            self.graph.update_edge(a, b, ());
        }

        let first = self.order.first().and_then(|name| self.by_name.get(name)).copied();

        Ok(Cookbook {
            graph: self.graph,
            by_name: self.by_name,
            first,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(program: &str) -> Task {
        Task {
            steps: vec![Step::new(vec![program.to_string()])],
            input_file: None,
            output_file: None,
        }
    }

    #[test]
    fn builds_consistent_inverse_edges() {
        let mut builder = CookbookBuilder::new();
        builder.add_recipe("a", vec![task("echo")]);
        builder.add_recipe("b", vec![task("echo")]);
        builder.add_dependency("a", "b");
        let cookbook = builder.build().unwrap();

        let a = cookbook.find("a").unwrap();
        let b = cookbook.find("b").unwrap();
        assert_eq!(cookbook.depends_on(a).collect::<Vec<_>>(), vec![b]);
        assert_eq!(cookbook.dependents(b).collect::<Vec<_>>(), vec![a]);
    }

    #[test]
    fn dangling_dependency_is_rejected() {
        let mut builder = CookbookBuilder::new();
        builder.add_recipe("a", vec![task("echo")]);
        builder.add_dependency("a", "missing");
        assert!(builder.build().is_err());
    }

    #[test]
    fn empty_name_resolves_to_first_declared_recipe() {
        let mut builder = CookbookBuilder::new();
        builder.add_recipe("first", vec![task("echo")]);
        builder.add_recipe("second", vec![task("echo")]);
        let cookbook = builder.build().unwrap();

        assert_eq!(cookbook.find_or_first(""), cookbook.find("first"));
    }
}
