// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Cycle detection (C2): a depth-first search rooted at the target, ported
//! from the source's explicit visiting-stack DFS (`detect_cycle_dfs`) onto
//! the `RecipeState` tagged variant instead of a side-channel stack.

use thiserror::Error;

use crate::cookbook::{Cookbook, RecipeId, RecipeState};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CycleError {
    #[error("self-dependency detected in recipe '{0}'")]
    SelfLoop(String),
    #[error("circular dependency detected involving recipe '{0}'")]
    Circular(String),
}

struct Frame {
    node: RecipeId,
    deps: Vec<RecipeId>,
    next: usize,
}

/// DFS from `target` across `depends_on`. On success, returns the count of
/// recipes reachable from `target` (the build's total work). `state` on
/// every visited recipe is reset to `Unvisited` before returning, on both
/// the success and error paths.
pub fn check_cycles(cookbook: &mut Cookbook, target: RecipeId) -> Result<usize, CycleError> {
    let mut touched = Vec::new();
    let outcome = walk(cookbook, target, &mut touched);
    for id in touched {
        cookbook.set_state(id, RecipeState::Unvisited);
    }
    outcome
}

fn walk(cookbook: &mut Cookbook, target: RecipeId, touched: &mut Vec<RecipeId>) -> Result<usize, CycleError> {
    cookbook.set_state(target, RecipeState::Visiting);
    touched.push(target);
    let mut reachable = 1usize;

    let mut stack = vec![Frame {
        node: target,
        deps: cookbook.depends_on(target).collect(),
        next: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        if frame.next == frame.deps.len() {
            cookbook.set_state(frame.node, RecipeState::Visited);
            stack.pop();
            continue;
        }

        let node = frame.node;
        let dep = frame.deps[frame.next];
        frame.next += 1;

        if dep == node {
            return Err(CycleError::SelfLoop(cookbook.name(node).to_string()));
        }

        match cookbook.state(dep) {
            RecipeState::Visiting => return Err(CycleError::Circular(cookbook.name(dep).to_string())),
            RecipeState::Visited => {}
            RecipeState::Unvisited => {
                cookbook.set_state(dep, RecipeState::Visiting);
                touched.push(dep);
                reachable += 1;
                stack.push(Frame {
                    node: dep,
                    deps: cookbook.depends_on(dep).collect(),
                    next: 0,
                });
            }
            RecipeState::Running(_) | RecipeState::Done => {
                unreachable!("cycle detection runs before any worker is dispatched")
            }
        }
    }

    Ok(reachable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookbook::{CookbookBuilder, Step, Task};

    fn task() -> Task {
        Task {
            steps: vec![Step::new(vec!["echo".into()])],
            input_file: None,
            output_file: None,
        }
    }

    #[test]
    fn acyclic_diamond_counts_every_reachable_recipe() {
        let mut builder = CookbookBuilder::new();
        builder.add_recipe("d", vec![task()]);
        builder.add_recipe("b", vec![task()]);
        builder.add_recipe("c", vec![task()]);
        builder.add_recipe("a", vec![task()]);
        builder.add_dependency("d", "b");
        builder.add_dependency("d", "c");
        builder.add_dependency("b", "a");
        builder.add_dependency("c", "a");
        let mut cookbook = builder.build().unwrap();
        let d = cookbook.find("d").unwrap();

        assert_eq!(check_cycles(&mut cookbook, d), Ok(4));
        // state must be reset on every node touched by the traversal
        for id in [d, cookbook.find("b").unwrap(), cookbook.find("c").unwrap(), cookbook.find("a").unwrap()] {
            assert_eq!(cookbook.state(id), RecipeState::Unvisited);
        }
    }

    #[test]
    fn self_loop_is_rejected() {
        let mut builder = CookbookBuilder::new();
        builder.add_recipe("a", vec![task()]);
        builder.add_dependency("a", "a");
        let mut cookbook = builder.build().unwrap();
        let a = cookbook.find("a").unwrap();

        assert_eq!(check_cycles(&mut cookbook, a), Err(CycleError::SelfLoop("a".into())));
    }

    #[test]
    fn two_cycle_is_rejected_and_state_is_reset() {
        let mut builder = CookbookBuilder::new();
        builder.add_recipe("a", vec![task()]);
        builder.add_recipe("b", vec![task()]);
        builder.add_dependency("a", "b");
        builder.add_dependency("b", "a");
        let mut cookbook = builder.build().unwrap();
        let a = cookbook.find("a").unwrap();
        let b = cookbook.find("b").unwrap();

        assert!(check_cycles(&mut cookbook, a).is_err());
        assert_eq!(cookbook.state(a), RecipeState::Unvisited);
        assert_eq!(cookbook.state(b), RecipeState::Unvisited);
    }

    #[test]
    fn unrelated_subtree_is_untouched() {
        let mut builder = CookbookBuilder::new();
        builder.add_recipe("target", vec![task()]);
        builder.add_recipe("unrelated", vec![task()]);
        let mut cookbook = builder.build().unwrap();
        let target = cookbook.find("target").unwrap();
        let unrelated = cookbook.find("unrelated").unwrap();

        assert_eq!(check_cycles(&mut cookbook, target), Ok(1));
        assert_eq!(cookbook.state(unrelated), RecipeState::Unvisited);
    }
}
