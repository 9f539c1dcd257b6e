// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! In-memory recipe graph: the data model of a cookbook plus the
//! analysis passes (cycle detection, readiness tracking) that run over it
//! before any worker is ever dispatched.

pub mod cookbook;
pub mod cycle;
pub mod ready;

pub use cookbook::{Cookbook, CookbookBuilder, DanglingDependencyError, Recipe, RecipeId, RecipeState, Step, Task};
pub use cycle::{check_cycles, CycleError};
pub use ready::{initial_ready, saturate, Completed, ReadinessError, ReadyQueue};
