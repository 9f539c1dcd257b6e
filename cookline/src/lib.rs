// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! `cookline`: builds a recipe and everything it depends on, running as
//! many independent recipes in parallel as the `-c` concurrency limit
//! allows.

pub mod cli;
pub mod cookbook_format;
pub mod engine;
pub mod error;
pub mod signal;

use std::path::Path;

use dag::{check_cycles, Cookbook};
use error::AppError;

/// Loads the cookbook at `path`, resolves `target_name` to a recipe (empty
/// string means "the first recipe declared"), checks it for cycles, and runs
/// the scheduler with the given concurrency. Returns the total number of
/// recipes built on success.
pub fn build(path: &Path, target_name: &str, concurrency: u32) -> Result<usize, AppError> {
    let doc = cookbook_format::load(path)?;
    let mut cookbook: Cookbook = doc.into_cookbook(path)?;

    let target = cookbook
        .find_or_first(target_name)
        .ok_or_else(|| AppError::RecipeNotFound(target_name.to_string()))?;

    let reachable = check_cycles(&mut cookbook, target)?;
    engine::run(&mut cookbook, target, concurrency)?;

    Ok(reachable)
}
