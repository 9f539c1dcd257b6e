// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The on-disk cookbook format (§10.1): a thin, dumb translation from YAML
//! into [`dag::CookbookBuilder`]. Dependency-name resolution and dangling
//! references are deliberately left to the builder, matching
//! `stone_recipe::from_slice`'s separation between "parse the document" and
//! "validate the model".

use std::path::{Path, PathBuf};

use dag::{Cookbook, CookbookBuilder, Step, Task};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::CookbookFormatError;

pub fn from_slice(bytes: &[u8], path: &Path) -> Result<RecipeDoc, CookbookFormatError> {
    serde_yaml::from_slice(bytes).map_err(|source| CookbookFormatError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load(path: &Path) -> Result<RecipeDoc, CookbookFormatError> {
    let bytes = std::fs::read(path).map_err(|source| CookbookFormatError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_slice(&bytes, path)
}

/// `recipes:` is an [`IndexMap`] rather than a `HashMap` so that the first
/// key in the YAML document is reliably the cookbook's first recipe — the
/// CLI's empty-name-means-first-recipe default (§9) depends on this order
/// surviving deserialization.
#[derive(Debug, Deserialize)]
pub struct RecipeDoc {
    pub recipes: IndexMap<String, RawRecipe>,
}

#[derive(Debug, Deserialize)]
pub struct RawRecipe {
    #[serde(default, rename = "depends-on")]
    pub depends_on: Vec<String>,
    pub tasks: Vec<RawTask>,
}

#[derive(Debug, Deserialize)]
pub struct RawTask {
    pub steps: Vec<Vec<String>>,
    #[serde(default, rename = "input-file")]
    pub input_file: Option<PathBuf>,
    #[serde(default, rename = "output-file")]
    pub output_file: Option<PathBuf>,
}

impl RecipeDoc {
    /// Turns the parsed document into a [`Cookbook`], validating that every
    /// recipe has at least one task, every task at least one step, and every
    /// step a non-empty argument vector. Dangling `depends-on` names surface
    /// from [`dag::CookbookBuilder::build`], not from here.
    pub fn into_cookbook(self, path: &Path) -> Result<Cookbook, CookbookFormatError> {
        if self.recipes.is_empty() {
            return Err(CookbookFormatError::Empty { path: path.to_path_buf() });
        }

        let mut builder = CookbookBuilder::new();
        let mut deps: Vec<(String, String)> = Vec::new();

        for (name, raw) in &self.recipes {
            if raw.tasks.is_empty() {
                return Err(CookbookFormatError::EmptyTasks { recipe: name.clone() });
            }

            let mut tasks = Vec::with_capacity(raw.tasks.len());
            for raw_task in &raw.tasks {
                if raw_task.steps.is_empty() {
                    return Err(CookbookFormatError::EmptyTask { recipe: name.clone() });
                }

                let mut steps = Vec::with_capacity(raw_task.steps.len());
                for argv in &raw_task.steps {
                    if argv.is_empty() {
                        return Err(CookbookFormatError::EmptyStep { recipe: name.clone() });
                    }
                    steps.push(Step::new(argv.clone()));
                }

                tasks.push(Task {
                    steps,
                    input_file: raw_task.input_file.clone(),
                    output_file: raw_task.output_file.clone(),
                });
            }

            builder.add_recipe(name.clone(), tasks);
            for dependency in &raw.depends_on {
                deps.push((name.clone(), dependency.clone()));
            }
        }

        for (recipe, dependency) in deps {
            builder.add_dependency(recipe, dependency);
        }

        builder.build().map_err(Into::into)
    }
}
