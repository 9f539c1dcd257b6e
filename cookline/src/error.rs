// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Per-layer error enums (§11). `main` is the only place that turns one of
//! these into a diagnostic line and a process exit code, mirroring the
//! source's uniform `fprintf(stderr, "ERROR: ...")` + `exit(EXIT_FAILURE)`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CookbookFormatError {
    #[error("can't open cookbook '{path}': {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("error parsing cookbook '{path}': {source}")]
    Yaml { path: PathBuf, source: serde_yaml::Error },
    #[error("cookbook '{path}' declares no recipes")]
    Empty { path: PathBuf },
    #[error("recipe '{recipe}' has no tasks")]
    EmptyTasks { recipe: String },
    #[error("recipe '{recipe}' has a task with no steps")]
    EmptyTask { recipe: String },
    #[error("recipe '{recipe}' has a step with an empty argument vector")]
    EmptyStep { recipe: String },
    #[error(transparent)]
    Dangling(#[from] dag::DanglingDependencyError),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to fork worker for recipe '{0}': {1}")]
    WorkerSpawn(String, #[source] nix::Error),
    #[error("signal handling failure: {0}")]
    Signal(#[source] crate::signal::Error),
    #[error("recipe '{0}' failed")]
    WorkerFailure(String),
    #[error(transparent)]
    Readiness(#[from] dag::ReadinessError),
}

/// The top-level error `main` reports. Every variant exits non-zero; the
/// source never distinguishes exit codes beyond `EXIT_FAILURE`, so neither
/// do we.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Cookbook(#[from] CookbookFormatError),
    #[error("recipe '{0}' not found in cookbook")]
    RecipeNotFound(String),
    #[error(transparent)]
    Cycle(#[from] dag::CycleError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
