// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The scheduling loop: C5 dispatches workers, C7 reaps them and re-saturates
//! the ready queue, C8 aborts the whole build on the first failure. Mirrors
//! `main.c`'s `schedule_work` loop, with the SIGCHLD-driven wait of §5
//! implemented by [`crate::signal`] instead of a raw `sigsuspend` call site.

use std::collections::HashMap;

use dag::{initial_ready, saturate, Completed, Cookbook, RecipeId, RecipeState, ReadyQueue};
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};

use crate::engine::worker;
use crate::error::EngineError;
use crate::signal::{self, Guard};

/// Runs every recipe the target transitively depends on, `concurrency` at a
/// time, and returns once the target (and everything it needed) has built
/// successfully, or the first failure has aborted the build.
pub fn run(cookbook: &mut Cookbook, target: RecipeId, concurrency: u32) -> Result<(), EngineError> {
    let mut ready = initial_ready(cookbook, target)?;
    let mut completed = Completed::new();
    let mut active: HashMap<Pid, RecipeId> = HashMap::new();

    let _guard = Guard::install().map_err(EngineError::Signal)?;

    loop {
        dispatch(cookbook, &mut ready, &mut active, concurrency)?;

        if ready.is_empty() && active.is_empty() {
            break;
        }

        signal::suspend().map_err(EngineError::Signal)?;

        if let Err(failed) = reap_all(cookbook, &mut ready, &mut active, &mut completed, target) {
            abort(&active);
            return Err(EngineError::WorkerFailure(failed));
        }
    }

    Ok(())
}

/// C5: while the ready queue is non-empty and there is spare concurrency,
/// fork a worker for the next recipe.
fn dispatch(
    cookbook: &mut Cookbook,
    ready: &mut ReadyQueue,
    active: &mut HashMap<Pid, RecipeId>,
    concurrency: u32,
) -> Result<(), EngineError> {
    while !ready.is_empty() && (active.len() as u32) < concurrency {
        let recipe_id = ready.pop_front().expect("checked non-empty above");
        let pid = spawn_worker(cookbook, recipe_id)?;
        cookbook.set_state(recipe_id, RecipeState::Running(pid.as_raw()));
        active.insert(pid, recipe_id);
        log::debug!("dispatched '{}' as pid {pid}", cookbook.name(recipe_id));
    }
    Ok(())
}

/// Forks a worker process for `recipe_id`. The child never returns: it runs
/// the recipe's tasks and calls [`std::process::exit`] directly.
fn spawn_worker(cookbook: &Cookbook, recipe_id: RecipeId) -> Result<Pid, EngineError> {
    let recipe = cookbook.recipe(recipe_id).clone();
    // SAFETY: the child immediately execs or exits without touching any
    // state shared with the parent beyond what Command/exit already handle.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => Ok(child),
        Ok(ForkResult::Child) => {
            let code = worker::run_recipe(&recipe);
            std::process::exit(code);
        }
        Err(err) => Err(EngineError::WorkerSpawn(recipe.name.clone(), err)),
    }
}

/// C7: drains every terminated worker in one non-blocking pass, marking
/// completions and re-saturating the ready queue. Returns the name of the
/// first recipe to fail, if any, so the caller can hand off to C8.
fn reap_all(
    cookbook: &mut Cookbook,
    ready: &mut ReadyQueue,
    active: &mut HashMap<Pid, RecipeId>,
    completed: &mut Completed,
    target: RecipeId,
) -> Result<(), String> {
    loop {
        let status = match waitpid(None::<Pid>, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => status,
            Err(nix::Error::ECHILD) => break,
            Err(_) => break,
        };

        let Some(pid) = status.pid() else { continue };
        let Some(recipe_id) = active.remove(&pid) else { continue };

        cookbook.set_state(recipe_id, RecipeState::Done);

        let succeeded = matches!(status, WaitStatus::Exited(_, 0));
        if succeeded {
            completed.push(recipe_id);
            saturate(cookbook, ready, completed, target, recipe_id);
        } else {
            let name = cookbook.name(recipe_id).to_string();
            log::error!("recipe '{name}' failed");
            return Err(name);
        }
    }
    Ok(())
}

/// C8: terminate every still-running worker and drain their reaps,
/// ignoring the exit statuses — the build has already failed.
fn abort(active: &HashMap<Pid, RecipeId>) {
    for &pid in active.keys() {
        let _ = kill(pid, Signal::SIGKILL);
    }
    for &pid in active.keys() {
        let _ = waitpid(pid, None);
    }
}
