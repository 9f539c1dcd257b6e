// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! C6: runs inside a forked worker process. Each task in the recipe becomes a
//! pipeline of external programs, wired together with [`std::process::Stdio`]
//! rather than the source's manual `pipe()`/`dup2()` plumbing — `Command`
//! already owns and closes the file descriptors correctly on both ends.
//!
//! Program resolution mirrors the source's `util/<argv0>` override: a recipe
//! step first tries a same-named program under `util/`, then falls back to
//! the ambient `PATH` lookup `Command` performs when given a bare name.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::process::{Child, Command, Stdio};

use dag::{Recipe, Step, Task};

const UTIL_DIR: &str = "util";

/// Runs every task in `recipe`, in source order. The first task that fails
/// stops the recipe; later tasks do not run. Returns the exit code the
/// worker process should terminate with.
pub fn run_recipe(recipe: &Recipe) -> i32 {
    for task in &recipe.tasks {
        if !run_task(task) {
            log::error!("recipe '{}' failed", recipe.name);
            return 1;
        }
    }
    0
}

fn run_task(task: &Task) -> bool {
    let input = match open_input(task) {
        Ok(file) => file,
        Err(()) => return false,
    };
    let output = match open_output(task) {
        Ok(file) => file,
        Err(()) => return false,
    };

    let mut children: Vec<Child> = Vec::with_capacity(task.steps.len());
    let mut feed: Option<Stdio> = input.map(Stdio::from);

    for (index, step) in task.steps.iter().enumerate() {
        let is_last = index + 1 == task.steps.len();
        let stdin = feed.take().unwrap_or_else(Stdio::inherit);
        let stdout = if is_last {
            stdio_for_output(output.as_ref())
        } else {
            Stdio::piped()
        };

        match spawn_step(step, stdin, stdout) {
            Ok(mut child) => {
                feed = child.stdout.take().map(Stdio::from);
                children.push(child);
            }
            Err(err) => {
                log::error!("failed to start '{}': {err}", step.program());
                wait_all(children);
                return false;
            }
        }
    }

    wait_all(children)
}

fn open_input(task: &Task) -> Result<Option<File>, ()> {
    match &task.input_file {
        None => Ok(None),
        Some(path) => File::open(path)
            .map(Some)
            .map_err(|err| log::error!("failed to open input file '{}': {err}", path.display())),
    }
}

fn open_output(task: &Task) -> Result<Option<File>, ()> {
    match &task.output_file {
        None => Ok(None),
        Some(path) => OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map(Some)
            .map_err(|err| log::error!("failed to open output file '{}': {err}", path.display())),
    }
}

fn stdio_for_output(output: Option<&File>) -> Stdio {
    match output.and_then(|file| file.try_clone().ok()) {
        Some(file) => Stdio::from(file),
        None => Stdio::inherit(),
    }
}

/// Resolves `step.program()` against `util/` first, the ambient `PATH` second,
/// and spawns it with the given pipeline ends.
fn spawn_step(step: &Step, stdin: Stdio, stdout: Stdio) -> std::io::Result<Child> {
    let via_util = Path::new(UTIL_DIR).join(step.program());
    let mut command = if via_util.is_file() {
        Command::new(via_util)
    } else {
        Command::new(step.program())
    };
    command.args(&step.argv[1..]).stdin(stdin).stdout(stdout).stderr(Stdio::inherit());
    command.spawn()
}

/// Waits for every spawned step; the task succeeds only if all of them exit
/// with status zero, matching the source's "earliest non-zero status wins".
fn wait_all(children: Vec<Child>) -> bool {
    let mut success = true;
    for mut child in children {
        match child.wait() {
            Ok(status) if status.success() => {}
            _ => success = false,
        }
    }
    success
}
