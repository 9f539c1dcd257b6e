// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::Parser;
use cookline::cli::Cli;

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cookline::build(&cli.file, cli.recipe.as_deref().unwrap_or(""), cli.cooks) {
        Ok(count) => log::info!("built {count} recipe(s)"),
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    }
}
