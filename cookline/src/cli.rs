// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Command-line surface (§6, §10.2), laid out the way `boulder::cli::Command`
//! derives its args, just without subcommands: cookline has exactly one job.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(about = "Run a recipe and everything it depends on, in parallel")]
pub struct Cli {
    /// Cookbook file to read.
    #[arg(short = 'f', long = "file", default_value = "cookbook.ckb")]
    pub file: PathBuf,

    /// Number of recipes allowed to run at once.
    #[arg(short = 'c', long = "cooks", default_value = "1", value_parser = parse_positive_u32)]
    pub cooks: u32,

    /// Print additional information about what cookline is doing.
    #[arg(short, long)]
    pub verbose: bool,

    /// Recipe to build. Defaults to the first recipe declared in the cookbook.
    pub recipe: Option<String>,
}

fn parse_positive_u32(raw: &str) -> Result<u32, String> {
    let value: u32 = raw.parse().map_err(|_| format!("'{raw}' is not a number"))?;
    if value == 0 {
        return Err("must be at least 1".to_string());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_behavior() {
        let cli = Cli::parse_from(["cookline"]);
        assert_eq!(cli.file, PathBuf::from("cookbook.ckb"));
        assert_eq!(cli.cooks, 1);
        assert!(!cli.verbose);
        assert_eq!(cli.recipe, None);
    }

    #[test]
    fn zero_cooks_is_rejected() {
        assert!(Cli::try_parse_from(["cookline", "-c", "0"]).is_err());
    }

    #[test]
    fn flags_and_positional_combine() {
        let cli = Cli::parse_from(["cookline", "-f", "other.ckb", "-c", "4", "-v", "target"]);
        assert_eq!(cli.file, PathBuf::from("other.ckb"));
        assert_eq!(cli.cooks, 4);
        assert!(cli.verbose);
        assert_eq!(cli.recipe.as_deref(), Some("target"));
    }
}
