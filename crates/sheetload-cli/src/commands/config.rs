//! Configuration commands.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use sheetload_config::Config;

pub fn show() -> Result<()> {
    let paths = get_paths()?;

    if !paths.config_file.exists() {
        println!("{}", "No config file; built-in defaults apply.".dimmed());
        println!("{}", "─".repeat(50));
        println!("{}", Config::default_config_string());
        return Ok(());
    }

    let contents =
        std::fs::read_to_string(&paths.config_file).context("Failed to read config file")?;
    Config::load_from(&paths.config_file).context("Config file is invalid")?;

    println!("{}", "Current Configuration".cyan().bold());
    println!("{}", paths.config_file.display().to_string().dimmed());
    println!("{}", "─".repeat(50));
    println!("{}", contents);

    Ok(())
}
