//! Initialize sheetload.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use sheetload_config::Config;
use sheetload_db::Database;

pub fn run() -> Result<()> {
    let paths = get_paths()?;

    if paths.is_initialized() {
        println!("{} Sheetload is already initialized.", "Note:".yellow().bold());
        println!("  Config: {}", paths.config_file.display());
        println!("  Database: {}", paths.database_file.display());
        return Ok(());
    }

    println!("{}", "Initializing sheetload...".cyan().bold());

    paths.ensure_dirs().context("Failed to create directories")?;
    println!("  {} Created directories", "✓".green());

    Config::create_default_file(&paths.config_file).context("Failed to create config file")?;
    println!("  {} Created config: {}", "✓".green(), paths.config_file.display());

    let db = Database::open(&paths.database_file).context("Failed to initialize database")?;
    if !db.integrity_check()? {
        anyhow::bail!("Database failed its integrity check");
    }
    println!("  {} Created database: {}", "✓".green(), paths.database_file.display());

    println!();
    println!("{}", "Sheetload initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Drop CSV or XLSX files into: {}", paths.incoming_dir.display());
    println!("  2. Load them: {}", "sheetload run".cyan());
    println!("  3. Check what landed: {}", "sheetload stats".cyan());

    Ok(())
}
