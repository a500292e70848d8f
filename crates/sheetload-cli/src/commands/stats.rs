//! Stats command - show database statistics.

use super::{format_size, get_database};
use anyhow::Result;
use colored::Colorize;

pub fn run(json: bool) -> Result<()> {
    let db = get_database()?;
    run_with_db(&db, json)
}

/// Run stats with an existing database connection.
pub fn run_with_db(db: &sheetload_db::Database, json: bool) -> Result<()> {
    let stats = db.get_stats()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", "Sheetload Statistics".cyan().bold());
    println!("{}", "─".repeat(50));

    println!();
    println!("{}", "Registry".white().bold());
    println!("  Files: {}", stats.total_files);
    println!("  Sheets: {}", stats.total_sheets.to_string().green());

    let mut by_file: Vec<_> = stats.sheets_by_file.iter().collect();
    by_file.sort();
    for (file, count) in by_file {
        println!("    {}: {}", file, count);
    }

    println!();
    println!("{}", "Cells".white().bold());
    println!("  Total: {}", stats.total_cells);
    println!("  Null: {}", stats.null_cells.to_string().dimmed());

    println!();
    println!("{}", "Storage".white().bold());
    println!("  Database size: {}", format_size(stats.database_size_bytes));

    Ok(())
}
