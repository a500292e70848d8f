//! Sheets command - list loaded sheets.

use super::get_database;
use anyhow::Result;
use colored::Colorize;

pub fn run(limit: i64) -> Result<()> {
    let db = get_database()?;
    let sheets = db.list_sheets(Some(limit))?;

    if sheets.is_empty() {
        println!(
            "{}",
            "No sheets loaded. Use 'sheetload run' to load the incoming folder.".dimmed()
        );
        return Ok(());
    }

    println!("{}", "Loaded Sheets".cyan().bold());
    println!("{}", "─".repeat(70));

    for sheet in sheets {
        let date = sheet.registered_at.format("%Y-%m-%d %H:%M").to_string();
        let hash: String = sheet.content_hash.chars().take(12).collect();

        println!(
            "{} {} {} {}",
            format!("#{}", sheet.id).dimmed(),
            sheet.file_name.white().bold(),
            format!("'{}'", sheet.sheet_name).cyan(),
            date.dimmed()
        );
        println!("  {} cells, content {}", sheet.cell_count, hash.dimmed());
    }

    Ok(())
}
