use anyhow::{Context, Result};
use colored::*;

use crate::cli::app::SheetArgs;
use crate::jobs::{RecurrenceSpec, load_rows};

/// Recurrence preview per row; needs no API access
pub fn preview_command(input: SheetArgs) -> Result<()> {
    let sheet = load_rows(&input.file, input.sheet.as_deref())
        .with_context(|| format!("Failed to load {}", input.file.display()))?;

    println!();
    for row in &sheet.rows {
        let line = match RecurrenceSpec::from_row(row) {
            Ok(spec) => spec.preview().normal(),
            Err(e) => e.to_string().bright_red(),
        };
        println!("  row {:>4}  {:<40} {}", row.row_number, row.title(), line);
    }
    println!();
    Ok(())
}
