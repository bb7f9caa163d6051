use anyhow::Result;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::composer::{RunReport, TopEntry};

/// Render a colored terminal report.
pub fn render(report: &RunReport, verbose: bool, quiet: bool) -> Result<()> {
    let skipped_total: usize = report.skipped.values().sum();

    if quiet {
        println!(
            "Devices: {}  Kept: {}  Skipped: {}  Failed: {}",
            report.parsed,
            report.kept.to_string().green(),
            skipped_total.to_string().yellow(),
            report.failed.to_string().red(),
        );
        return Ok(());
    }

    println!(
        "\n {} v{}",
        "lineageos-info".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(" Wiki devices: {}\n", report.wiki_devices.display());

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(" │  {:<48} │", format!("Devices parsed     : {}", report.parsed));
    println!(
        " │  {:<48} │",
        format!("{}  Kept            : {:>4}", "✓".green(), report.kept)
    );
    println!(
        " │  {:<48} │",
        format!(
            "{}  Skipped         : {:>4}  {}",
            "⚠".yellow(),
            skipped_total,
            summarize_skips(report)
        )
    );
    println!(
        " │  {:<48} │",
        format!("{}  Failed          : {:>4}", "✗".red(), report.failed)
    );
    println!(
        " │  {:<48} │",
        format!(
            "Last wiki update   : {}",
            report.last_wiki_update.as_deref().unwrap_or("unknown")
        )
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    for output in &report.outputs {
        let target = output
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        println!(
            "  {} LineageOS {}: {} devices → {}",
            "→".cyan(),
            output.version,
            output.rows,
            target
        );
    }
    if let Some(readme) = &report.readme {
        println!("  {} README updated: {}", "→".cyan(), readme.display());
    }
    println!();

    println!(" {} Devices with the most maintainers:\n", "[TOP]".green().bold());
    render_table(&report.top_all);
    println!();

    if verbose && !report.top_kept.is_empty() {
        println!(" {} Top devices in the CSV files:\n", "[CSV]".cyan().bold());
        render_table(&report.top_kept);
        println!();
    }

    Ok(())
}

fn render_table(entries: &[TopEntry]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Device").add_attribute(Attribute::Bold),
            Cell::new("Codename").add_attribute(Attribute::Bold),
            Cell::new("Maintainers").add_attribute(Attribute::Bold),
            Cell::new("Removable battery").add_attribute(Attribute::Bold),
            Cell::new("Wiki").add_attribute(Attribute::Bold),
        ]);

    for (i, entry) in entries.iter().enumerate() {
        let color = match entry.maintainers {
            0 => Color::Red,
            1 => Color::Yellow,
            _ => Color::Green,
        };

        table.add_row(vec![
            Cell::new(i + 1).set_alignment(CellAlignment::Right),
            Cell::new(&entry.short_name),
            Cell::new(&entry.codename),
            Cell::new(entry.maintainers)
                .fg(color)
                .set_alignment(CellAlignment::Center),
            Cell::new(entry.removable_battery).set_alignment(CellAlignment::Center),
            Cell::new(&entry.wiki_link).fg(Color::DarkGrey),
        ]);
    }

    println!("{}", table);
}

/// `[version (12), maintainers (3)]` — the three most common skip reasons.
fn summarize_skips(report: &RunReport) -> String {
    let mut pairs: Vec<(&String, &usize)> = report.skipped.iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(a.1));

    let summary: Vec<String> = pairs
        .iter()
        .take(3)
        .map(|(label, count)| format!("{} ({})", label, count))
        .collect();

    if summary.is_empty() {
        String::new()
    } else {
        format!("[{}]", summary.join(", "))
    }
}
