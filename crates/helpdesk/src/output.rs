// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal output: pretty JSON for records, an aligned table for stats.

use std::io::IsTerminal;

use helpdesk_core::{HelpdeskError, TicketStats};
use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), HelpdeskError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| HelpdeskError::Internal(format!("failed to render output: {e}")))?;
    println!("{text}");
    Ok(())
}

fn use_color(plain: bool, stream_is_terminal: bool) -> bool {
    !plain && stream_is_terminal
}

pub fn print_error(error: &HelpdeskError, plain: bool) {
    if use_color(plain, std::io::stderr().is_terminal()) {
        use colored::Colorize;
        eprintln!("{} {error}", "error:".red().bold());
    } else {
        eprintln!("error: {error}");
    }
}

/// Stats rows as (label, count), in display order.
fn stats_rows(stats: &TicketStats) -> [(&'static str, u64); 7] {
    [
        ("Open", stats.open),
        ("In progress", stats.in_progress),
        ("Resolved", stats.resolved),
        ("Closed", stats.closed),
        ("Escalated", stats.escalated),
        ("Overdue", stats.overdue),
        ("Total", stats.total),
    ]
}

/// Plain aligned table: labels left, counts right-aligned to the widest.
pub fn render_stats_table(stats: &TicketStats) -> String {
    let rows = stats_rows(stats);
    let label_width = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    let count_width = rows
        .iter()
        .map(|(_, n)| n.to_string().len())
        .max()
        .unwrap_or(1);

    let mut out = String::new();
    out.push_str("  helpdesk stats\n");
    out.push_str(&format!("  {}\n", "-".repeat(label_width + count_width + 4)));
    for (label, count) in rows {
        out.push_str(&format!(
            "    {label:<label_width$}  {count:>count_width$}\n"
        ));
    }
    out
}

pub fn print_stats(stats: &TicketStats, plain: bool) {
    let table = render_stats_table(stats);
    if use_color(plain, std::io::stdout().is_terminal()) {
        use colored::Colorize;
        for line in table.lines() {
            if line.trim_start().starts_with("Overdue") && stats.overdue > 0 {
                println!("{}", line.yellow());
            } else if line.trim_start().starts_with("Escalated") && stats.escalated > 0 {
                println!("{}", line.red());
            } else {
                println!("{line}");
            }
        }
    } else {
        print!("{table}");
    }
}
