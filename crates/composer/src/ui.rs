//! Terminal UI helpers.
//!
//! This module uses println! for CLI output, which is appropriate
//! for terminal user interfaces.

#![allow(clippy::disallowed_macros)]

use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use crate::drafts::Drafts;
use crate::issues::{IssueDraft, IssuePlan};
use crate::store::{CodeKind, CodeRecord};
use crate::template::ExpansionWarning;
use crate::TokenUsage;

/// Get colored kind string
pub fn kind_colored(kind: CodeKind) -> String {
    match kind {
        CodeKind::Project => "project".cyan().to_string(),
        CodeKind::Task => "task".magenta().to_string(),
    }
}

/// Create a table for displaying codes
pub fn code_table(records: &[CodeRecord]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Code").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Kind").fg(Color::Cyan),
        Cell::new("Type").fg(Color::Cyan),
        Cell::new("Placeholders").fg(Color::Cyan),
    ]);

    for record in records {
        let kind_color = match record.kind {
            CodeKind::Project => Color::Cyan,
            CodeKind::Task => Color::Magenta,
        };
        let placeholders = crate::template::extract(&record.template_id(), &record.template)
            .placeholders
            .len();

        table.add_row(vec![
            Cell::new(&record.code),
            Cell::new(&record.name),
            Cell::new(record.kind.to_string()).fg(kind_color),
            Cell::new(record.issue_type.as_deref().unwrap_or("-")),
            Cell::new(placeholders),
        ]);
    }

    table
}

/// Display a code record with its template
pub fn display_code_details(record: &CodeRecord) {
    println!("{}", "═".repeat(60).dimmed());
    println!(
        "{} {} {}",
        "Code".cyan().bold(),
        record.code.cyan().bold(),
        format!("[{}]", record.kind).yellow()
    );
    println!("{}", "═".repeat(60).dimmed());
    println!();

    println!("{}: {}", "Name".bold(), record.name);
    println!("{}: {}", "Kind".bold(), kind_colored(record.kind));
    if let Some(issue_type) = &record.issue_type {
        println!("{}: {}", "Issue type".bold(), issue_type);
    }
    println!("{}: {}", "Id".bold(), record.id.to_string().dimmed());
    println!(
        "{}: {}",
        "Updated".bold(),
        record.updated_at.format("%Y-%m-%d %H:%M UTC")
    );

    println!();
    println!("{}", "Template".bold().underline());
    if record.template.is_empty() {
        println!("{}", "(empty)".dimmed());
    } else {
        println!("{}", record.template);
    }
    println!();
}

fn display_issue(label: &str, draft: &IssueDraft) {
    println!(
        "{} {} {}",
        label.cyan().bold(),
        draft.summary.bold(),
        format!("[{} / {}]", draft.code, draft.issue_type).dimmed()
    );
    println!("{}", draft.description);
    println!();
}

/// Display an issue plan before it is pushed
pub fn display_plan(plan: &IssuePlan) {
    display_issue("Parent", &plan.parent);
    for subtask in &plan.subtasks {
        display_issue("  Subtask", subtask);
    }
    display_warnings(&plan.warnings);
    if let Some(usage) = plan.usage {
        display_usage(usage);
    }
}

/// Display drafted epic and stories
pub fn display_drafts(drafts: &Drafts) {
    println!("{} {}", "Epic".cyan().bold(), drafts.epic.summary.bold());
    println!("{}", drafts.epic.description);
    println!();

    println!(
        "{} ({})",
        "Stories".bold().underline(),
        drafts.stories.len()
    );
    for (i, story) in drafts.stories.iter().enumerate() {
        println!("  {} {}", format!("{}.", i + 1).dimmed(), story.summary.bold());
        for line in story.description.lines() {
            println!("     {line}");
        }
    }
    println!();
    display_usage(drafts.usage);
}

/// Print one line per expansion warning
pub fn display_warnings(warnings: &[ExpansionWarning]) {
    for warning in warnings {
        let message = match warning {
            ExpansionWarning::MalformedTag { owner, offset } => {
                format!("{owner}: tag at byte {offset} has no prompt and was kept as text")
            }
            ExpansionWarning::CountMismatch { expected, received } => {
                format!("AI returned {received} items for {expected} placeholders")
            }
            ExpansionWarning::Truncated {
                owner,
                ordinal,
                generated_lines,
                max_lines,
            } => format!(
                "{owner}: placeholder {ordinal} cut from {generated_lines} to {max_lines} lines"
            ),
        };
        print_warning(&message);
    }
}

/// Print token usage
pub fn display_usage(usage: TokenUsage) {
    println!(
        "{}",
        format!(
            "tokens: {} in / {} out / {} total",
            usage.input_tokens, usage.output_tokens, usage.total_tokens
        )
        .dimmed()
    );
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}
