// Output formatting utilities

use crate::models::{Entry, Field, Form};
use std::io::IsTerminal;

const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";

/// Column gap in tables
const GAP: usize = 1;
/// Narrowest a field column gets before it is hidden
const FIELD_MIN_WIDTH: usize = 6;
/// Widest a field column grows to
const FIELD_MAX_WIDTH: usize = 30;

/// Check if stdout is a terminal (TTY)
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate for reliable detection, with fallback to
/// COLUMNS environment variable and a sensible default.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 { // Sanity check
                return width;
            }
        }
    }

    120
}

/// Apply bold formatting if in TTY mode
fn bold_if_tty(text: &str, is_tty: bool) -> String {
    if is_tty {
        format!("{}{}{}", ANSI_BOLD, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

/// Cut `text` to `width` characters, marking the cut with '…'
fn truncate(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(width - 1).collect();
    out.push('…');
    out
}

fn pad(text: &str, width: usize) -> String {
    let count = text.chars().count();
    format!("{}{}", text, " ".repeat(width.saturating_sub(count)))
}

/// Display value of a field: its own value, or its filled sub-inputs joined
pub fn field_display_value(entry: &Entry, field: &Field) -> String {
    if let Some(value) = entry.get(&field.id.to_string()) {
        if field.inputs.is_empty() || !value.is_empty() {
            return value;
        }
    }
    field
        .inputs
        .iter()
        .filter_map(|input| entry.get(&input.id))
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format entries as a table: ID, creation date, creator, then one column
/// per form field. Field columns that don't fit the width are dropped from
/// the right.
pub fn format_entry_table(entries: &[Entry], form: &Form, width: usize) -> String {
    let mut headers = vec!["ID".to_string(), "Created".to_string(), "By".to_string()];
    let mut rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            vec![
                e.id.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string()),
                e.date_created.chars().take(16).collect(),
                e.created_by.map(|id| id.to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    for field in &form.fields {
        headers.push(field.label.clone());
        for (row, entry) in rows.iter_mut().zip(entries) {
            row.push(field_display_value(entry, field));
        }
    }

    let mut widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let longest = rows.iter().map(|r| r[i].chars().count()).max().unwrap_or(0);
            let natural = longest.max(h.chars().count());
            if i < 3 { natural } else { natural.clamp(FIELD_MIN_WIDTH.min(natural), FIELD_MAX_WIDTH) }
        })
        .collect();

    // Shrink field columns toward their minimum, then hide from the right
    let total = |w: &[usize]| w.iter().sum::<usize>() + GAP * w.len().saturating_sub(1);
    while total(&widths) > width && widths.len() > 3 {
        let widest = (3..widths.len()).max_by_key(|&i| widths[i]).unwrap_or(3);
        if widths[widest] > FIELD_MIN_WIDTH {
            widths[widest] -= 1;
        } else {
            widths.pop();
        }
    }

    let tty = is_tty();
    let mut output = String::new();
    let header_line: Vec<String> = widths.iter().enumerate().map(|(i, w)| pad(&truncate(&headers[i], *w), *w)).collect();
    output.push_str(&bold_if_tty(header_line.join(" ").trim_end(), tty));
    output.push('\n');
    output.push_str(&"-".repeat(total(&widths)));
    output.push('\n');
    for row in &rows {
        let cells: Vec<String> = widths.iter().enumerate().map(|(i, w)| pad(&truncate(&row[i], *w), *w)).collect();
        output.push_str(cells.join(" ").trim_end());
        output.push('\n');
    }
    output
}

/// Format a form and its fields (with sub-inputs and choices)
pub fn format_form_summary(form: &Form) -> String {
    let mut output = String::new();
    let header = format!("Form {}: {}", form.id, form.title);
    output.push_str(&header);
    output.push('\n');
    output.push_str(&"=".repeat(header.len().max(40)));
    output.push_str("\n\n");

    if form.fields.is_empty() {
        output.push_str("(no fields)\n");
        return output;
    }

    output.push_str(&format!("{:<8} {:<14} {}\n", "Key", "Type", "Label"));
    output.push_str(&format!("{}\n", "-".repeat(40)));
    for field in &form.fields {
        output.push_str(&format!("{:<8} {:<14} {}\n", field.id, field.field_type.as_str(), field.label));
        for input in &field.inputs {
            output.push_str(&format!("{:<8} {:<14} {}\n", input.id, "", input.label));
        }
        if !field.choices.is_empty() {
            let choices: Vec<&str> = field.choices.iter().map(|c| c.text.as_str()).collect();
            output.push_str(&format!("{:<8} {:<14} choices: {}\n", "", "", choices.join(", ")));
        }
    }
    output
}

/// Format a single entry: properties, then field values by label, then other meta.
/// `creator` is the login of the user the entry was created by, when known.
pub fn format_entry_detail(entry: &Entry, form: Option<&Form>, creator: Option<&str>) -> String {
    let mut output = String::new();
    let header = format!(
        "Entry {} (form {})",
        entry.id.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string()),
        entry.form_id
    );
    output.push_str(&header);
    output.push('\n');
    output.push_str(&"=".repeat(header.len().max(40)));
    output.push_str("\n\n");

    let none = || "(none)".to_string();
    output.push_str(&format!("  Status:         {}\n", entry.status));
    output.push_str(&format!("  Created:        {}\n", entry.date_created));
    output.push_str(&format!("  Updated:        {}\n", entry.date_updated));
    let created_by = match (entry.created_by, creator) {
        (Some(id), Some(login)) => format!("{} ({})", id, login),
        (Some(id), None) => id.to_string(),
        (None, _) => none(),
    };
    output.push_str(&format!("  Created by:     {}\n", created_by));
    output.push_str(&format!("  Starred:        {}\n", if entry.is_starred { "yes" } else { "no" }));
    output.push_str(&format!("  Read:           {}\n", if entry.is_read { "yes" } else { "no" }));
    output.push_str(&format!(
        "  Payment status: {}\n",
        entry.payment_status.clone().unwrap_or_else(none)
    ));
    output.push_str(&format!(
        "  Payment date:   {}\n",
        entry.payment_date.clone().unwrap_or_else(none)
    ));
    if !entry.ip.is_empty() {
        output.push_str(&format!("  IP:             {}\n", entry.ip));
    }
    if !entry.source_url.is_empty() {
        output.push_str(&format!("  Source URL:     {}\n", entry.source_url));
    }

    let mut shown: Vec<String> = Vec::new();
    if let Some(form) = form {
        output.push_str("\nFields:\n");
        for field in &form.fields {
            shown.push(field.id.to_string());
            shown.extend(field.inputs.iter().map(|i| i.id.clone()));
            let value = field_display_value(entry, field);
            output.push_str(&format!("  {:<20} {}\n", truncate(&field.label, 20), value));
        }
    }

    let other: Vec<(&String, &String)> = entry.meta.iter().filter(|(k, _)| !shown.contains(k)).collect();
    if !other.is_empty() {
        output.push_str("\nMeta:\n");
        for (key, value) in other {
            output.push_str(&format!("  {:<20} {}\n", key, value));
        }
    }
    output
}
