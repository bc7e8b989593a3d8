//! Rendering
//!
//! Turns a loaded catalog plus local read state into something to look at:
//! an HTML page for the web front-end or a fixed-width table for the CLI.

mod html;
mod table;

pub use html::{escape_html, parse_row_ids, render_page, render_row, render_rows};
pub use table::{render_sources, render_table};

use chrono::{DateTime, Utc};

/// Shown instead of rows when there is nothing to list
pub const EMPTY_PLACEHOLDER: &str =
    "No manga tracked yet, or data file is empty/invalid. Add one above or run the update script.";

/// "Checked" column text
pub fn format_checked(at: Option<DateTime<Utc>>) -> String {
    at.map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "Never".to_string())
}
