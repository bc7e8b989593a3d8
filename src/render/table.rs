//! Terminal table rendering for the CLI

use super::{format_checked, EMPTY_PLACEHOLDER};
use crate::catalog::{Catalog, CatalogStatus, MangaSource};
use crate::state::ReadState;
use std::fmt::Write;

const TITLE_WIDTH: usize = 30;
const CHAPTER_WIDTH: usize = 24;

/// Truncate to `width` characters, marking the cut with `~`
fn fit(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}

/// Render the catalog as a fixed-width table
pub fn render_table(catalog: &Catalog, read: &ReadState) -> String {
    let mut out = String::new();

    if catalog.items.is_empty() {
        let _ = writeln!(out, "{}", EMPTY_PLACEHOLDER);
        if let CatalogStatus::Unreadable(reason) = &catalog.status {
            let _ = writeln!(out, "Catalog could not be read: {}", reason);
        }
        return out;
    }

    let _ = writeln!(
        out,
        "{:<6} {:<tw$} {:<cw$} {:<20} {}",
        "ID",
        "Title",
        "Latest Chapter",
        "Checked",
        "Status",
        tw = TITLE_WIDTH,
        cw = CHAPTER_WIDTH
    );
    let _ = writeln!(out, "{}", "-".repeat(6 + TITLE_WIDTH + CHAPTER_WIDTH + 20 + 12));

    for item in &catalog.items {
        let chapter = item
            .latest_chapter
            .as_ref()
            .map(|c| c.text.as_str())
            .unwrap_or("N/A");
        let status = if read.is_read(item) { "Read" } else { "Unread" };
        let marker = if read.is_pending(item.id) { " *" } else { "" };

        let _ = writeln!(
            out,
            "{:<6} {:<tw$} {:<cw$} {:<20} {}{}",
            item.id,
            fit(&item.title, TITLE_WIDTH),
            fit(chapter, CHAPTER_WIDTH),
            format_checked(item.last_updated_at),
            status,
            marker,
            tw = TITLE_WIDTH,
            cw = CHAPTER_WIDTH
        );
    }

    let pending = read.pending_count();
    if pending > 0 {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "* {} pending change{} (run `mangafetch flush` to commit)",
            pending,
            if pending > 1 { "s" } else { "" }
        );
    }

    out
}

/// Render the scraper's source list
pub fn render_sources(sources: &[MangaSource]) -> String {
    let mut out = String::new();

    if sources.is_empty() {
        let _ = writeln!(out, "No manga added yet. Use `mangafetch add` to add some.");
        return out;
    }

    let _ = writeln!(out, "Your Manga List:");
    let _ = writeln!(out, "{}", "-".repeat(50));
    for source in sources {
        let _ = writeln!(
            out,
            "ID: {}, Name: {}, Status: {}",
            source.id,
            source.name,
            if source.is_active { "Active" } else { "Inactive" }
        );
        let _ = writeln!(out, "URL: {}", source.url);
        let _ = writeln!(out, "Selector ({}): {}", source.selector_kind(), source.selector);
        let _ = writeln!(out, "{}", "-".repeat(50));
    }

    out
}
