//! HTML rendering
//!
//! Produces the tracker page served by the web front-end. Each row carries the
//! manga id in a `data-manga-id` attribute; [`parse_row_ids`] reads them back.

use super::{format_checked, EMPTY_PLACEHOLDER};
use crate::catalog::{Catalog, CatalogStatus, TrackedItem};
use crate::state::{ReadState, ThemeSettings};
use regex::Regex;
use std::fmt::Write;
use std::sync::OnceLock;

/// Escape text for element content and double-quoted attributes
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Only http(s) links are rendered as anchors
fn safe_href(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Some(escape_html(trimmed))
    } else {
        None
    }
}

/// Render one table row
pub fn render_row(item: &TrackedItem, read: &ReadState) -> String {
    let is_read = read.is_read(item);
    let mut classes = Vec::new();
    if is_read {
        classes.push("is-read");
    }
    if read.is_pending(item.id) {
        classes.push("is-pending");
    }

    let chapter = match &item.latest_chapter {
        Some(chapter) => {
            let text = escape_html(&chapter.text);
            match chapter.url.as_deref().and_then(safe_href) {
                Some(href) => format!(
                    r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
                    href, text
                ),
                None => text,
            }
        }
        None => "N/A".to_string(),
    };

    let source = match item.source_url.as_deref().and_then(safe_href) {
        Some(href) => format!(
            r#"<a href="{}" target="_blank" rel="noopener noreferrer">Source Page</a>"#,
            href
        ),
        None => "N/A".to_string(),
    };

    format!(
        concat!(
            r#"<tr data-manga-id="{id}" class="{classes}">"#,
            "<td>{title}</td>",
            "<td>{chapter}<br><small>Checked: {checked}</small></td>",
            "<td>{source}</td>",
            r#"<td><button class="btn btn-read" data-id="{id}">{action}</button></td>"#,
            "</tr>"
        ),
        id = item.id,
        classes = classes.join(" "),
        title = escape_html(&item.title),
        chapter = chapter,
        checked = escape_html(&format_checked(item.last_updated_at)),
        source = source,
        action = if is_read { "Mark Unread" } else { "Mark Read" },
    )
}

/// Render the table body: one row per item, or the placeholder row
pub fn render_rows(catalog: &Catalog, read: &ReadState) -> String {
    if catalog.items.is_empty() {
        let mut body = format!(
            r#"<tr class="placeholder"><td colspan="4">{}</td></tr>"#,
            escape_html(EMPTY_PLACEHOLDER)
        );
        if let CatalogStatus::Unreadable(reason) = &catalog.status {
            let _ = write!(
                body,
                r#"<tr class="placeholder notice"><td colspan="4">Catalog could not be read: {}</td></tr>"#,
                escape_html(reason)
            );
        }
        return body;
    }

    catalog
        .items
        .iter()
        .map(|item| render_row(item, read))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the full tracker page
pub fn render_page(catalog: &Catalog, read: &ReadState, theme: &ThemeSettings) -> String {
    let pending = read.pending_count();
    let update_label = if pending > 0 {
        format!(
            "Update List ({} change{})",
            pending,
            if pending > 1 { "s" } else { "" }
        )
    } else {
        "Update List".to_string()
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en" data-theme="{accent}" data-bg-theme="{background}">
<head>
<meta charset="utf-8">
<title>Manga Tracker</title>
<style>{style}</style>
</head>
<body>
<h1>Manga Tracker</h1>
<section id="controls">
  <button id="update-read-status-button" class="btn{has_changes}"{disabled}>{update_label}</button>
  <span id="update-status-message"></span>
</section>
<table>
<thead><tr><th>Title</th><th>Latest Chapter</th><th>Source</th><th>Status</th></tr></thead>
<tbody id="manga-table-body">
{rows}
</tbody>
</table>
<form id="add-manga-form">
  <input id="manga-name" name="name" placeholder="Manga name" required>
  <input id="manga-url" name="url" placeholder="https://..." required>
  <input id="manga-selector" name="selector" placeholder="Chapter selector" required>
  <label><input type="radio" name="selector-type" value="css" checked> CSS</label>
  <label><input type="radio" name="selector-type" value="xpath"> XPath</label>
  <button type="submit" class="btn">Add Manga</button>
  <div id="token-error-message"></div>
</form>
<script>{script}</script>
</body>
</html>
"#,
        accent = escape_html(&theme.accent),
        background = escape_html(&theme.background),
        style = PAGE_STYLE,
        has_changes = if pending > 0 { " has-changes" } else { "" },
        disabled = if pending > 0 { "" } else { " disabled" },
        update_label = update_label,
        rows = render_rows(catalog, read),
        script = PAGE_SCRIPT,
    )
}

/// Recover manga ids from rendered rows, in document order
pub fn parse_row_ids(html: &str) -> Vec<u64> {
    static ROW_ID: OnceLock<Regex> = OnceLock::new();
    let re = ROW_ID.get_or_init(|| {
        Regex::new(r#"<tr data-manga-id="(\d+)""#).expect("row id pattern is valid")
    });

    re.captures_iter(html)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

const PAGE_STYLE: &str = r#"
body { font-family: sans-serif; margin: 2rem; }
table { border-collapse: collapse; width: 100%; }
td, th { border-bottom: 1px solid #ccc; padding: .5rem; text-align: left; }
tr.is-read { opacity: .55; }
tr.is-pending td:first-child::after { content: " *"; }
.btn.has-changes { font-weight: bold; }
"#;

const PAGE_SCRIPT: &str = r#"
async function call(method, url, body) {
  const res = await fetch(url, {method, headers: {'Content-Type': 'application/json'}, body: body ? JSON.stringify(body) : undefined});
  const data = await res.json().catch(() => ({}));
  if (!res.ok) throw new Error((data.error && data.error.message) || res.statusText);
  return data;
}
document.getElementById('manga-table-body').addEventListener('click', async (e) => {
  if (!e.target.classList.contains('btn-read')) return;
  await call('POST', `/api/v1/manga/${e.target.dataset.id}/toggle`);
  location.reload();
});
document.getElementById('update-read-status-button').addEventListener('click', async () => {
  const msg = document.getElementById('update-status-message');
  msg.textContent = 'Committing changes to GitHub...';
  try { await call('POST', '/api/v1/flush'); location.reload(); }
  catch (err) { msg.textContent = `Error: ${err.message}`; }
});
document.getElementById('add-manga-form').addEventListener('submit', async (e) => {
  e.preventDefault();
  const f = e.target;
  const msg = document.getElementById('token-error-message');
  try {
    await call('POST', '/api/v1/sources', {
      name: document.getElementById('manga-name').value,
      url: document.getElementById('manga-url').value,
      selector: document.getElementById('manga-selector').value,
      use_xpath: f.querySelector('input[name="selector-type"]:checked').value === 'xpath'
    });
    msg.textContent = 'Manga added successfully to GitHub!';
    f.reset();
  } catch (err) { msg.textContent = `Error: ${err.message}`; }
});
"#;
