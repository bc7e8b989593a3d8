//! Local State
//!
//! Everything the tracker remembers between runs on this machine: confirmed
//! and pending read flags, theme choices and the GitHub token.

mod store;
mod types;

pub use store::{
    LocalStore, ACCENT_THEME_KEY, BG_THEME_KEY, PENDING_CHANGES_KEY, READ_STATUSES_KEY, TOKEN_KEY,
};
pub use types::{ReadMap, ReadState, ThemeSettings};
