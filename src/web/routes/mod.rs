//! Web Routes
//!
//! Route handlers organized by functionality.

pub mod health;
pub mod manga;
pub mod settings;
pub mod sources;
