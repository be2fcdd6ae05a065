//! API route handlers

pub mod events;
pub mod health;
pub mod history;
pub mod monitor;
pub mod settings;
pub mod status;
pub mod watchlist;
