pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod services;
pub mod state;

// Convenient re-exports (so call sites can do `rpgcog::Registry`, etc.)
pub use error::{AppResult, DomainError};
pub use state::registry::Registry;
