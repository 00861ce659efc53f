pub mod config;
pub mod error;
pub mod db;
pub mod jsonl;
pub mod text;
pub mod store;
pub mod search;
pub mod eval;
pub mod curate;

pub use config::Config;
pub use error::{QacurateError, Result};
