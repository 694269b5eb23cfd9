pub mod cache;
pub mod config;
pub mod contacts;
pub mod db;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod notify;
pub mod probe;
pub mod retention;
pub mod services;
pub mod stats;
pub mod store;
pub mod trigger;

pub use config::Config;
pub use error::{Error, Result};
