pub mod admin;
pub mod aggregate;
pub mod config;
pub mod error;
pub mod evaluations;
pub mod output;
pub mod scoring;
pub mod store;
pub mod teams;

pub use error::{Error, Result};
