// Core library modules
pub mod annotation;
pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod holidays;
pub mod resolver;
pub mod sunset;
pub mod weather;

pub use error::{Error, Result};
