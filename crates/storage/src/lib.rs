#![forbid(unsafe_code)]

pub mod config;
pub mod envelope;
pub mod http;
pub mod repository;

pub use config::{ConfigError, StoreConfig};
pub use http::HttpProgressStore;
pub use repository::{CourseListing, InMemoryProgressStore, ProgressStore, StoreError};
