pub mod binding;
pub mod config;
pub mod engine;
pub mod fixtures;
pub mod journal;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod wire;
