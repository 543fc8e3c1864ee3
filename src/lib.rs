pub mod config;
pub mod edges;
pub mod error;
pub mod fetch;
pub mod index;
pub mod infra;
pub mod land;
pub mod locator;
pub mod nodes;
pub mod output;
pub mod pipeline;
pub mod records;
pub mod services;
