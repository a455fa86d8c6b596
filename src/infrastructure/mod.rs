pub mod config;
pub mod repositories;
