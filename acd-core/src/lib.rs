pub mod bank;
pub mod config;
pub mod core;
pub mod dev;
