pub mod catalog;
pub mod config;
pub mod session;
pub mod stats;
