// src/lib.rs
pub mod analysis;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod util;
