// src/infrastructure/mod.rs
pub mod chain;
pub mod llm;
pub mod market;
pub mod notify;
pub mod persistence;
pub mod routing;
