// src/models/mod.rs
pub mod channel;
pub mod project;

pub use channel::*;
pub use project::*;
