//! Layered resource resolution for BioWare Aurora engine games.

pub mod engine;
pub mod format;
pub mod options;
pub mod progress;
pub mod resource;
