//! A utility crate containing implementations of various primitives light on dependencies.

pub mod stateless_reader;
