//! Implement support for the container formats the games ship their resources in.

pub mod erf;
pub mod pe;
pub mod zip;

#[cfg(test)]
pub(crate) mod test_util;
