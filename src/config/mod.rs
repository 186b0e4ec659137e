//! Configuration loading, defaults and validation

mod settings;
#[cfg(test)]
mod tests;

pub use settings::*;
