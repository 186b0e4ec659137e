//! Console front end

mod cli;

pub use cli::*;
