#[macro_use]
extern crate quick_error;

#[macro_use]
extern crate slog;

mod errors;
pub use errors::*;

mod node;
pub use node::*;

pub mod setup;
