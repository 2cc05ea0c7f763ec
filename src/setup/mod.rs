mod setup;
pub use setup::*;

mod log_format;
pub use log_format::*;

#[cfg(test)]
mod test_format;
