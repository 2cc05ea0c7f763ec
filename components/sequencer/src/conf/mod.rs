mod conf;
pub use conf::*;

mod errors;
pub use errors::*;
