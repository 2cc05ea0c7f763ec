mod coordinator;
pub use coordinator::*;

mod errors;
pub use errors::*;
