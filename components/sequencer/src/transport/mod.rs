mod transport;
pub use transport::*;

mod mem_hub;
pub use mem_hub::*;
