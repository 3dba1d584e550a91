pub mod search;
pub mod system;

pub use search::*;
pub use system::*;
