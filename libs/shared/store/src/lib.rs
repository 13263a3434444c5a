pub mod clock;
pub mod memory;
pub mod notify;
pub mod repository;

pub use clock::*;
pub use memory::*;
pub use notify::*;
pub use repository::*;
