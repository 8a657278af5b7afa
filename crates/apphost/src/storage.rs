pub mod memory;
pub mod session_store;

pub use memory::MemorySessionStorage;
pub use session_store::{SessionStorage, StorageError};
