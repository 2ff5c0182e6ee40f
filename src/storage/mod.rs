pub mod engine;
pub mod memory;
pub mod table;

pub use engine::Store;
pub use memory::MemoryStore;
pub use table::Table;
