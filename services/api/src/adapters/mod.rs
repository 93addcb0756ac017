pub mod memory;
pub mod seed;

pub use memory::MemoryRepository;
