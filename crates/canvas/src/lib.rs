//! Canvas store implementations for plancanvas.

pub mod in_memory;

pub use in_memory::InMemoryCanvas;
