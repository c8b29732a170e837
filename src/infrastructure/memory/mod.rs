//! Memory Layer - In-Memory Resource Management
//!
//! 实现临时资源句柄注册表

mod handle_registry;

pub use handle_registry::InMemoryHandleRegistry;
