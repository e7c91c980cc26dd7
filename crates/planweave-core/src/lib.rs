pub mod error;
pub mod hooks;
pub mod memory;
pub mod registry;
pub mod traits;
pub mod types;

pub use error::{EngineError, Result};
pub use hooks::{ExecutionHook, HookVerdict};
pub use memory::MemoryStore;
pub use registry::{ProviderRegistry, ToolFn, ToolSet};
pub use types::*;
