mod core;
mod directory;
mod phase;
mod stream;

pub use self::core::{ExecutorConfig, TurnExecutor, DEFAULT_RECURSION_LIMIT};
pub use directory::ThreadDirectory;
pub use phase::{tools_condition, Phase};
pub use stream::{TurnEvent, TurnStream};
