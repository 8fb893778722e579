pub mod coordinator;
pub mod env;
pub mod parser;
pub mod types;
pub mod validate;

pub use coordinator::{CollectionChange, ConfigCoordinator, LifecycleState, RestartRequest};
pub use types::{ConfigData, ConfigSnapshot};
