//! Relay pipeline: transform, dispatch, and routing.

pub mod dispatch;
pub mod relay;
pub mod transform;

pub use dispatch::Dispatcher;
pub use relay::RelayEngine;
pub use transform::{ContentTransformer, NameMaps};
