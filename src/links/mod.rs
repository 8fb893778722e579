//! Channel link model and routing table.

pub mod registry;
pub mod types;

pub use registry::{LinkRegistry, LinkTable, VerificationReport, VerifyScope};
pub use types::{BroadMentionPermission, ChatLink, Link, LinkKind, SyncDirection};
