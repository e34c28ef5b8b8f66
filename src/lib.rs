pub mod core;
pub mod orchestration;
pub mod plugins;
pub mod security;

pub use crate::core::*;
pub use crate::orchestration::{
    NonInteractivePrompt, PublishOptions, PublishOrchestrator, StdinPrompt,
};
pub use crate::plugins::{CommandBuilder, ConfigRegistry, DistPublisher, ProjectManifest};
pub use crate::security::{CommandError, SafeCommandExecutor, SecretMasker};
