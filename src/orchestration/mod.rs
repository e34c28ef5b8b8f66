//! Orchestration layer for the publish command
//!
//! This module sequences the build, artifact, credential and upload steps
//! over the collaborators defined in [`crate::core::traits`].

pub mod credentials;
pub mod prompt;
pub mod publish_command;

// Re-export main types for convenience
pub use credentials::{CredentialLookup, lookup_credentials, resolve_credentials};
pub use prompt::{NonInteractivePrompt, StdinPrompt};
pub use publish_command::{PublishOptions, PublishOrchestrator};
