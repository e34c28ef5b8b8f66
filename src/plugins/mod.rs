pub mod command_builder;
pub mod config_registry;
pub mod dist_publisher;
pub mod manifest;
pub mod uploader;

pub use command_builder::CommandBuilder;
pub use config_registry::{ConfigRegistry, DEFAULT_REPOSITORY, DEFAULT_REPOSITORY_URL};
pub use dist_publisher::DistPublisher;
pub use manifest::{ArtifactKind, ProjectManifest};
pub use uploader::{UploadForm, Uploader};
