//! Publisher for the files in the project's dist directory
//!
//! Resolves the target repository, fills in certificates and stored
//! credentials the request left out, then uploads over HTTP or copies into a
//! local directory repository.

use super::config_registry::DEFAULT_REPOSITORY;
use super::manifest::{ProjectManifest, list_dist_artifacts};
use super::uploader::{UploadForm, Uploader};
use crate::core::traits::{
    ArtifactSet, Credentials, PublishRequest, Publisher, RepositoryEntry, RepositoryKind,
    RepositoryRegistry,
};
use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Publishes the artifacts of one project release
pub struct DistPublisher {
    manifest: ProjectManifest,
    project_path: PathBuf,
    dist_dir: PathBuf,
    registry: Arc<dyn RepositoryRegistry>,
}

impl DistPublisher {
    /// `dist_dir` and relative `local` repository paths are resolved against
    /// `project_path`
    pub fn new<P: AsRef<Path>, D: AsRef<Path>>(
        manifest: ProjectManifest,
        project_path: P,
        dist_dir: D,
        registry: Arc<dyn RepositoryRegistry>,
    ) -> Self {
        let project_path = project_path.as_ref().to_path_buf();
        Self {
            manifest,
            dist_dir: project_path.join(dist_dir),
            project_path,
            registry,
        }
    }

    /// Credentials from the request, or the repository's stored ones when
    /// the request has none
    fn effective_credentials(request: &PublishRequest, entry: &RepositoryEntry) -> Credentials {
        if request.credentials.is_empty() {
            entry.stored_credentials().cloned().unwrap_or_default()
        } else {
            request.credentials.clone()
        }
    }

    async fn upload_http(
        &self,
        entry: &RepositoryEntry,
        request: &PublishRequest,
        files: &[PathBuf],
    ) -> anyhow::Result<()> {
        let cert = request.cert.as_ref().or(entry.cert.as_ref());
        let client_cert = request.client_cert.as_ref().or(entry.client_cert.as_ref());

        let uploader = Uploader::new(
            &entry.url,
            Self::effective_credentials(request, entry),
            cert.map(PathBuf::as_path),
            client_cert.map(PathBuf::as_path),
        )?;

        for file in files {
            let form = UploadForm::prepare(file, &self.manifest).await?;

            if request.dry_run {
                println!(" - Uploading {} (dry run)", form.file_name);
                continue;
            }

            let file_name = form.file_name.clone();
            uploader.upload(form).await?;
            println!(" - Uploading {} OK", file_name);
        }

        Ok(())
    }

    async fn copy_local(
        &self,
        entry: &RepositoryEntry,
        request: &PublishRequest,
        files: &[PathBuf],
    ) -> anyhow::Result<()> {
        let target_dir = self.project_path.join(&entry.url);

        if !request.dry_run {
            tokio::fs::create_dir_all(&target_dir)
                .await
                .with_context(|| format!("Failed to create {}", target_dir.display()))?;
        }

        for file in files {
            let file_name = file
                .file_name()
                .with_context(|| format!("{} is not a file", file.display()))?;
            let target = target_dir.join(file_name);

            tokio::fs::metadata(file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;

            if target.exists() {
                anyhow::bail!("{} already exists in {}", file_name.to_string_lossy(), target_dir.display());
            }

            if request.dry_run {
                println!(" - Copying {} (dry run)", file_name.to_string_lossy());
                continue;
            }

            tokio::fs::copy(file, &target)
                .await
                .with_context(|| format!("Failed to copy {} to {}", file.display(), target.display()))?;
            println!(" - Copying {} OK", file_name.to_string_lossy());
        }

        Ok(())
    }
}

#[async_trait]
impl Publisher for DistPublisher {
    async fn list_artifacts(&self) -> anyhow::Result<ArtifactSet> {
        let files = list_dist_artifacts(&self.dist_dir, &self.manifest)?;
        Ok(ArtifactSet::new(files))
    }

    async fn publish(&self, request: &PublishRequest) -> anyhow::Result<()> {
        let name = request
            .repository_name
            .as_deref()
            .unwrap_or(DEFAULT_REPOSITORY);
        let entry = self
            .registry
            .lookup(name)
            .with_context(|| format!("No repository named {} found", name))?;

        let files = list_dist_artifacts(&self.dist_dir, &self.manifest)?;

        println!(
            "Publishing {} ({}) to {}{}",
            self.manifest.name,
            self.manifest.version,
            entry.name,
            if request.dry_run { " (dry run)" } else { "" }
        );
        tracing::info!(
            repository = %entry.name,
            url = %entry.url,
            files = files.len(),
            dry_run = request.dry_run,
            "publishing"
        );

        match entry.kind {
            RepositoryKind::Http => self.upload_http(&entry, request, &files).await,
            RepositoryKind::Local => self.copy_local(&entry, request, &files).await,
        }
    }
}
