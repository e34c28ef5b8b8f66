//! HTTP upload of distribution files
//!
//! Speaks the legacy upload protocol: one multipart POST per file with
//! `:action=file_upload`, the package metadata, a sha256 digest and the file
//! itself as `content`.

use super::manifest::{ArtifactKind, ProjectManifest};
use crate::core::traits::Credentials;
use anyhow::Context;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Everything sent for one file, prepared before any network access
#[derive(Debug)]
pub struct UploadForm {
    pub file_name: String,
    pub fields: Vec<(&'static str, String)>,
    pub content: Vec<u8>,
}

impl UploadForm {
    /// Read `file` and compute the form fields
    pub async fn prepare(file: &Path, manifest: &ProjectManifest) -> anyhow::Result<Self> {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("{} is not a file", file.display()))?;

        let kind = ArtifactKind::from_file_name(&file_name)
            .with_context(|| format!("Unknown distribution type: {}", file_name))?;

        let content = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;

        let sha256_digest = hex::encode(Sha256::digest(&content));

        let fields = vec![
            (":action", "file_upload".to_string()),
            ("protocol_version", "1".to_string()),
            ("name", manifest.name.clone()),
            ("version", manifest.version.clone()),
            ("filetype", kind.filetype().to_string()),
            ("pyversion", kind.pyversion(&file_name)),
            ("sha256_digest", sha256_digest),
        ];

        Ok(Self {
            file_name,
            fields,
            content,
        })
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    fn into_multipart(self) -> anyhow::Result<Form> {
        let mut form = Form::new();
        for (key, value) in self.fields {
            form = form.text(key, value);
        }

        let part = Part::bytes(self.content)
            .file_name(self.file_name)
            .mime_str("application/octet-stream")?;

        Ok(form.part("content", part))
    }
}

/// HTTP client bound to one repository URL
pub struct Uploader {
    url: String,
    client: reqwest::Client,
    credentials: Credentials,
}

impl Uploader {
    /// Build the client, loading the CA and client certificates if given
    pub fn new(
        url: &str,
        credentials: Credentials,
        cert: Option<&Path>,
        client_cert: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .user_agent(concat!("dist-publisher/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none());

        if let Some(cert) = cert {
            let pem = std::fs::read(cert)
                .with_context(|| format!("Failed to read certificate {}", cert.display()))?;
            let certificate = reqwest::Certificate::from_pem(&pem)
                .with_context(|| format!("Invalid certificate {}", cert.display()))?;
            builder = builder.add_root_certificate(certificate);
        }

        if let Some(client_cert) = client_cert {
            let pem = std::fs::read(client_cert).with_context(|| {
                format!("Failed to read client certificate {}", client_cert.display())
            })?;
            let identity = reqwest::Identity::from_pem(&pem).with_context(|| {
                format!("Invalid client certificate {}", client_cert.display())
            })?;
            builder = builder.identity(identity);
        }

        Ok(Self {
            url: url.to_string(),
            client: builder.build()?,
            credentials,
        })
    }

    /// Upload one prepared file
    pub async fn upload(&self, form: UploadForm) -> anyhow::Result<()> {
        let file_name = form.file_name.clone();
        let mut request = self.client.post(&self.url).multipart(form.into_multipart()?);

        if !self.credentials.is_empty() {
            request = request.basic_auth(
                self.credentials.username.clone().unwrap_or_default(),
                self.credentials
                    .password
                    .as_ref()
                    .map(|p| p.expose_secret().to_string()),
            );
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to upload {}", file_name))?;

        let status = response.status();
        tracing::debug!(file = %file_name, %status, "upload response");
        let body = response.text().await.unwrap_or_default();

        check_response(status, &body)
    }
}

/// Map an upload response to success or a descriptive error
pub fn check_response(status: StatusCode, body: &str) -> anyhow::Result<()> {
    if status.is_success() {
        return Ok(());
    }

    if status.is_redirection() {
        anyhow::bail!(
            "HTTP {}: redirects are not supported. Is the repository URL missing a trailing slash?",
            status.as_u16()
        );
    }

    if status == StatusCode::FORBIDDEN {
        anyhow::bail!("HTTP 403: invalid or non-existent authentication information");
    }

    let detail: String = body.trim().chars().take(200).collect();
    if detail.is_empty() {
        anyhow::bail!("HTTP {}", status);
    }
    anyhow::bail!("HTTP {}: {}", status, detail)
}
