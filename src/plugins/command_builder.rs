//! Builder that runs the project's build front-end

use crate::core::traits::Builder;
use crate::security::SafeCommandExecutor;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Runs a configured build command from the project root
pub struct CommandBuilder {
    project_path: PathBuf,
    command: Vec<String>,
}

impl CommandBuilder {
    pub fn new<P: AsRef<Path>>(project_path: P, command: Vec<String>) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
            command,
        }
    }
}

#[async_trait]
impl Builder for CommandBuilder {
    async fn build(&self) -> anyhow::Result<()> {
        let Some((program, args)) = self.command.split_first() else {
            anyhow::bail!("build command is empty");
        };
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        println!("Building with `{}`", self.command.join(" "));

        let executor = SafeCommandExecutor::new(&self.project_path)?;
        let output = executor.execute(program, &args).await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            println!("  {}", line);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let status = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            anyhow::bail!("`{}` exited with {}: {}", program, status, stderr.trim());
        }

        tracing::info!(program, "build finished");
        Ok(())
    }
}
