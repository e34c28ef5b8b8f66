//! Confirmation prompts

use crate::core::traits::Prompt;
use async_trait::async_trait;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Asks on stdout and reads the answer from stdin
///
/// `y`/`yes` (any case) confirm, an empty answer takes the default,
/// anything else declines.
pub struct StdinPrompt;

impl StdinPrompt {
    fn interpret(answer: &str, default: bool) -> bool {
        let answer = answer.trim().to_lowercase();
        if answer.is_empty() {
            return default;
        }
        answer == "yes" || answer == "y"
    }
}

#[async_trait]
impl Prompt for StdinPrompt {
    async fn confirm(&self, question: &str, default: bool) -> anyhow::Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let mut stdout = io::stdout();
        stdout
            .write_all(format!("{} {} ", question, hint).as_bytes())
            .await?;
        stdout.flush().await?;

        let mut reader = BufReader::new(io::stdin());
        let mut answer = String::new();
        if reader.read_line(&mut answer).await? == 0 {
            // stdin closed
            return Ok(default);
        }

        Ok(Self::interpret(&answer, default))
    }
}

/// Answers every question with its default, for `--no-interaction` and CI
pub struct NonInteractivePrompt;

#[async_trait]
impl Prompt for NonInteractivePrompt {
    async fn confirm(&self, question: &str, default: bool) -> anyhow::Result<bool> {
        tracing::info!(question, default, "non-interactive, using default answer");
        Ok(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpret_answers() {
        assert!(StdinPrompt::interpret("y\n", false));
        assert!(StdinPrompt::interpret("YES", false));
        assert!(!StdinPrompt::interpret("n", true));
        assert!(!StdinPrompt::interpret("maybe", true));
    }

    #[test]
    fn test_interpret_empty_answer_uses_default() {
        assert!(StdinPrompt::interpret("\n", true));
        assert!(!StdinPrompt::interpret("  ", false));
    }

    #[tokio::test]
    async fn test_non_interactive_prompt_returns_default() {
        let prompt = NonInteractivePrompt;
        assert!(!prompt.confirm("Build anyway?", false).await.unwrap());
        assert!(prompt.confirm("Continue?", true).await.unwrap());
    }
}
