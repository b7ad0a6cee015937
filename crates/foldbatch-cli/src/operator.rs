//! Operator checkpoints: points where the run blocks until a human
//! confirms something only they can do (signing in, inspecting results).

use anyhow::{bail, Result};
use async_trait::async_trait;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

#[async_trait]
pub trait Operator: Send + Sync {
    /// Show `message` and wait for acknowledgment.
    async fn acknowledge(&self, message: &str) -> Result<()>;
}

/// Prompts on the terminal and waits for Enter.
pub struct ConsoleOperator;

#[async_trait]
impl Operator for ConsoleOperator {
    async fn acknowledge(&self, message: &str) -> Result<()> {
        let prompt = format!("  {message} [Enter] ");
        let line = tokio::task::spawn_blocking(move || -> Result<()> {
            let mut rl = DefaultEditor::new()?;
            match rl.readline(&prompt) {
                Ok(_) | Err(ReadlineError::Eof) => Ok(()),
                Err(ReadlineError::Interrupted) => bail!("interrupted at operator checkpoint"),
                Err(e) => Err(e.into()),
            }
        })
        .await?;
        line
    }
}

/// Never blocks; logs the checkpoint instead. Used with `--no-wait`.
pub struct Unattended;

#[async_trait]
impl Operator for Unattended {
    async fn acknowledge(&self, message: &str) -> Result<()> {
        tracing::info!(checkpoint = message, "Skipping operator checkpoint");
        Ok(())
    }
}
