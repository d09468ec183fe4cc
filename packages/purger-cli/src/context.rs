//! Shared state for purger commands

use std::sync::Arc;

use anyhow::{Context, Result};
use console::{style, StyledObject};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password};
use purger::{JsonFileStore, Ledger, PurgerConfig};

/// How a line of output should look.
#[derive(Debug, Clone, Copy)]
pub enum Tone {
    Heading,
    Good,
    Caution,
    Note,
}

impl Tone {
    fn paint<'a>(self, msg: &'a str) -> StyledObject<&'a str> {
        match self {
            Tone::Heading => style(msg).bold(),
            Tone::Good => style(msg).green(),
            Tone::Caution => style(msg).yellow(),
            Tone::Note => style(msg).cyan(),
        }
    }
}

/// Configuration, the opened ledger and terminal helpers.
///
/// In quiet mode nothing is printed and every prompt takes its default.
pub struct AppContext {
    pub quiet: bool,
    pub config: PurgerConfig,
    pub ledger: Arc<Ledger<JsonFileStore>>,
}

impl AppContext {
    pub fn new(quiet: bool) -> Result<Self> {
        let config = PurgerConfig::from_env().context("Failed to load configuration")?;
        let ledger = Arc::new(Ledger::open(config.ledger_path()));
        Ok(Self {
            quiet,
            config,
            ledger,
        })
    }

    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.quiet {
            return Ok(default);
        }
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(default)
            .interact()
            .context("Could not read confirmation")
    }

    /// Ask for a line of text, trimmed.
    pub fn input(&self, prompt: &str, default: &str) -> Result<String> {
        if self.quiet {
            return Ok(default.to_string());
        }
        let answer: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(default.to_string())
            .allow_empty(true)
            .interact_text()
            .context("Could not read input")?;
        Ok(answer.trim().to_string())
    }

    /// Read a secret without echo. Quiet mode yields an empty string.
    pub fn password(&self, prompt: &str) -> Result<String> {
        if self.quiet {
            return Ok(String::new());
        }
        Password::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .context("Could not read password")
    }

    pub fn say(&self, tone: Tone, msg: &str) {
        if self.quiet {
            return;
        }
        if matches!(tone, Tone::Heading) {
            println!();
        }
        println!("{}", tone.paint(msg));
    }

    /// Aligned `label: value` line for summaries.
    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        if !self.quiet {
            println!("  {:<18} {}", style(format!("{label}:")).dim(), value);
        }
    }
}
