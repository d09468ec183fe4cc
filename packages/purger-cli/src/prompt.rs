//! Terminal prompts backed by dialoguer.

use std::path::Path;

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use purger::{guard::format_timestamp, DuplicatePrompt, SubjectRecord};

/// Asks at the terminal before purging a client again.
pub struct TerminalPrompt;

impl DuplicatePrompt for TerminalPrompt {
    fn confirm(&self, subject_key: &str, record: &SubjectRecord, notice_path: &Path) -> bool {
        println!(
            "{}",
            style(format!(
                "Client {} already purged on {} (sequence {}, by {}).",
                subject_key,
                format_timestamp(&record.timestamp),
                record.sequence_id,
                record.operator
            ))
            .yellow()
        );
        println!("Duplicate notice saved at {}", notice_path.display());

        // A closed terminal counts as "no"
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Override and purge again?")
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}
