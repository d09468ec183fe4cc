//! Extracted rows and the units of work that produce them.

use indexmap::IndexMap;

/// One extracted row: field label to value, in page order.
pub type Record = IndexMap<String, String>;

/// A page (or other unit of work) handed to the extraction collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionUnit {
    /// Unit label, also used for the output file name
    pub name: String,

    /// Whether the first row of this unit carries the client's name
    pub names_subject: bool,
}

impl ExtractionUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            names_subject: false,
        }
    }

    /// Mark this unit as the source of the display name.
    pub fn naming_subject(mut self) -> Self {
        self.names_subject = true;
        self
    }

    /// File-system safe label (`/` is not allowed in file names).
    pub fn file_stem(&self) -> String {
        self.name.replace('/', "-")
    }
}

/// The standard page order for a client purge.
pub fn default_units() -> Vec<ExtractionUnit> {
    vec![
        ExtractionUnit::new("Client-Details").naming_subject(),
        ExtractionUnit::new("Package-Schedules"),
        ExtractionUnit::new("Notes"),
        ExtractionUnit::new("Info-Sheet"),
        ExtractionUnit::new("Agreement"),
        ExtractionUnit::new("Contacts"),
        ExtractionUnit::new("Support-Plan"),
        ExtractionUnit::new("Emergency-Plan"),
        ExtractionUnit::new("Documents"),
        ExtractionUnit::new("NDIS-Budget"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_units_order() {
        let units = default_units();
        assert_eq!(units.len(), 10);
        assert_eq!(units[0].name, "Client-Details");
        assert!(units[0].names_subject);
        assert!(units[1..].iter().all(|u| !u.names_subject));
        assert_eq!(units[9].name, "NDIS-Budget");
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(ExtractionUnit::new("Info/Sheet").file_stem(), "Info-Sheet");
    }
}
