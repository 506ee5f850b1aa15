//! Update options, modes and results.

use std::fmt;

use bson::{Bson, Document};

/// Execution flags for update terminals.
///
/// `UpdateOptions::new()` leaves every decision to the engine defaults:
/// return the document as it was before the update, no upsert, no removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Return the modified document instead of the original (find-and-modify).
    pub return_new: bool,
    /// Insert a document when nothing matches.
    pub upsert: bool,
    /// Remove the matched document instead of updating it (find-and-modify).
    pub remove: bool,
    /// Skip document validation on the server.
    pub bypass_document_validation: Option<bool>,
}

impl UpdateOptions {
    /// Engine defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the modified document.
    pub fn return_new(mut self, return_new: bool) -> Self {
        self.return_new = return_new;
        self
    }

    /// Insert when nothing matches.
    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    /// Remove the matched document.
    pub fn remove(mut self, remove: bool) -> Self {
        self.remove = remove;
        self
    }

    /// Skip server side validation.
    pub fn bypass_document_validation(mut self, bypass: bool) -> Self {
        self.bypass_document_validation = Some(bypass);
        self
    }
}

/// Which update terminal was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateMode {
    /// Update a single document and return it.
    FindAndModify,
    /// Update every matching document.
    All,
    /// Update at most one matching document.
    First,
    /// Update at most one document, inserting when nothing matches.
    Upsert,
}

impl UpdateMode {
    /// Short name used in logs and error contexts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FindAndModify => "findAndModify",
            Self::All => "all",
            Self::First => "first",
            Self::Upsert => "upsert",
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateResult {
    /// Number of documents matched by the filter.
    pub matched_count: u64,
    /// Number of documents actually changed.
    pub modified_count: u64,
    /// Id of the inserted document, when an upsert inserted one.
    pub upserted_id: Option<Bson>,
}

impl UpdateResult {
    /// Whether an upsert inserted a new document.
    pub fn was_upserted(&self) -> bool {
        self.upserted_id.is_some()
    }
}

/// What an engine answers to an update command.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// Find-and-modify result; `None` when nothing matched.
    Document(Option<Document>),
    /// Summary of an `all`, `first` or `upsert` update.
    Summary(UpdateResult),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = UpdateOptions::new();
        assert!(!options.return_new);
        assert!(!options.upsert);
        assert!(!options.remove);
        assert_eq!(options.bypass_document_validation, None);
    }

    #[test]
    fn test_options_builder() {
        let options = UpdateOptions::new()
            .return_new(true)
            .upsert(true)
            .bypass_document_validation(true);
        assert!(options.return_new);
        assert!(options.upsert);
        assert_eq!(options.bypass_document_validation, Some(true));
    }

    #[test]
    fn test_was_upserted() {
        let result = UpdateResult {
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(Bson::Int32(1)),
        };
        assert!(result.was_upserted());
        assert!(!UpdateResult::default().was_upserted());
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(UpdateMode::FindAndModify.to_string(), "findAndModify");
        assert_eq!(UpdateMode::Upsert.to_string(), "upsert");
    }
}
