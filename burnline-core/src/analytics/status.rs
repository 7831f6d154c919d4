//! Status classification.
//!
//! Status ids are team-defined and can be deleted; categories are fixed.
//! Everything downstream reasons about categories only.

use crate::analytics::AnalyticsSource;
use crate::error::Result;
use crate::types::{ActivityRecord, Status, StatusCategory};
use std::collections::HashMap;

/// One side of a status transition, resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classified<'a> {
    /// The field had no value
    Absent,
    /// The id resolves to a category
    Known(StatusCategory),
    /// The id no longer resolves (status deleted, or schema drift)
    Unresolved(&'a str),
}

/// A status change with both sides resolved. `None` means the side was absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: Option<StatusCategory>,
    pub to: Option<StatusCategory>,
}

impl StatusTransition {
    /// Whether the story moved into a category matching `pred`.
    pub fn entered(&self, pred: impl Fn(StatusCategory) -> bool) -> bool {
        let was = self.from.map(&pred).unwrap_or(false);
        let is = self.to.map(&pred).unwrap_or(false);
        !was && is
    }

    /// Whether the story moved out of a category matching `pred`.
    pub fn exited(&self, pred: impl Fn(StatusCategory) -> bool) -> bool {
        let was = self.from.map(&pred).unwrap_or(false);
        let is = self.to.map(&pred).unwrap_or(false);
        was && !is
    }
}

/// Maps status ids to categories.
#[derive(Debug, Clone, Default)]
pub struct StatusClassifier {
    categories: HashMap<String, StatusCategory>,
}

impl StatusClassifier {
    pub fn new(statuses: impl IntoIterator<Item = Status>) -> Self {
        Self {
            categories: statuses
                .into_iter()
                .map(|s| (s.id, s.category))
                .collect(),
        }
    }

    /// Build a classifier from every status the source knows about.
    pub fn load<S: AnalyticsSource + ?Sized>(source: &S) -> Result<Self> {
        let statuses = source.fetch_statuses()?;
        tracing::debug!(count = statuses.len(), "Loaded status categories");
        Ok(Self::new(statuses))
    }

    /// Category for a status id, if it still exists.
    pub fn resolve(&self, status_id: &str) -> Option<StatusCategory> {
        self.categories.get(status_id).copied()
    }

    pub fn classify<'a>(&self, value: Option<&'a str>) -> Classified<'a> {
        match value {
            None => Classified::Absent,
            Some(id) => match self.resolve(id) {
                Some(category) => Classified::Known(category),
                None => Classified::Unresolved(id),
            },
        }
    }

    /// Resolve both sides of a status record.
    ///
    /// Returns the first unresolved id as the error; such records contribute
    /// nothing to completion math.
    pub fn transition<'a>(
        &self,
        record: &'a ActivityRecord,
    ) -> std::result::Result<StatusTransition, &'a str> {
        let side = |value: Option<&'a str>| match self.classify(value) {
            Classified::Absent => Ok(None),
            Classified::Known(category) => Ok(Some(category)),
            Classified::Unresolved(id) => Err(id),
        };

        Ok(StatusTransition {
            from: side(record.old_value.as_deref())?,
            to: side(record.new_value.as_deref())?,
        })
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
