//! # Kind Filters
//!
//! Selects which notifications a subscription receives.

use shared_types::{EventKind, Notification};
use std::collections::HashSet;

/// Filter for subscribing to specific event kinds.
#[derive(Debug, Clone, Default)]
pub struct KindFilter {
    /// Kinds to include. Empty means all kinds.
    pub kinds: HashSet<EventKind>,
    /// Only generic notifications (no correlation id attached).
    pub generic_only: bool,
}

impl KindFilter {
    /// Create a filter that accepts all notifications.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific kinds.
    #[must_use]
    pub fn kinds<I, K>(kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<EventKind>,
    {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
            generic_only: false,
        }
    }

    /// Restrict to generic notifications.
    #[must_use]
    pub fn generic(mut self) -> Self {
        self.generic_only = true;
        self
    }

    /// Check if a notification matches this filter.
    #[must_use]
    pub fn matches(&self, notification: &Notification) -> bool {
        let kind_match = self.kinds.is_empty() || self.kinds.contains(&notification.kind);
        let scope_match = !self.generic_only || notification.is_generic();

        kind_match && scope_match
    }
}
