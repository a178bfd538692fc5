#![forbid(unsafe_code)]

//! Search box and "unfinished only" toggle of the todo list.

use std::sync::Arc;

use settle_core::{Clock, Debouncer, Instant};

use crate::config::FormConfig;
use crate::model::TodoItem;

/// Debounced search over a list of tasks.
///
/// The term matches case-sensitively against the name or the description.
/// An empty term matches everything.
pub struct TodoFilter {
    term: Debouncer<String>,
    only_unfinished: bool,
    clock: Arc<dyn Clock>,
}

impl TodoFilter {
    /// Empty filter with the configured search delay.
    #[must_use]
    pub fn new(config: &FormConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            term: Debouncer::new(String::new(), config.filter_debounce),
            only_unfinished: false,
            clock,
        }
    }

    /// Type into the search box.
    pub fn set_term(&mut self, term: impl Into<String>) {
        let now = self.clock.now();
        self.set_term_at(term, now);
    }

    /// Type into the search box at `now`.
    pub fn set_term_at(&mut self, term: impl Into<String>, now: Instant) {
        self.term.push_at(term.into(), now);
    }

    /// Publish the search term if its quiet period is over.
    ///
    /// Returns whether the term the list filters by changed.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now();
        self.tick_at(now)
    }

    /// Like [`tick`](Self::tick), at `now`.
    pub fn tick_at(&mut self, now: Instant) -> bool {
        self.term.tick_at(now).is_some()
    }

    /// The term the list is currently filtered by.
    #[must_use]
    pub fn term(&self) -> &str {
        self.term.value()
    }

    /// When the pending term publishes, if one is pending.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.term.deadline()
    }

    /// Whether finished tasks are hidden.
    #[must_use]
    pub fn only_unfinished(&self) -> bool {
        self.only_unfinished
    }

    /// Flip the "unfinished only" toggle. Takes effect immediately.
    pub fn toggle_only_unfinished(&mut self) {
        self.only_unfinished = !self.only_unfinished;
    }

    /// Whether `item` passes the filter.
    #[must_use]
    pub fn matches(&self, item: &TodoItem) -> bool {
        if self.only_unfinished && item.is_finished() {
            return false;
        }
        let term = self.term.value();
        item.name.contains(term.as_str())
            || item
                .description
                .as_deref()
                .is_some_and(|d| d.contains(term.as_str()))
    }

    /// The items that pass the filter, in their original order.
    #[must_use]
    pub fn apply<'a>(&self, items: &'a [TodoItem]) -> Vec<&'a TodoItem> {
        items.iter().filter(|item| self.matches(item)).collect()
    }

    /// Stop publishing search terms.
    pub fn teardown(&mut self) {
        self.term.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use settle_core::ManualClock;
    use std::time::Duration;

    fn item(name: &str, description: Option<&str>, finished: bool) -> TodoItem {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        TodoItem {
            id: name.to_string(),
            user: "u".into(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: at,
            updated_at: at,
            finished_at: finished.then_some(at),
            deadline: None,
        }
    }

    fn items() -> Vec<TodoItem> {
        vec![
            item("Buy milk", None, false),
            item("Call mom", Some("about milk"), true),
            item("Write report", Some("quarterly"), false),
        ]
    }

    fn names(filtered: Vec<&TodoItem>) -> Vec<&str> {
        filtered.into_iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn empty_term_matches_everything() {
        let filter = TodoFilter::new(&FormConfig::default(), Arc::new(ManualClock::new()));
        assert_eq!(filter.apply(&items()).len(), 3);
    }

    #[test]
    fn term_applies_after_quiet_period() {
        let clock = Arc::new(ManualClock::new());
        let mut filter = TodoFilter::new(&FormConfig::default(), clock.clone());
        filter.set_term("m");
        clock.advance_ms(50);
        filter.set_term("mi");
        clock.advance_ms(50);
        filter.set_term("milk");

        clock.advance_ms(149);
        assert!(!filter.tick());
        assert_eq!(filter.term(), "");
        assert_eq!(filter.next_deadline(), Some(clock.now() + Duration::from_millis(1)));

        clock.advance_ms(1);
        assert!(filter.tick());
        let list = items();
        assert_eq!(names(filter.apply(&list)), ["Buy milk", "Call mom"]);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let clock = Arc::new(ManualClock::new());
        let mut filter = TodoFilter::new(&FormConfig::default(), clock.clone());
        filter.set_term_at("Milk", clock.now());
        filter.tick_at(clock.now() + Duration::from_millis(150));
        assert!(filter.apply(&items()).is_empty());
    }

    #[test]
    fn toggle_hides_finished() {
        let mut filter = TodoFilter::new(&FormConfig::default(), Arc::new(ManualClock::new()));
        filter.toggle_only_unfinished();
        assert!(filter.only_unfinished());
        let list = items();
        assert_eq!(names(filter.apply(&list)), ["Buy milk", "Write report"]);
        filter.toggle_only_unfinished();
        assert_eq!(filter.apply(&list).len(), 3);
    }

    #[test]
    fn teardown_freezes_term() {
        let clock = Arc::new(ManualClock::new());
        let mut filter = TodoFilter::new(&FormConfig::default(), clock.clone());
        filter.set_term("x");
        filter.teardown();
        clock.advance_ms(1000);
        assert!(!filter.tick());
        assert_eq!(filter.term(), "");
    }
}
