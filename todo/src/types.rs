//! Domain types for the to-do list.
//!
//! Items are plain values: every update returns a new [`TodoItem`] and the
//! store swaps whole items in and out of [`TodoState`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Unique identifier for a to-do item
///
/// Locally created items get a v4 UUID. Items loaded from a data source keep
/// whatever id the source gave them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    /// Creates a new random `TodoId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TodoId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TodoId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TodoId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single to-do item
///
/// Equality is structural so that selectors notice a flipped `done` flag.
/// Use [`TodoItem::same_item`] to compare identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Unique identifier
    pub id: TodoId,
    /// What needs doing
    pub title: String,
    /// Whether the item is finished
    pub done: bool,
}

/// Field overrides for [`TodoItem::edited`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TodoPatch {
    /// New title, if any
    pub title: Option<String>,
    /// New completion flag, if any
    pub done: Option<bool>,
}

impl TodoPatch {
    /// A patch that only changes the title
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            done: None,
        }
    }
}

impl TodoItem {
    /// A fresh, unfinished item with a newly generated id
    #[must_use]
    pub fn create(title: impl Into<String>) -> Self {
        Self::with_id(TodoId::new(), title)
    }

    /// An unfinished item with a known id
    #[must_use]
    pub fn with_id(id: impl Into<TodoId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            done: false,
        }
    }

    /// Copy with `done` negated
    #[must_use]
    pub fn toggled(&self) -> Self {
        Self {
            done: !self.done,
            ..self.clone()
        }
    }

    /// Copy with the patched fields overwritten; the id never changes
    #[must_use]
    pub fn edited(&self, patch: TodoPatch) -> Self {
        Self {
            id: self.id.clone(),
            title: patch.title.unwrap_or_else(|| self.title.clone()),
            done: patch.done.unwrap_or(self.done),
        }
    }

    /// Whether `other` is the same item, whatever its fields
    #[must_use]
    pub fn same_item(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Identifies one outstanding fetch
///
/// Results are applied only while their ticket is pending, so a result that
/// lands after a logout is dropped instead of resurrecting items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FetchTicket(pub u64);

impl std::fmt::Display for FetchTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State of the to-do list
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoState {
    /// Items, newest first
    pub items: Vec<TodoItem>,
    /// Fetches whose results are still wanted
    pub pending_fetches: BTreeSet<FetchTicket>,
    /// Next ticket to hand out; never reused
    pub next_ticket: u64,
    /// Every id an `Add` has used, including deleted and logged-out items
    #[serde(default)]
    pub added_ids: BTreeSet<TodoId>,
}

impl TodoState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state holding `items`
    #[must_use]
    pub fn with_items(items: Vec<TodoItem>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    /// Copy with no items and no pending fetches
    ///
    /// The ticket counter and the added ids are kept so that neither is
    /// ever handed out twice.
    #[must_use]
    pub fn with_items_cleared(&self) -> Self {
        Self {
            items: Vec::new(),
            pending_fetches: BTreeSet::new(),
            next_ticket: self.next_ticket,
            added_ids: self.added_ids.clone(),
        }
    }

    /// Ticket issued by the most recent `FetchAll`
    #[must_use]
    pub fn last_ticket(&self) -> Option<FetchTicket> {
        self.next_ticket.checked_sub(1).map(FetchTicket)
    }

    /// Looks up an item by id
    #[must_use]
    pub fn get(&self, id: &TodoId) -> Option<&TodoItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Whether an item with `id` exists
    #[must_use]
    pub fn contains(&self, id: &TodoId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn position(&self, id: &TodoId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }

    pub(crate) fn issue_ticket(&mut self) -> FetchTicket {
        let ticket = FetchTicket(self.next_ticket);
        self.next_ticket += 1;
        self.pending_fetches.insert(ticket);
        ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_assigns_fresh_ids() {
        let first = TodoItem::create("Buy Milk");
        let second = TodoItem::create("Buy Milk");

        assert!(!first.done);
        assert_ne!(first.id, second.id);
        assert!(!first.same_item(&second));
    }

    #[test]
    fn toggled_flips_only_done() {
        let item = TodoItem::with_id("1", "Buy Milk");
        let toggled = item.toggled();

        assert!(toggled.done);
        assert!(toggled.same_item(&item));
        assert_eq!(toggled.title, item.title);
        assert_eq!(toggled.toggled(), item);
    }

    #[test]
    fn edited_keeps_id() {
        let item = TodoItem::with_id("1", "Buy Milk");
        let edited = item.edited(TodoPatch {
            title: Some("Buy Oat Milk".into()),
            done: Some(true),
        });

        assert_eq!(edited.id, item.id);
        assert_eq!(edited.title, "Buy Oat Milk");
        assert!(edited.done);
        assert_eq!(item.edited(TodoPatch::default()), item);
    }

    #[test]
    fn cleared_state_keeps_ticket_counter() {
        let mut state = TodoState::with_items(vec![TodoItem::with_id("1", "a")]);
        let ticket = state.issue_ticket();

        let cleared = state.with_items_cleared();

        assert!(cleared.items.is_empty());
        assert!(cleared.pending_fetches.is_empty());
        assert_eq!(cleared.next_ticket, ticket.0 + 1);
        assert_eq!(cleared.last_ticket(), Some(ticket));
        assert_eq!(TodoState::new().last_ticket(), None);
    }

    #[test]
    #[allow(clippy::unwrap_used)] // Panics: test fixture always serializes
    fn ids_serialize_as_plain_strings() {
        let item = TodoItem::with_id("1", "Buy Milk");
        let json = serde_json::to_string(&item).unwrap();

        assert_eq!(json, r#"{"id":"1","title":"Buy Milk","done":false}"#);
    }
}
