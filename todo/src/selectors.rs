//! Selectors over [`TodoState`].
//!
//! Plain functions; any `Fn(&TodoState) -> T` is a
//! [`Selector`](statecraft_core::selector::Selector).

use crate::types::{TodoId, TodoItem, TodoState};

/// Every item, in list order
#[must_use]
pub fn all_items(state: &TodoState) -> Vec<TodoItem> {
    state.items.clone()
}

/// Number of items not yet done
#[must_use]
pub fn incomplete_count(state: &TodoState) -> usize {
    state.items.iter().filter(|item| !item.done).count()
}

/// Selector for a single item, `None` while it does not exist
pub fn item_by_id(id: TodoId) -> impl Fn(&TodoState) -> Option<TodoItem> + Send + Sync + 'static {
    move |state| state.get(&id).cloned()
}
