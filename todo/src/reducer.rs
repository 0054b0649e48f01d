//! Reducer for the to-do list.
//!
//! Validation happens before any write, and every rejected action returns a
//! [`ValidationError`]. Actions that target a missing id are no-ops.

use crate::action::TodoAction;
use crate::environment::TodoEnvironment;
use crate::error::{DataSourceError, ValidationError};
use crate::types::{FetchTicket, TodoId, TodoItem, TodoState};
use statecraft_core::{async_effect, effect::Effect, effects, reducer::Reducer, Effects};
use statecraft_runtime::retry::retry_with_predicate;
use std::collections::HashSet;
use std::sync::Arc;

/// Reducer for [`TodoState`]
#[derive(Clone, Debug, Default)]
pub struct TodoReducer;

impl TodoReducer {
    /// Creates a new `TodoReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn require_title(action: &TodoAction, title: &str) -> Result<(), ValidationError> {
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle { action: action.kind() });
        }
        Ok(())
    }

    fn fetch(ticket: FetchTicket, env: &TodoEnvironment) -> Effect<TodoAction> {
        let source = Arc::clone(&env.source);
        let retry = env.retry.clone();

        async_effect! {
            let fetched = retry_with_predicate(
                &retry,
                || source.fetch_all_items(),
                DataSourceError::is_transient,
            )
            .await;

            Some(match fetched {
                Ok(items) => TodoAction::FetchLoaded { ticket, items },
                Err(error) => TodoAction::FetchFailed { ticket, error },
            })
        }
    }

    /// Append the fetched items that are not already present
    fn merge_fetched(state: &mut TodoState, items: Vec<TodoItem>) -> usize {
        let mut known: HashSet<TodoId> = state.items.iter().map(|item| item.id.clone()).collect();
        let before = state.items.len();
        state
            .items
            .extend(items.into_iter().filter(|item| known.insert(item.id.clone())));
        state.items.len() - before
    }
}

impl Reducer for TodoReducer {
    type State = TodoState;
    type Action = TodoAction;
    type Environment = TodoEnvironment;
    type Error = ValidationError;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<Effects<Self::Action>, Self::Error> {
        match action {
            TodoAction::FetchAll => {
                let ticket = state.issue_ticket();
                tracing::debug!(%ticket, "Fetch started");
                Ok(effects![Self::fetch(ticket, env)])
            },

            TodoAction::Add(ref item) => {
                Self::require_title(&action, &item.title)?;
                // Ids are retired on use, so a replayed Add cannot revive a deleted item
                if state.contains(&item.id) || !state.added_ids.insert(item.id.clone()) {
                    return Err(ValidationError::DuplicateId(item.id.clone()));
                }
                state.items.insert(0, TodoItem::with_id(item.id.clone(), item.title.clone()));
                Ok(effects![])
            },

            TodoAction::Edit(ref item) => {
                Self::require_title(&action, &item.title)?;
                match state.position(&item.id) {
                    Some(index) => state.items[index] = item.clone(),
                    None => tracing::debug!(id = %item.id, "Edit target not found"),
                }
                Ok(effects![])
            },

            TodoAction::Delete { id } => {
                match state.position(&id) {
                    Some(index) => {
                        state.items.remove(index);
                    },
                    None => tracing::debug!(%id, "Delete target not found"),
                }
                Ok(effects![])
            },

            TodoAction::ToggleDone { id } => {
                match state.position(&id) {
                    Some(index) => state.items[index] = state.items[index].toggled(),
                    None => tracing::debug!(%id, "Toggle target not found"),
                }
                Ok(effects![])
            },

            TodoAction::Logout => {
                let abandoned = state.pending_fetches.len();
                *state = state.with_items_cleared();
                if abandoned > 0 {
                    tracing::debug!(abandoned, "Pending fetches abandoned");
                }
                Ok(effects![])
            },

            TodoAction::FetchLoaded { ticket, items } => {
                if !state.pending_fetches.remove(&ticket) {
                    tracing::debug!(%ticket, "Dropping stale fetch result");
                    return Ok(effects![]);
                }
                let received = items.len();
                let appended = Self::merge_fetched(state, items);
                tracing::debug!(%ticket, received, appended, "Fetch applied");
                Ok(effects![])
            },

            TodoAction::FetchFailed { ticket, error } => {
                if state.pending_fetches.remove(&ticket) {
                    tracing::warn!(%ticket, error = %error, "Fetch failed, items unchanged");
                } else {
                    tracing::debug!(%ticket, "Dropping stale fetch failure");
                }
                Ok(effects![])
            },
        }
    }
}
