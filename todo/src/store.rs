//! Store wiring for the to-do list.

use crate::action::TodoAction;
use crate::environment::TodoEnvironment;
use crate::error::{RefreshError, ValidationError};
use crate::middleware::LogoutMiddleware;
use crate::reducer::TodoReducer;
use crate::types::{TodoId, TodoState};
use statecraft_runtime::middleware::TracingMiddleware;
use statecraft_runtime::{Store, StoreConfig, StoreError};
use std::time::Duration;

/// The to-do store
pub type TodoStore = Store<TodoState, TodoAction, TodoEnvironment, TodoReducer>;

/// Open a store with an empty list
///
/// Links, outermost first: [`TracingMiddleware`], [`LogoutMiddleware`].
/// A `FetchAll` is dispatched before the store is returned; await
/// [`Store::ready`] to wait for its result.
///
/// # Errors
///
/// Returns an error if the initial `FetchAll` is refused, which only
/// happens when the reducer is broken.
pub async fn open_store(env: TodoEnvironment, config: StoreConfig) -> Result<TodoStore, StoreError<ValidationError>> {
    let store = Store::builder(TodoState::new(), TodoReducer::new(), env)
        .middleware(TracingMiddleware::new("todo"))
        .middleware(LogoutMiddleware)
        .init_action(TodoAction::FetchAll)
        .config(config)
        .build()
        .await?;

    tracing::info!("Todo store open");
    Ok(store)
}

/// Add an item and return its id
///
/// # Errors
///
/// Returns [`StoreError::Rejected`] if the title is blank.
pub async fn add_item(store: &TodoStore, title: impl Into<String>) -> Result<TodoId, StoreError<ValidationError>> {
    let action = TodoAction::add(title);
    let id = action.added_id().cloned().unwrap_or_default();
    store.send(action).await?;
    Ok(id)
}

/// Fetch again and wait for the result
///
/// Returns the number of items in the list once this fetch's result has
/// been dispatched. Results of other fetches, such as the init fetch, are
/// ignored. If a `Logout` abandoned the fetch, its result is dropped and
/// the count reflects the cleared list.
///
/// # Errors
///
/// - [`RefreshError::Source`]: the data source failed after retries
/// - [`RefreshError::Store`]: the store is shutting down or no result
///   arrived within `timeout`
pub async fn refresh(store: &TodoStore, timeout: Duration) -> Result<usize, RefreshError> {
    let outcome = store
        .send_and_correlate(
            TodoAction::FetchAll,
            |state| {
                let ticket = state.last_ticket();
                move |action: &TodoAction| ticket.is_some_and(|ticket| action.fetch_ticket() == Some(ticket))
            },
            timeout,
        )
        .await?;

    match outcome {
        TodoAction::FetchFailed { error, .. } => Err(RefreshError::Source(error)),
        _ => Ok(store.state(|state| state.items.len())),
    }
}
