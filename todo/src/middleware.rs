//! Middleware links for the to-do store.

use crate::action::TodoAction;
use crate::reducer::TodoReducer;
use crate::types::TodoState;
use statecraft_core::middleware::{Middleware, Next, Proceeded};
use std::sync::Arc;

/// Hands the reducer an already cleared state on `Logout`
///
/// Every other action passes through untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogoutMiddleware;

impl Middleware<TodoReducer> for LogoutMiddleware {
    fn handle(&self, state: Arc<TodoState>, action: TodoAction, next: Next<'_, TodoReducer>) -> Proceeded<TodoReducer> {
        if matches!(action, TodoAction::Logout) {
            tracing::debug!(items = state.items.len(), "Clearing state for logout");
            return next.run(Arc::new(state.with_items_cleared()), action);
        }
        next.run(state, action)
    }
}
