//! The action catalog.

use crate::error::DataSourceError;
use crate::types::{FetchTicket, TodoId, TodoItem};

/// Payload of [`TodoAction::Add`]
///
/// Only [`TodoAction::add`] creates one, so every added id is a fresh v4
/// UUID and callers cannot pick their own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewItem {
    pub(crate) id: TodoId,
    pub(crate) title: String,
}

impl NewItem {
    /// Id the item will get
    #[must_use]
    pub const fn id(&self) -> &TodoId {
        &self.id
    }

    /// Requested title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

/// Everything that can change a [`TodoState`](crate::types::TodoState)
///
/// The first six variants are requests from callers. `FetchLoaded` and
/// `FetchFailed` are fed back by the effect that a `FetchAll` starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TodoAction {
    /// Load every item from the data source and append the new ones
    FetchAll,

    /// Insert a new, unfinished item at the front of the list
    ///
    /// Build with [`TodoAction::add`]; the payload cannot be made elsewhere.
    Add(NewItem),

    /// Replace the item with the same id; title must not be blank
    Edit(TodoItem),

    /// Remove an item
    Delete {
        /// Item to remove
        id: TodoId,
    },

    /// Flip an item's `done` flag
    ToggleDone {
        /// Item to flip
        id: TodoId,
    },

    /// Clear every item and abandon outstanding fetches
    Logout,

    /// A fetch finished
    FetchLoaded {
        /// The fetch this result belongs to
        ticket: FetchTicket,
        /// What the source returned
        items: Vec<TodoItem>,
    },

    /// A fetch gave up
    FetchFailed {
        /// The fetch this result belongs to
        ticket: FetchTicket,
        /// Last error from the source
        error: DataSourceError,
    },
}

impl TodoAction {
    /// An `Add` with a freshly generated id
    ///
    /// ```
    /// use todo::TodoAction;
    ///
    /// let action = TodoAction::add("Buy Milk");
    /// assert!(matches!(action, TodoAction::Add(ref item) if item.title() == "Buy Milk"));
    /// ```
    #[must_use]
    pub fn add(title: impl Into<String>) -> Self {
        Self::Add(NewItem {
            id: TodoId::new(),
            title: title.into(),
        })
    }

    /// The id an `Add` will assign, so callers can refer to the new item
    #[must_use]
    pub const fn added_id(&self) -> Option<&TodoId> {
        match self {
            Self::Add(item) => Some(&item.id),
            _ => None,
        }
    }

    /// Catalog tag, as shown in logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::FetchAll => "[Todo] Fetch All",
            Self::Add(_) => "[Todo] Add",
            Self::Edit(_) => "[Todo] Edit",
            Self::Delete { .. } => "[Todo] Delete",
            Self::ToggleDone { .. } => "[Todo] Toggle Done",
            Self::Logout => "[Todo] Logout",
            Self::FetchLoaded { .. } => "[Todo] Fetch Loaded",
            Self::FetchFailed { .. } => "[Todo] Fetch Failed",
        }
    }

    /// Whether this action carries the outcome of a fetch
    #[must_use]
    pub const fn is_fetch_result(&self) -> bool {
        matches!(self, Self::FetchLoaded { .. } | Self::FetchFailed { .. })
    }

    /// The fetch a result belongs to
    #[must_use]
    pub const fn fetch_ticket(&self) -> Option<FetchTicket> {
        match self {
            Self::FetchLoaded { ticket, .. } | Self::FetchFailed { ticket, .. } => Some(*ticket),
            _ => None,
        }
    }
}
