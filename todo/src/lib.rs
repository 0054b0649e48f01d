//! To-do list state container.
//!
//! A single [`TodoStore`] owns the list. Callers change it only by sending
//! [`TodoAction`]s, which pass through the middleware chain
//! ([`TracingMiddleware`](statecraft_runtime::middleware::TracingMiddleware),
//! then [`LogoutMiddleware`]) before [`TodoReducer`] produces the next
//! snapshot. Views read the list through the [`selectors`] and subscribe to
//! changes of a selector's output.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use statecraft_runtime::StoreConfig;
//! use todo::{open_store, selectors, InMemoryDataSource, TodoAction, TodoEnvironment};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let env = TodoEnvironment::new(Arc::new(InMemoryDataSource::default()));
//! let store = open_store(env, StoreConfig::default()).await?;
//! store.ready().await;
//!
//! let _sub = store.subscribe(selectors::incomplete_count, |left| println!("{left} left"));
//!
//! let add = TodoAction::add("Walk dog");
//! let id = add.added_id().cloned().unwrap_or_default();
//! store.send(add).await?;
//! store.send(TodoAction::ToggleDone { id }).await?;
//!
//! println!("{} items", store.state(|s| s.items.len()));
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod environment;
pub mod error;
pub mod middleware;
pub mod reducer;
pub mod selectors;
pub mod store;
pub mod types;

pub use action::{NewItem, TodoAction};
pub use environment::{DataSource, InMemoryDataSource, TodoEnvironment};
pub use error::{DataSourceError, RefreshError, ValidationError};
pub use middleware::LogoutMiddleware;
pub use reducer::TodoReducer;
pub use store::{add_item, open_store, refresh, TodoStore};
pub use types::{FetchTicket, TodoId, TodoItem, TodoPatch, TodoState};
