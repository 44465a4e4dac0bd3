//! # Holders
//!
//! Two ownership-managing handles over heap-allocated resources.
//!
//! ## Handles
//!
//! 1. **`ExclusiveHolder<T>`** - exactly one owner, no copies, released once
//! 2. **`SharedHolder<T>`** - reference counted, released by the last owner
//! 3. **`SyncSharedHolder<T>`** - the shared holder with an atomic count
//!
//! Both holders report an empty dereference as `HolderError::NullDereference`
//! through `get`/`access`; the `*holder` syntax panics with the same message.
//!
//! ```
//! use holders::{ExclusiveHolder, HolderState, SharedHolder};
//!
//! let mut unique = ExclusiveHolder::new(1);
//! *unique += 1;
//! assert_eq!(*unique, 2);
//! unique.dispose();
//! unique.dispose();
//! assert_eq!(unique.state(), HolderState::Empty);
//!
//! let p: SharedHolder<i32> = SharedHolder::new(1);
//! let q = p.clone();
//! assert_eq!(q.count(), 2);
//! ```
//!
//! ## Running the demo
//!
//! ```bash
//! cargo run --bin holders-demo -- --scenario all
//! RUST_LOG=trace cargo run --bin holders-demo -- --scenario fanout --copies 3
//! ```

pub mod config;
pub mod counter;
pub mod error;
pub mod exclusive;
pub mod scenarios;
pub mod shared;
pub mod state;

pub use config::{ConfigError, DemoConfig};
pub use counter::{AtomicCount, LocalCount, RefCounter};
pub use error::HolderError;
pub use exclusive::ExclusiveHolder;
pub use scenarios::{Scenario, ScenarioError, ScenarioReport};
pub use shared::{SharedHolder, SyncSharedHolder};
pub use state::HolderState;
