//! Reactive resource stores.
//!
//! Each store pairs a [`ConsoleClient`](doma_api::ConsoleClient) with
//! watch-channel state: fetches replace snapshots wholesale, mutations
//! stage optimistic drafts and settle through the journal. Snapshots
//! are cheap `Arc` clones; subscribe to a store to re-render on change.

mod collection;
mod freshness;
mod journal;
mod subscription;

pub mod device;
pub mod guest;
pub mod home;
pub mod scene;
pub mod security;
pub mod session;
pub mod telemetry;

pub use device::DeviceStore;
pub use freshness::Freshness;
pub use guest::GuestStore;
pub use home::HomeStore;
pub use journal::{MutationState, MutationTicket};
pub use scene::{SceneStore, SCENE_ACTIVE_RESET};
pub use security::SecurityStore;
pub use session::{Identity, SessionStore};
pub use subscription::{SnapshotStream, Subscription};
pub use telemetry::{PollHandle, TelemetryStore, DEFAULT_POLL_INTERVAL};
