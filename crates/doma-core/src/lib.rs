//! Reactive state layer between `doma-api` and console front ends.
//!
//! This crate owns the optimistic-mutation machinery of the Doma
//! workspace:
//!
//! - **Stores** ([`store`]) -- One per resource family: devices,
//!   scenes, homes, security, guests, telemetry, and the session. Each
//!   pairs a [`ConsoleClient`] with watch-channel snapshots; fetches
//!   replace state wholesale, mutations stage drafts that settle when
//!   the backend answers.
//!
//! - **[`MutationTicket`]** -- Handle for one in-flight mutation.
//!   [`outcome()`](MutationTicket::outcome) resolves to
//!   [`MutationState::Applied`] or [`MutationState::Reverted`] once the
//!   backend has spoken; drafts are visible in snapshots immediately.
//!
//! - **[`Freshness`]** -- Per-collection fetch provenance. A failed
//!   refresh keeps the previous snapshot and flips the cell to
//!   [`Freshness::Stale`] with the rendered error.
//!
//! - **[`CoreError`]** -- Consumer-facing failures; wire-level errors
//!   from `doma-api` are translated on the way up.
//!
//! The wire model re-exports from [`doma_api`]: [`model`] for domain
//! types, [`types`] for request and response envelopes.

pub mod error;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use doma_api::{model, types, ConsoleClient, SessionHandle};
pub use error::CoreError;
pub use store::{
    DeviceStore, Freshness, GuestStore, HomeStore, Identity, MutationState, MutationTicket,
    PollHandle, SceneStore, SecurityStore, SessionStore, SnapshotStream, Subscription,
    TelemetryStore, DEFAULT_POLL_INTERVAL, SCENE_ACTIVE_RESET,
};
