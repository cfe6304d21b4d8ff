// doma-api: Async Rust client for the Doma smart-home console API

pub mod client;
pub mod error;
pub mod model;
pub mod session;
pub mod types;

pub use client::ConsoleClient;
pub use error::Error;
pub use session::SessionHandle;
