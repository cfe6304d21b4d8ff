// doma-mock: In-process mock of the Doma console backend for tests and demos

mod handlers;
mod routes;
mod server;
mod state;
pub mod telemetry;

pub use server::{DEFAULT_SEED, MockServer};
pub use telemetry::{SeededTelemetry, TelemetrySource};
