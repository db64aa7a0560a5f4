//! HTTP front end for the SiliconCloud stats dashboard.
//!
//! Accepts a session cookie and a day or month from the browser, fetches the
//! matching billing report upstream and returns it reshaped for charts and
//! tables. Nothing is stored server-side.

pub mod config;
pub mod error;
pub mod handlers;
pub mod server;
pub mod telemetry;

pub use config::Config;
pub use server::{build_router, AppState};
