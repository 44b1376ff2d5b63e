//! # Pepega - a minimal Wayland shared-memory client
//!
//! Opens one xdg-shell top-level, paints a blue/green gradient into an
//! ARGB8888 buffer backed by anonymous shared memory and repaints on every
//! frame callback and resize.
//!
//! ## Architecture
//!
//! - `shm`: anonymous POSIX shared memory regions
//! - `buffer`: mapped pixel buffers and their layout
//! - `render`: the gradient renderer
//! - `presenter`: the display-server operations the session relies on
//! - `session`: window state machine and buffer lifecycle
//! - `client`: Wayland connection, globals and protocol dispatch
//! - `event_loop`: blocking dispatch until the window closes
//! - `teardown`: ordered release of the window and connection
//! - `config`: configuration parsing and management
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pepega::{client::WaylandClient, event_loop};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut client = WaylandClient::connect(1367, 768)?;
//!     event_loop::run(&mut client)?;
//!     client.shutdown()
//! }
//! ```

pub mod buffer;
pub mod client;
pub mod config;
pub mod event_loop;
pub mod presenter;
pub mod render;
pub mod session;
pub mod shm;
pub mod teardown;

pub use buffer::{BufferError, BufferLayout, PixelBuffer};
pub use config::PepegaConfig;
pub use presenter::Presenter;
pub use session::{Session, SessionEvent, SessionState};
pub use shm::ShmError;

// Re-export common error types
pub use anyhow::{Context, Error, Result};

/// Version information for Pepega
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
