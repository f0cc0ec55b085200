//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Ctrl+C → Shutdown::trigger → stop accepting
//!            → idle connections close → wait for drain (bounded) → exit
//! ```
//!
//! # Design Decisions
//! - A connection in the middle of an exchange finishes it first
//! - Shutdown has timeout: the server returns after the grace period

pub mod shutdown;

pub use shutdown::Shutdown;
