//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup, in declaration order)
//!     → matcher.rs (evaluate match conditions)
//!     → matched Route's handler, or the next pipeline stage
//!
//! Route Compilation (at startup):
//!     handlers::routes(files root)
//!     → Router with routes in precedence order
//!     → Freeze inside the shared Pipeline
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (exact and prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins

pub mod matcher;
pub mod router;

pub use router::{Route, Router};
