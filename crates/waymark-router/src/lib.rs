//! # Waymark Router
//!
//! A client-side path router with support for:
//! - Static routes (`/about`)
//! - Named parameters (`/users/:id`) with custom patterns (`/post/:id(\d+)`)
//! - Optional and repeating parameters (`/opt/:x?`, `/files/:path*`, `/tags/:tag+`)
//! - Catch-all routes (`*`)
//! - Exit handlers that run against the page being left
//! - Path generation from patterns (the inverse of matching)
//!
//! ## Dispatch
//!
//! Every navigation builds a fresh [`Context`] and walks two middleware
//! chains: the exit chain with the previous context, then the entry chain
//! with the new one. Each middleware gets a one-shot [`Next`]; not calling it
//! claims the navigation. A navigation started while another one is still
//! dispatching supersedes it, and the older walk stops at its next step.
//!
//! When no route claims a path and the host location does not already show
//! it, the router stops and asks the [`Platform`] for a full page load.
//!
//! ## Host integration
//!
//! The router talks to its host only through [`Platform`]. [`MemoryPlatform`]
//! keeps everything in memory, which is what tests and headless use want.
//!
//! ## Example
//!
//! ```
//! use waymark_router::Router;
//!
//! let router = Router::new();
//! router
//!     .route("/users/:id", |ctx, _next| {
//!         assert_eq!(ctx.param("id").as_deref(), Some("123"));
//!     })
//!     .unwrap();
//!
//! let ctx = router.show("/users/123");
//! assert_eq!(ctx.handled(), Some(true));
//! assert_eq!(router.current(), "/users/123");
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

mod config;
mod context;
mod dispatch;
mod error;
pub mod path;
pub mod pattern;
mod platform;
mod route;
mod router;

pub use config::RouterConfig;
pub use context::{Context, ContextSettings, Params, State};
pub use dispatch::{Middleware, Next};
pub use error::{BuildError, PatternError, RouterError};
pub use pattern::{build_path, compile_pattern, CompiledPattern, PathBuilder, PatternOptions};
pub use platform::{Location, MemoryPlatform, Platform, PlatformEvent, Task};
pub use route::{Route, RouteMatch};
pub use router::{
    with_default_router, ReplaceOptions, Router, ShowOptions, StartOptions, WeakRouter,
};
