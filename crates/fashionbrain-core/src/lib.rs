//! Core types and errors shared by the fashionbrain crates.
//!
//! - **Error types**: [`FashionBrainError`] and the [`Result`] alias
//! - **Wire types**: request and response bodies for the backend API
//!
//! This crate does no I/O. The resolver, the HTTP client and the CLI all
//! build on it.
//!
//! # Examples
//!
//! ```rust
//! use fashionbrain_core::{ActionRequest, ActionType};
//!
//! let action = ActionRequest::new(["p1", "p2"], ActionType::Save);
//! assert_eq!(action.product_ids, "p1,p2");
//! ```
//!
//! ```rust
//! use fashionbrain_core::{FashionBrainError, Result};
//!
//! fn fetch() -> Result<()> {
//!     Err(FashionBrainError::server(404, "Not Found"))
//! }
//!
//! assert_eq!(fetch().unwrap_err().status(), Some(404));
//! ```

pub mod error;
pub mod models;

pub use error::{FashionBrainError, Result};
pub use models::{
    AckResponse, ActionRequest, ActionResponse, ActionType, AuthSession, FeedResponse,
    LoginRequest, MeResponse, OnboardingRequest, Outfit, Product, RecommendRequest,
    RecommendResponse, SignupOutcome, SignupRequest, User,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{FashionBrainError, Result};
    pub use crate::models::{ActionType, AuthSession, SignupOutcome, User};
}
