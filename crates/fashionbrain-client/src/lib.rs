//! HTTP client for the FashionBrain backend.
//!
//! [`ApiClient`] wraps two primitives, [`ApiClient::get`] and
//! [`ApiClient::post`], and builds typed endpoint helpers on top of them
//! (`signup`, `login`, `me`, `feed`, `record_action`, `complete_onboarding`,
//! `recommend`, `upload_image`).
//!
//! Every call:
//! - sends `Content-Type: application/json`, and `Authorization: Bearer …`
//!   only when a token is given (multipart uploads send their own content type);
//! - carries exactly one timeout (per-method budgets in [`ClientOptions`]);
//! - ends in one of: success, [`Timeout`], [`Network`], [`Server`] or [`Parse`].
//!
//! One rejection is recovered locally: a signup refused with a message
//! saying the email must be confirmed is returned as a success carrying
//! `requires_confirmation: true` and a placeholder user.
//!
//! [`Timeout`]: fashionbrain_core::FashionBrainError::Timeout
//! [`Network`]: fashionbrain_core::FashionBrainError::Network
//! [`Server`]: fashionbrain_core::FashionBrainError::Server
//! [`Parse`]: fashionbrain_core::FashionBrainError::Parse
//!
//! # Example
//!
//! ```no_run
//! use fashionbrain_client::{ApiClient, ClientOptions};
//! use fashionbrain_core::LoginRequest;
//!
//! # async fn demo() -> fashionbrain_core::Result<()> {
//! let client = ApiClient::new("http://localhost:8000", ClientOptions::default())?;
//! let session = client.login(&LoginRequest::new("a@b.com", "secret")).await?;
//! let feed = client.feed(&session.access_token, 10).await?;
//! println!("{} outfits", feed.outfits.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod paths;
mod response;

pub use api::UploadTarget;
pub use client::{ApiClient, ClientOptions};
