//! # Function Host Test Utilities
//!
//! Shared test utilities for the function host.
//!
//! This crate provides:
//! - Fixed RSA signing keys with matching JWKs (`TestSigningKey`)
//! - Token claim builders (`TestClaims`) and tampering helpers
//! - A JWKS endpoint mock with swappable key sets (`MockJwksServer`)
//! - Server test harness (`TestFunctionHost` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fh_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let key = TestSigningKey::primary();
//!     let jwks = MockJwksServer::start(&[&key]).await;
//!     let host = TestFunctionHost::spawn(&[("JWKS_URL", &jwks.url())]).await?;
//!
//!     let token = key.sign(&TestClaims::valid().to_json());
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/test-auth", host.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod jwks_mock;
pub mod keys;
pub mod server_harness;
pub mod tokens;

// Re-export commonly used items
pub use jwks_mock::*;
pub use keys::*;
pub use server_harness::*;
pub use tokens::*;
