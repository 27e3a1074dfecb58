//! Bearer token authentication for the function host.
//!
//! # Components
//!
//! - `jwks` - signing key set cache over the identity platform's JWKS endpoint
//! - `jwt` - RS256 signature and claim verification for one token
//! - `claims` - verified claims handed to handlers
//! - `authorizer` - the full pipeline and the authorization decision

pub mod authorizer;
pub mod claims;
pub mod jwks;
pub mod jwt;

pub use authorizer::{AuthorizationResult, AuthorizerSettings, TokenAuthorizer};
pub use claims::{Audience, TokenClaims};
pub use jwks::{HttpKeySetSource, KeySetCache, KeySetSource, SigningKey};
