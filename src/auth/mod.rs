//! Authentication and authorization core: credential checks at login, token issue and
//! verification, and the gate that guards every protected route.

pub mod credentials;
pub mod gate;
pub mod tokens;

pub use credentials::{user_identity, verify_credentials};
pub use gate::{AuthorizationDecision, Capability, Gate, Rejection, authorize, gated};
pub use tokens::{Claims, IssuedToken, TokenIssuer, TokenVerifier};
