//! Router Module Index
//!
//! Routes are grouped by the capability they demand. Each group is wrapped by the
//! authorization gate as a whole in `create_router`, so the requirement is visible in
//! one place and no handler can be mounted without it by accident.

/// Routes accessible without a token: health check and the two login entry points.
pub mod public;

/// Routes behind the `AuthenticatedAny` gate.
pub mod authenticated;

/// Routes behind the `AuthenticatedAdmin` gate, nested under `/api/admin`.
pub mod admin;
