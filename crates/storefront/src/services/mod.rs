//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Signup, login and profile updates
//! - `checkout` - Turning a session cart into an order

pub mod auth;
pub mod checkout;
