//! FreshMart Core - Shared domain types.
//!
//! This crate provides the types shared by every FreshMart component:
//! - `storefront` - The grocery store web application
//! - `cli` - Command-line tools for migrations, seeding and reports
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP. The shopping cart lives here because it is a value carried
//! in the session, not a stored entity.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, emails, prices, and the session cart

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
