//! Nature de Pierre Core - Shared domain types.
//!
//! This crate provides the types shared by all Nature de Pierre components:
//! - `storefront` - Public catalog, cart and checkout API
//! - `admin` - Backoffice API (products, categories, customers, orders)
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic (cart merging, VAT totals,
//! validation) - no I/O, no database access, no HTTP clients.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, VAT rates and statuses
//! - [`catalog`] - Products and categories
//! - [`customer`] - Customers, companies and addresses
//! - [`cart`] - Cart lines, merge rules and totals
//! - [`order`] - Orders and order items
//! - [`payment`] - Payment intents and provider events
//! - [`checkout`] - Checkout wizard payloads and step validation
//! - [`validation`] - Field-level validation errors
//! - [`pagination`] - Paged list responses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod customer;
pub mod order;
pub mod pagination;
pub mod payment;
pub mod types;
pub mod validation;

pub use types::*;
