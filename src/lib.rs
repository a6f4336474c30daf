//! SQLite data access for the bakery: users, their orders, cookies and the
//! line items that tie orders to cookies.
//!
//! # Intention
//!
//! - Declare the four tables once and create them idempotently at start-up.
//! - Expose plain functions for every read and write, each taking the
//!   connection (or open [`UnitOfWork`]) explicitly.
//! - Keep money exact: costs are [`rust_decimal::Decimal`] end to end.
//!
//! # Architectural Boundaries
//!
//! - Only SQLite/database code belongs here.
//! - No business logic beyond what the rows themselves require (password
//!   hashing, cost normalisation, timestamps).

pub mod config;
pub mod error;
pub mod models;
pub mod numeric;
pub mod operations;
pub mod password;
pub mod queries;
pub mod schema;
pub mod store;

pub use config::StoreConfig;
pub use error::{ConstraintKind, Result, StoreError};
pub use models::{
    Cookie, CookieStock, LineItem, NewCookie, NewLineItem, NewOrder, NewRecord, NewUser, Order,
    OrderLine, User, Value,
};
pub use queries::{CookieStream, JoinOrdering};
pub use store::{Store, UnitOfWork};
