//! crv: a terminal viewer for crime investigation records.
//!
//! The core is a small tabular pipeline:
//!
//! ```text
//! file text -> table::Table (header + padded rows)
//!           -> view::TableView (filtered row indices)
//!           -> session::Session (load / refresh / query)
//! ```
//!
//! `model`, `controller` and `ui` form the terminal front end on top of it,
//! gated by an `auth::Authenticator`.

pub mod auth;
pub mod controller;
pub mod domain;
pub mod inputter;
pub mod logging;
pub mod model;
pub mod session;
pub mod table;
pub mod ui;
pub mod view;
