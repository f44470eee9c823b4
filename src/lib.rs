//! In-memory IPv4 routing table for a software router.
//!
//! [`routes::RouteTable`] stores forwarding entries, folds entries that share
//! a next hop into supernets, keeps the longest prefixes first and resolves
//! destinations by longest prefix match. [`service::RouteService`] hosts a
//! table behind the [`module::Module`] lifecycle.

pub mod config;
pub mod error;
pub mod module;
pub mod routes;
pub mod service;

pub use error::{RouterError, RouterResult};
pub use routes::{RouteEntry, RouteTable};
pub use service::RouteService;
