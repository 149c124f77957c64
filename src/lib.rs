//! Keeps a personal list of restaurants in one JSON file and picks where to
//! eat.
//!
//! [`repository::Repository`] owns the file, [`validate`] gates what may be
//! written to it and [`service::Service`] is what the binaries talk to.

pub mod config;
pub mod data;
pub mod logging;
pub mod repository;
pub mod service;
pub mod validate;

pub use data::{Menu, Restaurant, RestaurantData, SaveRequest};
pub use repository::{InitOutcome, Repository, RepositoryError};
pub use service::Service;
pub use validate::ValidationError;
