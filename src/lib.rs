//! farmsync: copy farmOS areas into a local SQLite database.

pub mod config;
pub mod db;
pub mod farmos;
pub mod models;
pub mod sync;
