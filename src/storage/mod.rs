pub mod db;
mod files;
mod jobs;
pub mod models;
mod tables;
mod users;

pub use db::{Database, DatabaseError};
pub use tables::*;
