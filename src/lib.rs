pub mod access;
pub mod applications;
pub mod auth;
pub mod config;
pub mod db;
pub mod enums;
pub mod error;
pub mod filters;
pub mod models;
pub mod routes;
pub mod schema;
pub mod state;
pub mod storage;
pub mod utils;
pub mod validation;
