pub mod api;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod fare;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod services;
