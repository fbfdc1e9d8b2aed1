//! Backend-for-frontend: the dashboard's auth routes and session cookies.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
