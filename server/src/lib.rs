pub mod config;
pub mod error;
pub mod history;
pub mod page;
pub mod pipeline;
pub mod routes;
pub mod validation;

pub use routes::{app, AppState};
