pub mod dto;
pub mod handlers;
pub mod invoice;
pub mod number;
pub mod policy;
pub mod pricing;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
