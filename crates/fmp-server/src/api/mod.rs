use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

pub mod routes;


pub fn routes() -> Router<Arc<AppState>> {
    routes::create_router()
}
