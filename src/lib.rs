//! Food donation reservation server.
//!
//! Businesses list surplus food at their locations; individuals reserve it
//! for pickup. The core guarantees that stock is never over-reserved and
//! that every reservation's quantities are released or consumed exactly
//! once, whether it is canceled, expires or is picked up.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Storage**: PostgreSQL with sqlx, or an in-memory store
//! - **Identity**: trusted `X-User-Id` / `X-Business-Id` headers
//! - **Format**: JSON requests/responses

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{clock::Clock, store::Store};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

/// Build the HTTP router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        // Locations and pickup points
        .route("/api/v1/locations", post(handlers::locations::create_location))
        .route(
            "/api/v1/locations/{location_id}",
            delete(handlers::locations::delete_location),
        )
        .route(
            "/api/v1/locations/{location_id}/archive",
            post(handlers::locations::archive_location),
        )
        .route(
            "/api/v1/locations/{location_id}/pickup-points",
            post(handlers::locations::add_pickup_point),
        )
        // Food items
        .route(
            "/api/v1/locations/{location_id}/food-items",
            get(handlers::food_items::list_food_items).post(handlers::food_items::create_food_item),
        )
        .route(
            "/api/v1/locations/{location_id}/food-items/{id}",
            put(handlers::food_items::update_food_item)
                .delete(handlers::food_items::delete_food_item),
        )
        .route(
            "/api/v1/locations/{location_id}/food-items/{id}/archive",
            post(handlers::food_items::archive_food_item),
        )
        // Reservations
        .route(
            "/api/v1/reservations",
            post(handlers::reservations::create_reservation)
                .get(handlers::reservations::list_reservations),
        )
        .route(
            "/api/v1/reservations/{id}",
            get(handlers::reservations::get_reservation)
                .delete(handlers::reservations::cancel_reservation),
        )
        .route(
            "/api/v1/reservations/{id}/pickup",
            post(handlers::reservations::pick_up_reservation),
        )
        // Every API route needs a caller identity
        .route_layer(axum_middleware::from_fn(
            middleware::caller::caller_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(api_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
