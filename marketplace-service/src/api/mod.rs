use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod commissions;
pub mod complaints;
pub mod coupons;
pub mod feedback;
pub mod payments;
pub mod qualification;
pub mod services;
pub mod webhooks;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/services", get(services::list).post(services::create))
        .route(
            "/services/:id",
            get(services::get).put(services::update).delete(services::deactivate),
        )
        .route("/bookings", post(bookings::create).get(bookings::list))
        .route("/bookings/:id", get(bookings::get))
        .route("/bookings/:id/accept", post(bookings::accept))
        .route("/bookings/:id/complete", post(bookings::complete))
        .route("/bookings/:id/cancel", post(bookings::cancel))
        .route("/coupons", get(coupons::list).post(coupons::create))
        .route("/coupons/preview", post(coupons::preview))
        .route(
            "/coupons/:id",
            axum::routing::put(coupons::update).delete(coupons::deactivate),
        )
        .route(
            "/commissions",
            get(commissions::list).post(commissions::create),
        )
        .route(
            "/commissions/:id",
            axum::routing::put(commissions::update).delete(commissions::deactivate),
        )
        .route("/payments/order", post(payments::create_order))
        .route("/payments/verify", post(payments::verify))
        .route("/webhooks/payment", post(webhooks::payment_webhook))
        .route("/feedback", post(feedback::create).get(feedback::list))
        .route(
            "/complaints",
            post(complaints::create).get(complaints::list),
        )
        .route("/complaints/:id/resolve", post(complaints::resolve))
        .route("/complaints/:id/dismiss", post(complaints::dismiss))
        .route(
            "/provider/tests/:category/start",
            post(qualification::start_attempt),
        )
        .route(
            "/provider/tests/attempts/:id/submit",
            post(qualification::submit_attempt),
        )
        .route(
            "/provider/tests/attempts",
            get(qualification::list_attempts),
        )
        .route("/admin/providers", get(admin::list_providers))
        .route(
            "/admin/providers/:id/approve",
            post(admin::approve_provider),
        )
        .route("/admin/users", get(admin::list_users))
        .route("/admin/transactions", get(admin::list_transactions))
        .route("/admin/earnings", get(admin::list_earnings))
        .route("/admin/payouts/run", post(admin::run_payouts));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

pub async fn health_check() -> &'static str {
    "OK"
}
