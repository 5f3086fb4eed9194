use std::sync::Arc;

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::Extension;
use tower_http::cors::{Any, CorsLayer};

mod api;
mod checkout;
mod database;
mod docs;
mod env;
mod error;
mod mail;
mod models;
mod request_state;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let app_state = database::AppState::connect(env::DATABASE_URL.as_str()).await;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut open_api = OpenApi::default();
    let app = ApiRouter::new()
        .nest_api_service("/docs", docs::docs_routes())
        .merge(api::router(app_state))
        .finish_api_with(&mut open_api, docs::api_docs)
        .layer(Extension(Arc::new(open_api)))
        .layer(cors);

    let address = format!("{}:{}", env::HOST.as_str(), *env::PORT);
    log::info!("Starting pos-server on {address}");

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .expect("bind server address");
    axum::serve(listener, app.into_make_service())
        .await
        .expect("run server");
}
