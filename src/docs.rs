use std::sync::Arc;

use aide::{
    axum::{
        routing::{get, get_with},
        ApiRouter, IntoApiResponse,
    },
    openapi::{OpenApi, Tag},
    redoc::Redoc,
    transform::TransformOpenApi,
};
use axum::{response::IntoResponse, Extension, Json};

pub fn api_docs(api: TransformOpenApi) -> TransformOpenApi {
    api.title("POS Server Open API")
        .summary("Point-of-sale backend")
        .description(include_str!("../README.md"))
        .tag(Tag {
            name: "auth".into(),
            description: Some("Login, registration and password reset".into()),
            ..Default::default()
        })
        .tag(Tag {
            name: "cashiers".into(),
            description: Some("Cashier account management".into()),
            ..Default::default()
        })
        .tag(Tag {
            name: "catalog".into(),
            description: Some("Categories and products".into()),
            ..Default::default()
        })
        .tag(Tag {
            name: "transactions".into(),
            description: Some("Transaction and payment recording".into()),
            ..Default::default()
        })
        .security_scheme(
            "SessionToken",
            aide::openapi::SecurityScheme::Http {
                scheme: "bearer".into(),
                bearer_format: Some("opaque session token".into()),
                description: Some("Session token created by a login.".into()),
                extensions: Default::default(),
            },
        )
}

pub fn docs_routes() -> ApiRouter {
    // We infer the return types for these routes
    // as an example.
    //
    // As a result, the `serve_redoc` route will
    // have the `text/html` content-type correctly set
    // with a 200 status.
    aide::gen::infer_responses(true);

    let router = ApiRouter::new()
        .api_route_with(
            "/",
            get_with(
                Redoc::new("/docs/api.json")
                    .with_title("pos-server")
                    .axum_handler(),
                |op| op.description("This documentation page."),
            ),
            |p| p.security_requirement("SessionToken"),
        )
        .route("/api.json", get(serve_docs));

    // Afterwards we disable response inference because
    // it might be incorrect for other routes.
    aide::gen::infer_responses(false);

    router
}

async fn serve_docs(Extension(api): Extension<Arc<OpenApi>>) -> impl IntoApiResponse {
    Json(api).into_response()
}
