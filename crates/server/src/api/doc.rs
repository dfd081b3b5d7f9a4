//! OpenAPI documentation aggregator, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Herald API",
        version = "0.1.0",
        description = "Alert routing configuration and notification delivery.",
    ),
    tags(
        (name = "Health", description = "Liveness, reload metrics and manual reload"),
        (name = "Routes", description = "Add, edit and delete notification channels"),
        (name = "Receivers", description = "Test delivery through a receiver"),
    ),
    paths(
        crate::api::status::health,
        crate::api::status::status,
        crate::api::status::reload,
        crate::api::routes::add_route,
        crate::api::routes::edit_route,
        crate::api::routes::delete_route,
        crate::api::receivers::test_receiver,
    ),
    components(schemas(
        crate::api::ErrorResponse,
        crate::api::ErrorType,
        crate::api::routes::ChannelName,
        crate::api::status::HealthResponse,
        crate::api::status::ReloadMetrics,
        crate::api::status::StatusResponse,
    ))
)]
pub struct ApiDoc;
