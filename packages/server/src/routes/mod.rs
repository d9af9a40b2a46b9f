use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn image_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::image::upload_image))
        .layer(handlers::image::upload_body_limit(
            config.storage.max_upload_size,
        ));

    OpenApiRouter::new()
        .merge(upload)
        .routes(routes!(
            handlers::image::get_image,
            handlers::image::delete_image
        ))
        .routes(routes!(handlers::image::get_image_metadata))
}
