use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().merge(image_routes(config))
}

fn image_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::image::upload_image,
            handlers::image::list_images
        ))
        .routes(routes!(
            handlers::image::get_image,
            handlers::image::delete_image
        ))
        .routes(routes!(handlers::image::get_image_by_filename))
        // Only the upload route reads a body.
        .layer(handlers::image::upload_body_limit(config.upload.max_size))
}
