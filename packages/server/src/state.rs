use crate::config::AppConfig;
use crate::images::ImageService;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub images: ImageService,
}
