use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::queue::RabbitMqService;
use crate::modules::media::MediaProcessor;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub queue: RabbitMqService,
    pub processor: Arc<MediaProcessor>,
}

impl AppState {
    pub fn new(config: AppConfig, queue: RabbitMqService, processor: MediaProcessor) -> Self {
        Self {
            config,
            queue,
            processor: Arc::new(processor),
        }
    }
}
