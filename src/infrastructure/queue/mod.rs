pub mod rabbitmq;

pub use rabbitmq::{QueuePublisher, RabbitMqService};
