//! Events - 控制器事件推送

mod publisher;

pub use publisher::{ControllerEvent, EventPublisher, DEFAULT_EVENT_CAPACITY};
