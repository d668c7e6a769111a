//! Event Publisher Implementation
//!
//! 控制器事件推送：所有事件走同一个 broadcast 通道，订阅者看到的顺序与发布顺序一致

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::{ButtonState, RepeatMode};

/// 控制器事件类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ControllerEvent {
    /// 状态栏消息
    Status { message: String },
    /// 分句结果（按原文顺序）
    SentencesReady { segments: Vec<String> },
    /// 按钮使能变化
    ButtonsUpdate {
        play_enabled: bool,
        pause_enabled: bool,
        stop_enabled: bool,
    },
    /// 播放目标切换
    ModeChanged { mode: RepeatMode },
    /// 图片识别结果（已过滤）
    OcrResult { text: String },
}

impl From<ButtonState> for ControllerEvent {
    fn from(buttons: ButtonState) -> Self {
        ControllerEvent::ButtonsUpdate {
            play_enabled: buttons.play_enabled,
            pause_enabled: buttons.pause_enabled,
            stop_enabled: buttons.stop_enabled,
        }
    }
}

/// 默认通道容量
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// 事件发布器
pub struct EventPublisher {
    channel: broadcast::Sender<ControllerEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// 指定通道容量（慢订阅者超出容量会收到 Lagged）
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { channel: tx }
    }

    /// 订阅事件
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.channel.subscribe()
    }

    pub fn publish_status(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(message = %message, "Status");
        self.publish(ControllerEvent::Status { message });
    }

    pub fn publish_sentences(&self, segments: Vec<String>) {
        self.publish(ControllerEvent::SentencesReady { segments });
    }

    pub fn publish_buttons(&self, buttons: ButtonState) {
        self.publish(buttons.into());
    }

    pub fn publish_mode(&self, mode: RepeatMode) {
        self.publish(ControllerEvent::ModeChanged { mode });
    }

    pub fn publish_ocr_result(&self, text: impl Into<String>) {
        self.publish(ControllerEvent::OcrResult { text: text.into() });
    }

    /// 发布事件，没有订阅者时丢弃
    pub fn publish(&self, event: ControllerEvent) {
        if let Err(e) = self.channel.send(event) {
            tracing::debug!(error = %e, "Failed to publish event (no receivers)");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::compute_buttons;

    #[tokio::test]
    async fn test_publish_preserves_order() {
        let publisher = EventPublisher::new();
        let mut rx = publisher.subscribe();

        publisher.publish_status("Processing");
        publisher.publish_sentences(vec!["一。".into(), "二。".into()]);
        publisher.publish_buttons(compute_buttons(true, false, false));
        publisher.publish_mode(RepeatMode::Single);

        assert_eq!(
            rx.recv().await.unwrap(),
            ControllerEvent::Status {
                message: "Processing".into()
            }
        );
        assert!(matches!(
            rx.recv().await.unwrap(),
            ControllerEvent::SentencesReady { segments } if segments.len() == 2
        ));
        assert_eq!(
            rx.recv().await.unwrap(),
            ControllerEvent::ButtonsUpdate {
                play_enabled: true,
                pause_enabled: false,
                stop_enabled: false,
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            ControllerEvent::ModeChanged {
                mode: RepeatMode::Single
            }
        );
    }

    #[test]
    fn test_publish_without_subscribers() {
        let publisher = EventPublisher::new();
        publisher.publish_status("nobody listening");
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(ControllerEvent::ModeChanged {
            mode: RepeatMode::Full,
        })
        .unwrap();
        assert_eq!(json["event"], "ModeChanged");
        assert_eq!(json["data"]["mode"], "full");
    }
}
