//! Outward notifications for the UI layer.
//!
//! Provisioning and clip downloads report what they are doing through an
//! [`EventSink`]. Delivery is one-way: no acknowledgement, no backpressure,
//! and a sink that has gone away silently drops events.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::resources::types::ToolId;

// =============================================================================
// Payloads
// =============================================================================

/// Progress of one tool being provisioned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// Tool key, e.g. `ffmpeg`.
    pub key: String,
    /// Human label, e.g. `FFmpeg`.
    pub title: String,
    /// Current phase ("Downloading", "Extracting") or an error message.
    pub description: String,
    /// Percent complete. Nominally 0..=100; may overshoot briefly.
    pub progress: f64,
}

/// Status carried by clip download progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Pending,
    Processing,
    Download,
    Done,
    Error,
}

/// Progress of a clip download.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadProgress {
    pub status: DownloadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

/// Severity of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Success,
    Error,
    Info,
}

/// A user-facing message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub status: MessageStatus,
    pub message: String,
}

// =============================================================================
// Events
// =============================================================================

/// Events sent to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum AppEvent {
    /// A tool started provisioning.
    ResourceStart(ProgressEvent),
    /// A tool reported progress.
    ResourceProgress(ProgressEvent),
    /// A tool finished provisioning.
    ResourceStop(ProgressEvent),
    /// A tool failed to provision.
    ResourceError(ProgressEvent),
    /// All tools are ready.
    ResourceFinish,
    /// A clip download started.
    DownloadStart,
    /// A clip download reported progress.
    DownloadProgress(DownloadProgress),
    /// A clip download ended, successfully or not.
    DownloadStop,
    /// Free-form message for the user.
    Message(Message),
}

impl AppEvent {
    /// Event name on the UI bus.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ResourceStart(_) => "resource-start",
            Self::ResourceProgress(_) => "resource-progress",
            Self::ResourceStop(_) => "resource-stop",
            Self::ResourceError(_) => "resource-error",
            Self::ResourceFinish => "resource-finish",
            Self::DownloadStart => "download-start",
            Self::DownloadProgress(_) => "download-progress",
            Self::DownloadStop => "download-stop",
            Self::Message(_) => "message",
        }
    }

    /// Convenience constructor for [`AppEvent::Message`].
    pub fn message(status: MessageStatus, message: impl Into<String>) -> Self {
        Self::Message(Message {
            status,
            message: message.into(),
        })
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Fire-and-forget receiver of [`AppEvent`]s.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AppEvent);
}

/// Sender half of an event channel.
pub type EventSender = mpsc::UnboundedSender<AppEvent>;

/// Receiver half of an event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<AppEvent>;

/// Create an event channel for streaming events to the UI.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

impl EventSink for EventSender {
    fn emit(&self, event: AppEvent) {
        // A closed receiver means nobody is listening anymore.
        let _ = self.send(event);
    }
}

/// Sink that only logs events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: AppEvent) {
        debug!(event = event.name(), ?event, "Event emitted");
    }
}

// =============================================================================
// Resource Reporter
// =============================================================================

/// Emits lifecycle events for a single tool.
pub struct ResourceReporter<'a> {
    sink: &'a dyn EventSink,
    key: &'static str,
    title: &'static str,
}

impl<'a> ResourceReporter<'a> {
    pub fn new(sink: &'a dyn EventSink, tool: ToolId) -> Self {
        Self {
            sink,
            key: tool.as_str(),
            title: tool.title(),
        }
    }

    fn payload(&self, description: impl Into<String>, progress: f64) -> ProgressEvent {
        ProgressEvent {
            key: self.key.to_string(),
            title: self.title.to_string(),
            description: description.into(),
            progress,
        }
    }

    pub fn start(&self) {
        self.sink.emit(AppEvent::ResourceStart(self.payload("", 0.0)));
    }

    pub fn progress(&self, description: &str, progress: f64) {
        self.sink
            .emit(AppEvent::ResourceProgress(self.payload(description, progress)));
    }

    pub fn stop(&self) {
        self.sink.emit(AppEvent::ResourceStop(self.payload("", 100.0)));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.sink
            .emit(AppEvent::ResourceError(self.payload(message, 100.0)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(AppEvent::ResourceFinish.name(), "resource-finish");
        assert_eq!(AppEvent::DownloadStart.name(), "download-start");
        assert_eq!(AppEvent::DownloadStop.name(), "download-stop");
        assert_eq!(
            AppEvent::message(MessageStatus::Info, "hi").name(),
            "message"
        );
    }

    #[test]
    fn test_progress_event_json_shape() {
        let event = AppEvent::ResourceProgress(ProgressEvent {
            key: "ffmpeg".into(),
            title: "FFmpeg".into(),
            description: "Downloading".into(),
            progress: 42.0,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "resource-progress");
        assert_eq!(json["payload"]["key"], "ffmpeg");
        assert_eq!(json["payload"]["title"], "FFmpeg");
        assert_eq!(json["payload"]["description"], "Downloading");
        assert_eq!(json["payload"]["progress"], 42.0);
    }

    #[test]
    fn test_download_status_lowercase() {
        let json = serde_json::to_string(&DownloadStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }

    #[test]
    fn test_reporter_lifecycle() {
        let (tx, mut rx) = event_channel();
        let reporter = ResourceReporter::new(&tx, ToolId::YtDlp);

        reporter.start();
        reporter.progress("Downloading", 50.0);
        reporter.stop();
        reporter.error("boom");

        let names: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.name())
            .collect();
        assert_eq!(
            names,
            vec![
                "resource-start",
                "resource-progress",
                "resource-stop",
                "resource-error"
            ]
        );
    }

    #[test]
    fn test_reporter_payloads() {
        let (tx, mut rx) = event_channel();
        let reporter = ResourceReporter::new(&tx, ToolId::Ffmpeg);

        reporter.start();
        reporter.stop();

        match rx.try_recv().unwrap() {
            AppEvent::ResourceStart(p) => {
                assert_eq!(p.key, "ffmpeg");
                assert_eq!(p.title, "FFmpeg");
                assert_eq!(p.progress, 0.0);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.try_recv().unwrap() {
            AppEvent::ResourceStop(p) => assert_eq!(p.progress, 100.0),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_tracing_sink_accepts_reporter_events() {
        let sink = TracingSink;
        let reporter = ResourceReporter::new(&sink, ToolId::Ffmpeg);
        reporter.start();
        reporter.error("offline");
    }

    #[test]
    fn test_sender_ignores_closed_receiver() {
        let (tx, rx) = event_channel();
        drop(rx);
        tx.emit(AppEvent::ResourceFinish);
    }
}
