//! Terminal rendering of core events.

use ytclip_core::events::{DownloadStatus, Message};
use ytclip_core::{AppEvent, AppPaths, EventReceiver, MessageStatus, Settings, ToolId};

/// Prints every event until the channel closes.
pub async fn print_events(mut rx: EventReceiver, json: bool) {
    while let Some(event) = rx.recv().await {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!("Failed to serialize {}: {}", event.name(), e),
            }
        } else if let Some(line) = describe(&event) {
            match event {
                AppEvent::ResourceError(_)
                | AppEvent::Message(Message {
                    status: MessageStatus::Error,
                    ..
                }) => eprintln!("{line}"),
                _ => println!("{line}"),
            }
        }
    }
}

/// One-line text form of an event, if it is worth showing.
fn describe(event: &AppEvent) -> Option<String> {
    let line = match event {
        AppEvent::ResourceStart(p) => format!("{}: installing", p.title),
        AppEvent::ResourceProgress(p) => {
            format!("{}: {} {:.0}%", p.title, p.description, p.progress)
        }
        AppEvent::ResourceStop(p) => format!("{}: ready", p.title),
        AppEvent::ResourceError(p) => format!("{}: FAILED - {}", p.title, p.description),
        AppEvent::ResourceFinish => "All tools ready".to_string(),
        AppEvent::DownloadStart => "Download started".to_string(),
        AppEvent::DownloadProgress(p) => match (p.status, p.progress) {
            (DownloadStatus::Download, Some(percent)) => format!("Downloading {percent:.1}%"),
            (DownloadStatus::Processing, _) => "Processing".to_string(),
            (DownloadStatus::Error, _) => "Download failed".to_string(),
            _ => return None,
        },
        AppEvent::DownloadStop => return None,
        AppEvent::Message(m) => match m.status {
            MessageStatus::Error => format!("ERROR: {}", m.message),
            _ => m.message.clone(),
        },
    };
    Some(line)
}

/// Prints the resolved directory layout and tool locations.
pub fn print_paths(paths: &AppPaths, settings: &Settings) {
    println!("home:      {}", paths.home().display());
    println!("downloads: {}", paths.download_dir().display());
    println!("resources: {}", paths.resource_dir().display());
    println!("settings:  {}", paths.settings_path().display());
    println!("output:    {}", settings.output_dir().display());
    for tool in ToolId::all() {
        println!(
            "{:<10} {}",
            format!("{}:", tool),
            paths.tool_location(*tool).program().to_string_lossy()
        );
    }
}
