use crate::api::ApiClient;
use crate::application::{Downloader, LibraryFetcher, LibraryModel};
use crate::domain::{PollControl, RowPath, TransferStatus};
use crate::settings::Settings;
use crate::ui::{LibraryMessage, LibraryView};
use iced::{time, Subscription, Task};
use std::path::PathBuf;
use tokio::runtime::Handle;
use tracing::{error, info, warn};

pub struct LibraryApp {
    view: LibraryView,
    model: LibraryModel<Downloader>,
    api_client: ApiClient,
    settings: Settings,
    clip_library_dir: PathBuf,
    // Transfers run here, outside the UI executor
    runtime: Handle,
}

impl LibraryApp {
    pub fn new(settings: Settings, runtime: Handle) -> (Self, Task<Message>) {
        let api_client = ApiClient::new(settings.api_config());
        let clip_library_dir = settings.clip_library_dir_or_default();

        let fetcher = LibraryFetcher::new(api_client.clone(), clip_library_dir.clone());
        let fetch = Task::perform(
            async move {
                let mut fetcher = fetcher;
                match fetcher.get_descriptions().await {
                    Ok(_) => Ok(fetcher),
                    Err(e) => Err(e.to_string()),
                }
            },
            Message::DescriptionsFetched,
        );

        let app = Self {
            view: LibraryView::default(),
            model: LibraryModel::new(),
            api_client,
            settings,
            clip_library_dir,
            runtime,
        };

        (app, fetch)
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(LibraryMessage),
    /// Result of the startup catalog fetch
    DescriptionsFetched(Result<LibraryFetcher, String>),
    /// Timer tick for one downloading row
    PollDownload(RowPath),
}

pub fn update(app: &mut LibraryApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(LibraryMessage::InstallToggled(path)) => {
            let client = app.api_client.clone();
            let runtime = app.runtime.clone();

            match app.model.install_activated(path, &app.clip_library_dir, |url, dir| {
                Downloader::new(url, dir, client, runtime)
            }) {
                Ok(()) => {
                    if let Some(row) = app.model.row(path) {
                        if let Some(downloader) = row.downloader() {
                            app.view.status_message = format!(
                                "Downloading {} to {}",
                                row.name,
                                downloader.destination().display()
                            );
                        }
                    }
                }
                Err(e) => {
                    warn!(row = %path, error = %e, "Could not start download");
                    app.view.status_message = e.to_string();
                }
            }
        }
        Message::DescriptionsFetched(result) => match result {
            Ok(fetcher) => {
                fetcher.foreach_description(|library| {
                    app.model.add_library(library);
                });
                info!(count = app.model.len(), "Library rows ready");
                app.view.status_message = if app.model.is_empty() {
                    "No libraries available".to_string()
                } else {
                    format!("{} libraries available", app.model.len())
                };
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch library descriptions");
                app.view.status_message = format!("Could not load library list: {}", e);
            }
        },
        Message::PollDownload(path) => {
            if app.model.poll(path) == PollControl::Stop {
                if let Some(row) = app.model.row(path) {
                    app.view.status_message = download_outcome(&row.name, row.last_status);
                }
            }
        }
    }
    Task::none()
}

/// Status line shown once a row's download has been dropped
fn download_outcome(name: &str, status: Option<TransferStatus>) -> String {
    match status {
        Some(TransferStatus::Completed) => format!("{} downloaded", name),
        Some(TransferStatus::Cancelled) => format!("{} download cancelled", name),
        _ => format!("{} download failed", name),
    }
}

pub fn view(app: &LibraryApp) -> iced::Element<'_, Message> {
    app.view.view(app.model.rows()).map(Message::UiMessage)
}

/// One poll timer per downloading row; a row's timer stops once its
/// download is dropped from the model.
pub fn subscription(app: &LibraryApp) -> Subscription<Message> {
    let interval = app.settings.poll_interval();

    Subscription::batch(app.model.downloading_rows().map(|path| {
        time::every(interval)
            .with(path)
            .map(|(path, _)| Message::PollDownload(path))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_outcome_only_reports_success_when_completed() {
        assert_eq!(
            download_outcome("Drums", Some(TransferStatus::Completed)),
            "Drums downloaded"
        );
        assert_eq!(
            download_outcome("Drums", Some(TransferStatus::Failed)),
            "Drums download failed"
        );
        assert_eq!(
            download_outcome("Drums", Some(TransferStatus::Cancelled)),
            "Drums download cancelled"
        );
        assert_eq!(download_outcome("Drums", None), "Drums download failed");
    }
}
