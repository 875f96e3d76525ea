use std::path::Path;

use tracing::{debug, info, trace, warn};

use super::downloader::Transfer;
use crate::{
    domain::{AppError, DownloadPhase, LibraryDescription, PollControl, RowPath, TransferStatus},
    utils::{collapse_whitespace, escape_markup},
};

/// One row of the library table.
#[derive(Debug)]
pub struct LibraryEntry<T> {
    pub name: String,
    pub author: String,
    pub license: String,
    pub size: u64,
    pub installed: bool,
    pub url: String,
    /// Markup-escaped description
    pub description: String,
    /// Last polled download progress, 0.0..=1.0
    pub progress: f64,
    /// Status seen by the most recent poll of the current or last download
    pub last_status: Option<TransferStatus>,
    downloader: Option<T>,
}

impl<T> LibraryEntry<T> {
    pub fn phase(&self) -> DownloadPhase {
        if self.downloader.is_some() {
            DownloadPhase::Downloading
        } else {
            DownloadPhase::Idle
        }
    }

    pub fn downloader(&self) -> Option<&T> {
        self.downloader.as_ref()
    }

    /// Description with whitespace runs collapsed, for hover text
    pub fn tooltip(&self) -> String {
        collapse_whitespace(&self.description)
    }
}

/// Rows of downloadable libraries, each owning its in-flight download.
#[derive(Debug)]
pub struct LibraryModel<T> {
    rows: Vec<LibraryEntry<T>>,
}

impl<T> Default for LibraryModel<T> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<T: Transfer> LibraryModel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[LibraryEntry<T>] {
        &self.rows
    }

    pub fn row(&self, path: RowPath) -> Option<&LibraryEntry<T>> {
        self.rows.get(path.0)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows that currently own a download and need polling
    pub fn downloading_rows(&self) -> impl Iterator<Item = RowPath> + '_ {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.downloader.is_some())
            .map(|(index, _)| RowPath(index))
    }

    pub fn add_library(&mut self, library: &LibraryDescription) -> RowPath {
        let description = escape_markup(&library.description);

        debug!(name = %library.name, description = %library.description, "Adding library row");

        self.rows.push(LibraryEntry {
            name: library.name.clone(),
            author: library.author.clone(),
            license: library.license.clone(),
            size: library.size,
            installed: library.installed,
            url: library.url.clone(),
            description,
            progress: 0.0,
            last_status: None,
            downloader: None,
        });

        RowPath(self.rows.len() - 1)
    }

    /// Start downloading the library at `path` into `dest_dir`.
    ///
    /// Exactly one handle is built and started per successful call.
    pub fn install_activated(
        &mut self,
        path: RowPath,
        dest_dir: &Path,
        make_downloader: impl FnOnce(&str, &Path) -> T,
    ) -> Result<(), AppError> {
        let row = self
            .rows
            .get_mut(path.0)
            .ok_or_else(|| AppError::InvalidRow(path.to_string()))?;

        if row.downloader.is_some() {
            return Err(AppError::AlreadyDownloading(row.name.clone()));
        }
        if row.url.is_empty() {
            return Err(AppError::MissingUrl(row.name.clone()));
        }

        info!("will download {} to {}", row.url, dest_dir.display());

        let mut downloader = make_downloader(&row.url, dest_dir);
        downloader.start();

        row.progress = 0.0;
        row.last_status = None;
        row.downloader = Some(downloader);
        Ok(())
    }

    /// One timer tick for the row at `path`.
    ///
    /// Drops the row's download once it reaches a terminal status.
    pub fn poll(&mut self, path: RowPath) -> PollControl {
        let Some(row) = self.rows.get_mut(path.0) else {
            return PollControl::Stop;
        };
        let Some(downloader) = row.downloader.as_ref() else {
            return PollControl::Stop;
        };

        let progress = downloader.progress();
        let status = downloader.status();
        trace!(row = %path, progress, ?status, "Download progress");

        row.progress = progress.clamp(0.0, 1.0);
        row.last_status = Some(status);

        if !status.is_terminal() {
            return PollControl::Continue;
        }

        match status {
            TransferStatus::Completed => info!(name = %row.name, "Library download complete"),
            _ => warn!(name = %row.name, ?status, "Library download ended early"),
        }

        row.downloader = None;
        PollControl::Stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::path::PathBuf;
    use std::rc::Rc;

    /// Transfer whose status the test drives by hand.
    struct FakeTransfer {
        status: Rc<Cell<TransferStatus>>,
        progress: Rc<Cell<f64>>,
        starts: Rc<Cell<usize>>,
        drops: Rc<Cell<usize>>,
    }

    impl Transfer for FakeTransfer {
        fn start(&mut self) {
            self.starts.set(self.starts.get() + 1);
            self.status.set(TransferStatus::Running);
        }

        fn progress(&self) -> f64 {
            self.progress.get()
        }

        fn status(&self) -> TransferStatus {
            self.status.get()
        }
    }

    impl Drop for FakeTransfer {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    #[derive(Default)]
    struct Harness {
        status: Rc<Cell<TransferStatus>>,
        progress: Rc<Cell<f64>>,
        starts: Rc<Cell<usize>>,
        drops: Rc<Cell<usize>>,
        created: Rc<RefCell<Vec<(String, PathBuf)>>>,
    }

    impl Harness {
        fn factory(&self) -> impl FnOnce(&str, &Path) -> FakeTransfer + '_ {
            move |url, dir| {
                self.created
                    .borrow_mut()
                    .push((url.to_string(), dir.to_path_buf()));
                FakeTransfer {
                    status: self.status.clone(),
                    progress: self.progress.clone(),
                    starts: self.starts.clone(),
                    drops: self.drops.clone(),
                }
            }
        }
    }

    fn library(name: &str, url: &str) -> LibraryDescription {
        LibraryDescription {
            name: name.to_string(),
            author: "Paul".to_string(),
            license: "CC-BY-SA".to_string(),
            size: 1_000_000,
            installed: false,
            url: url.to_string(),
            description: format!("{}  loops & <one-shots>\n  for  everyone", name),
            toplevel: name.to_lowercase(),
        }
    }

    fn model() -> LibraryModel<FakeTransfer> {
        let mut model = LibraryModel::new();
        model.add_library(&library("Drums", "https://example.org/drums.tar.xz"));
        model.add_library(&library("Bass", "https://example.org/bass.tar.xz"));
        model
    }

    #[test]
    fn test_add_library_copies_and_escapes() {
        assert!(LibraryModel::<FakeTransfer>::new().is_empty());

        let model = model();
        assert_eq!(model.len(), 2);
        assert!(!model.is_empty());

        let row = model.row(RowPath(0)).unwrap();
        assert_eq!(row.name, "Drums");
        assert_eq!(row.author, "Paul");
        assert_eq!(row.license, "CC-BY-SA");
        assert_eq!(row.size, 1_000_000);
        assert!(!row.installed);
        assert_eq!(row.url, "https://example.org/drums.tar.xz");
        assert_eq!(
            row.description,
            "Drums  loops &amp; &lt;one-shots&gt;\n  for  everyone"
        );
        assert_eq!(row.tooltip(), "Drums loops &amp; &lt;one-shots&gt; for everyone");
        assert_eq!(row.phase(), DownloadPhase::Idle);
    }

    #[test]
    fn test_install_starts_exactly_one_download() {
        let mut model = model();
        let harness = Harness::default();
        let dest = PathBuf::from("/music/clips");

        model
            .install_activated(RowPath(1), &dest, harness.factory())
            .unwrap();

        assert_eq!(harness.starts.get(), 1);
        assert_eq!(
            *harness.created.borrow(),
            vec![("https://example.org/bass.tar.xz".to_string(), dest.clone())]
        );
        assert_eq!(model.row(RowPath(1)).unwrap().phase(), DownloadPhase::Downloading);
        assert_eq!(model.row(RowPath(0)).unwrap().phase(), DownloadPhase::Idle);
        assert_eq!(model.downloading_rows().collect::<Vec<_>>(), vec![RowPath(1)]);
    }

    #[test]
    fn test_install_rejects_active_row() {
        let mut model = model();
        let harness = Harness::default();
        let dest = PathBuf::from("/music/clips");

        model.install_activated(RowPath(0), &dest, harness.factory()).unwrap();
        let err = model.install_activated(RowPath(0), &dest, harness.factory()).unwrap_err();

        assert_eq!(err, AppError::AlreadyDownloading("Drums".to_string()));
        assert_eq!(harness.starts.get(), 1);
        assert_eq!(harness.created.borrow().len(), 1);
    }

    #[test]
    fn test_install_invalid_rows() {
        let mut model = model();
        let harness = Harness::default();
        let dest = PathBuf::from("/music/clips");

        assert_eq!(
            model.install_activated(RowPath(7), &dest, harness.factory()),
            Err(AppError::InvalidRow("7".to_string()))
        );

        model.add_library(&library("Silent", ""));
        assert_eq!(
            model.install_activated(RowPath(2), &dest, harness.factory()),
            Err(AppError::MissingUrl("Silent".to_string()))
        );
        assert_eq!(harness.starts.get(), 0);
    }

    #[test]
    fn test_poll_continues_until_terminal() {
        let mut model = model();
        let harness = Harness::default();
        model
            .install_activated(RowPath(0), Path::new("/music/clips"), harness.factory())
            .unwrap();

        harness.progress.set(0.25);
        assert_eq!(model.poll(RowPath(0)), PollControl::Continue);
        assert_eq!(model.row(RowPath(0)).unwrap().progress, 0.25);
        assert_eq!(
            model.row(RowPath(0)).unwrap().last_status,
            Some(TransferStatus::Running)
        );
        assert_eq!(harness.drops.get(), 0);

        harness.progress.set(1.0);
        harness.status.set(TransferStatus::Completed);
        assert_eq!(model.poll(RowPath(0)), PollControl::Stop);

        let row = model.row(RowPath(0)).unwrap();
        assert!(row.downloader().is_none());
        assert_eq!(row.phase(), DownloadPhase::Idle);
        assert_eq!(harness.drops.get(), 1);
        assert_eq!(model.downloading_rows().count(), 0);

        // no handle left, so the timer stays stopped
        assert_eq!(model.poll(RowPath(0)), PollControl::Stop);
        assert_eq!(harness.drops.get(), 1);
    }

    #[test]
    fn test_poll_failure_is_treated_like_completion() {
        let mut model = model();
        let harness = Harness::default();
        model
            .install_activated(RowPath(1), Path::new("/music/clips"), harness.factory())
            .unwrap();

        harness.status.set(TransferStatus::Failed);
        assert_eq!(model.poll(RowPath(1)), PollControl::Stop);
        assert_eq!(
            model.row(RowPath(1)).unwrap().last_status,
            Some(TransferStatus::Failed)
        );
        assert_eq!(model.row(RowPath(1)).unwrap().phase(), DownloadPhase::Idle);
        assert!(!model.row(RowPath(1)).unwrap().installed);

        // the row can be installed again afterwards
        model
            .install_activated(RowPath(1), Path::new("/music/clips"), harness.factory())
            .unwrap();
        assert_eq!(harness.starts.get(), 2);
    }

    #[test]
    fn test_poll_unknown_row_stops() {
        let mut model = model();
        assert_eq!(model.poll(RowPath(0)), PollControl::Stop);
        assert_eq!(model.poll(RowPath(42)), PollControl::Stop);
    }
}
