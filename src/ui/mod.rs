use iced::{
    widget::{button, column, container, progress_bar, row, scrollable, text, tooltip, Column, Space},
    Element, Length,
};

use crate::application::LibraryEntry;
use crate::domain::{DownloadPhase, RowPath};
use crate::utils::format_size;

/// Main view state
pub struct LibraryView {
    pub status_message: String,
}

impl Default for LibraryView {
    fn default() -> Self {
        Self {
            status_message: "Fetching library list...".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum LibraryMessage {
    InstallToggled(RowPath),
}

const COLUMNS: [(&str, u16); 6] = [
    ("Name", 4),
    ("Author", 3),
    ("License", 2),
    ("Size", 2),
    ("Installed", 2),
    ("", 3),
];

impl LibraryView {
    pub fn view<'a, T>(&'a self, rows: &'a [LibraryEntry<T>]) -> Element<'a, LibraryMessage> {
        let header = row(COLUMNS.iter().map(|(title, portion)| {
            text(*title)
                .size(14)
                .width(Length::FillPortion(*portion))
                .into()
        }))
        .spacing(8);

        let table = Column::with_children(
            rows.iter()
                .enumerate()
                .map(|(index, entry)| library_row(RowPath(index), entry)),
        )
        .spacing(4);

        column![
            text("Loop Library Manager").size(24),
            Space::new().height(Length::Fixed(8.0)),
            header,
            scrollable(table).height(Length::Fill),
            text(&self.status_message).size(14),
        ]
        .padding(8)
        .spacing(8)
        .into()
    }
}

fn library_row<'a, T>(path: RowPath, entry: &'a LibraryEntry<T>) -> Element<'a, LibraryMessage> {
    let action: Element<'a, LibraryMessage> = match entry.phase() {
        DownloadPhase::Downloading => progress_bar(0.0..=1.0, entry.progress as f32).into(),
        DownloadPhase::Idle => {
            let label = if entry.installed { "Reinstall" } else { "Install" };
            button(text(label).size(13))
                .on_press(LibraryMessage::InstallToggled(path))
                .into()
        }
    };

    let cells = row![
        text(&entry.name).width(Length::FillPortion(COLUMNS[0].1)),
        text(&entry.author).width(Length::FillPortion(COLUMNS[1].1)),
        text(&entry.license).width(Length::FillPortion(COLUMNS[2].1)),
        text(format_size(entry.size)).width(Length::FillPortion(COLUMNS[3].1)),
        text(if entry.installed { "Yes" } else { "No" })
            .width(Length::FillPortion(COLUMNS[4].1)),
        container(action).width(Length::FillPortion(COLUMNS[5].1)),
    ]
    .spacing(8);

    tooltip(
        cells,
        container(text(entry.tooltip()).size(13)).padding(6),
        tooltip::Position::FollowCursor,
    )
    .into()
}
