pub mod downloader;
pub mod library_fetcher;
pub mod library_model;

pub use downloader::Downloader;
pub use library_fetcher::LibraryFetcher;
pub use library_model::{LibraryEntry, LibraryModel};
