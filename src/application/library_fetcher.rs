use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{
    api::{ApiClient, CatalogEntry},
    domain::{AppError, LibraryDescription},
};

/// Loads library descriptions from the remote catalog and marks the ones
/// already present in the clip library.
#[derive(Debug, Clone)]
pub struct LibraryFetcher {
    api_client: ApiClient,
    clip_library_dir: PathBuf,
    descriptions: Vec<LibraryDescription>,
}

impl LibraryFetcher {
    pub fn new(api_client: ApiClient, clip_library_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_client,
            clip_library_dir: clip_library_dir.into(),
            descriptions: Vec::new(),
        }
    }

    /// Fetch the catalog, replacing any previously fetched descriptions.
    /// Returns the number of libraries found.
    pub async fn get_descriptions(&mut self) -> Result<usize, AppError> {
        let catalog = self
            .api_client
            .fetch_catalog()
            .await
            .map_err(|e| AppError::Catalog(e.to_string()))?;

        let mut descriptions = Vec::with_capacity(catalog.libraries.len());
        for entry in catalog.libraries {
            let installed = is_installed(&self.clip_library_dir, &entry.toplevel).await;
            descriptions.push(describe(entry, installed));
        }

        info!(
            count = descriptions.len(),
            url = %self.api_client.config().catalog_url,
            "Fetched library catalog"
        );

        self.descriptions = descriptions;
        Ok(self.descriptions.len())
    }

    pub fn foreach_description(&self, mut f: impl FnMut(&LibraryDescription)) {
        for description in &self.descriptions {
            f(description);
        }
    }
}

async fn is_installed(clip_library_dir: &Path, toplevel: &str) -> bool {
    if toplevel.is_empty() {
        return false;
    }
    let path = clip_library_dir.join(toplevel);
    let installed = tokio::fs::try_exists(&path).await.unwrap_or(false);
    debug!(path = %path.display(), installed, "Checked library install");
    installed
}

fn describe(entry: CatalogEntry, installed: bool) -> LibraryDescription {
    LibraryDescription {
        name: entry.name,
        author: entry.author,
        license: entry.license,
        size: entry.size,
        installed,
        url: entry.url,
        description: entry.description,
        toplevel: entry.toplevel,
    }
}
