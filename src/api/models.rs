use serde::{Deserialize, Serialize};

/// Response from the catalog endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogResponse {
    #[serde(default)]
    pub libraries: Vec<CatalogEntry>,
}

/// One library in the catalog
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub author: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub size: u64,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub toplevel: String,
}

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub catalog_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            catalog_url: "https://ardour.org/libraries.json".to_string(),
        }
    }
}
