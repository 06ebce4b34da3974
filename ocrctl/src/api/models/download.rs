use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters for the download endpoint
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadQuery {
    /// Locator of the object to download, usually a table returned by the process endpoint
    pub csv_url: Option<String>,
}
