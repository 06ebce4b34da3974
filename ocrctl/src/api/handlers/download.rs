use crate::AppState;
use crate::api::models::download::DownloadQuery;
use crate::errors::{Error, ErrorBody, Result};
use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::header,
    response::{IntoResponse, Response},
};

const FALLBACK_ATTACHMENT_NAME: &str = "download";

/// Name offered to the client for a downloaded object: the trailing path segment of the locator,
/// limited to characters that are valid inside a quoted header parameter.
fn attachment_name(locator: &str) -> String {
    let segment = locator.rsplit('/').next().unwrap_or_default();
    let name: String = segment
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();

    if name.is_empty() {
        FALLBACK_ATTACHMENT_NAME.to_string()
    } else {
        name
    }
}

#[utoipa::path(
    get,
    path = "/download",
    tag = "tables",
    summary = "Download a stored object",
    description = "Return the bytes of a stored object as a file attachment, named after the last segment of its locator.",
    params(DownloadQuery),
    responses(
        (status = 200, description = "Object contents", content_type = "text/csv"),
        (status = 400, description = "CSV URL not provided", body = ErrorBody),
        (status = 500, description = "Object not found or storage failure", body = ErrorBody)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn download_table(
    State(state): State<AppState>,
    query: std::result::Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response> {
    let Query(query) = query.map_err(|rejection| Error::BadRequest {
        message: rejection.body_text(),
    })?;

    let csv_url = query
        .csv_url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| Error::bad_request("CSV URL not provided"))?;

    let content = state.storage.get(&csv_url).await?;

    let filename = attachment_name(&csv_url);
    let content_type = mime_guess::from_path(&filename).first_or_octet_stream();
    tracing::info!(locator = %csv_url, size = content.len(), "Serving stored object");

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        content,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ObjectStorage;
    use crate::test_utils::{ScriptedOcrEngine, create_test_app};
    use axum::http::StatusCode;

    #[test]
    fn test_attachment_name() {
        assert_eq!(attachment_name("s3://scans/outputs/output_1.csv"), "output_1.csv");
        assert_eq!(attachment_name("s3://scans/outputs/"), "download");
        assert_eq!(attachment_name("s3://scans/weird \"name\".csv"), "weird__name_.csv");
    }

    #[tokio::test]
    async fn test_download_returns_stored_bytes_as_attachment() {
        let app = create_test_app(ScriptedOcrEngine::new());
        let table = b"image_url,extracted_text\nmem://test-bucket/images/a.png,HELLO\n".to_vec();
        let locator = app
            .storage
            .put("outputs/output_abc.csv", table.clone(), "text/csv")
            .await
            .unwrap()
            .to_string();

        let response = app.server.get("/download").add_query_param("csv_url", &locator).await;

        response.assert_status_ok();
        assert_eq!(response.as_bytes().to_vec(), table);
        assert_eq!(response.header(header::CONTENT_TYPE), "text/csv");
        assert_eq!(
            response.header(header::CONTENT_DISPOSITION),
            "attachment; filename=\"output_abc.csv\""
        );
    }

    #[tokio::test]
    async fn test_download_unknown_extension_is_octet_stream() {
        let app = create_test_app(ScriptedOcrEngine::new());
        let locator = app
            .storage
            .put("outputs/blob", b"raw".to_vec(), "application/octet-stream")
            .await
            .unwrap()
            .to_string();

        let response = app.server.get("/download").add_query_param("csv_url", &locator).await;

        response.assert_status_ok();
        assert_eq!(response.header(header::CONTENT_TYPE), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_download_without_locator_is_rejected() {
        let app = create_test_app(ScriptedOcrEngine::new());

        for request in [app.server.get("/download"), app.server.get("/download").add_query_param("csv_url", "")] {
            let response = request.await;
            response.assert_status(StatusCode::BAD_REQUEST);
            let body: ErrorBody = response.json();
            assert_eq!(body.error, "CSV URL not provided");
        }
    }

    #[tokio::test]
    async fn test_download_missing_object_is_server_error() {
        let app = create_test_app(ScriptedOcrEngine::new());

        let response = app
            .server
            .get("/download")
            .add_query_param("csv_url", "mem://test-bucket/outputs/output_missing.csv")
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = response.json();
        assert!(body.error.starts_with("Object not found"));
    }

    #[tokio::test]
    async fn test_download_foreign_scheme_is_server_error() {
        let app = create_test_app(ScriptedOcrEngine::new());

        let response = app
            .server
            .get("/download")
            .add_query_param("csv_url", "https://example.com/output.csv")
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }
}
