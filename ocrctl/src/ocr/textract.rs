//! OCR using AWS Textract.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_textract::error::ProvideErrorMetadata;
use aws_sdk_textract::operation::detect_document_text::DetectDocumentTextOutput;
use aws_sdk_textract::primitives::Blob;
use aws_sdk_textract::types::{BlockType, Document};

use super::{OcrEngine, OcrError};

/// OCR engine wrapping the Textract `DetectDocumentText` API.
pub struct TextractOcrEngine {
    client: aws_sdk_textract::Client,
}

impl TextractOcrEngine {
    pub fn new(client: aws_sdk_textract::Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient AWS configuration.
    pub async fn from_env(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let sdk_config = loader.load().await;
        Self::new(aws_sdk_textract::Client::new(&sdk_config))
    }
}

/// Join the `LINE` blocks of a response, in reading order, one per line.
fn lines_to_text(output: &DetectDocumentTextOutput) -> String {
    output
        .blocks()
        .iter()
        .filter(|block| block.block_type() == Some(&BlockType::Line))
        .filter_map(|block| block.text())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl OcrEngine for TextractOcrEngine {
    fn name(&self) -> &'static str {
        "textract"
    }

    #[tracing::instrument(level = "debug", skip_all, fields(bytes = image.len()))]
    async fn detect_text(&self, image: &[u8]) -> Result<String, OcrError> {
        let document = Document::builder().bytes(Blob::new(image.to_vec())).build();

        let output = self
            .client
            .detect_document_text()
            .document(document)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                // Textract rejected this particular document (bad format, too large, ...)
                Some(service_err) => OcrError::Service {
                    message: service_err
                        .message()
                        .map(str::to_string)
                        .unwrap_or_else(|| service_err.to_string()),
                },
                None => OcrError::Other(anyhow::anyhow!("AWS Textract request failed: {e}")),
            })?;

        let text = lines_to_text(&output);
        tracing::trace!(%text, "Extracted text");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_textract::types::Block;

    fn block(block_type: BlockType, text: &str) -> Block {
        Block::builder().block_type(block_type).text(text).build()
    }

    #[test]
    fn test_lines_to_text_keeps_only_lines_in_order() {
        let output = DetectDocumentTextOutput::builder()
            .blocks(Block::builder().block_type(BlockType::Page).build())
            .blocks(block(BlockType::Line, "INVOICE 42"))
            .blocks(block(BlockType::Word, "INVOICE"))
            .blocks(block(BlockType::Word, "42"))
            .blocks(block(BlockType::Line, "Total: $10"))
            .build();

        assert_eq!(lines_to_text(&output), "INVOICE 42\nTotal: $10");
    }

    #[test]
    fn test_lines_to_text_empty_document() {
        let output = DetectDocumentTextOutput::builder().build();
        assert_eq!(lines_to_text(&output), "");
    }
}
