use bytes::Bytes;
use tracing::{debug, warn};

/// Raw text of an uploaded document. PDFs go through `pdf-extract` on the
/// blocking pool; anything else is decoded as UTF-8, replacing invalid bytes.
/// A PDF that cannot be read yields empty text.
pub async fn extract_text(bytes: Bytes, file_type: &str, file_name: &str) -> String {
    if !is_pdf(&bytes, file_type, file_name) {
        return String::from_utf8_lossy(&bytes).trim().to_string();
    }

    let size = bytes.len();
    let extracted =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;

    match extracted {
        Ok(Ok(text)) => {
            debug!("Extracted {} chars from {size}-byte PDF", text.len());
            text.trim().to_string()
        }
        Ok(Err(e)) => {
            warn!("PDF text extraction failed for {file_name}: {e}");
            String::new()
        }
        Err(e) => {
            warn!("PDF extraction task failed for {file_name}: {e}");
            String::new()
        }
    }
}

fn is_pdf(bytes: &[u8], file_type: &str, file_name: &str) -> bool {
    file_type.eq_ignore_ascii_case("application/pdf")
        || file_name.to_ascii_lowercase().ends_with(".pdf")
        || bytes.starts_with(b"%PDF-")
}
