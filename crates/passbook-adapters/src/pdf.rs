//! Turning bank responses into validated statement documents.

use crate::http::HttpResponse;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use passbook_core::{AdapterError, Result, StatementPdf};

/// Validate a direct document response.
///
/// Non-2xx statuses, empty bodies and non-PDF content types are rejected with
/// a download error naming `statement_id`.
pub fn from_response(bank: &str, statement_id: &str, response: HttpResponse) -> Result<StatementPdf> {
    if !response.is_success() {
        return Err(AdapterError::download(
            bank,
            statement_id,
            response.status_line(),
        ));
    }
    let content_type = response.content_type().map(str::to_string);
    StatementPdf {
        statement_id: statement_id.to_string(),
        content_type,
        bytes: response.body,
    }
    .validate(bank)
}

/// Decode a base64 PDF carried inside a JSON or GraphQL payload.
///
/// `content_type` is the type the payload declares for the document. When it
/// is absent, the media type of a `data:<type>;base64,` prefix is used
/// instead. Embedded line breaks are ignored.
pub fn decode_base64_pdf(
    bank: &str,
    statement_id: &str,
    encoded: &str,
    content_type: Option<&str>,
) -> Result<StatementPdf> {
    let (declared, payload) = match encoded.split_once("base64,") {
        Some((prefix, data)) => (data_url_media_type(prefix), data),
        None => (None, encoded),
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(cleaned.as_bytes()).map_err(|e| {
        AdapterError::download(bank, statement_id, format!("invalid base64 document: {e}"))
    })?;

    StatementPdf {
        statement_id: statement_id.to_string(),
        content_type: content_type.or(declared).map(str::to_string),
        bytes,
    }
    .validate(bank)
}

/// `application/pdf` out of `data:application/pdf;`.
fn data_url_media_type(prefix: &str) -> Option<&str> {
    let media_type = prefix
        .trim()
        .strip_prefix("data:")?
        .trim_end_matches(';');
    (!media_type.is_empty()).then_some(media_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use passbook_core::ErrorKind;

    #[test]
    fn test_from_response_keeps_every_byte() {
        let response = HttpResponse::pdf(vec![7u8; 15_000]);
        let pdf = from_response("citi", "s1", response).expect("valid document");
        assert_eq!(pdf.len(), 15_000);
        assert_eq!(pdf.content_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn test_from_response_rejects_empty_and_errors() {
        let err = from_response("citi", "s1", HttpResponse::pdf(Vec::new())).expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::Download);

        let err = from_response("citi", "s1", HttpResponse::new(500, "oops")).expect_err("500");
        assert!(err.to_string().contains("HTTP 500 Internal Server Error"));
    }

    #[test]
    fn test_decode_base64_pdf() {
        let encoded = STANDARD.encode(b"%PDF-1.7 body");
        let pdf = decode_base64_pdf("amex", "s1", &encoded, Some("application/pdf"))
            .expect("decode");
        assert_eq!(pdf.bytes, b"%PDF-1.7 body");
        assert_eq!(pdf.content_type.as_deref(), Some("application/pdf"));

        let with_prefix = format!("data:application/pdf;base64,{}\n", &encoded);
        let pdf = decode_base64_pdf("amex", "s1", &with_prefix, None).expect("decode prefixed");
        assert_eq!(pdf.bytes, b"%PDF-1.7 body");
        assert_eq!(pdf.content_type.as_deref(), Some("application/pdf"));

        let pdf = decode_base64_pdf("amex", "s1", &encoded, None).expect("untyped payload");
        assert_eq!(pdf.content_type, None);
    }

    #[test]
    fn test_decode_base64_pdf_rejects_declared_html() {
        let encoded = STANDARD.encode(b"<html>session expired</html>");
        let err = decode_base64_pdf("amex", "s1", &encoded, Some("text/html"))
            .expect_err("html is not a statement");
        assert_eq!(err.kind(), ErrorKind::Download);
        assert!(err.to_string().contains("text/html"));

        let data_url = format!("data:text/html;base64,{encoded}");
        let err = decode_base64_pdf("amex", "s1", &data_url, None).expect_err("html data url");
        assert!(err.to_string().contains("text/html"));
    }

    #[test]
    fn test_decode_base64_pdf_rejects() {
        assert!(decode_base64_pdf("amex", "s1", "!!not base64!!", None).is_err());
        let err = decode_base64_pdf("amex", "s1", "", None).expect_err("empty");
        assert!(err.to_string().contains("empty"));
    }
}
