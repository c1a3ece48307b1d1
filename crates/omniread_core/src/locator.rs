//! crates/omniread_core/src/locator.rs
//!
//! Locator resolution and the trusted-origin allow-list for the document
//! delivery proxy.

use crate::domain::{Book, Chapter};
use url::Url;

/// Why a (book, chapter) reference failed to resolve to a fetchable locator.
/// Both cases surface as NotFound to the caller; the distinction exists for
/// logging.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LocatorError {
    /// No locator at the resolved position, or the value is not an absolute
    /// http(s) URL.
    #[error("Document source is missing")]
    Missing,
    /// The book's content field holds literal text, not a locator.
    #[error("Book content is not a streamable document")]
    NotStreamable,
}

/// Resolves a (book, chapter) reference to the storage locator to stream.
///
/// With no index the book's master document is used. With an index, the
/// content field of the chapter at that 0-based position among `chapters`
/// (already ordered by `order` ascending); an out-of-range index falls back
/// to the master document. Text-type books hold literal text in the same
/// content field and are refused outright.
pub fn resolve_locator(
    book: &Book,
    chapters: &[Chapter],
    chapter_index: Option<u32>,
) -> Result<String, LocatorError> {
    if !book.upload_type.is_pdf_bearing() {
        return Err(LocatorError::NotStreamable);
    }

    let locator = match chapter_index.and_then(|index| chapters.get(index as usize)) {
        Some(chapter) => Some(chapter.content.clone()),
        None => book.master_locator.clone(),
    }
    .ok_or(LocatorError::Missing)?;

    if !is_absolute_http(&locator) {
        return Err(LocatorError::Missing);
    }
    Ok(locator)
}

/// A locator is fetchable only as an absolute http(s) URL.
fn is_absolute_http(locator: &str) -> bool {
    matches!(
        Url::parse(locator),
        Ok(url) if url.scheme() == "http" || url.scheme() == "https"
    )
}

/// The allow-list keeping the proxy from relaying arbitrary third-party
/// URLs: only locators whose host is the storage domain, or a subdomain of
/// it, are ever dereferenced. Matches are on the host alone; the trusted
/// domain appearing in a path or query component does not count.
#[derive(Debug, Clone)]
pub struct TrustedOrigin {
    domain: String,
}

impl TrustedOrigin {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into().to_ascii_lowercase(),
        }
    }

    pub fn permits(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => {
                let host = host.to_ascii_lowercase();
                host == self.domain || host.ends_with(&format!(".{}", self.domain))
            }
            None => false,
        }
    }
}

/// Rewrites plain-http locators to secure transport before fetching.
pub fn normalize_secure(locator: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(locator)?;
    if url.scheme() == "http" {
        // Always permitted for http -> https.
        let _ = url.set_scheme("https");
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UploadType;
    use chrono::Utc;
    use uuid::Uuid;

    fn book(upload_type: UploadType, master_locator: Option<&str>) -> Book {
        Book {
            id: Uuid::new_v4(),
            title: "Moby-Dick".to_string(),
            author: "Herman Melville".to_string(),
            description: String::new(),
            cover_url: "https://res.cloudinary.com/demo/cover.png".to_string(),
            genres: vec![],
            upload_type,
            master_locator: master_locator.map(str::to_string),
            total_chapters: 0,
            uploaded_by: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    fn chapter(book_id: Uuid, order: u32, content: &str) -> Chapter {
        Chapter {
            id: Uuid::new_v4(),
            book_id,
            title: format!("Chapter {order}"),
            order,
            content: content.to_string(),
            start_page: 1,
            end_page: None,
        }
    }

    #[test]
    fn master_document_is_used_without_an_index() {
        let book = book(
            UploadType::PdfSingle,
            Some("https://res.cloudinary.com/demo/raw/upload/book.pdf"),
        );
        let locator = resolve_locator(&book, &[], None).unwrap();
        assert_eq!(locator, "https://res.cloudinary.com/demo/raw/upload/book.pdf");
    }

    #[test]
    fn chapter_index_selects_by_ordinal_position() {
        let book = book(UploadType::PdfCollection, None);
        let chapters = vec![
            chapter(book.id, 1, "https://res.cloudinary.com/demo/ch1.pdf"),
            chapter(book.id, 2, "https://res.cloudinary.com/demo/ch2.pdf"),
        ];
        let locator = resolve_locator(&book, &chapters, Some(1)).unwrap();
        assert_eq!(locator, "https://res.cloudinary.com/demo/ch2.pdf");
    }

    #[test]
    fn out_of_range_index_falls_back_to_master() {
        let book = book(
            UploadType::PdfSingle,
            Some("https://res.cloudinary.com/demo/master.pdf"),
        );
        let chapters = vec![chapter(book.id, 1, "")];
        let locator = resolve_locator(&book, &chapters, Some(9)).unwrap();
        assert_eq!(locator, "https://res.cloudinary.com/demo/master.pdf");
    }

    #[test]
    fn manual_text_content_is_never_fetchable() {
        let book = book(UploadType::ManualText, None);
        let chapters = vec![chapter(book.id, 1, "<p>Call me Ishmael.</p>")];
        assert_eq!(
            resolve_locator(&book, &chapters, Some(0)),
            Err(LocatorError::NotStreamable)
        );
        assert_eq!(
            resolve_locator(&book, &chapters, None),
            Err(LocatorError::NotStreamable)
        );
    }

    #[test]
    fn missing_or_relative_locators_are_refused() {
        let book_without_master = book(UploadType::PdfSingle, None);
        assert_eq!(
            resolve_locator(&book_without_master, &[], None),
            Err(LocatorError::Missing)
        );

        let book_with_path = book(UploadType::PdfSingle, Some("/uploads/book.pdf"));
        assert_eq!(
            resolve_locator(&book_with_path, &[], None),
            Err(LocatorError::Missing)
        );

        // A pointer chapter of a single-PDF book carries no locator of its
        // own; addressing it directly is a miss, not a master fallback.
        let book_with_master = book(
            UploadType::PdfSingle,
            Some("https://res.cloudinary.com/demo/master.pdf"),
        );
        let pointer = vec![chapter(book_with_master.id, 1, "")];
        assert_eq!(
            resolve_locator(&book_with_master, &pointer, Some(0)),
            Err(LocatorError::Missing)
        );
    }

    #[test]
    fn trusted_origin_matches_host_and_subdomains() {
        let trusted = TrustedOrigin::new("cloudinary.com");
        let allowed = [
            "https://cloudinary.com/x.pdf",
            "https://res.cloudinary.com/demo/x.pdf",
            "https://RES.CLOUDINARY.COM/demo/x.pdf",
        ];
        for locator in allowed {
            assert!(trusted.permits(&Url::parse(locator).unwrap()), "{locator}");
        }
    }

    #[test]
    fn trusted_domain_in_path_or_suffix_does_not_count() {
        let trusted = TrustedOrigin::new("cloudinary.com");
        let blocked = [
            "https://evil.com/cloudinary.com/x.pdf",
            "https://evil.com/?u=cloudinary.com",
            "https://cloudinary.com.evil.com/x.pdf",
            "https://notcloudinary.com/x.pdf",
        ];
        for locator in blocked {
            assert!(!trusted.permits(&Url::parse(locator).unwrap()), "{locator}");
        }
    }

    #[test]
    fn plain_http_is_upgraded_to_https() {
        let url = normalize_secure("http://res.cloudinary.com/demo/x.pdf").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("res.cloudinary.com"));

        let url = normalize_secure("https://res.cloudinary.com/demo/x.pdf").unwrap();
        assert_eq!(url.scheme(), "https");
    }
}
