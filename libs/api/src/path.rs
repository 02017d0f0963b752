use crate::request::PageQuery;

pub const SESSION: &str = "/api/session";
pub const SESSION_START: &str = "/api/session/start";
pub const SESSION_END: &str = "/api/session/end";
pub const SESSION_CURRENT: &str = "/api/session/current";

pub const ARCHIVE: &str = "/api/archive";
pub const ARCHIVE_TRASH: &str = "/api/archive/trash";
pub const ARCHIVE_RESTORE: &str = "/api/archive/restore";
pub const ARCHIVE_VISIBILITY: &str = "/api/archive/visibility";
pub const ARCHIVE_RENAME: &str = "/api/archive/rename";
pub const ARCHIVE_PERMANENT: &str = "/api/archive/permanent/{id}";

pub const CAPTURE: &str = "/api/capture";
pub const CAPTURE_SESSION: &str = "/api/capture/{session}";

pub const STATUS: &str = "/api/status";
pub const STATUS_EVENTS: &str = "/api/status/events";
pub const PUBLIC_ARCHIVE: &str = "/api/public/archive";

/// Paths under this prefix are served without operator credentials
pub const PUBLIC_PREFIXES: [&str; 2] = [STATUS, "/api/public/"];

pub fn archive_permanent(id: &str) -> String {
    ARCHIVE_PERMANENT.replace("{id}", id)
}

pub fn capture(session: &str) -> String {
    CAPTURE_SESSION.replace("{session}", session)
}

pub fn archive_page(qry: PageQuery) -> String {
    let query = serde_html_form::to_string(qry).unwrap_or_default();
    format!("{}?{}", ARCHIVE, query)
}

pub fn public_archive_page(qry: PageQuery) -> String {
    let query = serde_html_form::to_string(qry).unwrap_or_default();
    format!("{}?{}", PUBLIC_ARCHIVE, query)
}

pub fn is_public(path: &str) -> bool {
    PUBLIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Ingest server endpoints, see the WHIP server's stream API
pub mod ingest {
    pub fn whip(base: &str, stream: &str) -> String {
        format!("{}/whip/{}", base.trim_end_matches('/'), stream)
    }

    pub fn streams(base: &str, stream: &str) -> String {
        format!("{}/api/streams/{}", base.trim_end_matches('/'), stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_page_query() {
        let path = archive_page(PageQuery {
            page: Some(2),
            page_size: Some(20),
        });
        assert_eq!(path, "/api/archive?page=2&pageSize=20");

        let path = public_archive_page(PageQuery {
            page: None,
            page_size: None,
        });
        assert_eq!(path, "/api/public/archive?");
    }

    #[test]
    fn test_templated_paths() {
        assert_eq!(archive_permanent("a1"), "/api/archive/permanent/a1");
        assert_eq!(capture("s1"), "/api/capture/s1");
    }

    #[test]
    fn test_public_paths() {
        assert!(is_public(STATUS));
        assert!(is_public(STATUS_EVENTS));
        assert!(is_public(PUBLIC_ARCHIVE));
        assert!(!is_public(ARCHIVE));
        assert!(!is_public(SESSION_CURRENT));
    }

    #[test]
    fn test_ingest_paths() {
        assert_eq!(
            ingest::whip("https://ingest.example.com/", "abc"),
            "https://ingest.example.com/whip/abc"
        );
        assert_eq!(
            ingest::streams("http://127.0.0.1:7777", ""),
            "http://127.0.0.1:7777/api/streams/"
        );
    }
}
