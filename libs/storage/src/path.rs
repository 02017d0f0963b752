use chrono::Datelike;

/// Directory the recorder writes a broadcast into.
/// Format: {session}/{year}/{month}/{day}
pub fn recording_dir(session: &str, started_at_ms: i64) -> String {
    let dt = chrono::DateTime::from_timestamp_millis(started_at_ms).unwrap_or_else(chrono::Utc::now);

    format!(
        "{}/{:04}/{:02}/{:02}",
        session,
        dt.year_ce().1,
        dt.month(),
        dt.day(),
    )
}

pub fn thumbnail_path(dir: &str) -> String {
    format!("{}/thumbnail.jpg", dir.trim_end_matches('/'))
}

pub fn validate_path(path: &str) -> bool {
    !path.is_empty() && !path.contains("..") && !path.starts_with('/')
}
