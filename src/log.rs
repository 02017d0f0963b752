use tracing_subscriber::EnvFilter;

/// Crates whose events follow the configured level
const TARGETS: &[&str] = &["onair", "studio", "http_log", "auth", "storage"];

fn directives(level: &str) -> String {
    let mut parts: Vec<String> = TARGETS.iter().map(|t| format!("{t}={level}")).collect();
    // query logging from the database layer is noise at info
    parts.push("sea_orm=warn".to_string());
    parts.push("sqlx=warn".to_string());
    parts.join(",")
}

pub fn set(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(level))),
        )
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();
}
