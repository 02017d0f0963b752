use anyhow::Result;
use opendal::services;
use opendal::{ErrorKind, Operator};

use crate::config::StorageConfig;

pub fn create_operator(config: &StorageConfig) -> Result<Operator> {
    tracing::debug!("Creating storage operator for config: {:?}", config);

    match config {
        StorageConfig::Fs { root } => {
            tracing::info!("Configuring filesystem storage with root: {}", root);
            let builder = services::Fs::default().root(root);
            Ok(Operator::new(builder)?.finish())
        }
        StorageConfig::S3 {
            bucket,
            root,
            region,
            endpoint,
            access_key_id,
            secret_access_key,
        } => {
            tracing::info!(
                "Configuring S3 storage with bucket: {}, region: {:?}",
                bucket,
                region
            );

            let mut builder = services::S3::default()
                .bucket(bucket)
                .root(root.trim_start_matches('/'));

            if let Some(region) = region {
                builder = builder.region(region);
            }
            if let Some(endpoint) = endpoint {
                builder = builder.endpoint(endpoint);
            }
            if let Some(access_key_id) = access_key_id {
                builder = builder.access_key_id(access_key_id);
            }
            if let Some(secret_access_key) = secret_access_key {
                builder = builder.secret_access_key(secret_access_key);
            }

            Ok(Operator::new(builder)?.finish())
        }
    }
}

/// Remove a directory and everything below it, returns how many files went away.
/// A directory that does not exist counts as already removed.
pub async fn remove_dir(operator: &Operator, dir: &str) -> Result<usize> {
    let dir = format!("{}/", dir.trim_end_matches('/'));

    let entries = match operator.list_with(&dir).recursive(true).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let (mut dirs, files): (Vec<_>, Vec<_>) = entries
        .into_iter()
        .map(|entry| entry.path().to_string())
        .partition(|path| path.ends_with('/'));

    for file in files.iter() {
        operator.delete(file).await?;
        // not every backend lists intermediate directories
        let mut parent = file.as_str();
        while let Some(idx) = parent.trim_end_matches('/').rfind('/') {
            parent = &file[..=idx];
            if parent.len() <= dir.len() {
                break;
            }
            dirs.push(parent.to_string());
        }
    }

    // children before parents
    dirs.retain(|d| d != &dir);
    dirs.sort();
    dirs.dedup();
    dirs.sort_by_key(|d| std::cmp::Reverse(d.len()));
    for d in dirs.iter() {
        operator.delete(d).await?;
    }
    match operator.delete(&dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    tracing::debug!("removed {} files under {}", files.len(), dir);
    Ok(files.len())
}
