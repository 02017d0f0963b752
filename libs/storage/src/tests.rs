use crate::{create_operator, remove_dir, StorageConfig};

fn fs_operator(root: &std::path::Path) -> opendal::Operator {
    create_operator(&StorageConfig::Fs {
        root: root.to_string_lossy().into_owned(),
    })
    .unwrap()
}

#[test]
fn test_s3_storage_config() {
    let config = StorageConfig::S3 {
        bucket: "test-bucket".to_string(),
        root: "/test".to_string(),
        region: Some("us-east-1".to_string()),
        endpoint: Some("http://localhost:9000".to_string()),
        access_key_id: Some("minioadmin".to_string()),
        secret_access_key: Some("minioadmin".to_string()),
    };

    assert!(create_operator(&config).is_ok());
}

#[test]
fn test_storage_config_from_toml() {
    let config: StorageConfig = toml::from_str(
        r#"
        type = "s3"
        bucket = "archive"
        region = "eu-west-1"
        "#,
    )
    .unwrap();
    match config {
        StorageConfig::S3 { bucket, root, .. } => {
            assert_eq!(bucket, "archive");
            assert_eq!(root, "/");
        }
        _ => panic!("expected s3 config"),
    }

    let config: StorageConfig = toml::from_str(r#"type = "fs""#).unwrap();
    assert_eq!(config, StorageConfig::default());
}

#[tokio::test]
async fn test_remove_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let op = fs_operator(tmp.path());

    op.write("s-01/2024/01/15/segment_001.m4s", vec![1u8; 8])
        .await
        .unwrap();
    op.write("s-01/2024/01/15/init/manifest.mpd", "mpd").await.unwrap();
    op.write("s-02/2024/01/15/segment_001.m4s", vec![2u8; 8])
        .await
        .unwrap();

    let removed = remove_dir(&op, "s-01/2024/01/15").await.unwrap();
    assert_eq!(removed, 2);
    assert!(!op.exists("s-01/2024/01/15/segment_001.m4s").await.unwrap());
    assert!(!op.exists("s-01/2024/01/15/").await.unwrap());
    assert!(op.exists("s-02/2024/01/15/segment_001.m4s").await.unwrap());
}

#[tokio::test]
async fn test_remove_missing_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let op = fs_operator(tmp.path());
    assert_eq!(remove_dir(&op, "nothing/here").await.unwrap(), 0);
}
