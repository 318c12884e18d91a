use assert_matches::assert_matches;
use exiftool_async::tags::{FlatTags, TagGroups};
use exiftool_async::{ExifDate, ExifTool, ExifToolConfig, ExifToolError};
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

const FAKE_EXIFTOOL: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/fake_exiftool.sh");

fn fake_config() -> ExifToolConfig {
    let script = Path::new(FAKE_EXIFTOOL);
    fs::set_permissions(script, fs::Permissions::from_mode(0o755)).expect("chmod fake exiftool");
    ExifToolConfig::default()
        .with_executable(script)
        .with_task_timeout(Duration::from_secs(5))
        .with_shutdown_timeout(Duration::from_secs(1))
}

async fn fake_exiftool() -> Result<ExifTool, ExifToolError> {
    ExifTool::with_config(fake_config()).await
}

/// A temp dir with `names` as (non-empty) files.
fn images(names: &[&str]) -> (TempDir, Vec<PathBuf>) {
    let dir = tempfile::tempdir().expect("temp dir");
    let paths = names
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            fs::write(&path, b"not really a jpeg").expect("write image");
            path
        })
        .collect();
    (dir, paths)
}

#[tokio::test]
async fn test_version() -> Result<(), ExifToolError> {
    let et = fake_exiftool().await?;
    assert_eq!(et.version().await?, "10.30");
    et.end().await;
    Ok(())
}

#[tokio::test]
async fn test_version_is_cached() -> Result<(), ExifToolError> {
    let et = ExifTool::with_config(fake_config().with_max_restarts_per_minute(0)).await?;
    assert_eq!(et.version().await?, "10.30");

    // No more workers can be started after this crash.
    assert_matches!(
        et.execute(&["-crash"]).await,
        Err(ExifToolError::ProcessTerminated { .. })
    );
    assert_matches!(
        et.execute(&["-ver"]).await,
        Err(ExifToolError::RestartLimit { restarts: 1 })
    );
    assert_eq!(et.version().await?, "10.30");
    et.end().await;
    Ok(())
}

#[tokio::test]
async fn test_spawn_failed() {
    let config = ExifToolConfig::default().with_executable("/nonexistent/exiftool");
    let result = ExifTool::with_config(config).await;
    assert_matches!(
        result,
        Err(ExifToolError::SpawnFailed { executable, .. }) if executable == Path::new("/nonexistent/exiftool")
    );
}

#[tokio::test]
async fn test_read_missing_file() -> Result<(), ExifToolError> {
    let et = fake_exiftool().await?;
    let tags = et.read("bogus").await?;
    assert_eq!(tags.source_file, "bogus");
    assert!(tags.errors[0].contains("File not found"));
    assert!(tags.is_empty());
    assert_eq!(tags.command, "-json bogus");

    assert_matches!(
        tags.ensure_ok(),
        Err(ExifToolError::FileNotFound { path, command })
            if path == Path::new("bogus") && command == "-json bogus"
    );

    let grouped = et.read_grouped("bogus").await?;
    assert_matches!(
        grouped.ensure_ok(),
        Err(ExifToolError::FileNotFound { command, .. }) if command == "-json -g bogus"
    );
    et.end().await;
    Ok(())
}

#[tokio::test]
async fn test_read() -> Result<(), ExifToolError> {
    let (_dir, paths) = images(&["image.jpg"]);
    let et = fake_exiftool().await?;

    let tags = et.read(&paths[0]).await?.ensure_ok()?;
    assert_eq!(tags.source_file, paths[0].to_string_lossy());
    assert!(tags.errors.is_empty());
    assert!(tags.warnings.is_empty());
    assert_eq!(tags.get_str("Make"), Some("Huawei"));
    assert_eq!(tags.get("ImageWidth"), Some(&json!(2688)));
    assert_eq!(tags.get_as::<u32>("ImageWidth")?, Some(2688));

    let taken = tags.date_time("DateTimeOriginal").expect("DateTimeOriginal");
    assert_eq!(taken.to_string(), "2017:08:01 16:20:43");
    assert_eq!(taken.offset, None);
    assert_eq!(tags.date("GPSDateStamp").map(|d| d.to_string()).as_deref(), Some("2017:08:01"));
    assert_eq!(tags.time("GPSTimeStamp").map(|t| t.to_string()).as_deref(), Some("14:20:41"));

    let flat: FlatTags = tags.into_typed()?;
    assert_eq!(flat.source_file, paths[0].to_string_lossy());
    assert_eq!(flat.exif.make.as_deref(), Some("Huawei"));
    assert_eq!(flat.exif.model.as_deref(), Some("Nexus 6P"));
    assert_eq!(flat.composite.image_size.as_deref(), Some("2688x1512"));
    assert_eq!(flat.exif_tool.exif_tool_version, Some(10.3));
    assert_eq!(flat.file.file_name.as_deref(), Some("image.jpg"));

    et.end().await;
    Ok(())
}

#[tokio::test]
async fn test_read_grouped() -> Result<(), ExifToolError> {
    let (_dir, paths) = images(&["image.jpg"]);
    let et = fake_exiftool().await?;

    let grouped = et.read_grouped(&paths[0]).await?.ensure_ok()?;
    assert_eq!(grouped.get("EXIF", "Model"), Some(&json!("Nexus 6P")));
    assert_eq!(grouped.get("File", "FileName"), Some(&json!("image.jpg")));
    assert!(grouped
        .qualified()
        .any(|(tag, value)| tag == "Composite:ImageSize" && value == &json!("2688x1512")));

    let typed: TagGroups = grouped.into_typed()?;
    let exif = typed.exif.expect("EXIF group");
    assert_eq!(exif.make.as_deref(), Some("Huawei"));
    assert_eq!(exif.image_width, Some(2688));
    assert_eq!(exif.gps_date_stamp, "2017:08:01".parse::<ExifDate>().ok());
    assert!(exif.date_time_original.is_some());
    assert_eq!(
        typed.file.and_then(|file| file.file_size).as_deref(),
        Some("1196 kB")
    );
    assert!(typed.jfif.is_none());

    et.end().await;
    Ok(())
}

#[tokio::test]
async fn test_warnings() -> Result<(), ExifToolError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("warn.jpg");
    fs::write(&path, b"WARN")?;
    let et = fake_exiftool().await?;

    let tags = et.read(&path).await?.ensure_ok()?;
    assert_eq!(
        tags.warnings,
        vec![format!("Bad MakerNotes offsets - {}", path.display())]
    );

    let grouped = et.read_grouped(&path).await?;
    assert!(grouped.warnings.contains(&"Bad MakerNotes offsets".to_string()));
    assert_eq!(grouped.warnings.len(), 2);
    assert!(grouped
        .group("ExifTool")
        .is_some_and(|tags| !tags.contains_key("Warning")));

    et.end().await;
    Ok(())
}

#[tokio::test]
async fn test_read_batch() -> Result<(), ExifToolError> {
    let (dir, mut paths) = images(&["one.jpg", "two.jpg", "three.jpg"]);
    paths.insert(1, dir.path().join("missing.jpg"));
    let et = fake_exiftool().await?;

    let results = et.read_batch(&paths).await?;
    assert_eq!(results.len(), 4);
    for (tags, path) in results.iter().zip(&paths) {
        assert_eq!(tags.source_file, path.to_string_lossy());
    }
    assert_eq!(results[0].get_str("FileName"), Some("one.jpg"));
    assert_eq!(results[2].get_str("FileName"), Some("two.jpg"));
    assert_eq!(results[3].get_str("FileName"), Some("three.jpg"));

    assert!(results[1].is_empty());
    assert_eq!(results[1].errors.len(), 1);
    assert!(results[1].errors[0].contains("File not found"));
    assert!(results
        .iter()
        .enumerate()
        .all(|(i, tags)| i == 1 || tags.errors.is_empty()));

    assert!(et.read_batch(Vec::<PathBuf>::new()).await?.is_empty());
    et.end().await;
    Ok(())
}

#[tokio::test]
async fn test_read_tags() -> Result<(), ExifToolError> {
    #[derive(Deserialize, Debug, PartialEq)]
    #[serde(rename_all = "PascalCase")]
    struct CameraInfo {
        make: String,
        model: String,
        image_width: u32,
        software: Option<String>,
    }

    let (dir, paths) = images(&["image.jpg"]);
    let et = fake_exiftool().await?;

    let info: CameraInfo = et
        .read_tags(&paths[0], &["Make", "Model", "ImageWidth", "Software"])
        .await?;
    assert_eq!(
        info,
        CameraInfo {
            make: "Huawei".to_string(),
            model: "Nexus 6P".to_string(),
            image_width: 2688,
            software: None,
        }
    );

    let missing = dir.path().join("missing.jpg");
    assert_matches!(
        et.read_tags::<CameraInfo>(&missing, &["Make"]).await,
        Err(ExifToolError::FileNotFound { path, .. }) if path == missing
    );

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "PascalCase")]
    struct Wrong {
        #[allow(dead_code)]
        make: u32,
    }
    assert_matches!(
        et.read_tags::<Wrong>(&paths[0], &["Make"]).await,
        Err(ExifToolError::Deserialization { path, .. }) if path == "Make"
    );

    et.end().await;
    Ok(())
}

#[tokio::test]
async fn test_read_binary() -> Result<(), ExifToolError> {
    let (dir, paths) = images(&["image.jpg"]);
    // No trailing newline: the sentinel directly follows the data.
    let thumbnail = b"\xFF\xD8\xFF\xE0\x00\x10JFIF\n\r\n\x00\xFF\xD9".to_vec();
    fs::write(dir.path().join("image.jpg.thumb"), &thumbnail)?;
    let et = fake_exiftool().await?;

    assert_eq!(et.read_binary(&paths[0], "ThumbnailImage").await?, thumbnail);
    assert_matches!(
        et.read_binary(&paths[0], "PreviewImage").await,
        Err(ExifToolError::TagNotFound { tag, .. }) if tag == "PreviewImage"
    );
    assert_matches!(
        et.read_binary(dir.path().join("missing.jpg"), "ThumbnailImage").await,
        Err(ExifToolError::FileNotFound { .. })
    );

    et.end().await;
    Ok(())
}

#[tokio::test]
async fn test_execute_raw() -> Result<(), ExifToolError> {
    let et = fake_exiftool().await?;

    let response = et.execute(&["-ver"]).await?;
    assert_eq!(response.stdout, b"10.30\n");
    assert!(response.stderr.is_empty());

    let response = et.execute(&["-json", "bogus"]).await?;
    assert!(response.stdout.is_empty());
    assert_eq!(response.stderr, vec!["Error: File not found - bogus".to_string()]);

    assert_matches!(
        et.execute(&["-ver\n-crash"]).await,
        Err(ExifToolError::InvalidArgument { arg }) if arg == "-ver\n-crash"
    );
    // The worker is still usable after a rejected argument.
    assert_eq!(et.execute(&["-ver"]).await?.stdout, b"10.30\n");

    et.end().await;
    Ok(())
}

#[tokio::test]
async fn test_common_args() -> Result<(), ExifToolError> {
    let et = ExifTool::with_config(fake_config().with_common_args(["-echo", "common"])).await?;
    let response = et.execute(&["-ver"]).await?;
    assert_eq!(response.stdout, b"common\n10.30\n");
    et.end().await;
    Ok(())
}

#[tokio::test]
async fn test_concurrent_reads_with_recycling() -> Result<(), ExifToolError> {
    let names: Vec<String> = (0..20).map(|i| format!("img{i:02}.jpg")).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let (_dir, paths) = images(&names);
    let et = ExifTool::with_config(fake_config().with_max_tasks_per_process(3)).await?;

    let reads = paths.iter().map(|path| {
        let et = et.clone();
        let path = path.clone();
        tokio::spawn(async move { et.read(&path).await })
    });
    let results = futures::future::join_all(reads).await;

    for (result, path) in results.into_iter().zip(&paths) {
        let tags = result.expect("task panicked")?.ensure_ok()?;
        assert_eq!(tags.source_file, path.to_string_lossy());
    }
    assert_eq!(et.version().await?, "10.30");
    et.end().await;
    Ok(())
}

#[tokio::test]
async fn test_restart_after_crash() -> Result<(), ExifToolError> {
    let et = fake_exiftool().await?;
    assert_eq!(et.version().await?, "10.30");

    assert_matches!(
        et.execute(&["-crash"]).await,
        Err(ExifToolError::ProcessTerminated { command }) if command == "-crash"
    );
    let response = et.execute(&["-ver"]).await?;
    assert_eq!(response.stdout, b"10.30\n");

    et.end().await;
    Ok(())
}

#[tokio::test]
async fn test_restart_limit() -> Result<(), ExifToolError> {
    let et = ExifTool::with_config(fake_config().with_max_restarts_per_minute(1)).await?;

    for _ in 0..2 {
        assert_matches!(
            et.execute(&["-crash"]).await,
            Err(ExifToolError::ProcessTerminated { .. })
        );
    }
    assert_matches!(
        et.execute(&["-ver"]).await,
        Err(ExifToolError::RestartLimit { restarts: 2 })
    );

    et.end().await;
    Ok(())
}

#[tokio::test]
async fn test_timeout_then_recover() -> Result<(), ExifToolError> {
    let config = fake_config().with_task_timeout(Duration::from_millis(300));
    let et = ExifTool::with_config(config).await?;

    assert_matches!(
        et.execute(&["-sleep", "3", "-ver"]).await,
        Err(ExifToolError::Timeout { timeout, .. }) if timeout == Duration::from_millis(300)
    );
    let response = et.execute(&["-ver"]).await?;
    assert_eq!(response.stdout, b"10.30\n");

    et.end().await;
    Ok(())
}

#[tokio::test]
async fn test_timeout_on_recycled_worker() -> Result<(), ExifToolError> {
    let config = fake_config()
        .with_task_timeout(Duration::from_millis(300))
        .with_max_tasks_per_process(1);
    let et = ExifTool::with_config(config).await?;

    // The worker is retired right after this request is written.
    let started = Instant::now();
    assert_matches!(
        et.execute(&["-sleep", "2", "-ver"]).await,
        Err(ExifToolError::Timeout { timeout, .. }) if timeout == Duration::from_millis(300)
    );
    assert!(started.elapsed() < Duration::from_secs(1), "took {:?}", started.elapsed());

    let response = et.execute(&["-ver"]).await?;
    assert_eq!(response.stdout, b"10.30\n");
    et.end().await;
    Ok(())
}

#[tokio::test]
async fn test_crash_after_stdout_only() -> Result<(), ExifToolError> {
    let et = fake_exiftool().await?;

    assert_matches!(
        et.execute(&["-half_crash"]).await,
        Err(ExifToolError::ProcessTerminated { command }) if command == "-half_crash"
    );
    assert_eq!(et.version().await?, "10.30");
    et.end().await;
    Ok(())
}

#[tokio::test]
async fn test_end_drains_pending_requests() -> Result<(), ExifToolError> {
    let (_dir, paths) = images(&["a.jpg", "b.jpg"]);
    let et = fake_exiftool().await?;

    let mut first = Box::pin(et.read(&paths[0]));
    let mut second = Box::pin(et.execute(&["-sleep", "0.2", "-ver"]));
    // Queue both requests before shutting down.
    assert!(futures::poll!(&mut first).is_pending());
    assert!(futures::poll!(&mut second).is_pending());

    let ((), first, second) = tokio::join!(et.end(), first, second);
    assert_eq!(first?.get_str("FileName"), Some("a.jpg"));
    assert_eq!(second?.stdout, b"10.30\n");

    assert!(et.is_ended());
    assert_matches!(et.read(&paths[1]).await, Err(ExifToolError::Ended));
    assert_matches!(et.version().await, Err(ExifToolError::Ended));

    // Ending twice is fine.
    et.end().await;
    Ok(())
}

#[tokio::test]
async fn test_is_ended_once_end_is_called() -> Result<(), ExifToolError> {
    let et = fake_exiftool().await?;
    assert!(!et.is_ended());

    let mut ending = Box::pin(et.end());
    let _ = futures::poll!(&mut ending);
    assert!(et.is_ended());
    assert!(et.clone().is_ended());
    ending.await;
    Ok(())
}

#[tokio::test]
async fn test_drop_all_handles() -> Result<(), ExifToolError> {
    let dir = tempfile::tempdir()?;
    let marker = dir.path().join("closed");
    let marker_arg = marker.to_string_lossy().into_owned();
    let config = fake_config().with_common_args(["-marker", marker_arg.as_str()]);

    let et = ExifTool::with_config(config).await?;
    let clone = et.clone();
    drop(et);
    assert_eq!(clone.version().await?, "10.30");
    assert!(!clone.is_ended());
    drop(clone);

    // exiftool is asked to exit with `-stay_open False`, not killed.
    let deadline = Instant::now() + Duration::from_secs(5);
    while !marker.exists() {
        assert!(Instant::now() < deadline, "exiftool was not closed");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(fs::read_to_string(&marker)?, "closed\n");
    Ok(())
}

mod real_exiftool {
    //! These need exiftool on the PATH and the sample image in `data/`.

    use super::*;
    use image::ImageReader;
    use std::io::Cursor;

    fn test_image_path() -> PathBuf {
        PathBuf::from("data/image.jpg")
    }

    #[tokio::test]
    #[ignore = "needs exiftool and data/image.jpg"]
    async fn test_read_real_image() -> Result<(), ExifToolError> {
        let et = ExifTool::new().await?;
        assert!(!et.version().await?.is_empty());

        let tags = et.read(test_image_path()).await?.ensure_ok()?;
        assert_eq!(tags.get_str("Make"), Some("Huawei"));
        assert_eq!(tags.get_str("Model"), Some("Nexus 6P"));

        let missing = et.read("data/non_existent_file.jpg").await?;
        assert!(missing.errors[0].contains("File not found"));
        et.end().await;
        Ok(())
    }

    #[tokio::test]
    #[ignore = "needs exiftool and data/image.jpg"]
    async fn test_read_real_thumbnail() -> Result<(), ExifToolError> {
        let et = ExifTool::new().await?;
        let thumb_bytes = et.read_binary(test_image_path(), "ThumbnailImage").await?;

        let format = ImageReader::new(Cursor::new(&thumb_bytes))
            .with_guessed_format()
            .expect("Cursor never fails")
            .format();
        assert_eq!(format, Some(image::ImageFormat::Jpeg));

        let img = image::load_from_memory(&thumb_bytes).unwrap();
        println!("Thumbnail dimensions: {}x{}", img.width(), img.height());
        et.end().await;
        Ok(())
    }
}
