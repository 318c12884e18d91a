use crate::config::ExifToolConfig;
use crate::correlator::RawResponse;
use crate::error::ExifToolError;
use crate::metadata::{self, Diagnostics, GroupedTags, Record, Tags};
use crate::supervisor::{Message, Supervisor};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, OnceCell};

/// Handle to a long-running `exiftool -stay_open` process.
///
/// The handle is cheap to clone and every clone talks to the same process.
/// Requests from all clones are queued and sent to exiftool one after the
/// other, in the order they were made. If exiftool crashes it is restarted
/// on the next request.
///
/// The process is shut down when [`ExifTool::end`] is called or when the
/// last clone is dropped.
#[derive(Debug, Clone)]
pub struct ExifTool {
    tx: mpsc::Sender<Message>,
    stopped: watch::Receiver<bool>,
    ended: Arc<AtomicBool>,
    version: Arc<OnceCell<String>>,
}

impl ExifTool {
    /// Launches `exiftool` (or `$EXIFTOOL_PATH`) in stay-open mode.
    ///
    /// Must be called inside a Tokio runtime. Returns
    /// [`ExifToolError::SpawnFailed`] if the executable can't be started.
    pub async fn new() -> Result<Self, ExifToolError> {
        Self::with_config(ExifToolConfig::from_env()).await
    }

    /// Launches exiftool with custom settings.
    ///
    /// # Example
    /// ```no_run
    /// # use exiftool_async::{ExifTool, ExifToolConfig, ExifToolError};
    /// # use std::time::Duration;
    /// # async fn run() -> Result<(), ExifToolError> {
    /// let config = ExifToolConfig::default()
    ///     .with_executable("/opt/exiftool/exiftool")
    ///     .with_task_timeout(Duration::from_secs(5));
    /// let exiftool = ExifTool::with_config(config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_config(config: ExifToolConfig) -> Result<Self, ExifToolError> {
        let (tx, stopped) = Supervisor::start(config)?;
        Ok(Self {
            tx,
            stopped,
            ended: Arc::new(AtomicBool::new(false)),
            version: Arc::new(OnceCell::new()),
        })
    }

    /// Runs exiftool with the given arguments and returns its raw output.
    ///
    /// Nothing is interpreted: errors exiftool prints end up in
    /// [`RawResponse::stderr`].
    ///
    /// # Example
    /// ```no_run
    /// # use exiftool_async::{ExifTool, ExifToolError};
    /// # async fn run() -> Result<(), ExifToolError> {
    /// let exiftool = ExifTool::new().await?;
    /// let response = exiftool.execute(&["-S", "-FocalLength", "data/image.jpg"]).await?;
    /// println!("{}", String::from_utf8_lossy(&response.stdout));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn execute(&self, args: &[&str]) -> Result<RawResponse, ExifToolError> {
        self.send(args.iter().map(|arg| arg.to_string()).collect())
            .await
    }

    async fn send(&self, args: Vec<String>) -> Result<RawResponse, ExifToolError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Message::Execute { args, reply })
            .await
            .map_err(|_| ExifToolError::Ended)?;
        response.await.map_err(|_| ExifToolError::Ended)?
    }

    /// The exiftool version, e.g. `"12.40"`. Cached after the first call.
    pub async fn version(&self) -> Result<String, ExifToolError> {
        self.version
            .get_or_try_init(|| async {
                let response = self.send(vec!["-ver".to_string()]).await?;
                Ok::<_, ExifToolError>(String::from_utf8(response.stdout)?.trim().to_string())
            })
            .await
            .cloned()
    }

    /// Reads all metadata of a file.
    ///
    /// Runs `exiftool -json {file_path}`. Problems exiftool reports for the
    /// file don't fail the call; they are listed in [`Tags::errors`].
    ///
    /// # Example
    /// ```no_run
    /// # use exiftool_async::{ExifTool, ExifToolError};
    /// # async fn run() -> Result<(), ExifToolError> {
    /// let exiftool = ExifTool::new().await?;
    /// let tags = exiftool.read("data/image.jpg").await?.ensure_ok()?;
    /// println!("Make: {:?}", tags.get_str("Make"));
    /// println!("Taken: {:?}", tags.date_time("DateTimeOriginal"));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn read(&self, file_path: impl AsRef<Path>) -> Result<Tags, ExifToolError> {
        self.read_with_args(file_path, &[]).await
    }

    /// Like [`ExifTool::read`] with extra arguments such as `-n` or `-Make`.
    ///
    /// Runs `exiftool -json {extra_args...} {file_path}`.
    pub async fn read_with_args(
        &self,
        file_path: impl AsRef<Path>,
        extra_args: &[&str],
    ) -> Result<Tags, ExifToolError> {
        self.read_one(file_path.as_ref(), extra_args).await
    }

    /// Reads all metadata of a file, namespaced by group (`EXIF`, `IPTC`, `File`, ...).
    ///
    /// Runs `exiftool -json -g {file_path}`.
    ///
    /// # Example
    /// ```no_run
    /// # use exiftool_async::{ExifTool, ExifToolError};
    /// # use exiftool_async::tags::TagGroups;
    /// # async fn run() -> Result<(), ExifToolError> {
    /// let exiftool = ExifTool::new().await?;
    /// let grouped = exiftool.read_grouped("data/image.jpg").await?;
    /// println!("Model: {:?}", grouped.get("EXIF", "Model"));
    ///
    /// let typed: TagGroups = grouped.into_typed()?;
    /// println!("Width: {:?}", typed.exif.and_then(|exif| exif.image_width));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn read_grouped(
        &self,
        file_path: impl AsRef<Path>,
    ) -> Result<GroupedTags, ExifToolError> {
        self.read_one(file_path.as_ref(), &["-g"]).await
    }

    /// Reads many files with a single exiftool command.
    ///
    /// Returns one [`Tags`] per path, in the same order. Errors exiftool
    /// prints about a file are attached to that file's [`Tags::errors`].
    pub async fn read_batch<I, P>(&self, file_paths: I) -> Result<Vec<Tags>, ExifToolError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths: Vec<String> = file_paths
            .into_iter()
            .map(|path| path_arg(path.as_ref()))
            .collect();
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        self.read_records(&paths, &[]).await
    }

    /// Reads selected tags and deserializes them into `T`.
    ///
    /// Runs `exiftool -json {-TAG...} {file_path}`. Fails with
    /// [`ExifToolError::FileNotFound`] or [`ExifToolError::ExifTool`] if
    /// exiftool reported an error for the file.
    ///
    /// # Example
    /// ```no_run
    /// # use exiftool_async::{ExifTool, ExifToolError};
    /// # use serde::Deserialize;
    /// #[derive(Deserialize, Debug)]
    /// #[serde(rename_all = "PascalCase")]
    /// struct Camera {
    ///     make: String,
    ///     model: String,
    ///     image_width: Option<u32>,
    /// }
    ///
    /// # async fn run() -> Result<(), ExifToolError> {
    /// let exiftool = ExifTool::new().await?;
    /// let camera: Camera = exiftool
    ///     .read_tags("data/image.jpg", &["Make", "Model", "ImageWidth"])
    ///     .await?;
    /// println!("{camera:?}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn read_tags<T: DeserializeOwned>(
        &self,
        file_path: impl AsRef<Path>,
        tags: &[&str],
    ) -> Result<T, ExifToolError> {
        let tag_args: Vec<String> = tags.iter().map(|tag| format!("-{tag}")).collect();
        let tag_args: Vec<&str> = tag_args.iter().map(String::as_str).collect();
        self.read_with_args(file_path, &tag_args)
            .await?
            .ensure_ok()?
            .into_typed()
    }

    /// Reads a binary tag such as `ThumbnailImage` or `PreviewImage`.
    ///
    /// Runs `exiftool -b -TAG {file_path}`. Returns
    /// [`ExifToolError::TagNotFound`] if the tag has no data.
    ///
    /// # Example
    /// ```no_run
    /// # use exiftool_async::{ExifTool, ExifToolError};
    /// # async fn run() -> Result<(), ExifToolError> {
    /// let exiftool = ExifTool::new().await?;
    /// let thumbnail = exiftool.read_binary("data/image.jpg", "ThumbnailImage").await?;
    /// std::fs::write("thumbnail.jpg", thumbnail)?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn read_binary(
        &self,
        file_path: impl AsRef<Path>,
        tag: &str,
    ) -> Result<Vec<u8>, ExifToolError> {
        let file_path = file_path.as_ref();
        let args = vec!["-b".to_string(), format!("-{tag}"), path_arg(file_path)];
        let command = args.join(" ");

        let response = self.send(args).await?;
        if let Some(err) = Diagnostics::from_stderr(&response.stderr).into_error(&command) {
            return Err(err);
        }
        if response.stdout.is_empty() {
            return Err(ExifToolError::TagNotFound {
                path: file_path.to_path_buf(),
                tag: tag.to_string(),
            });
        }
        Ok(response.stdout)
    }

    /// Shuts exiftool down.
    ///
    /// Requests made before `end` still complete; later ones fail with
    /// [`ExifToolError::Ended`]. Resolves once the process has exited.
    /// Calling it again is a no-op.
    pub async fn end(&self) {
        self.ended.store(true, Ordering::Release);
        if self.tx.send(Message::Shutdown).await.is_err() {
            log::debug!("exiftool is already shutting down");
        }
        let mut stopped = self.stopped.clone();
        // Err means the supervisor is gone, which is just as final.
        let _ = stopped.wait_for(|stopped| *stopped).await;
    }

    /// Whether [`ExifTool::end`] was called, or the process is shutting down for another reason.
    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire) || self.tx.is_closed()
    }

    async fn read_one<R: Record>(
        &self,
        file_path: &Path,
        extra_args: &[&str],
    ) -> Result<R, ExifToolError> {
        let path = path_arg(file_path);
        let mut parts = vec!["-json"];
        parts.extend_from_slice(extra_args);
        parts.push(&path);
        let command = parts.join(" ");
        let records = self
            .read_records(std::slice::from_ref(&path), extra_args)
            .await?;
        records
            .into_iter()
            .next()
            .ok_or(ExifToolError::UnexpectedFormat { path, command })
    }

    async fn read_records<R: Record>(
        &self,
        paths: &[String],
        extra_args: &[&str],
    ) -> Result<Vec<R>, ExifToolError> {
        let mut args = Vec::with_capacity(1 + extra_args.len() + paths.len());
        args.push("-json".to_string());
        args.extend(extra_args.iter().map(|arg| arg.to_string()));
        args.extend(paths.iter().cloned());
        let command = args.join(" ");

        let response = self.send(args).await?;
        let diagnostics = Diagnostics::from_stderr(&response.stderr);
        metadata::assemble(paths, &response.stdout, diagnostics, &command)
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
