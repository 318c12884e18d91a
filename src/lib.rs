//! # exiftool-async
//!
//! An async Rust wrapper for Phil Harvey's ExifTool command-line application.
//!
//! One long-running ExifTool process is kept in stay-open mode and shared by
//! every clone of the [`ExifTool`] handle. Requests made concurrently from
//! many tasks are queued and answered in order; crashes, hangs and recycling
//! of the process are handled behind the handle.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use exiftool_async::{ExifTool, ExifToolError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ExifToolError> {
//!     let exiftool = ExifTool::new().await?; // Starts the background ExifTool process
//!     println!("ExifTool {}", exiftool.version().await?);
//!
//!     // Flat metadata; problems with the file end up in `tags.errors`
//!     let tags = exiftool.read("path/to/your/image.jpg").await?;
//!     if let Some(error) = tags.errors.first() {
//!         eprintln!("exiftool: {error}");
//!     }
//!     println!("Make: {:?}", tags.get_str("Make"));
//!
//!     // Read binary data (e.g., thumbnail)
//!     let thumbnail = exiftool
//!         .read_binary("path/to/your/image.jpg", "ThumbnailImage")
//!         .await?;
//!     println!("Read {} bytes for thumbnail", thumbnail.len());
//!
//!     // Waits for pending requests, then stops the process
//!     exiftool.end().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Typed tags
//!
//! [`tags`] holds structs generated by the `mktags` binary from sample images:
//!
//! ```no_run
//! use exiftool_async::tags::{FlatTags, TagGroups};
//! use exiftool_async::{ExifTool, ExifToolError};
//!
//! # async fn run() -> Result<(), ExifToolError> {
//! let exiftool = ExifTool::new().await?;
//!
//! let flat: FlatTags = exiftool.read("data/image.jpg").await?.ensure_ok()?.into_typed()?;
//! println!("Taken: {:?}", flat.exif.date_time_original);
//!
//! let grouped: TagGroups = exiftool.read_grouped("data/image.jpg").await?.into_typed()?;
//! println!("GPS date: {:?}", grouped.exif.and_then(|exif| exif.gps_date_stamp));
//! # Ok(())
//! # }
//! ```

mod config;
mod correlator;
mod error;
mod exiftool;
mod metadata;
mod protocol;
mod supervisor;
mod worker;

pub mod datetime;
pub mod de;
pub mod mktags;
pub mod tags;

pub use config::{ExifToolConfig, EXIFTOOL_PATH_ENV};
pub use correlator::RawResponse;
pub use datetime::{ExifDate, ExifDateTime, ExifTime, ParseDateTimeError};
pub use error::ExifToolError;
pub use exiftool::ExifTool;
pub use metadata::{GroupedTags, Tags};
