//! Typed tags, generated by `mktags` from sample images.
//!
//! Regenerate with `cargo run --bin mktags -- IMG_DIR`. Do not edit by hand.

use crate::datetime::{ExifDate, ExifDateTime, ExifTime};
use serde::Deserialize;

/// `Composite` tags.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompositeTags {
    /// `2.0`
    #[serde(rename = "Aperture", default, deserialize_with = "crate::de::float")]
    pub aperture: Option<f64>,
    /// `"4.7 mm"`
    #[serde(rename = "FocalLength35efl", default, deserialize_with = "crate::de::string")]
    pub focal_length35efl: Option<String>,
    /// `"0 m Above Sea Level"`
    #[serde(rename = "GPSAltitude", default, deserialize_with = "crate::de::string")]
    pub gps_altitude: Option<String>,
    /// `"2017:08:01 14:20:41Z"`
    #[serde(rename = "GPSDateTime", default, deserialize_with = "crate::de::lenient")]
    pub gps_date_time: Option<ExifDateTime>,
    /// `"37 deg 46' 37.42\" N"`
    #[serde(rename = "GPSLatitude", default, deserialize_with = "crate::de::string")]
    pub gps_latitude: Option<String>,
    /// `"122 deg 25' 9.85\" W"`
    #[serde(rename = "GPSLongitude", default, deserialize_with = "crate::de::string")]
    pub gps_longitude: Option<String>,
    /// `"37 deg 46' 37.42\" N, 122 deg 25' 9.85\" W"`
    #[serde(rename = "GPSPosition", default, deserialize_with = "crate::de::string")]
    pub gps_position: Option<String>,
    /// `"2688x1512"`
    #[serde(rename = "ImageSize", default, deserialize_with = "crate::de::string")]
    pub image_size: Option<String>,
    /// `13.3`
    #[serde(rename = "LightValue", default, deserialize_with = "crate::de::float")]
    pub light_value: Option<f64>,
    /// `4.1`
    #[serde(rename = "Megapixels", default, deserialize_with = "crate::de::float")]
    pub megapixels: Option<f64>,
    /// `"1/1000"`
    #[serde(rename = "ShutterSpeed", default, deserialize_with = "crate::de::string")]
    pub shutter_speed: Option<String>,
    /// `"2017:08:01 16:20:43.123"`
    #[serde(rename = "SubSecDateTimeOriginal", default, deserialize_with = "crate::de::lenient")]
    pub sub_sec_date_time_original: Option<ExifDateTime>,
}

/// `EXIF` tags.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EXIFTags {
    /// `2.0`
    #[serde(rename = "ApertureValue", default, deserialize_with = "crate::de::float")]
    pub aperture_value: Option<f64>,
    /// `"sRGB"`
    #[serde(rename = "ColorSpace", default, deserialize_with = "crate::de::string")]
    pub color_space: Option<String>,
    /// `"2017:08:01 16:20:43"`
    #[serde(rename = "DateTimeOriginal", default, deserialize_with = "crate::de::lenient")]
    pub date_time_original: Option<ExifDateTime>,
    /// `1512`
    #[serde(rename = "ExifImageHeight", default, deserialize_with = "crate::de::integer")]
    pub exif_image_height: Option<i64>,
    /// `2688`
    #[serde(rename = "ExifImageWidth", default, deserialize_with = "crate::de::integer")]
    pub exif_image_width: Option<i64>,
    /// `"1/1000"`
    #[serde(rename = "ExposureTime", default, deserialize_with = "crate::de::string")]
    pub exposure_time: Option<String>,
    /// `2.0`
    #[serde(rename = "FNumber", default, deserialize_with = "crate::de::float")]
    pub f_number: Option<f64>,
    /// `"Off, Did not fire"`
    #[serde(rename = "Flash", default, deserialize_with = "crate::de::string")]
    pub flash: Option<String>,
    /// `"4.7 mm"`
    #[serde(rename = "FocalLength", default, deserialize_with = "crate::de::string")]
    pub focal_length: Option<String>,
    /// `"0 m"`
    #[serde(rename = "GPSAltitude", default, deserialize_with = "crate::de::string")]
    pub gps_altitude: Option<String>,
    /// `"2017:08:01"`
    #[serde(rename = "GPSDateStamp", default, deserialize_with = "crate::de::lenient")]
    pub gps_date_stamp: Option<ExifDate>,
    /// `"37 deg 46' 37.42\""`
    #[serde(rename = "GPSLatitude", default, deserialize_with = "crate::de::string")]
    pub gps_latitude: Option<String>,
    /// `"14:20:41"`
    #[serde(rename = "GPSTimeStamp", default, deserialize_with = "crate::de::lenient")]
    pub gps_time_stamp: Option<ExifTime>,
    /// `100`
    #[serde(rename = "ISO", default, deserialize_with = "crate::de::integer")]
    pub iso: Option<i64>,
    /// `1512`
    #[serde(rename = "ImageHeight", default, deserialize_with = "crate::de::integer")]
    pub image_height: Option<i64>,
    /// `2688`
    #[serde(rename = "ImageWidth", default, deserialize_with = "crate::de::integer")]
    pub image_width: Option<i64>,
    /// `"Huawei"`
    #[serde(rename = "Make", default, deserialize_with = "crate::de::string")]
    pub make: Option<String>,
    /// `"Nexus 6P"`
    #[serde(rename = "Model", default, deserialize_with = "crate::de::string")]
    pub model: Option<String>,
    /// `"2017:08:01 16:20:43"`
    #[serde(rename = "ModifyDate", default, deserialize_with = "crate::de::lenient")]
    pub modify_date: Option<ExifDateTime>,
    /// `"Horizontal (normal)"`
    #[serde(rename = "Orientation", default, deserialize_with = "crate::de::string")]
    pub orientation: Option<String>,
    /// `"inches"`
    #[serde(rename = "ResolutionUnit", default, deserialize_with = "crate::de::string")]
    pub resolution_unit: Option<String>,
    /// `72`
    #[serde(rename = "XResolution", default, deserialize_with = "crate::de::integer")]
    pub x_resolution: Option<i64>,
    /// `72`
    #[serde(rename = "YResolution", default, deserialize_with = "crate::de::integer")]
    pub y_resolution: Option<i64>,
}

/// `ExifTool` tags.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExifToolTags {
    /// `10.55`
    #[serde(rename = "ExifToolVersion", default, deserialize_with = "crate::de::float")]
    pub exif_tool_version: Option<f64>,
}

/// `File` tags.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FileTags {
    /// `8`
    #[serde(rename = "BitsPerSample", default, deserialize_with = "crate::de::integer")]
    pub bits_per_sample: Option<i64>,
    /// `3`
    #[serde(rename = "ColorComponents", default, deserialize_with = "crate::de::integer")]
    pub color_components: Option<i64>,
    /// `"data"`
    #[serde(rename = "Directory", default, deserialize_with = "crate::de::string")]
    pub directory: Option<String>,
    /// `"Baseline DCT, Huffman coding"`
    #[serde(rename = "EncodingProcess", default, deserialize_with = "crate::de::string")]
    pub encoding_process: Option<String>,
    /// `"2017:08:03 10:12:01-07:00"`
    #[serde(rename = "FileAccessDate", default, deserialize_with = "crate::de::lenient")]
    pub file_access_date: Option<ExifDateTime>,
    /// `"2017:08:01 16:20:43-07:00"`
    #[serde(rename = "FileModifyDate", default, deserialize_with = "crate::de::lenient")]
    pub file_modify_date: Option<ExifDateTime>,
    /// `"image.jpg"`
    #[serde(rename = "FileName", default, deserialize_with = "crate::de::string")]
    pub file_name: Option<String>,
    /// `"rw-r--r--"`
    #[serde(rename = "FilePermissions", default, deserialize_with = "crate::de::string")]
    pub file_permissions: Option<String>,
    /// `"1196 kB"`
    #[serde(rename = "FileSize", default, deserialize_with = "crate::de::string")]
    pub file_size: Option<String>,
    /// `"JPEG"`
    #[serde(rename = "FileType", default, deserialize_with = "crate::de::string")]
    pub file_type: Option<String>,
    /// `"jpg"`
    #[serde(rename = "FileTypeExtension", default, deserialize_with = "crate::de::string")]
    pub file_type_extension: Option<String>,
    /// `1512`
    #[serde(rename = "ImageHeight", default, deserialize_with = "crate::de::integer")]
    pub image_height: Option<i64>,
    /// `2688`
    #[serde(rename = "ImageWidth", default, deserialize_with = "crate::de::integer")]
    pub image_width: Option<i64>,
    /// `"image/jpeg"`
    #[serde(rename = "MIMEType", default, deserialize_with = "crate::de::string")]
    pub mime_type: Option<String>,
    /// `"YCbCr4:2:0 (2 2)"`
    #[serde(rename = "YCbCrSubSampling", default, deserialize_with = "crate::de::string")]
    pub y_cb_cr_sub_sampling: Option<String>,
}

/// `JFIF` tags.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JFIFTags {
    /// `1.01`
    #[serde(rename = "JFIFVersion", default, deserialize_with = "crate::de::float")]
    pub jfif_version: Option<f64>,
    /// `"None"`
    #[serde(rename = "ResolutionUnit", default, deserialize_with = "crate::de::string")]
    pub resolution_unit: Option<String>,
    /// `1`
    #[serde(rename = "XResolution", default, deserialize_with = "crate::de::integer")]
    pub x_resolution: Option<i64>,
    /// `1`
    #[serde(rename = "YResolution", default, deserialize_with = "crate::de::integer")]
    pub y_resolution: Option<i64>,
}

/// Every group in exiftool's flat key space, as returned by `ExifTool::read`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FlatTags {
    #[serde(rename = "SourceFile", default)]
    pub source_file: String,
    #[serde(flatten)]
    pub composite: CompositeTags,
    #[serde(flatten)]
    pub exif: EXIFTags,
    #[serde(flatten)]
    pub exif_tool: ExifToolTags,
    #[serde(flatten)]
    pub file: FileTags,
    #[serde(flatten)]
    pub jfif: JFIFTags,
}

/// Tags namespaced by group, as returned by `ExifTool::read_grouped`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TagGroups {
    #[serde(rename = "SourceFile", default)]
    pub source_file: String,
    #[serde(rename = "Composite", default)]
    pub composite: Option<CompositeTags>,
    #[serde(rename = "EXIF", default)]
    pub exif: Option<EXIFTags>,
    #[serde(rename = "ExifTool", default)]
    pub exif_tool: Option<ExifToolTags>,
    #[serde(rename = "File", default)]
    pub file: Option<FileTags>,
    #[serde(rename = "JFIF", default)]
    pub jfif: Option<JFIFTags>,
}
