use crate::datetime::{ExifDate, ExifDateTime, ExifTime};
use crate::error::ExifToolError;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

const ERROR_PREFIX: &str = "Error: ";
const WARNING_PREFIX: &str = "Warning: ";
const FILE_NOT_FOUND_PREFIX: &str = "File not found - ";

// "1 image files read", "1 files could not be read", "2 directories scanned"
static SUMMARY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+ .*\b(files?|directories)\b").expect("summary line regex is valid")
});

pub(crate) fn value_to_clean_string(val: &Value) -> String {
    match val {
        Value::String(s) => s.clone(),
        _ => val.to_string(),
    }
}

/// Errors and warnings exiftool printed on stderr for one request, prefixes stripped.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Diagnostics {
    pub(crate) errors: Vec<String>,
    pub(crate) warnings: Vec<String>,
}

impl Diagnostics {
    pub(crate) fn from_stderr(lines: &[String]) -> Self {
        let mut diagnostics = Self::default();
        for line in lines {
            if let Some(message) = line.strip_prefix(ERROR_PREFIX) {
                diagnostics.errors.push(message.trim().to_string());
            } else if let Some(message) = line.strip_prefix(WARNING_PREFIX) {
                log::warn!("ExifTool Warning - {message}");
                diagnostics.warnings.push(message.trim().to_string());
            } else if SUMMARY_LINE.is_match(line) {
                log::debug!("exiftool: {line}");
            } else {
                log::warn!("Unexpected exiftool stderr: {line}");
                diagnostics.warnings.push(line.trim().to_string());
            }
        }
        diagnostics
    }

    /// The first error as a typed [`ExifToolError`], if there is one.
    pub(crate) fn into_error(self, command: &str) -> Option<ExifToolError> {
        self.errors
            .into_iter()
            .next()
            .map(|message| diagnostic_error(message, command))
    }
}

/// Turns an exiftool error message (prefix stripped) into an error variant.
pub(crate) fn diagnostic_error(message: String, command: &str) -> ExifToolError {
    match message.strip_prefix(FILE_NOT_FOUND_PREFIX) {
        Some(file) => ExifToolError::FileNotFound {
            path: PathBuf::from(file.trim()),
            command: command.to_string(),
        },
        None => ExifToolError::ExifTool {
            message,
            command: command.to_string(),
        },
    }
}

/// Moves `Error` / `Warning` entries out of a JSON object.
fn take_messages(map: &mut Map<String, Value>, key: &str) -> Vec<String> {
    match map.remove(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(value_to_clean_string).collect(),
        Some(value) => vec![value_to_clean_string(&value)],
    }
}

/// Shared by [`Tags`] and [`GroupedTags`] so batch results can be assembled generically.
pub(crate) trait Record: Sized {
    fn from_object(map: Map<String, Value>) -> Self;
    fn missing(source_file: String) -> Self;
    fn source_file(&self) -> &str;
    fn set_command(&mut self, command: &str);
    fn errors_mut(&mut self) -> &mut Vec<String>;
    fn warnings_mut(&mut self) -> &mut Vec<String>;
}

/// Metadata of one file in exiftool's flat key space (`-json`).
///
/// Errors exiftool reported for the file, such as `File not found - bogus`,
/// are collected in [`Tags::errors`] rather than failing the read; use
/// [`Tags::ensure_ok`] to turn them into an [`ExifToolError`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tags {
    pub source_file: String,
    /// The exiftool arguments this record was read with.
    pub command: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub tags: Map<String, Value>,
}

impl Tags {
    pub fn get(&self, tag: &str) -> Option<&Value> {
        self.tags.get(tag)
    }

    pub fn get_str(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).and_then(Value::as_str)
    }

    /// Deserializes a single tag. A missing tag is `Ok(None)`.
    pub fn get_as<T: DeserializeOwned>(&self, tag: &str) -> Result<Option<T>, ExifToolError> {
        self.tags
            .get(tag)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|source| {
                    ExifToolError::TagDeserialization {
                        path: PathBuf::from(&self.source_file),
                        tag: tag.to_string(),
                        source,
                    }
                })
            })
            .transpose()
    }

    pub fn date_time(&self, tag: &str) -> Option<ExifDateTime> {
        self.get_str(tag)?.parse().ok()
    }

    pub fn date(&self, tag: &str) -> Option<ExifDate> {
        self.get_str(tag)?.parse().ok()
    }

    pub fn time(&self, tag: &str) -> Option<ExifTime> {
        self.get_str(tag)?.parse().ok()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Deserializes all tags, plus `SourceFile`, into `T`, e.g. [`crate::tags::FlatTags`].
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, ExifToolError> {
        let mut map = self.tags;
        map.insert("SourceFile".to_string(), Value::String(self.source_file));
        serde_path_to_error::deserialize(Value::Object(map)).map_err(ExifToolError::from)
    }

    /// Fails with the first error exiftool reported for this file.
    pub fn ensure_ok(self) -> Result<Self, ExifToolError> {
        let command = self.command.clone();
        ensure_ok(self, &command)
    }
}

impl Record for Tags {
    fn from_object(mut map: Map<String, Value>) -> Self {
        let source_file = map
            .remove("SourceFile")
            .map(|v| value_to_clean_string(&v))
            .unwrap_or_default();
        let errors = take_messages(&mut map, "Error");
        let warnings = take_messages(&mut map, "Warning");
        Self {
            source_file,
            errors,
            warnings,
            tags: map,
            ..Self::default()
        }
    }

    fn missing(source_file: String) -> Self {
        Self {
            source_file,
            ..Self::default()
        }
    }

    fn source_file(&self) -> &str {
        &self.source_file
    }

    fn set_command(&mut self, command: &str) {
        self.command = command.to_string();
    }

    fn errors_mut(&mut self) -> &mut Vec<String> {
        &mut self.errors
    }

    fn warnings_mut(&mut self) -> &mut Vec<String> {
        &mut self.warnings
    }
}

/// Metadata of one file namespaced by group (`-json -g`), e.g. `EXIF`, `IPTC`, `File`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupedTags {
    pub source_file: String,
    pub command: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub groups: BTreeMap<String, Map<String, Value>>,
}

impl GroupedTags {
    pub fn group(&self, group: &str) -> Option<&Map<String, Value>> {
        self.groups.get(group)
    }

    pub fn get(&self, group: &str, tag: &str) -> Option<&Value> {
        self.groups.get(group)?.get(tag)
    }

    /// Every tag as `("Group:Tag", value)`, ordered by group.
    pub fn qualified(&self) -> impl Iterator<Item = (String, &Value)> + '_ {
        self.groups.iter().flat_map(|(group, tags)| {
            tags.iter()
                .map(move |(tag, value)| (format!("{group}:{tag}"), value))
        })
    }

    /// Deserializes the groups, plus `SourceFile`, into `T`, e.g. [`crate::tags::TagGroups`].
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, ExifToolError> {
        let mut map: Map<String, Value> = self
            .groups
            .into_iter()
            .map(|(group, tags)| (group, Value::Object(tags)))
            .collect();
        map.insert("SourceFile".to_string(), Value::String(self.source_file));
        serde_path_to_error::deserialize(Value::Object(map)).map_err(ExifToolError::from)
    }

    pub fn ensure_ok(self) -> Result<Self, ExifToolError> {
        let command = self.command.clone();
        ensure_ok(self, &command)
    }
}

impl Record for GroupedTags {
    fn from_object(mut map: Map<String, Value>) -> Self {
        let source_file = map
            .remove("SourceFile")
            .map(|v| value_to_clean_string(&v))
            .unwrap_or_default();
        let mut errors = take_messages(&mut map, "Error");
        let mut warnings = take_messages(&mut map, "Warning");

        let mut groups = BTreeMap::new();
        for (key, value) in map {
            match value {
                Value::Object(mut tags) => {
                    if key == "ExifTool" {
                        errors.extend(take_messages(&mut tags, "Error"));
                        warnings.extend(take_messages(&mut tags, "Warning"));
                    }
                    groups.insert(key, tags);
                }
                other => log::debug!("Ignoring ungrouped value {key}={other}"),
            }
        }

        Self {
            source_file,
            errors,
            warnings,
            groups,
            ..Self::default()
        }
    }

    fn missing(source_file: String) -> Self {
        Self {
            source_file,
            ..Self::default()
        }
    }

    fn source_file(&self) -> &str {
        &self.source_file
    }

    fn set_command(&mut self, command: &str) {
        self.command = command.to_string();
    }

    fn errors_mut(&mut self) -> &mut Vec<String> {
        &mut self.errors
    }

    fn warnings_mut(&mut self) -> &mut Vec<String> {
        &mut self.warnings
    }
}

fn ensure_ok<R: Record>(mut record: R, command: &str) -> Result<R, ExifToolError> {
    match record.errors_mut().first().cloned() {
        Some(message) => Err(diagnostic_error(message, command)),
        None => Ok(record),
    }
}

/// Builds one record per requested path, in request order, from a `-json` response.
///
/// Files exiftool printed but that were not requested by name (directory
/// arguments) are appended. Stderr messages ending in a file name go to
/// that file, the longest name winning; the rest go to every record.
pub(crate) fn assemble<R: Record>(
    paths: &[String],
    stdout: &[u8],
    diagnostics: Diagnostics,
    command: &str,
) -> Result<Vec<R>, ExifToolError> {
    let values: Vec<Value> = if stdout.iter().all(u8::is_ascii_whitespace) {
        Vec::new()
    } else {
        serde_json::from_slice(stdout)?
    };

    let mut found = values
        .into_iter()
        .map(|value| match value {
            Value::Object(map) => Ok(R::from_object(map)),
            _ => Err(ExifToolError::UnexpectedFormat {
                path: paths.join(", "),
                command: command.to_string(),
            }),
        })
        .collect::<Result<Vec<R>, _>>()?;

    let mut records = Vec::with_capacity(paths.len().max(found.len()));
    for path in paths {
        let record = match found.iter().position(|r| same_file(r.source_file(), path)) {
            Some(index) => found.remove(index),
            None => R::missing(path.clone()),
        };
        records.push(record);
    }
    records.extend(found);
    for record in &mut records {
        record.set_command(command);
    }

    attribute(&mut records, diagnostics.errors, R::errors_mut);
    attribute(&mut records, diagnostics.warnings, R::warnings_mut);
    Ok(records)
}

fn same_file(source_file: &str, requested: &str) -> bool {
    source_file == requested || source_file == requested.replace('\\', "/")
}

/// `message` is `source` itself or ends with it after ` - ` or a path separator.
fn names_file(message: &str, source: &str) -> bool {
    if source.is_empty() {
        return false;
    }
    if message == source {
        return true;
    }
    message
        .strip_suffix(source)
        .is_some_and(|head| head.ends_with(" - ") || head.ends_with('/') || head.ends_with('\\'))
}

fn attribute<R: Record>(
    records: &mut [R],
    messages: Vec<String>,
    target: fn(&mut R) -> &mut Vec<String>,
) {
    for message in messages {
        let owner = records
            .iter()
            .enumerate()
            .filter(|(_, r)| names_file(&message, r.source_file()))
            .max_by_key(|(_, r)| r.source_file().len())
            .map(|(index, _)| index);
        match owner {
            Some(index) => target(&mut records[index]).push(message),
            None => {
                for record in records.iter_mut() {
                    target(record).push(message.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde::Deserialize;
    use serde_json::json;

    fn lines(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_diagnostics_from_stderr() {
        let diagnostics = Diagnostics::from_stderr(&lines(&[
            "Error: File not found - bogus",
            "Warning: [minor] Suspicious IFD0 - a.jpg",
            "    1 files could not be read",
            "something else",
        ]));
        assert_eq!(diagnostics.errors, vec!["File not found - bogus"]);
        assert_eq!(
            diagnostics.warnings,
            vec!["[minor] Suspicious IFD0 - a.jpg", "something else"]
        );
    }

    #[test]
    fn test_diagnostic_errors() {
        assert_matches!(
            diagnostic_error("File not found - data/x.jpg".into(), "-json data/x.jpg"),
            ExifToolError::FileNotFound { path, .. } if path == PathBuf::from("data/x.jpg")
        );
        assert_matches!(
            diagnostic_error("Unknown file type".into(), "-json a.txt"),
            ExifToolError::ExifTool { message, command }
                if message == "Unknown file type" && command == "-json a.txt"
        );
    }

    #[test]
    fn test_tags_from_object() -> Result<(), ExifToolError> {
        let Value::Object(map) = json!({
            "SourceFile": "data/image.jpg",
            "Make": "Huawei",
            "ImageWidth": 2688,
            "DateTimeOriginal": "2017:08:01 16:20:43",
            "GPSDateStamp": "2017:08:01",
            "Warning": "Bad MakerNotes offsets",
        }) else {
            unreachable!()
        };
        let tags = Tags::from_object(map);

        assert_eq!(tags.source_file, "data/image.jpg");
        assert_eq!(tags.warnings, vec!["Bad MakerNotes offsets"]);
        assert_eq!(tags.get_str("Make"), Some("Huawei"));
        assert_eq!(tags.get_as::<u32>("ImageWidth")?, Some(2688));
        assert_eq!(tags.get_as::<u32>("ImageHeight")?, None);
        assert_matches!(
            tags.get_as::<u32>("Make"),
            Err(ExifToolError::TagDeserialization { tag, .. }) if tag == "Make"
        );
        assert!(tags.date_time("DateTimeOriginal").is_some());
        assert!(tags.date("GPSDateStamp").is_some());
        assert!(tags.date_time("Make").is_none());
        assert_eq!(tags.len(), 4);
        Ok(())
    }

    #[test]
    fn test_into_typed() -> Result<(), ExifToolError> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Camera {
            source_file: String,
            make: String,
            image_width: u32,
        }

        let Value::Object(map) = json!({"SourceFile": "a.jpg", "Make": "Huawei", "ImageWidth": 2688})
        else {
            unreachable!()
        };
        let camera: Camera = Tags::from_object(map).into_typed()?;
        assert_eq!(camera.source_file, "a.jpg");
        assert_eq!(camera.make, "Huawei");
        assert_eq!(camera.image_width, 2688);

        let Value::Object(map) = json!({"SourceFile": "a.jpg", "Make": "Huawei", "ImageWidth": "wide"})
        else {
            unreachable!()
        };
        assert_matches!(
            Tags::from_object(map).into_typed::<Camera>(),
            Err(ExifToolError::Deserialization { path, .. }) if path == "ImageWidth"
        );
        Ok(())
    }

    #[test]
    fn test_grouped_from_object() {
        let Value::Object(map) = json!({
            "SourceFile": "a.jpg",
            "ExifTool": {"ExifToolVersion": 12.4, "Warning": "Truncated"},
            "EXIF": {"Make": "Huawei", "Model": "Nexus 6P"},
            "File": {"FileName": "a.jpg"},
        }) else {
            unreachable!()
        };
        let grouped = GroupedTags::from_object(map);

        assert_eq!(grouped.warnings, vec!["Truncated"]);
        assert_eq!(grouped.get("EXIF", "Make"), Some(&json!("Huawei")));
        assert_eq!(grouped.get("IPTC", "Keywords"), None);
        assert!(grouped.group("ExifTool").is_some_and(|g| !g.contains_key("Warning")));

        let qualified: Vec<String> = grouped.qualified().map(|(tag, _)| tag).collect();
        assert_eq!(
            qualified,
            vec![
                "EXIF:Make",
                "EXIF:Model",
                "ExifTool:ExifToolVersion",
                "File:FileName"
            ]
        );
    }

    #[test]
    fn test_assemble_batch() -> Result<(), ExifToolError> {
        let paths = lines(&["a.jpg", "bogus", "b.jpg"]);
        let stdout = br#"[{"SourceFile": "b.jpg", "Make": "B"}, {"SourceFile": "a.jpg", "Make": "A"}]"#;
        let diagnostics = Diagnostics::from_stderr(&lines(&[
            "Error: File not found - bogus",
            "Warning: Something global",
        ]));

        let records: Vec<Tags> = assemble(&paths, stdout, diagnostics, "-json a.jpg bogus b.jpg")?;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get_str("Make"), Some("A"));
        assert!(records[0].errors.is_empty());
        assert_eq!(records[1].source_file, "bogus");
        assert_eq!(records[1].errors, vec!["File not found - bogus"]);
        assert_eq!(records[2].get_str("Make"), Some("B"));
        assert!(records.iter().all(|r| r.warnings == vec!["Something global"]));

        assert_matches!(
            records[1].clone().ensure_ok(),
            Err(ExifToolError::FileNotFound { path, .. }) if path == PathBuf::from("bogus")
        );
        assert!(records[0].clone().ensure_ok().is_ok());
        Ok(())
    }

    #[test]
    fn test_assemble_suffix_named_files() -> Result<(), ExifToolError> {
        let paths = lines(&["a.jpg", "ba.jpg", "dir/ba.jpg"]);
        let stdout = br#"[{"SourceFile": "a.jpg"}, {"SourceFile": "dir/ba.jpg"}]"#;
        let diagnostics = Diagnostics::from_stderr(&lines(&[
            "Error: File not found - ba.jpg",
            "Warning: Bad MakerNotes offsets - dir/ba.jpg",
        ]));

        let command = "-json a.jpg ba.jpg dir/ba.jpg";
        let records: Vec<Tags> = assemble(&paths, stdout, diagnostics, command)?;
        assert!(records[0].errors.is_empty());
        assert!(records[0].warnings.is_empty());
        assert_eq!(records[1].errors, vec!["File not found - ba.jpg"]);
        assert!(records[1].warnings.is_empty());
        assert!(records[2].errors.is_empty());
        assert_eq!(records[2].warnings, vec!["Bad MakerNotes offsets - dir/ba.jpg"]);

        assert!(records[0].clone().ensure_ok().is_ok());
        assert_matches!(
            records[1].clone().ensure_ok(),
            Err(ExifToolError::FileNotFound { path, command: failed })
                if path == PathBuf::from("ba.jpg") && failed == command
        );
        Ok(())
    }

    #[test]
    fn test_names_file() {
        assert!(names_file("a.jpg", "a.jpg"));
        assert!(names_file("File not found - a.jpg", "a.jpg"));
        assert!(names_file("File not found - photos/a.jpg", "a.jpg"));
        assert!(!names_file("File not found - ba.jpg", "a.jpg"));
        assert!(!names_file("Something global", ""));
    }

    #[test]
    fn test_assemble_empty_and_malformed() {
        let paths = lines(&["missing.jpg"]);
        let records: Vec<Tags> = assemble(&paths, b"\n", Diagnostics::default(), "-json").unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_empty());

        assert_matches!(
            assemble::<Tags>(&paths, b"[1]", Diagnostics::default(), "-json"),
            Err(ExifToolError::UnexpectedFormat { .. })
        );
        assert_matches!(
            assemble::<Tags>(&paths, b"{not json", Diagnostics::default(), "-json"),
            Err(ExifToolError::Json(_))
        );
    }
}
