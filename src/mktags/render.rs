use super::collector::{ObservedTag, TagCollector, ValueType};
use std::collections::{BTreeMap, BTreeSet};

const EXAMPLE_WIDTH: usize = 80;

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "crate", "do", "dyn", "else",
    "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let", "loop",
    "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return", "self",
    "static", "struct", "super", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Renders the typed tag dictionary (`src/tags.rs`) for every tag seen more
/// than `min_values` times.
pub fn render(collector: &TagCollector, min_values: usize) -> String {
    let groups = collector.grouped_tags(min_values);
    let mut lines: Vec<String> = vec![
        "//! Typed tags, generated by `mktags` from sample images.".to_string(),
        "//!".to_string(),
        "//! Regenerate with `cargo run --bin mktags -- IMG_DIR`. Do not edit by hand.".to_string(),
        String::new(),
    ];

    let date_types: BTreeSet<&str> = groups
        .values()
        .flatten()
        .map(|observed| observed.value_type())
        .filter(|value_type| {
            matches!(
                value_type,
                ValueType::ExifDate | ValueType::ExifTime | ValueType::ExifDateTime
            )
        })
        .map(ValueType::rust_type)
        .collect();
    match date_types.len() {
        0 => {}
        1 => lines.push(format!(
            "use crate::datetime::{};",
            date_types.iter().copied().collect::<String>()
        )),
        _ => lines.push(format!(
            "use crate::datetime::{{{}}};",
            date_types.iter().copied().collect::<Vec<_>>().join(", ")
        )),
    }
    lines.push("use serde::Deserialize;".to_string());

    for (group, tags) in &groups {
        lines.push(String::new());
        render_group(&mut lines, group, tags);
    }

    lines.push(String::new());
    lines.push(
        "/// Every group in exiftool's flat key space, as returned by `ExifTool::read`.".to_string(),
    );
    lines.push(DERIVES.to_string());
    lines.push("pub struct FlatTags {".to_string());
    lines.push("    #[serde(rename = \"SourceFile\", default)]".to_string());
    lines.push("    pub source_file: String,".to_string());
    for (field, group) in group_fields(&groups) {
        lines.push("    #[serde(flatten)]".to_string());
        lines.push(format!("    pub {field}: {},", struct_name(group)));
    }
    lines.push("}".to_string());

    lines.push(String::new());
    lines.push("/// Tags namespaced by group, as returned by `ExifTool::read_grouped`.".to_string());
    lines.push(DERIVES.to_string());
    lines.push("pub struct TagGroups {".to_string());
    lines.push("    #[serde(rename = \"SourceFile\", default)]".to_string());
    lines.push("    pub source_file: String,".to_string());
    for (field, group) in group_fields(&groups) {
        lines.push(format!("    #[serde(rename = \"{group}\", default)]"));
        lines.push(format!("    pub {field}: Option<{}>,", struct_name(group)));
    }
    lines.push("}".to_string());

    let mut source = lines.join("\n");
    source.push('\n');
    source
}

const DERIVES: &str = "#[derive(Debug, Clone, Default, PartialEq, Deserialize)]";

fn render_group(lines: &mut Vec<String>, group: &str, tags: &[&ObservedTag]) {
    lines.push(format!("/// `{group}` tags."));
    lines.push(DERIVES.to_string());
    lines.push(format!("pub struct {} {{", struct_name(group)));

    let mut used = BTreeSet::new();
    for observed in tags {
        let field = unique(&mut used, field_name(observed.name()));
        let value_type = observed.value_type();
        let example = ellipsize(&observed.example().to_string(), EXAMPLE_WIDTH).replace('`', "'");

        lines.push(format!("    /// `{example}`"));
        match value_type.deserializer() {
            Some(deserializer) => lines.push(format!(
                "    #[serde(rename = \"{}\", default, deserialize_with = \"{deserializer}\")]",
                observed.name()
            )),
            None => lines.push(format!(
                "    #[serde(rename = \"{}\", default)]",
                observed.name()
            )),
        }
        lines.push(format!(
            "    pub {field}: Option<{}>,",
            value_type.rust_type()
        ));
    }
    lines.push("}".to_string());
}

fn group_fields<'a>(groups: &BTreeMap<&'a str, Vec<&ObservedTag>>) -> Vec<(String, &'a str)> {
    let mut used = BTreeSet::new();
    groups
        .keys()
        .map(|group| (unique(&mut used, field_name(group)), *group))
        .collect()
}

/// `ICC_Profile` -> `ICCProfileTags`, `EXIF` -> `EXIFTags`.
pub(crate) fn struct_name(group: &str) -> String {
    let mut name = String::with_capacity(group.len() + 4);
    let mut upper_next = true;
    for c in group.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            name.extend(c.to_uppercase());
            upper_next = false;
        } else {
            name.push(c);
        }
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "Group");
    }
    name.push_str("Tags");
    name
}

/// `GPSDateStamp` -> `gps_date_stamp`, with keywords and leading digits made valid.
pub(crate) fn field_name(tag: &str) -> String {
    let chars: Vec<char> = tag.chars().collect();
    let mut name = String::with_capacity(tag.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 && !name.ends_with('_') {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary {
                name.push('_');
            }
        }
        name.extend(c.to_lowercase());
    }

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "tag_");
    }
    if KEYWORDS.contains(&name.as_str()) {
        name.push('_');
    }
    name
}

fn unique(used: &mut BTreeSet<String>, name: String) -> String {
    let mut candidate = name.clone();
    let mut n = 2;
    while used.contains(&candidate) {
        candidate = format!("{name}_{n}");
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

fn ellipsize(s: &str, max: usize) -> String {
    if s.chars().count() < max {
        s.to_string()
    } else {
        let mut short: String = s.chars().take(max - 1).collect();
        short.push('…');
        short
    }
}
