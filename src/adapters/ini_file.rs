// SPDX-License-Identifier: MIT OR Apache-2.0

//! INI store file format.
//!
//! This module provides the `IniFormat` used for every store file. Keys whose path
//! has more than one segment are written under a `[section]` named after the first
//! segment; single-segment keys come before the first section header.
//!
//! Values keep their dynamic type: booleans and numbers are bare literals, lists
//! and maps are JSON, and plain strings are written verbatim unless reading the
//! bare text back would produce something else, in which case they are written as
//! a JSON string literal.

use crate::adapters::location::STORE_EXTENSION;
use crate::domain::settings_key::normalize_key;
use crate::domain::{SettingsMap, SettingsValue};
use crate::ports::SettingsFormat;
use std::collections::BTreeMap;

/// INI format implementation.
///
/// # Examples
///
/// ```rust
/// use deskcfg::adapters::IniFormat;
/// use deskcfg::domain::SettingsValue;
/// use deskcfg::ports::SettingsFormat;
///
/// let format = IniFormat::new();
/// let entries = format.parse("theme=dark\n\n[window]\nwidth=800\n");
/// assert_eq!(entries.get("theme"), Some(&SettingsValue::from("dark")));
/// assert_eq!(entries.get("window/width"), Some(&SettingsValue::from(800)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct IniFormat;

impl IniFormat {
    /// Creates a new INI format.
    pub fn new() -> Self {
        IniFormat
    }

    /// Decodes the text to the right of `=`.
    fn decode_value(raw: &str) -> SettingsValue {
        serde_json::from_str::<SettingsValue>(raw)
            .unwrap_or_else(|_| SettingsValue::String(raw.to_string()))
    }

    /// Encodes a value for the right of `=`.
    fn encode_value(value: &SettingsValue) -> String {
        match value {
            SettingsValue::String(s) if !Self::needs_quoting(s) => s.clone(),
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }

    /// A string needs quoting when its bare form would not read back unchanged.
    fn needs_quoting(s: &str) -> bool {
        s.trim() != s
            || s.chars().any(char::is_control)
            || serde_json::from_str::<SettingsValue>(s).is_ok()
    }

    fn parse_section(line: &str) -> Option<String> {
        line.strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .map(normalize_key)
    }
}

impl SettingsFormat for IniFormat {
    fn parse(&self, content: &str) -> SettingsMap {
        let mut entries = SettingsMap::new();
        let mut section = String::new();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') {
                match Self::parse_section(line) {
                    Some(name) => section = name,
                    None => tracing::debug!("Skipping malformed section header on line {}", number + 1),
                }
                continue;
            }

            let Some((key, raw)) = line.split_once('=') else {
                tracing::debug!("Skipping line {} without '='", number + 1);
                continue;
            };

            let key = if section.is_empty() {
                normalize_key(key)
            } else {
                normalize_key(&format!("{}/{}", section, key))
            };
            if key.is_empty() || key == section {
                tracing::debug!("Skipping line {} with an empty key", number + 1);
                continue;
            }

            entries.insert(key, Self::decode_value(raw.trim()));
        }

        entries
    }

    fn render(&self, entries: &SettingsMap) -> String {
        let mut top_level: BTreeMap<&str, &SettingsValue> = BTreeMap::new();
        let mut sections: BTreeMap<&str, BTreeMap<&str, &SettingsValue>> = BTreeMap::new();

        for (key, value) in entries {
            match key.split_once('/') {
                Some((section, rest)) => {
                    sections.entry(section).or_default().insert(rest, value);
                }
                None => {
                    top_level.insert(key, value);
                }
            }
        }

        let mut out = String::new();
        for (key, value) in &top_level {
            out.push_str(&format!("{}={}\n", key, Self::encode_value(value)));
        }
        for (section, keys) in &sections {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("[{}]\n", section));
            for (key, value) in keys {
                out.push_str(&format!("{}={}\n", key, Self::encode_value(value)));
            }
        }
        out
    }

    fn extension(&self) -> &str {
        STORE_EXTENSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, SettingsValue)]) -> SettingsMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_parse_sections_and_top_level() {
        let content = "theme=dark\n[window]\nwidth=800\ngeometry/height=600\n";
        let entries = IniFormat::new().parse(content);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries["theme"], SettingsValue::from("dark"));
        assert_eq!(entries["window/width"], SettingsValue::from(800));
        assert_eq!(entries["window/geometry/height"], SettingsValue::from(600));
    }

    #[test]
    fn test_parse_typed_values() {
        let content = "a=true\nb=-3\nc=2.5\nd=[1,\"x\"]\ne={\"k\":false}\nf=\"42\"\ng=plain text\n";
        let entries = IniFormat::new().parse(content);

        assert_eq!(entries["a"], SettingsValue::Bool(true));
        assert_eq!(entries["b"], SettingsValue::Int(-3));
        assert_eq!(entries["c"], SettingsValue::Float(2.5));
        assert_eq!(
            entries["d"],
            SettingsValue::List(vec![SettingsValue::Int(1), SettingsValue::from("x")])
        );
        assert_eq!(
            entries["e"].as_map().and_then(|m| m.get("k")),
            Some(&SettingsValue::Bool(false))
        );
        assert_eq!(entries["f"], SettingsValue::from("42"));
        assert_eq!(entries["g"], SettingsValue::from("plain text"));
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let content = "; comment\n# another\ngood=1\nno equals here\n=orphan\n[broken\nafter=2\n";
        let entries = IniFormat::new().parse(content);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries["good"], SettingsValue::from(1));
        assert_eq!(entries["after"], SettingsValue::from(2));
    }

    #[test]
    fn test_parse_torn_file() {
        let content = "[window]\nwidth=800\nhei";
        let entries = IniFormat::new().parse(content);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries["window/width"], SettingsValue::from(800));
    }

    #[test]
    fn test_parse_last_duplicate_wins() {
        let entries = IniFormat::new().parse("k=1\nk=2\n");
        assert_eq!(entries["k"], SettingsValue::from(2));
    }

    #[test]
    fn test_render_layout() {
        let entries = map(&[
            ("theme", SettingsValue::from("dark")),
            ("window/width", SettingsValue::from(800)),
            ("window/maximized", SettingsValue::from(false)),
            ("panel/position", SettingsValue::from("top")),
        ]);
        let rendered = IniFormat::new().render(&entries);
        assert_eq!(
            rendered,
            "theme=dark\n\n[panel]\nposition=top\n\n[window]\nmaximized=false\nwidth=800\n"
        );
    }

    #[test]
    fn test_ambiguous_strings_are_quoted() {
        let format = IniFormat::new();
        let entries = map(&[
            ("a", SettingsValue::from("true")),
            ("b", SettingsValue::from("12")),
            ("c", SettingsValue::from(" padded ")),
            ("d", SettingsValue::from("two\nlines")),
            ("e", SettingsValue::from("\"quoted\"")),
            ("f", SettingsValue::from("")),
        ]);
        let rendered = format.render(&entries);
        assert!(rendered.contains("a=\"true\"\n"));
        assert!(rendered.contains("b=\"12\"\n"));
        assert!(rendered.contains("f=\n"));
        assert_eq!(format.parse(&rendered), entries);
    }

    #[test]
    fn test_render_then_parse_preserves_types() {
        let format = IniFormat::new();
        let mut nested = BTreeMap::new();
        nested.insert("x".to_string(), SettingsValue::from(1));
        let entries = map(&[
            ("flag", SettingsValue::from(true)),
            ("ratio", SettingsValue::from(0.5)),
            ("whole", SettingsValue::from(3.0)),
            ("list/items", SettingsValue::from(vec!["a", "b"])),
            ("deep/a/b/c", SettingsValue::Map(nested)),
        ]);
        assert_eq!(format.parse(&format.render(&entries)), entries);
    }

    #[test]
    fn test_extension() {
        assert_eq!(IniFormat::new().extension(), "conf");
    }
}
