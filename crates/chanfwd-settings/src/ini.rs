//! Minimal QSettings-compatible ini document.
//!
//! The legacy channel lists were written by Qt's `QSettings` in ini
//! format. This module models just enough of that format to round-trip
//! them: ordered sections of ordered `key=value` pairs, `#`/`;` comments,
//! and the QSettings array convention (a `size` key plus 1-based
//! `N\field` keys).
//!
//! Keys the codec does not know are preserved on read and simply ignored,
//! so files written by other tools survive a load/save cycle structurally.
//!
//! # Format
//!
//! ```text
//! [General]
//! zmq_address=tcp://*:9999
//!
//! [main_vfos]
//! size=1
//! 1\frequency=100000000
//! 1\out_rate=200000
//! ```

use std::path::Path;

use chanfwd_core::error::{Error, Result};

/// Name of the implicit section for keys before any `[section]` header.
pub const GENERAL_SECTION: &str = "General";

/// One `[section]` with its `key=value` entries in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IniSection {
    /// Section name without the brackets.
    pub name: String,
    entries: Vec<(String, String)>,
}

impl IniSection {
    /// Create an empty section.
    pub fn new(name: &str) -> Self {
        IniSection {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the section holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set `key` to `value`, replacing an existing entry in place or
    /// appending a new one.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    /// All entries in file order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Declared array length (the `size` key), 0 when absent or malformed.
    pub fn array_len(&self) -> usize {
        self.get("size")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Declare the array length.
    pub fn set_array_len(&mut self, len: usize) {
        self.set("size", &len.to_string());
    }

    /// Array field `index\field` (1-based), if present.
    pub fn array_get(&self, index: usize, field: &str) -> Option<&str> {
        self.get(&format!("{index}\\{field}"))
    }

    /// Set array field `index\field` (1-based).
    pub fn array_set(&mut self, index: usize, field: &str, value: &str) {
        self.set(&format!("{index}\\{field}"), value);
    }
}

/// A parsed ini document: sections in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IniDocument {
    sections: Vec<IniSection>,
}

impl IniDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a section by name.
    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Look up or create a section by name.
    pub fn section_mut(&mut self, name: &str) -> &mut IniSection {
        let pos = match self.sections.iter().position(|s| s.name == name) {
            Some(pos) => pos,
            None => {
                self.sections.push(IniSection::new(name));
                self.sections.len() - 1
            }
        };
        &mut self.sections[pos]
    }

    /// All sections in file order.
    pub fn sections(&self) -> impl Iterator<Item = &IniSection> {
        self.sections.iter()
    }

    /// Parse a document from text.
    ///
    /// Empty lines and `#`/`;` comments are skipped; CRLF endings are
    /// tolerated. Keys before the first section header land in
    /// [`GENERAL_SECTION`]. A line that is neither a header, a comment nor
    /// a `key=value` pair is a [`Error::Format`].
    pub fn parse(text: &str) -> Result<Self> {
        let mut doc = IniDocument::new();
        let mut current = GENERAL_SECTION.to_string();

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[') {
                let Some(name) = name.strip_suffix(']') else {
                    return Err(Error::Format(format!(
                        "line {}: unterminated section header",
                        lineno + 1
                    )));
                };
                current = name.trim().to_string();
                doc.section_mut(&current);
                continue;
            }

            let Some(eq) = line.find('=') else {
                return Err(Error::Format(format!(
                    "line {}: expected `key=value', got `{line}'",
                    lineno + 1
                )));
            };
            let key = line[..eq].trim();
            let value = line[eq + 1..].trim();
            if key.is_empty() {
                return Err(Error::Format(format!("line {}: empty key", lineno + 1)));
            }

            doc.section_mut(&current).set(key, value);
        }

        Ok(doc)
    }

    /// Render the document back to ini text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("[{}]\n", section.name));
            for (key, value) in section.entries() {
                out.push_str(&format!("{key}={value}\n"));
            }
        }
        out
    }

    /// Read and parse a document from a file.
    pub fn read_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Render and write the document to a file.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sections_and_keys() {
        let doc = IniDocument::parse(
            "[General]\nzmq_address=tcp://*:9999\n\n[main_vfos]\nsize=1\n1\\out_rate=200000\n",
        )
        .unwrap();

        assert_eq!(
            doc.section("General").unwrap().get("zmq_address"),
            Some("tcp://*:9999")
        );
        let vfos = doc.section("main_vfos").unwrap();
        assert_eq!(vfos.array_len(), 1);
        assert_eq!(vfos.array_get(1, "out_rate"), Some("200000"));
        assert_eq!(vfos.array_get(2, "out_rate"), None);
    }

    #[test]
    fn keys_before_header_go_to_general() {
        let doc = IniDocument::parse("center_frequency=100000000\n[vfos]\nsize=0\n").unwrap();
        assert_eq!(
            doc.section(GENERAL_SECTION).unwrap().get("center_frequency"),
            Some("100000000")
        );
    }

    #[test]
    fn comments_and_crlf_tolerated() {
        let doc =
            IniDocument::parse("# comment\r\n; other comment\r\n[s]\r\nkey = value \r\n").unwrap();
        assert_eq!(doc.section("s").unwrap().get("key"), Some("value"));
    }

    #[test]
    fn unknown_keys_survive_round_trip() {
        let text = "[s]\nwanted=1\nsomething_else=keep-me\n";
        let doc = IniDocument::parse(text).unwrap();
        let again = IniDocument::parse(&doc.render()).unwrap();
        assert_eq!(again.section("s").unwrap().get("something_else"), Some("keep-me"));
    }

    #[test]
    fn malformed_line_is_a_format_error() {
        let err = IniDocument::parse("[s]\nnot a pair\n").unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn unterminated_header_is_a_format_error() {
        let err = IniDocument::parse("[oops\n").unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn set_replaces_in_place() {
        let mut section = IniSection::new("s");
        section.set("a", "1");
        section.set("b", "2");
        section.set("a", "3");

        let entries: Vec<_> = section.entries().collect();
        assert_eq!(entries, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn render_is_stable() {
        let mut doc = IniDocument::new();
        let s = doc.section_mut("main_vfos");
        s.set_array_len(1);
        s.array_set(1, "frequency", "100000000");

        assert_eq!(
            doc.render(),
            "[main_vfos]\nsize=1\n1\\frequency=100000000\n"
        );
    }

    #[test]
    fn missing_file_is_an_access_error() {
        let err = IniDocument::read_from(Path::new("/nonexistent/chanfwd.ini")).unwrap_err();
        assert!(matches!(err, Error::Access(_)));
    }
}
