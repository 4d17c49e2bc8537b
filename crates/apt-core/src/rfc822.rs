//! Streaming RFC822 "tag file" parser.
//!
//! `Release`, `InRelease`, `Packages`, `Sources`, and `.diff/Index`
//! files are all sequences of RFC822-style key/value blocks separated
//! by blank lines, with continuation lines (leading whitespace)
//! extending the previous value (§6, §9 "Streaming parsers"). This
//! parser yields `(key, value)` byte-range pairs over a buffered
//! reader without materialising the whole file, so `Version` objects
//! can be constructed lazily from `(file, offset)` handles as the
//! cache's pre-package map requires (§4.1).

use std::io::{BufRead, BufReader, Read};

/// One RFC822 field, with continuation lines already joined (newline
/// characters are preserved so multi-line `Description` fields retain
/// their original line breaks).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name, e.g. `"Package"`. Case is preserved as written.
    pub key: String,
    /// Field value with the leading `": "`/`":"` stripped and
    /// continuation-line indentation preserved.
    pub value: String,
}

/// One parsed block (stanza), e.g. one package's index entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stanza {
    /// Fields in file order; duplicate keys are kept, last wins per
    /// `get` but all are retained for forensic dumping.
    pub fields: Vec<Field>,
    /// Byte offset of the first line of this stanza in the source.
    pub offset: u64,
}

impl Stanza {
    /// Look up a field's value by case-insensitive key, last
    /// occurrence wins (matches RFC822 override semantics used by
    /// `dpkg`/`apt`).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|f| f.key.eq_ignore_ascii_case(key))
            .map(|f| f.value.as_str())
    }

    /// Whether the stanza has no fields (used to detect doubled blank
    /// lines between stanzas, which should not emit an empty stanza).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Parse every stanza out of `reader`, returning them fully in memory.
/// Callers needing true streaming (e.g. the cache's pre-package map)
/// should use `StanzaReader` directly instead.
///
/// # Errors
/// Propagates I/O errors from `reader`.
pub fn parse_all<R: Read>(reader: R) -> std::io::Result<Vec<Stanza>> {
    StanzaReader::new(reader).collect()
}

/// An iterator over stanzas in a buffered reader, tracking byte offsets
/// so callers can remember `(file, offset)` handles instead of holding
/// parsed data (§4.1 "pre-package map").
pub struct StanzaReader<R> {
    reader: BufReader<R>,
    offset: u64,
}

impl<R: Read> StanzaReader<R> {
    /// Wrap a reader, buffering internally.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            offset: 0,
        }
    }
}

impl<R: Read> Iterator for StanzaReader<R> {
    type Item = std::io::Result<Stanza>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut stanza = Stanza {
            offset: self.offset,
            ..Stanza::default()
        };
        let mut current: Option<Field> = None;
        let mut line = String::new();
        let mut saw_any_line = false;

        loop {
            line.clear();
            let bytes_read = match self.reader.read_line(&mut line) {
                Ok(0) => {
                    // EOF.
                    if let Some(f) = current.take() {
                        stanza.fields.push(f);
                    }
                    return if saw_any_line { Some(Ok(stanza)) } else { None };
                }
                Ok(n) => n,
                Err(e) => return Some(Err(e)),
            };
            self.offset += bytes_read as u64;

            let trimmed_end = line.trim_end_matches(['\n', '\r']);

            if trimmed_end.is_empty() {
                // Blank line: end of stanza, unless we haven't started one.
                if let Some(f) = current.take() {
                    stanza.fields.push(f);
                }
                if saw_any_line {
                    return Some(Ok(stanza));
                }
                // Leading blank lines between stanzas: skip, reset offset base.
                stanza.offset = self.offset;
                continue;
            }

            saw_any_line = true;

            if trimmed_end.starts_with([' ', '\t']) {
                // Continuation line.
                if let Some(f) = current.as_mut() {
                    f.value.push('\n');
                    f.value.push_str(trimmed_end.trim_start());
                }
                // A continuation line with no preceding field is malformed;
                // silently dropped per §7 "parse-and-continue" policy.
                continue;
            }

            if let Some((key, value)) = trimmed_end.split_once(':') {
                if let Some(f) = current.take() {
                    stanza.fields.push(f);
                }
                current = Some(Field {
                    key: key.trim().to_string(),
                    value: value.trim_start().to_string(),
                });
            }
            // A non-continuation line without a colon is malformed;
            // dropped per the same policy.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_stanza_with_continuation() {
        let text = b"Package: foo\nVersion: 1.0\nDescription: short\n long line one\n .\n long line two\n";
        let stanzas = parse_all(text.as_slice()).unwrap();
        assert_eq!(stanzas.len(), 1);
        assert_eq!(stanzas[0].get("Package"), Some("foo"));
        assert_eq!(stanzas[0].get("Version"), Some("1.0"));
        assert_eq!(
            stanzas[0].get("Description"),
            Some("short\nlong line one\n.\nlong line two")
        );
    }

    #[test]
    fn parses_multiple_stanzas_separated_by_blank_lines() {
        let text = b"Package: a\nVersion: 1\n\nPackage: b\nVersion: 2\n";
        let stanzas = parse_all(text.as_slice()).unwrap();
        assert_eq!(stanzas.len(), 2);
        assert_eq!(stanzas[0].get("Package"), Some("a"));
        assert_eq!(stanzas[1].get("Package"), Some("b"));
    }

    #[test]
    fn last_duplicate_key_wins() {
        let text = b"Package: a\nPriority: optional\nPriority: extra\n";
        let stanzas = parse_all(text.as_slice()).unwrap();
        assert_eq!(stanzas[0].get("Priority"), Some("extra"));
    }

    #[test]
    fn empty_input_yields_no_stanzas() {
        let stanzas = parse_all(b"".as_slice()).unwrap();
        assert!(stanzas.is_empty());
    }
}
