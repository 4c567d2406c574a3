//! Name-status diff parsing.

use crate::commit::ChangeRecord;

/// Parses `--name-status -z` output into change records.
///
/// Each record is a status token followed by one path, or two for renames
/// and copies, all NUL-terminated. Paths are taken verbatim, so names with
/// quotes, backslashes or tabs survive.
pub struct ChangeSetParser;

impl ChangeSetParser {
    /// Parse every record, skipping statuses that carry no authorship
    /// (type changes, unmerged entries) and anything malformed.
    pub fn parse(output: &str) -> Vec<ChangeRecord> {
        let mut fields = output.split('\0');
        let mut records = Vec::new();

        while let Some(status) = fields.next() {
            // A commit header separator may leave a newline before the status
            let status = status.trim_matches('\n');
            if status.is_empty() {
                continue;
            }
            let Some(first) = fields.next() else {
                break;
            };
            let second = if status.starts_with(|c| c == 'R' || c == 'C') {
                match fields.next() {
                    Some(second) => Some(second),
                    None => break,
                }
            } else {
                None
            };
            if let Some(record) = Self::parse_record(status, first, second) {
                records.push(record);
            }
        }
        records
    }

    /// Build one record from a status token and its paths.
    pub fn parse_record(status: &str, first: &str, second: Option<&str>) -> Option<ChangeRecord> {
        if first.is_empty() {
            return None;
        }
        let mut chars = status.chars();
        let kind = chars.next()?;
        let score = chars.as_str();

        match (kind, second) {
            ('R' | 'C', Some(to)) if !to.is_empty() => {
                let similarity = parse_score(score)?;
                let (from, to) = (first.to_string(), to.to_string());
                Some(if kind == 'R' {
                    ChangeRecord::Rename { from, to, similarity }
                } else {
                    ChangeRecord::Copy { from, to, similarity }
                })
            }
            ('A', None) if score.is_empty() => Some(ChangeRecord::Add { path: first.to_string() }),
            ('M', None) if score.is_empty() => Some(ChangeRecord::Modify { path: first.to_string() }),
            ('D', None) if score.is_empty() => Some(ChangeRecord::Delete { path: first.to_string() }),
            _ => None,
        }
    }
}

fn parse_score(score: &str) -> Option<u8> {
    if score.is_empty() || !score.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    score.parse::<u8>().ok().filter(|s| *s <= 100)
}
