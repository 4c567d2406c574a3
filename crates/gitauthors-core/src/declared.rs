//! Authors declared in source headers and package manifests.

use crate::author::{AuthorEntry, AuthorList};
use crate::config::ExtractorKind;
use crate::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn author_tag() -> Result<&'static Regex> {
    static TAG: OnceLock<Regex> = OnceLock::new();
    if let Some(tag) = TAG.get() {
        return Ok(tag);
    }
    let tag = Regex::new(r"@author\s+(.+?)\s*(?:\*/)?\s*$")
        .map_err(|e| Error::Parse(format!("author tag pattern: {}", e)))?;
    Ok(TAG.get_or_init(|| tag))
}

/// `@author` tags of the file's documentation header.
///
/// The header is the first `/** ... */` block. Files without one fall back
/// to the leading run of line comments.
pub fn header_authors(content: &str) -> Result<Vec<AuthorEntry>> {
    let header = doc_block(content).unwrap_or_else(|| leading_comments(content));
    let tag = author_tag()?;

    let mut authors = AuthorList::new();
    for line in header.lines() {
        if let Some(caps) = tag.captures(line) {
            if let Some(entry) = AuthorEntry::parse(&caps[1]) {
                authors.push(entry);
            }
        }
    }
    Ok(authors.into_vec())
}

fn doc_block(content: &str) -> Option<&str> {
    let start = content.find("/**")?;
    let end = content[start..].find("*/").map(|e| start + e + 2)?;
    Some(&content[start..end])
}

fn leading_comments(content: &str) -> &str {
    let mut end = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let is_comment = trimmed.is_empty()
            || trimmed.starts_with("//")
            || trimmed.starts_with('#')
            || trimmed.starts_with("<?php");
        if !is_comment {
            break;
        }
        end += line.len();
    }
    &content[..end]
}

/// Authors declared in a package manifest of the given kind.
pub fn manifest_authors(kind: ExtractorKind, json: &str) -> Result<Vec<AuthorEntry>> {
    let manifest: Value = serde_json::from_str(json)?;
    let object = manifest
        .as_object()
        .ok_or_else(|| Error::Parse(format!("{} manifest is not a JSON object", kind.as_str())))?;

    let fields: &[&str] = match kind {
        ExtractorKind::Source => return Ok(Vec::new()),
        ExtractorKind::Composer | ExtractorKind::Bower => &["authors"],
        ExtractorKind::Node => &["author", "contributors"],
    };

    let mut authors = AuthorList::new();
    for field in fields {
        match object.get(*field) {
            Some(Value::Array(items)) => {
                for item in items {
                    if let Some(entry) = person(item) {
                        authors.push(entry);
                    }
                }
            }
            Some(item) => {
                if let Some(entry) = person(item) {
                    authors.push(entry);
                }
            }
            None => {}
        }
    }
    Ok(authors.into_vec())
}

/// A person is either `"Name <email> (url)"` or `{ "name": .., "email": .. }`.
fn person(value: &Value) -> Option<AuthorEntry> {
    match value {
        Value::String(s) => {
            let without_url = match s.find('(') {
                Some(i) => &s[..i],
                None => s.as_str(),
            };
            AuthorEntry::parse(without_url)
        }
        Value::Object(map) => {
            let name = map.get("name").and_then(Value::as_str).unwrap_or("");
            let email = map.get("email").and_then(Value::as_str).unwrap_or("");
            if name.trim().is_empty() && email.trim().is_empty() {
                None
            } else {
                Some(AuthorEntry::new(name, email))
            }
        }
        _ => None,
    }
}
