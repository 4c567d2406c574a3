//! Bulk commit history retrieval.

use crate::commit::Commit;
use crate::repository::{GitError, GitRepository, Result};
use chrono::{DateTime, Utc};
use gitauthors_core::CacheOp;

/// Field separator inside one log record (ASCII unit separator).
const FIELD_SEP: char = '\u{1f}';

/// `hash, author name, author email, subject, author date, parents`.
const LOG_FORMAT: &str = "--format=%H%x1f%an%x1f%ae%x1f%s%x1f%aI%x1f%P";

/// Reads the whole commit history of a repository in one query.
pub struct CommitLog<'a> {
    repo: &'a GitRepository,
}

impl<'a> CommitLog<'a> {
    pub fn new(repo: &'a GitRepository) -> Self {
        Self { repo }
    }

    /// All commits reachable from HEAD, newest first.
    pub fn fetch_all(&self) -> Result<Vec<Commit>> {
        let cache = self.repo.cache()?;
        if let Some(commits) = cache.get::<Vec<Commit>>(CacheOp::CommitLog, "")? {
            tracing::debug!("Commit log served from cache ({} commits)", commits.len());
            return Ok(commits);
        }

        let output = self
            .repo
            .runner()
            .run(&["-c", "log.showSignature=false", "log", "--simplify-merges", LOG_FORMAT, "HEAD"])?;
        let commits = Self::parse(&output)?;
        tracing::debug!("Fetched {} commits", commits.len());

        cache.put(CacheOp::CommitLog, "", &commits)?;
        Ok(commits)
    }

    /// Parse `LOG_FORMAT` output, one record per line.
    pub fn parse(output: &str) -> Result<Vec<Commit>> {
        output
            .lines()
            .map(|line| line.trim_end_matches(['\r', FIELD_SEP]))
            .filter(|line| !line.trim().is_empty())
            .map(Self::parse_record)
            .collect()
    }

    fn parse_record(line: &str) -> Result<Commit> {
        let fields: Vec<&str> = line.split(FIELD_SEP).collect();
        if fields.len() < 5 || fields.len() > 6 {
            return Err(GitError::Parse(format!("malformed log record: {:?}", line)));
        }

        let date = DateTime::parse_from_rfc3339(fields[4])
            .map_err(|e| GitError::Parse(format!("bad commit date {:?}: {}", fields[4], e)))?
            .with_timezone(&Utc);
        let parents = fields
            .get(5)
            .map(|p| p.split_whitespace().map(String::from).collect())
            .unwrap_or_default();

        Ok(Commit {
            hash: fields[0].to_string(),
            author_name: fields[1].to_string(),
            author_email: fields[2].to_string(),
            subject: fields[3].to_string(),
            date,
            parents,
            changes: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_records() {
        let output = concat!(
            "c3\u{1f}Lee\u{1f}lee@x.io\u{1f}Merge branch 'x'\u{1f}2024-03-02T10:00:00+01:00\u{1f}c2 c1\n",
            "c2\u{1f}Dana K\u{1f}dana@x.io\u{1f}Rename\u{1f}2024-03-01T10:00:00+00:00\u{1f}c1\n",
            "c1\u{1f}Dana K\u{1f}dana@x.io\u{1f}Initial\u{1f}2024-02-29T10:00:00+00:00\u{1f}\n",
        );
        let commits = CommitLog::parse(output).unwrap();

        assert_eq!(commits.len(), 3);
        assert_eq!(commits[0].parents, vec!["c2", "c1"]);
        assert!(commits[0].is_merge());
        assert_eq!(commits[0].subject, "Merge branch 'x'");
        assert_eq!(commits[0].date.to_rfc3339(), "2024-03-02T09:00:00+00:00");
        assert_eq!(commits[1].author_name, "Dana K");
        assert!(commits[2].parents.is_empty());
    }

    #[test]
    fn test_subject_with_other_punctuation() {
        let output = "c1\u{1f}Dana\u{1f}d@x.io\u{1f}Fix: a|b, \"c\"\t<d>\u{1f}2024-01-01T00:00:00Z\u{1f}\n";
        let commits = CommitLog::parse(output).unwrap();
        assert_eq!(commits[0].subject, "Fix: a|b, \"c\"\t<d>");
    }

    #[test]
    fn test_malformed_record() {
        assert!(matches!(CommitLog::parse("just one field\n"), Err(GitError::Parse(_))));
        assert!(CommitLog::parse("c\u{1f}a\u{1f}e\u{1f}s\u{1f}yesterday\u{1f}\n").is_err());
        assert!(CommitLog::parse("").unwrap().is_empty());
    }
}
