//! Job model and link-file parsing.
//!
//! A link file has one `<url><space><file name>` row per line. Rows sharing
//! a URL collapse into a single job that fans out to several destinations,
//! so each remote file is fetched once no matter how many names it gets.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One unit of download work, immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    /// Stable 1-based ordering key, assigned at creation.
    pub number: u32,
    pub url: String,
    /// Ordered destination file names; non-empty, no duplicates.
    pub file_names: Vec<String>,
}

/// Outcome of turning a link file into jobs.
#[derive(Debug)]
pub struct JobParseOutcome {
    pub jobs: Vec<DownloadJob>,
    /// 1-based file line numbers of rows rejected as malformed.
    pub invalid_rows: Vec<usize>,
    /// Non-blank rows seen, valid or not.
    pub row_count: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum JobFileError {
    #[error("unable to read links file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("links file {path} contains no rows")]
    Empty { path: PathBuf },
    #[error("links file {path} has no valid rows; invalid format at rows {rows:?} (expected <HTTP link><space><file name>)")]
    AllRowsInvalid { path: PathBuf, rows: Vec<usize> },
}

/// Reads `path` and builds the deduplicated job list. Blank lines are
/// skipped entirely; malformed rows are collected by line number. An empty
/// or all-invalid file is an error, never an empty batch.
pub fn load_jobs(path: &Path) -> Result<JobParseOutcome, JobFileError> {
    let contents = fs::read_to_string(path).map_err(|source| JobFileError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut order: Vec<String> = Vec::new();
    let mut names_by_url: HashMap<String, Vec<String>> = HashMap::new();
    let mut invalid_rows = Vec::new();
    let mut row_count = 0usize;

    for (index, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        row_count += 1;

        match parse_row(line) {
            Some((url, name)) => {
                let names = names_by_url.entry(url.clone()).or_insert_with(|| {
                    order.push(url);
                    Vec::new()
                });
                if !names.iter().any(|existing| existing.as_str() == name) {
                    names.push(name.to_string());
                }
            }
            None => invalid_rows.push(index + 1),
        }
    }

    if order.is_empty() {
        if invalid_rows.is_empty() {
            return Err(JobFileError::Empty {
                path: path.to_path_buf(),
            });
        }
        return Err(JobFileError::AllRowsInvalid {
            path: path.to_path_buf(),
            rows: invalid_rows,
        });
    }

    let jobs = order
        .into_iter()
        .enumerate()
        .map(|(index, url)| {
            let file_names = names_by_url.remove(&url).unwrap_or_default();
            DownloadJob {
                number: index as u32 + 1,
                url,
                file_names,
            }
        })
        .collect();

    Ok(JobParseOutcome {
        jobs,
        invalid_rows,
        row_count,
    })
}

/// Splits a row into its URL and file-name halves; the file name keeps any
/// internal spaces. Returns `None` for rows that don't parse.
fn parse_row(line: &str) -> Option<(String, &str)> {
    let (url, name) = line.split_once(' ')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let parsed = url::Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return None;
    }
    Some((url.to_string(), name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn links_file(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.txt");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn duplicate_urls_collapse_into_one_job() {
        let (_dir, path) = links_file(
            "http://host/a.bin first.bin\n\
             http://host/b.bin other.bin\n\
             http://host/a.bin second.bin\n",
        );
        let outcome = load_jobs(&path).unwrap();
        assert_eq!(outcome.row_count, 3);
        assert!(outcome.invalid_rows.is_empty());
        assert_eq!(outcome.jobs.len(), 2);

        let first = &outcome.jobs[0];
        assert_eq!(first.number, 1);
        assert_eq!(first.url, "http://host/a.bin");
        assert_eq!(first.file_names, vec!["first.bin", "second.bin"]);

        assert_eq!(outcome.jobs[1].number, 2);
        assert_eq!(outcome.jobs[1].file_names, vec!["other.bin"]);
    }

    #[test]
    fn repeated_name_for_same_url_is_kept_once() {
        let (_dir, path) = links_file(
            "http://host/a one.bin\n\
             http://host/a one.bin\n",
        );
        let outcome = load_jobs(&path).unwrap();
        assert_eq!(outcome.jobs[0].file_names, vec!["one.bin"]);
    }

    #[test]
    fn invalid_rows_are_reported_by_file_line_number() {
        let (_dir, path) = links_file(
            "http://host/ok fine.bin\n\
             \n\
             not-a-url broken.bin\n\
             ftp://host/nope wrong-scheme.bin\n\
             http://host/missing-name\n",
        );
        let outcome = load_jobs(&path).unwrap();
        // Blank line 2 is skipped but still counts toward line numbering.
        assert_eq!(outcome.invalid_rows, vec![3, 4, 5]);
        assert_eq!(outcome.row_count, 4);
        assert_eq!(outcome.jobs.len(), 1);
    }

    #[test]
    fn file_name_may_contain_spaces() {
        let (_dir, path) = links_file("http://host/a name with spaces.bin\n");
        let outcome = load_jobs(&path).unwrap();
        assert_eq!(outcome.jobs[0].file_names, vec!["name with spaces.bin"]);
    }

    #[test]
    fn empty_file_is_an_error() {
        let (_dir, path) = links_file("\n\n");
        assert!(matches!(load_jobs(&path), Err(JobFileError::Empty { .. })));
    }

    #[test]
    fn all_invalid_file_is_an_error_carrying_the_rows() {
        let (_dir, path) = links_file("junk one\nmore junk\n");
        match load_jobs(&path) {
            Err(JobFileError::AllRowsInvalid { rows, .. }) => assert_eq!(rows, vec![1, 2]),
            other => panic!("expected AllRowsInvalid, got {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");
        assert!(matches!(
            load_jobs(&path),
            Err(JobFileError::Unreadable { .. })
        ));
    }
}
