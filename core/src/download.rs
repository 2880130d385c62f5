//! Saving binary responses to disk.
//!
//! # Design
//! A download endpoint either streams a file or, when it cannot, answers
//! with a JSON error body. The `Content-Type` header tells the two apart.
//! Neither a JSON error nor a failure to write the file is a fault of the
//! client: both come back as `DownloadResult::NotSaved` with the reason,
//! and are logged.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::http::HttpResponse;
use crate::request::APPLICATION_JSON;

/// Outcome of a download call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadResult {
    Saved(SavedFile),
    NotSaved(NotSavedReason),
}

impl DownloadResult {
    /// Path of the saved file, if one was written.
    pub fn path(&self) -> Option<&Path> {
        match self {
            DownloadResult::Saved(file) => Some(&file.path),
            DownloadResult::NotSaved(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub path: PathBuf,
    pub file_name: String,
    /// `true` when the server sent no usable filename and one was generated.
    pub generated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotSavedReason {
    /// The server sent no `Content-Type` at all.
    MissingContentType,
    /// The server replied with JSON instead of a file.
    ErrorResponse { body: String },
    /// The file could not be written.
    Io { message: String },
}

/// How a response body should be treated, judged by its content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Missing,
    Json,
    Binary,
}

/// Classify a `Content-Type` value. Media type parameters are ignored.
pub fn classify_content_type(content_type: Option<&str>) -> ContentKind {
    let Some(value) = content_type else {
        return ContentKind::Missing;
    };
    let media_type = value.split(';').next().unwrap_or_default().trim();
    if media_type.eq_ignore_ascii_case(APPLICATION_JSON) {
        ContentKind::Json
    } else {
        ContentKind::Binary
    }
}

/// Extract the filename from an `attachment; filename="..."` disposition.
///
/// Only the first parameter after `attachment` is considered and it must be
/// `filename=<value>`, the value either fully quoted or bare. Anything else,
/// and any name that could escape the target directory, yields `None` so the
/// caller falls back to a generated name.
pub fn filename_from_disposition(disposition: &str) -> Option<String> {
    let value = disposition.trim();
    if !value.to_ascii_lowercase().starts_with("attachment") {
        return None;
    }
    let (_, params) = value.split_once(';')?;
    let first = params.split(';').next()?;
    let (key, name) = first.split_once('=')?;
    if !key.trim().eq_ignore_ascii_case("filename") {
        return None;
    }

    let name = name.trim();
    let name = match name.strip_prefix('"') {
        Some(quoted) => quoted.strip_suffix('"')?.trim(),
        None => name,
    };

    if name.is_empty() || name == "." || name == ".." || name.contains(['"', '/', '\\', '\0']) {
        return None;
    }
    Some(name.to_string())
}

/// A fresh random filename (a hyphenated UUID v4).
pub fn generated_file_name() -> String {
    Uuid::new_v4().to_string()
}

/// Save `response` under `target_dir` if it carries a file.
///
/// Parent directories are created as needed. A partially written file is
/// removed before reporting the failure.
pub fn save_response(response: HttpResponse, target_dir: &Path) -> DownloadResult {
    match classify_content_type(response.header("content-type")) {
        ContentKind::Missing => {
            error!(status = response.status, "download: no Content-Type returned by the server");
            return DownloadResult::NotSaved(NotSavedReason::MissingContentType);
        }
        ContentKind::Json => {
            let status = response.status;
            let body = match response.into_string() {
                Ok(body) => {
                    error!(%status, %body, "download: server answered with an error body");
                    body
                }
                Err(e) => {
                    error!(%status, error = %e, "download: error body could not be read");
                    String::new()
                }
            };
            return DownloadResult::NotSaved(NotSavedReason::ErrorResponse { body });
        }
        ContentKind::Binary => {}
    }

    let disposition = response.header("content-disposition");
    let (file_name, generated) = match disposition.and_then(filename_from_disposition) {
        Some(name) => (name, false),
        None => {
            if let Some(raw) = disposition {
                warn!(
                    disposition = %raw,
                    "download: unusable Content-Disposition, generating a filename"
                );
            }
            (generated_file_name(), true)
        }
    };

    let path = target_dir.join(&file_name);
    match write_body(response, &path) {
        Ok(bytes) => {
            debug!(path = %path.display(), bytes, "download: file saved");
            DownloadResult::Saved(SavedFile {
                path,
                file_name,
                generated,
            })
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "download: failed to save file");
            DownloadResult::NotSaved(NotSavedReason::Io { message: e.to_string() })
        }
    }
}

fn write_body(mut response: HttpResponse, path: &Path) -> io::Result<u64> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    let written = io::copy(&mut response.body, &mut file).and_then(|bytes| {
        file.sync_all()?;
        Ok(bytes)
    });
    if written.is_err() {
        drop(file);
        let _ = fs::remove_file(path);
    }
    written
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    fn response(headers: &[(&str, &str)], body: &[u8]) -> HttpResponse {
        HttpResponse::from_bytes(
            200,
            headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            body.to_vec(),
        )
    }

    #[test]
    fn classify_handles_case_and_parameters() {
        assert_eq!(classify_content_type(None), ContentKind::Missing);
        assert_eq!(classify_content_type(Some("application/json")), ContentKind::Json);
        assert_eq!(classify_content_type(Some("Application/JSON")), ContentKind::Json);
        assert_eq!(
            classify_content_type(Some("application/json; charset=utf-8")),
            ContentKind::Json
        );
        assert_eq!(classify_content_type(Some("application/octet-stream")), ContentKind::Binary);
        assert_eq!(classify_content_type(Some("text/csv")), ContentKind::Binary);
    }

    #[test]
    fn disposition_quoted_and_bare_names() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="report.csv""#).as_deref(),
            Some("report.csv")
        );
        assert_eq!(
            filename_from_disposition("attachment;filename=data.bin").as_deref(),
            Some("data.bin")
        );
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="my report.pdf"; size=10"#)
                .as_deref(),
            Some("my report.pdf")
        );
    }

    #[test]
    fn disposition_deviations_fall_back() {
        for raw in [
            "inline; filename=\"x.csv\"",
            "attachment",
            "attachment; name=\"x.csv\"",
            "attachment; filename",
            "attachment; filename=\"\"",
            "attachment; filename=\"../etc/passwd\"",
            "attachment; filename=\"a/b.csv\"",
            "attachment; filename=..",
            r#"attachment; filename="a;b.csv""#,
            r#"attachment; filename="report.csv"#,
            r#"attachment; filename=report.csv""#,
        ] {
            assert!(filename_from_disposition(raw).is_none(), "{raw}");
        }
    }

    #[test]
    fn generated_names_are_unique_uuids() {
        let a = generated_file_name();
        let b = generated_file_name();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
        assert!(!a.is_empty());
    }

    #[test]
    fn binary_response_is_saved_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let body = b"id,total\n1,9.5\n\xff\x00";
        let result = save_response(
            response(
                &[
                    ("content-type", "application/octet-stream"),
                    ("content-disposition", r#"attachment; filename="report.csv""#),
                ],
                body,
            ),
            dir.path(),
        );

        let file = match result {
            DownloadResult::Saved(file) => file,
            other => panic!("expected a saved file, got {other:?}"),
        };
        assert_eq!(file.file_name, "report.csv");
        assert!(!file.generated);
        assert_eq!(file.path, dir.path().join("report.csv"));
        assert_eq!(fs::read(&file.path).unwrap(), body);
    }

    #[test]
    fn missing_target_directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let result = save_response(response(&[("content-type", "text/plain")], b"hi"), &nested);
        let path = result.path().unwrap();
        assert!(path.starts_with(&nested));
        assert_eq!(fs::read_to_string(path).unwrap(), "hi");
    }

    #[test]
    fn no_disposition_generates_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let first = save_response(response(&[("content-type", "image/png")], b"1"), dir.path());
        let second = save_response(response(&[("content-type", "image/png")], b"2"), dir.path());

        let (DownloadResult::Saved(a), DownloadResult::Saved(b)) = (first, second) else {
            panic!("expected two saved files");
        };
        assert!(a.generated && b.generated);
        assert_ne!(a.file_name, b.file_name);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn json_response_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let body =
            r#"{"statusCode":"ERROR","responseData":{"errCode":"E9","errDesc":"no report"}}"#;
        let result = save_response(
            response(&[("content-type", "application/json")], body.as_bytes()),
            dir.path(),
        );

        assert_eq!(
            result,
            DownloadResult::NotSaved(NotSavedReason::ErrorResponse { body: body.to_string() })
        );
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_content_type_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let result = save_response(response(&[], b"data"), dir.path());
        assert_eq!(result, DownloadResult::NotSaved(NotSavedReason::MissingContentType));
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away"))
        }
    }

    #[test]
    fn stream_failure_reports_and_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let resp = HttpResponse {
            status: 200,
            headers: vec![
                ("content-type".to_string(), "text/csv".to_string()),
                ("content-disposition".to_string(), "attachment; filename=x.csv".to_string()),
            ],
            body: Box::new(FailingReader),
        };

        let result = save_response(resp, dir.path());
        assert!(matches!(result, DownloadResult::NotSaved(NotSavedReason::Io { .. })));
        assert!(!dir.path().join("x.csv").exists());
    }

    #[test]
    fn unreadable_error_body_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let resp = HttpResponse {
            status: 500,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Box::new(FailingReader),
        };

        let result = save_response(resp, dir.path());
        assert_eq!(
            result,
            DownloadResult::NotSaved(NotSavedReason::ErrorResponse { body: String::new() })
        );
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_create_leaves_existing_entry_alone() {
        let dir = tempfile::tempdir().unwrap();
        let taken = dir.path().join("x.csv");
        fs::create_dir(&taken).unwrap();
        fs::write(taken.join("keep.txt"), b"mine").unwrap();

        let result = save_response(
            response(
                &[
                    ("content-type", "text/csv"),
                    ("content-disposition", "attachment; filename=x.csv"),
                ],
                b"a,b\n",
            ),
            dir.path(),
        );
        assert!(matches!(result, DownloadResult::NotSaved(NotSavedReason::Io { .. })));
        assert_eq!(fs::read(taken.join("keep.txt")).unwrap(), b"mine");
    }
}
