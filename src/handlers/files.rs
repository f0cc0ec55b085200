//! File upload and download under a configured root directory.
//!
//! # Responsibilities
//! - Resolve `/files/<path>` to a location inside the root
//! - `POST`: create the file from the request body, never overwriting
//! - `GET`: return the file as an attachment
//!
//! # Design Decisions
//! - Paths are normalized lexically; any `..` that would leave the root
//!   is rejected before the filesystem is touched
//! - Uploads use exclusive create, so two racing uploads to the same path
//!   produce exactly one 201 and one 409
//! - Filesystem errors other than "not found" surface as 500

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::http::middleware::Handler;
use crate::http::request::Request;
use crate::http::response::{Response, Status};

pub const PREFIX: &str = "/files/";

/// Why a requested file path was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty file path")]
    Empty,
    #[error("path escapes the files directory")]
    Traversal,
}

/// Normalize the part of the target after `/files/` into a relative path.
///
/// `.` segments and empty segments are dropped and `..` removes the
/// previous segment. A `..` with nothing left to remove is a traversal.
pub fn resolve(raw: &str) -> Result<PathBuf, PathError> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathError::Traversal);
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err(PathError::Empty);
    }
    Ok(segments.iter().collect())
}

/// Serves `/files/` from an optional root directory.
#[derive(Debug, Clone, Default)]
pub struct Files {
    root: Option<PathBuf>,
}

impl Files {
    /// With no root, every request is answered with 400.
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    async fn serve(&self, req: &Request) -> Response {
        let Some(root) = &self.root else {
            tracing::warn!("Directory not specified for /files endpoint");
            return Response::new(Status::BadRequest);
        };

        let raw = req.path().strip_prefix(PREFIX).unwrap_or_default();
        let relative = match resolve(raw) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(path = %raw, error = %e, "Invalid file path");
                return Response::new(Status::BadRequest);
            }
        };
        let full_path = root.join(relative);

        match req.method() {
            "POST" => upload(req, &full_path).await,
            "GET" => download(&full_path).await,
            _ => Response::new(Status::MethodNotAllowed),
        }
    }
}

impl Handler for Files {
    fn handle<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Response> {
        Box::pin(self.serve(req))
    }
}

async fn upload(req: &Request, path: &Path) -> Response {
    let Some(body) = req.body() else {
        tracing::warn!("No request body provided for POST method");
        return Response::new(Status::BadRequest);
    };

    if let Some(parent) = path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            tracing::error!(path = %parent.display(), error = %e, "Error creating directory");
            return Response::new(Status::InternalServerError);
        }
    }

    match tokio::fs::try_exists(path).await {
        Ok(false) => {}
        Ok(true) => {
            tracing::info!(path = %path.display(), "File already exists");
            return Response::new(Status::Conflict);
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Error checking file existence");
            return Response::new(Status::InternalServerError);
        }
    }

    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            tracing::info!(path = %path.display(), "File created concurrently");
            return Response::new(Status::Conflict);
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Error creating file");
            return Response::new(Status::InternalServerError);
        }
    };

    if let Err(e) = write_all(&mut file, body).await {
        tracing::error!(path = %path.display(), error = %e, "Error writing file");
        return Response::new(Status::InternalServerError);
    }

    tracing::info!(path = %path.display(), bytes = body.len(), "File uploaded");
    Response::new(Status::Created)
}

async fn write_all(file: &mut tokio::fs::File, body: &[u8]) -> std::io::Result<()> {
    file.write_all(body).await?;
    file.flush().await
}

async fn download(path: &Path) -> Response {
    match tokio::fs::metadata(path).await {
        Ok(meta) if !meta.is_dir() => {}
        _ => return Response::new(Status::NotFound),
    }

    let content = match tokio::fs::read(path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Error reading file");
            return Response::new(Status::InternalServerError);
        }
    };

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Response::ok(content)
        .with_header("Content-Type", "application/octet-stream")
        .with_header(
            "Content-Disposition",
            format!("attachment; filename={filename}"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::HTTP_1_1;

    fn files(dir: &tempfile::TempDir) -> Files {
        Files::new(Some(dir.path().to_path_buf()))
    }

    async fn post(files: &Files, path: &str, body: Option<&str>) -> Response {
        let mut req = Request::new("POST", path, HTTP_1_1);
        if let Some(body) = body {
            req = req.with_body(body);
        }
        files.handle(&req).await
    }

    async fn get(files: &Files, path: &str) -> Response {
        files.handle(&Request::new("GET", path, HTTP_1_1)).await
    }

    #[test]
    fn resolve_normalizes_segments() {
        assert_eq!(resolve("a.txt"), Ok(PathBuf::from("a.txt")));
        assert_eq!(resolve("dir/./b.txt"), Ok(PathBuf::from("dir/b.txt")));
        assert_eq!(resolve("dir//x/../b.txt"), Ok(PathBuf::from("dir/b.txt")));
        assert_eq!(resolve("/abs/path"), Ok(PathBuf::from("abs/path")));
        assert_eq!(resolve("a..b"), Ok(PathBuf::from("a..b")));
    }

    #[test]
    fn resolve_rejects_escape_and_empty() {
        assert_eq!(resolve("../etc/passwd"), Err(PathError::Traversal));
        assert_eq!(resolve("a/../../b"), Err(PathError::Traversal));
        assert_eq!(resolve(""), Err(PathError::Empty));
        assert_eq!(resolve("./"), Err(PathError::Empty));
        assert_eq!(resolve("a/.."), Err(PathError::Empty));
    }

    #[tokio::test]
    async fn upload_then_download() {
        let dir = tempfile::tempdir().unwrap();
        let files = files(&dir);

        let created = post(&files, "/files/a.txt", Some("hello")).await;
        assert_eq!(created.status(), Status::Created);
        assert!(created.body().is_empty());
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"hello");

        let fetched = get(&files, "/files/a.txt").await;
        assert_eq!(fetched.status(), Status::Ok);
        assert_eq!(fetched.body(), b"hello");
        assert_eq!(fetched.header("content-type"), Some("application/octet-stream"));
        assert_eq!(
            fetched.header("content-disposition"),
            Some("attachment; filename=a.txt")
        );
    }

    #[tokio::test]
    async fn second_upload_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let files = files(&dir);

        assert_eq!(post(&files, "/files/a.txt", Some("one")).await.status(), Status::Created);
        assert_eq!(post(&files, "/files/a.txt", Some("two")).await.status(), Status::Conflict);
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"one");
    }

    #[tokio::test]
    async fn upload_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let files = files(&dir);

        let response = post(&files, "/files/nested/deeper/c.bin", Some("data")).await;
        assert_eq!(response.status(), Status::Created);
        assert!(dir.path().join("nested/deeper/c.bin").is_file());

        let fetched = get(&files, "/files/nested/deeper/c.bin").await;
        assert_eq!(
            fetched.header("content-disposition"),
            Some("attachment; filename=c.bin")
        );
    }

    #[tokio::test]
    async fn upload_without_body_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let response = post(&files(&dir), "/files/a.txt", None).await;
        assert_eq!(response.status(), Status::BadRequest);
        assert!(!dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn upload_under_a_file_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plain"), b"x").unwrap();

        let response = post(&files(&dir), "/files/plain/child.txt", Some("y")).await;
        assert_eq!(response.status(), Status::InternalServerError);
    }

    #[tokio::test]
    async fn concurrent_uploads_yield_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let files = files(&dir);

        let (a, b) = tokio::join!(
            post(&files, "/files/race.txt", Some("a")),
            post(&files, "/files/race.txt", Some("b")),
        );
        let mut statuses = [a.status(), b.status()];
        statuses.sort_by_key(|s| s.code());
        assert_eq!(statuses, [Status::Created, Status::Conflict]);
    }

    #[tokio::test]
    async fn download_missing_or_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let files = files(&dir);

        assert_eq!(get(&files, "/files/missing.txt").await.status(), Status::NotFound);
        assert_eq!(get(&files, "/files/sub").await.status(), Status::NotFound);
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let files = files(&dir);

        assert_eq!(get(&files, "/files/../etc/passwd").await.status(), Status::BadRequest);
        assert_eq!(
            post(&files, "/files/../escape.txt", Some("x")).await.status(),
            Status::BadRequest
        );
        assert!(!dir.path().parent().unwrap().join("escape.txt").exists());
        assert_eq!(get(&files, "/files/").await.status(), Status::BadRequest);
    }

    #[tokio::test]
    async fn missing_root_is_bad_request() {
        let files = Files::new(None);
        assert_eq!(get(&files, "/files/a.txt").await.status(), Status::BadRequest);
        assert_eq!(post(&files, "/files/a.txt", Some("x")).await.status(), Status::BadRequest);
    }

    #[tokio::test]
    async fn other_methods_are_not_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let response = files(&dir)
            .handle(&Request::new("PUT", "/files/a.txt", HTTP_1_1))
            .await;
        assert_eq!(response.status(), Status::MethodNotAllowed);
    }
}
