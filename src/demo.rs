//! Sample resources served by the `frog` binary.
//!
//! - `POST ^/string$` echoes the body
//! - `POST ^/json$` answers `firstname lastname` from a JSON object
//! - `GET ^/id/([0-9]+)$` answers the captured id
//! - `GET ^/reqinfo$` describes the request as HTML
//! - any other `GET` is served from the document root

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};
use crate::server::Server;

/// Registers every sample resource on `server`.
pub fn register(server: &mut Server, document_root: PathBuf) {
    server
        .resource("^/string$", "POST", echo_string)
        .resource("^/json$", "POST", json_names)
        .resource("^/id/([0-9]+)$", "GET", |response, request| {
            response.ok(request.capture(1).unwrap_or_default());
            Ok(())
        })
        .resource("^/reqinfo$", "GET", request_info)
        .default_resource("GET", move |response, request| {
            serve_file(&document_root, response, request)
        });
}

pub fn echo_string(response: &mut Response, request: &Request) -> anyhow::Result<()> {
    response.ok(&request.content);
    Ok(())
}

/// Answers with "firstname lastname" from a posted JSON object, or 400
/// with the reason the body was unusable.
pub fn json_names(response: &mut Response, request: &Request) -> anyhow::Result<()> {
    let names = serde_json::from_slice::<serde_json::Value>(&request.content)
        .map_err(|e| e.to_string())
        .and_then(|doc| {
            let field = |key: &str| {
                doc.get(key)
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| format!("No such node ({key})"))
            };
            Ok(format!("{} {}", field("firstname")?, field("lastname")?))
        });

    match names {
        Ok(name) => response.ok(name),
        Err(message) => response.bad_request(message),
    }
    Ok(())
}

pub fn request_info(response: &mut Response, request: &Request) -> anyhow::Result<()> {
    let mut page = String::new();
    write!(
        page,
        "<h2>Request from {}:{}</h2>",
        request.remote_endpoint_address(),
        request.remote_endpoint_port()
    )?;
    write!(page, "{} {} HTTP/{}<br>", request.method, request.path, request.http_version)?;
    for (name, value) in &request.headers {
        write!(page, "{name}: {value}<br>")?;
    }

    response.send(StatusCode::Ok, &[("Content-Type", "text/html")], page);
    Ok(())
}

/// Serves files below `root`; directories map to their `index.html`.
pub fn serve_file(root: &Path, response: &mut Response, request: &Request) -> anyhow::Result<()> {
    match read_under_root(root, &request.path) {
        Some(content) => response.ok(content),
        None => response.bad_request(format!("Could not open path {}", request.path)),
    }
    Ok(())
}

fn read_under_root(root: &Path, request_path: &str) -> Option<Vec<u8>> {
    let root = root.canonicalize().ok()?;
    let mut path = root.join(request_path.trim_start_matches('/')).canonicalize().ok()?;

    // Refuse anything that escapes the root through `..` or symlinks.
    if !path.starts_with(&root) {
        tracing::debug!(path = %path.display(), "Request outside document root");
        return None;
    }
    if path.is_dir() {
        path.push("index.html");
    }
    std::fs::read(&path).ok()
}
