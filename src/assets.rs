//! Static file server for the browser client, on its own port.

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};

use axum::Router;
use axum::extract::{Request, State};
use axum::handler::Handler;
use axum::http::{StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::error::Error;

pub const DEFAULT_STATIC_PORT: u16 = 8000;

/// Characters left unescaped in listing links.
const LINK_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

pub struct AssetServer {
    listener: TcpListener,
    root: PathBuf,
}

impl AssetServer {
    pub async fn bind(addr: SocketAddr, root: impl Into<PathBuf>) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr).await.map_err(|source| Error::Bind {
            service: "static asset server",
            addr,
            source,
        })?;
        let root = root.into();
        info!(
            "Static asset server listening on {}, serving {}",
            listener.local_addr()?,
            root.display()
        );

        Ok(Self { listener, root })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) -> Result<(), Error> {
        axum::serve(self.listener, router(self.root)).await?;
        Ok(())
    }
}

/// File service rooted at `root`. Directories without an `index.html`
/// fall through to a generated listing.
pub fn router(root: impl Into<PathBuf>) -> Router {
    let root = root.into();
    let listing = directory_listing.with_state(root.clone());
    let files = ServeDir::new(&root).fallback(listing);

    Router::new()
        .fallback_service(files)
        .layer(middleware::from_fn_with_state(root, reject_file_with_slash))
        .layer(TraceLayer::new_for_http())
}

/// A trailing slash names a directory; asking for a file that way is a 404.
async fn reject_file_with_slash(
    State(root): State<PathBuf>,
    request: Request,
    next: Next,
) -> Response {
    if names_file_as_directory(&root, request.uri().path()).await {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

async fn names_file_as_directory(root: &Path, request_path: &str) -> bool {
    if request_path.len() <= 1 || !request_path.ends_with('/') {
        return false;
    }
    let Some((relative, _)) = resolve(request_path) else {
        return false;
    };
    tokio::fs::metadata(root.join(relative))
        .await
        .is_ok_and(|meta| meta.is_file())
}

async fn directory_listing(State(root): State<PathBuf>, uri: Uri) -> Response {
    let Some((relative, shown)) = resolve(uri.path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !shown.ends_with('/') {
        return StatusCode::NOT_FOUND.into_response();
    }

    match render_listing(&root.join(relative), &shown).await {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            debug!("No listing for {}: {}", shown, e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Decode a request path into a path relative to the served root.
/// Returns `None` for undecodable paths or ones that climb out of the root.
fn resolve(request_path: &str) -> Option<(PathBuf, String)> {
    let decoded = percent_decode_str(request_path)
        .decode_utf8()
        .ok()?
        .into_owned();

    let mut relative = PathBuf::new();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    Some((relative, decoded))
}

async fn render_listing(dir: &Path, shown: &str) -> std::io::Result<String> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await?.is_dir() {
            name.push('/');
        }
        names.push(name);
    }
    names.sort_by_key(|name| name.to_lowercase());

    let title = format!("Directory listing for {}", escape_html(shown));
    let mut page = String::from("<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n");
    page.push_str("<meta charset=\"utf-8\">\n");
    page.push_str(&format!("<title>{title}</title>\n</head>\n<body>\n"));
    page.push_str(&format!("<h1>{title}</h1>\n<hr>\n<ul>\n"));
    for name in &names {
        page.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            utf8_percent_encode(name, LINK_SAFE),
            escape_html(name)
        ));
    }
    page.push_str("</ul>\n<hr>\n</body>\n</html>\n");

    Ok(page)
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
