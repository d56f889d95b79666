use crate::mirror::fs::MirrorFs;
use crate::mirror::rewrite::split_query;
use chrono::NaiveDate;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Persists fetched resources under a dated, versioned mirror directory
///
/// Layout: `<mirror-root>/<YYYY-MM-DD>/<subfolder>/<dirs>/<file>`.
pub struct MirrorWriter {
    fs: Arc<dyn MirrorFs>,
    store_path: PathBuf,
}

impl MirrorWriter {
    pub fn new(
        fs: Arc<dyn MirrorFs>,
        mirror_root: &Path,
        date: NaiveDate,
        subfolder: &str,
    ) -> Self {
        Self {
            fs,
            store_path: dated_store_path(mirror_root, date, subfolder),
        }
    }

    /// Directory every stored resource lands under
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Creates the store directory, wiping a previous mirror first when `clean` is set
    pub fn prepare(&self, clean: bool) -> io::Result<()> {
        if clean && self.fs.exists(&self.store_path) {
            tracing::info!("Removing previous mirror at {}", self.store_path.display());
            self.fs.remove_dir_all(&self.store_path)?;
        }
        self.fs.create_dir_all(&self.store_path)
    }

    /// Writes `body` at the location derived from `relative`
    ///
    /// Returns the full path written.
    pub fn store(&self, relative: &str, is_html: bool, body: &[u8]) -> io::Result<PathBuf> {
        let local = local_path(relative, is_html);
        let path = self.store_path.join(&local);

        if let Some(dir) = path.parent() {
            self.fs.create_dir_all(dir)?;
        }
        self.fs.write(&path, body)?;

        tracing::info!("Wrote file: {} with {} bytes", path.display(), body.len());
        Ok(path)
    }
}

/// `<mirror-root>/<YYYY-MM-DD>/<subfolder>` for a run on `date`
pub fn dated_store_path(mirror_root: &Path, date: NaiveDate, subfolder: &str) -> PathBuf {
    mirror_root
        .join(date.format("%F").to_string())
        .join(subfolder.trim_matches('/'))
}

/// Derives the path of a resource inside the store directory
///
/// The final path segment (plus any query) becomes the file name and the
/// preceding segments become directories. HTML resources always end up in a
/// `.html` file: a missing file name becomes `index.html`, a bare query
/// becomes `index.html?query`, anything else gains a `.html` suffix if it
/// lacks one.
///
/// ```
/// use roundabout::mirror::local_path;
/// use std::path::PathBuf;
///
/// assert_eq!(local_path("/", true), PathBuf::from("index.html"));
/// assert_eq!(local_path("/docs/intro", true), PathBuf::from("docs/intro.html"));
/// assert_eq!(local_path("/css/site.css", false), PathBuf::from("css/site.css"));
/// ```
pub fn local_path(relative: &str, is_html: bool) -> PathBuf {
    let (path, query) = split_query(relative);

    let mut segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && !is_dot_segment(s))
        .collect();

    let file = if path.ends_with('/') || segments.is_empty() {
        String::new()
    } else {
        segments.pop().unwrap_or_default().to_string()
    };
    let file = format!("{}{}", file, query);

    let file = if is_html {
        html_file_name(file)
    } else if file.is_empty() {
        "index".to_string()
    } else {
        file
    };

    let mut local: PathBuf = segments.iter().collect();
    local.push(file);
    local
}

fn html_file_name(file: String) -> String {
    if file.is_empty() {
        "index.html".to_string()
    } else if file.starts_with('?') {
        format!("index.html{}", file)
    } else if file.ends_with(".html") {
        file
    } else {
        format!("{}.html", file)
    }
}

fn is_dot_segment(segment: &str) -> bool {
    segment == "." || segment == ".."
}
