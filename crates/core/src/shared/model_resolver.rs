use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::config::ModelSource;
use crate::shared::constants::APP_DIR_NAME;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model file not found: {0}")]
    NotFound(PathBuf),
    #[error("model {name} is not available locally and has no download url")]
    Unavailable { name: String },
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("download of {url} was interrupted: {source}")]
    Transfer {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Resolve a model file, checking local locations before downloading.
///
/// Resolution order:
/// 1. Explicit `source.path` (an error if it does not exist)
/// 2. User cache directory (platform-specific)
/// 3. Bundled directory (for development / pre-packaged installs)
/// 4. Download from `source.url` to the cache
pub fn resolve(
    source: &ModelSource,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = explicit_path(source)? {
        return Ok(path);
    }
    let cache_dir = model_cache_dir()?;
    resolve_in(source, &cache_dir, bundled_dir, progress)
}

fn explicit_path(source: &ModelSource) -> Result<Option<PathBuf>, ModelResolveError> {
    match &source.path {
        Some(path) if path.exists() => Ok(Some(path.clone())),
        Some(path) => Err(ModelResolveError::NotFound(path.clone())),
        None => Ok(None),
    }
}

/// Steps 2-4 of [`resolve`]; `source.path` is not consulted.
fn resolve_in(
    source: &ModelSource,
    cache_dir: &Path,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(&source.name);
    if cached_path.exists() {
        log::debug!("Using cached model {}", cached_path.display());
        return Ok(cached_path);
    }

    if let Some(dir) = bundled_dir {
        let bundled_path = dir.join(&source.name);
        if bundled_path.exists() {
            log::debug!("Using bundled model {}", bundled_path.display());
            return Ok(bundled_path);
        }
    }

    let Some(url) = source.url.as_deref() else {
        return Err(ModelResolveError::Unavailable {
            name: source.name.clone(),
        });
    };

    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {} from {url}", source.name);
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/gesturecam/models/`
/// - Linux: `$XDG_CACHE_HOME/gesturecam/models/` or `~/.cache/gesturecam/models/`
/// - Windows: `%LOCALAPPDATA%/gesturecam/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

/// Counts bytes on their way to `inner` and reports them to `progress`.
struct ProgressWriter<W> {
    inner: W,
    written: u64,
    total: u64,
    progress: Option<ProgressFn>,
}

impl<W: Write> Write for ProgressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        if let Some(cb) = &self.progress {
            cb(self.written, self.total);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Stream `url` into `<dest>.part`, then rename it to `dest`. The partial
/// file is removed on any failure.
fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;
    let total = response.content_length().unwrap_or(0);

    let part = dest.with_extension("part");
    let result = write_body(&mut response, url, &part, dest, total, progress).and_then(|()| {
        fs::rename(&part, dest).map_err(|e| ModelResolveError::Write {
            path: dest.to_path_buf(),
            source: e,
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(&part);
    }
    result
}

/// Copy `body` into `part`. Read failures name the url, write failures the
/// destination.
fn write_body(
    body: &mut impl Read,
    url: &str,
    part: &Path,
    dest: &Path,
    total: u64,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let write_err = |e: io::Error| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    };
    let file = fs::File::create(part).map_err(write_err)?;
    let mut writer = ProgressWriter {
        inner: io::BufWriter::new(file),
        written: 0,
        total,
        progress,
    };

    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(ModelResolveError::Transfer {
                    url: url.to_string(),
                    source: e,
                })
            }
        };
        writer.write_all(&buf[..n]).map_err(write_err)?;
    }
    writer.flush().map_err(write_err)
}
