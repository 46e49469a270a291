use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::IngestError;
use crate::util::filename_from_content_disposition;

/// Streaming chunk size. Large files are never buffered whole.
pub(crate) const CHUNK_SIZE: usize = 1024 * 1024;

/// Where a download will land: inside a directory (final name decided by the
/// response) or at a literal file path.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Destination {
    Directory(PathBuf),
    File(PathBuf),
}

impl Destination {
    /// Filename precedence for the directory case: the response's
    /// `Content-Disposition` filename, else `{file_id}.dat`.
    pub(crate) fn into_target(self, file_id: &str, content_disposition: Option<&str>) -> PathBuf {
        match self {
            Self::File(path) => path,
            Self::Directory(dir) => {
                let name = content_disposition
                    .and_then(filename_from_content_disposition)
                    .unwrap_or_else(|| format!("{file_id}.dat"));
                dir.join(name)
            }
        }
    }
}

/// Decides where the download will be written and creates the containing
/// directory. Runs before any network I/O.
pub(crate) fn resolve_destination(target: Option<&Path>) -> Result<Destination, IngestError> {
    match target {
        None => {
            let dir = default_downloads_dir()?;
            std::fs::create_dir_all(&dir).map_err(|e| {
                IngestError::config_with(
                    format!("could not create downloads directory {}", dir.display()),
                    e,
                )
            })?;
            Ok(Destination::Directory(dir))
        }
        Some(p) if p.is_dir() => Ok(Destination::Directory(p.to_path_buf())),
        Some(p) => {
            if let Some(parent) = p.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        IngestError::config_with(
                            format!("could not create directory {}", parent.display()),
                            e,
                        )
                    })?;
                }
            }
            Ok(Destination::File(p.to_path_buf()))
        }
    }
}

fn default_downloads_dir() -> Result<PathBuf, IngestError> {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .ok_or_else(|| {
            IngestError::config("could not determine a downloads directory; pass an explicit target")
        })
}

/// Streams `source` into `target` in [`CHUNK_SIZE`] chunks, drawing a
/// progress bar when the total length is known. Returns the byte count.
pub(crate) fn stream_to_file<R: Read>(
    mut source: R,
    target: &Path,
    content_length: Option<u64>,
    progress: bool,
) -> Result<u64, IngestError> {
    let mut out = File::create(target)?;

    let pb = match (progress, content_length) {
        (true, Some(len)) => {
            let pb = ProgressBar::new(len);
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} {bytes}/{total_bytes} ({bytes_per_sec}) {wide_bar} {eta}",
                )
                .unwrap()
                .progress_chars("=>-"),
            );
            Some(pb)
        }
        _ => None,
    };

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut written: u64 = 0;
    loop {
        let n = match source.read(&mut buf)? {
            0 => break,
            n => n,
        };
        out.write_all(&buf[..n])?;
        written += n as u64;
        if let Some(pb) = &pb {
            pb.inc(n as u64);
        }
    }

    out.flush()?;
    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }
    Ok(written)
}
