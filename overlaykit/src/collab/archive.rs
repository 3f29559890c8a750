//! Archive decompression.

use overlaykit_shared::{OverlayError, OverlayResult};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Decodes a packaged archive into a directory, preserving relative paths.
///
/// Called from the blocking pool.
pub trait ArchiveUnpacker: Send + Sync {
    fn unpack(&self, archive: &Path, destination: &Path) -> OverlayResult<()>;
}

/// Container format, chosen from the archive file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarZstd,
    TarGzip,
    Tar,
}

impl ArchiveFormat {
    pub fn detect(archive: &Path) -> OverlayResult<Self> {
        let name = archive
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if name.ends_with(".tar.zst") || name.ends_with(".tzst") {
            Ok(Self::TarZstd)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(Self::TarGzip)
        } else if name.ends_with(".tar") {
            Ok(Self::Tar)
        } else {
            Err(OverlayError::Config(format!(
                "Unsupported archive format: {}",
                archive.display()
            )))
        }
    }
}

/// Tar unpacker with zstd and gzip decoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct TarUnpacker;

impl ArchiveUnpacker for TarUnpacker {
    fn unpack(&self, archive: &Path, destination: &Path) -> OverlayResult<()> {
        let format = ArchiveFormat::detect(archive)?;
        let file = File::open(archive).map_err(|e| {
            OverlayError::Storage(format!("Failed to open archive {}: {}", archive.display(), e))
        })?;
        let reader = BufReader::new(file);

        tracing::debug!(
            archive = %archive.display(),
            destination = %destination.display(),
            format = ?format,
            "Unpacking archive"
        );

        match format {
            ArchiveFormat::TarZstd => {
                let decoder = zstd::stream::read::Decoder::new(reader).map_err(|e| {
                    OverlayError::Storage(format!(
                        "Failed to initialise zstd decoder for {}: {}",
                        archive.display(),
                        e
                    ))
                })?;
                unpack_tar(decoder, archive, destination)
            }
            ArchiveFormat::TarGzip => {
                unpack_tar(flate2::read::GzDecoder::new(reader), archive, destination)
            }
            ArchiveFormat::Tar => unpack_tar(reader, archive, destination),
        }
    }
}

fn unpack_tar<R: Read>(reader: R, archive: &Path, destination: &Path) -> OverlayResult<()> {
    let mut tar = tar::Archive::new(reader);
    tar.set_preserve_permissions(true);
    tar.unpack(destination).map_err(|e| {
        OverlayError::Storage(format!(
            "Failed to unpack {} into {}: {}",
            archive.display(),
            destination.display(),
            e
        ))
    })
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::path::Path;

    /// Write a `.tar.zst` containing `files` (relative path, contents).
    pub fn write_tar_zst(path: &Path, files: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let encoder = zstd::stream::write::Encoder::new(file, 3).unwrap();
        let mut builder = tar::Builder::new(encoder);
        for (name, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder
                .append_data(&mut header, name, contents.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_detect_format() {
        assert_eq!(ArchiveFormat::detect(Path::new("bin.tar.zst")).unwrap(), ArchiveFormat::TarZstd);
        assert_eq!(ArchiveFormat::detect(Path::new("BIN.TGZ")).unwrap(), ArchiveFormat::TarGzip);
        assert_eq!(ArchiveFormat::detect(Path::new("bin.tar")).unwrap(), ArchiveFormat::Tar);
        assert!(ArchiveFormat::detect(Path::new("bin.zip")).is_err());
    }

    #[test]
    fn test_unpack_tar_zst_preserves_relative_paths() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("bin.tar.zst");
        testutil::write_tar_zst(
            &archive,
            &[("firefox", "#!/bin/sh\n"), ("browser/chrome.manifest", "manifest\n")],
        );

        let dest = dir.path().join("out");
        std::fs::create_dir(&dest).unwrap();
        TarUnpacker.unpack(&archive, &dest).unwrap();

        assert_eq!(std::fs::read_to_string(dest.join("firefox")).unwrap(), "#!/bin/sh\n");
        assert_eq!(
            std::fs::read_to_string(dest.join("browser/chrome.manifest")).unwrap(),
            "manifest\n"
        );
    }

    #[test]
    fn test_unpack_tar_gz() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("bin.tar.gz");
        {
            let file = std::fs::File::create(&archive).unwrap();
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::fast());
            let mut builder = tar::Builder::new(encoder);
            let mut header = tar::Header::new_gnu();
            header.set_size(2);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, "a.txt", &b"hi"[..]).unwrap();
            builder.into_inner().unwrap().finish().unwrap().flush().unwrap();
        }

        let dest = dir.path().join("out");
        std::fs::create_dir(&dest).unwrap();
        TarUnpacker.unpack(&archive, &dest).unwrap();
        assert_eq!(std::fs::read_to_string(dest.join("a.txt")).unwrap(), "hi");
    }

    #[test]
    fn test_missing_archive_is_storage_error() {
        let dir = tempdir().unwrap();
        let err = TarUnpacker
            .unpack(&dir.path().join("absent.tar.zst"), dir.path())
            .unwrap_err();
        assert!(matches!(err, OverlayError::Storage(_)));
    }
}
