//! Archive format detection.

use serde::{Deserialize, Serialize};

/// Supported archive container formats.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveFormat {
    /// Deflate-compressed zip.
    #[default]
    #[strum(serialize = "zip")]
    Zip,
    /// Gzip-compressed tarball.
    #[strum(serialize = "tar.gz")]
    TarGz,
}

impl ArchiveFormat {
    /// File extension, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }

    /// Detect the format from a file name.
    pub fn detect(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }

    /// Append this format's extension unless `base` already carries it.
    pub fn file_name(&self, base: &str) -> String {
        if Self::detect(base) == Some(*self) {
            base.to_string()
        } else {
            format!("{}.{}", base, self.extension())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(ArchiveFormat::detect("a.zip"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::detect("A.ZIP"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::detect("a.tar.gz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::detect("a.tgz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::detect("a.tar"), None);
        assert_eq!(ArchiveFormat::detect("zip"), None);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(ArchiveFormat::Zip.file_name("photos"), "photos.zip");
        assert_eq!(ArchiveFormat::Zip.file_name("photos.zip"), "photos.zip");
        assert_eq!(ArchiveFormat::TarGz.file_name("photos"), "photos.tar.gz");
    }
}
