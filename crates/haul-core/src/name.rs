//! Entry name rules.

/// Extensions that span two dots and must stay together when a name is split.
const COMPOUND_EXTENSIONS: [&str; 3] = [".tar.gz", ".tar.bz2", ".tar.xz"];

const WINDOWS_INVALID: [char; 8] = [':', '*', '?', '"', '<', '>', '|', '\\'];

const WINDOWS_RESERVED: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Validate a single entry name.
///
/// Always rejects empty names, path separators, NUL, `.`/`..` and names
/// longer than 255 bytes. With `strict` set, Windows-hostile names are
/// rejected as well regardless of the host platform.
pub fn validate_name(name: &str, strict: bool) -> Result<(), String> {
    if name.is_empty() {
        return Err("Name cannot be empty".into());
    }

    if name.len() > 255 {
        return Err("Name is too long (max 255 bytes)".into());
    }

    for c in ['/', '\\', '\0'] {
        if name.contains(c) {
            return Err(format!("Name cannot contain '{}'", c.escape_default()));
        }
    }

    if name == "." || name == ".." {
        return Err("'.' and '..' are reserved names".into());
    }

    if strict || cfg!(target_os = "windows") {
        if let Some(c) = name.chars().find(|c| WINDOWS_INVALID.contains(c)) {
            return Err(format!("Name cannot contain '{}'", c));
        }

        let upper = name.to_uppercase();
        let base = upper.split('.').next().unwrap_or("");
        if WINDOWS_RESERVED.contains(&base) {
            return Err("Reserved filename".into());
        }

        if name.starts_with(' ') || name.ends_with(' ') {
            return Err("Name cannot start or end with spaces".into());
        }

        if name.ends_with('.') {
            return Err("Name cannot end with a dot".into());
        }
    }

    Ok(())
}

/// Split a name into base and extension (extension keeps its leading dot).
///
/// Directories and dot-files without a further dot have no extension.
pub fn split_name(name: &str, is_dir: bool) -> (&str, &str) {
    if is_dir {
        return (name, "");
    }

    let lower = name.to_ascii_lowercase();
    for ext in COMPOUND_EXTENSIONS {
        if lower.len() > ext.len() && lower.ends_with(ext) {
            let at = name.len() - ext.len();
            return name.split_at(at);
        }
    }

    match name.rfind('.') {
        Some(at) if at > 0 => name.split_at(at),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name_valid() {
        assert!(validate_name("test.txt", false).is_ok());
        assert!(validate_name("my-file", false).is_ok());
        assert!(validate_name(".hidden", false).is_ok());
        assert!(validate_name("file with spaces", false).is_ok());
        assert!(validate_name("file with spaces", true).is_ok());
    }

    #[test]
    fn test_validate_name_invalid() {
        assert!(validate_name("", false).is_err());
        assert!(validate_name("test/file", false).is_err());
        assert!(validate_name("test\\file", false).is_err());
        assert!(validate_name("nul\0byte", false).is_err());
        assert!(validate_name(".", false).is_err());
        assert!(validate_name("..", false).is_err());
        assert!(validate_name(&"x".repeat(256), false).is_err());
    }

    #[test]
    fn test_validate_name_strict() {
        assert!(validate_name("a:b", true).is_err());
        assert!(validate_name("CON.txt", true).is_err());
        assert!(validate_name("file ", true).is_err());
        assert!(validate_name("file.", true).is_err());
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("a.txt", false), ("a", ".txt"));
        assert_eq!(split_name("a.b.txt", false), ("a.b", ".txt"));
        assert_eq!(split_name("Makefile", false), ("Makefile", ""));
        assert_eq!(split_name(".bashrc", false), (".bashrc", ""));
        assert_eq!(split_name("backup.tar.gz", false), ("backup", ".tar.gz"));
        assert_eq!(split_name("photos.v2", true), ("photos.v2", ""));
    }
}
