//! Validated logical filenames.
//!
//! Every filename that crosses the wire is resolved against a mount root by joining the two. A
//! name is therefore accepted only if it is a single plain path component: it cannot name a
//! parent directory, carry a separator, or collide with the server's staging files.

use crate::constants::STAGING_PREFIX;

/// Reasons a logical filename is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileNameError {
    #[error("filename cannot be empty")]
    Empty,
    #[error("filename cannot be '.' or '..'")]
    DotComponent,
    #[error("filename cannot contain a path separator")]
    Separator,
    #[error("filename cannot contain NUL")]
    Nul,
    #[error("filename cannot start with the reserved staging prefix")]
    Reserved,
}

/// A filename relative to a mount root that cannot escape it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileName(String);

impl FileName {
    /// Validates `input` as a logical filename.
    ///
    /// # Errors
    ///
    /// Returns a [`FileNameError`] if the name is empty, is `.` or `..`, contains `/`, `\` or NUL,
    /// or starts with the staging prefix.
    pub fn new(input: impl Into<String>) -> Result<Self, FileNameError> {
        let name = input.into();
        if name.is_empty() {
            return Err(FileNameError::Empty);
        }
        if name == "." || name == ".." {
            return Err(FileNameError::DotComponent);
        }
        if name.contains(['/', '\\']) {
            return Err(FileNameError::Separator);
        }
        if name.contains('\0') {
            return Err(FileNameError::Nul);
        }
        if name.starts_with(STAGING_PREFIX) {
            return Err(FileNameError::Reserved);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for FileName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_names() {
        for name in ["a.txt", "gt-logo.png", ".hidden", "with space", "ünïcode"] {
            let parsed = FileName::new(name).unwrap();
            assert_eq!(parsed.as_str(), name);
        }
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(FileName::new(""), Err(FileNameError::Empty));
    }

    #[test]
    fn test_rejects_parent_and_current_directory() {
        assert_eq!(FileName::new(".."), Err(FileNameError::DotComponent));
        assert_eq!(FileName::new("."), Err(FileNameError::DotComponent));
    }

    #[test]
    fn test_rejects_traversal_and_absolute_paths() {
        assert_eq!(FileName::new("../etc/passwd"), Err(FileNameError::Separator));
        assert_eq!(FileName::new("/etc/passwd"), Err(FileNameError::Separator));
        assert_eq!(FileName::new("dir\\file"), Err(FileNameError::Separator));
    }

    #[test]
    fn test_rejects_nul_and_staging_prefix() {
        assert_eq!(FileName::new("a\0b"), Err(FileNameError::Nul));
        let staged = format!("{STAGING_PREFIX}1234");
        assert_eq!(FileName::new(staged), Err(FileNameError::Reserved));
    }
}
