//! Source and object file naming and source loading.
//!
//! File names are normalised by keeping everything before the first `.` and
//! appending a fixed suffix, so `prog`, `prog.s` and `prog.asm` all assemble
//! `prog.asm` into `prog.obj`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::AssembleError;

/// Replaces the extension (everything from the first `.` of the file name)
/// with `suffix`, keeping the directory.
#[must_use]
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.split('.').next().unwrap_or_default();
    path.with_file_name(format!("{stem}.{suffix}"))
}

/// Resolves an `isa` operand to the object file it names.
///
/// Relative names are looked up in `dir`; the extension is replaced with
/// `suffix`.
#[must_use]
pub fn import_path(name: &str, dir: &Path, suffix: &str) -> PathBuf {
    let named = with_suffix(Path::new(name.trim()), suffix);
    if named.is_absolute() {
        named
    } else {
        dir.join(named)
    }
}

/// Reads a whole source file.
///
/// # Errors
///
/// Returns [`AssembleError::SourceRead`] when the file cannot be read.
pub fn read_source(path: &Path) -> Result<String, AssembleError> {
    fs::read_to_string(path).map_err(|source| AssembleError::SourceRead {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("prog", "asm", "prog.asm")]
    #[case("prog.s", "asm", "prog.asm")]
    #[case("prog.asm", "obj", "prog.obj")]
    #[case("dir/prog.v2.asm", "obj", "dir/prog.obj")]
    fn suffix_replacement(#[case] input: &str, #[case] suffix: &str, #[case] expected: &str) {
        assert_eq!(with_suffix(Path::new(input), suffix), PathBuf::from(expected));
    }

    #[test]
    fn import_names_are_relative_to_dir() {
        assert_eq!(
            import_path("microcode.asm", Path::new("/src"), "obj"),
            PathBuf::from("/src/microcode.obj")
        );
        assert_eq!(
            import_path("/abs/cpu", Path::new("/src"), "obj"),
            PathBuf::from("/abs/cpu.obj")
        );
    }

    #[test]
    fn missing_source_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("none.asm");
        let err = read_source(&path).unwrap_err();
        assert!(matches!(err, AssembleError::SourceRead { path: p, .. } if p == path));
    }
}
