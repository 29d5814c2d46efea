//! Where VST2 plugins live on disk.
//!
//! Only lists candidate files; loading them is up to the caller.

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Default VST2 folders for the current platform.
///
/// On Windows a non-empty `VST_PATH` environment variable is appended.
pub fn default_scan_paths() -> Vec<PathBuf> {
    scan_paths_for(
        std::env::consts::OS,
        std::env::var("HOME").ok().as_deref(),
        std::env::var("VST_PATH").ok().as_deref(),
    )
}

/// Library extension of a VST2 plugin on the current platform, dot included.
pub fn file_extension() -> &'static str {
    extension_for(std::env::consts::OS)
}

/// Whether `path` carries this platform's plugin extension.
pub fn is_plugin_file(path: &Path) -> bool {
    let wanted = &file_extension()[1..];
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

/// Plugin files directly inside `dir`, sorted. Subdirectories are not
/// descended into.
pub fn scan_directory(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if is_plugin_file(&path) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Scan every [`default_scan_paths`] folder, skipping the ones that are
/// missing or unreadable.
pub fn scan_default_paths() -> Vec<PathBuf> {
    let mut found = Vec::new();
    for dir in default_scan_paths() {
        if !dir.is_dir() {
            tracing::debug!("Skipping missing plugin folder {}", dir.display());
            continue;
        }
        match scan_directory(&dir) {
            Ok(mut plugins) => found.append(&mut plugins),
            Err(e) => tracing::warn!("Failed to scan {}: {}", dir.display(), e),
        }
    }
    tracing::info!("Found {} VST2 plugins", found.len());
    found
}

fn scan_paths_for(os: &str, home: Option<&str>, vst_path: Option<&str>) -> Vec<PathBuf> {
    let home = home.unwrap_or_default();
    match os {
        "macos" => vec![
            PathBuf::from(format!("{}/Library/Audio/Plug-Ins/VST", home)),
            PathBuf::from("/Library/Audio/Plug-Ins/VST"),
        ],
        "windows" => {
            let mut paths = vec![
                PathBuf::from("C:\\Program Files (x86)\\Steinberg\\VSTPlugins"),
                PathBuf::from("C:\\Program Files\\Steinberg\\VSTPlugins"),
            ];
            if let Some(extra) = vst_path.filter(|p| !p.is_empty()) {
                paths.push(PathBuf::from(extra));
            }
            paths
        }
        "linux" => vec![
            PathBuf::from("/usr/lib/vst"),
            PathBuf::from("/usr/local/lib/vst"),
            PathBuf::from(format!("{}/.vst", home)),
        ],
        _ => Vec::new(),
    }
}

fn extension_for(os: &str) -> &'static str {
    match os {
        "macos" => ".vst",
        "windows" => ".dll",
        _ => ".so",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_extension_per_platform() {
        assert_eq!(extension_for("macos"), ".vst");
        assert_eq!(extension_for("windows"), ".dll");
        assert_eq!(extension_for("linux"), ".so");
        assert_eq!(extension_for("freebsd"), ".so");
    }

    #[test]
    fn test_macos_paths_expand_home() {
        let paths = scan_paths_for("macos", Some("/Users/ada"), None);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/Users/ada/Library/Audio/Plug-Ins/VST"),
                PathBuf::from("/Library/Audio/Plug-Ins/VST"),
            ]
        );
    }

    #[test]
    fn test_windows_paths_append_vst_path() {
        let paths = scan_paths_for("windows", None, None);
        assert_eq!(paths.len(), 2);
        assert!(paths[0].to_string_lossy().contains("Steinberg"));

        let paths = scan_paths_for("windows", None, Some("D:\\Plugins"));
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[2], PathBuf::from("D:\\Plugins"));

        assert_eq!(scan_paths_for("windows", None, Some("")).len(), 2);
    }

    #[test]
    fn test_linux_paths() {
        let paths = scan_paths_for("linux", Some("/home/ada"), None);
        assert_eq!(paths[0], PathBuf::from("/usr/lib/vst"));
        assert_eq!(paths[2], PathBuf::from("/home/ada/.vst"));
    }

    #[test]
    fn test_is_plugin_file() {
        let ext = &file_extension()[1..];
        assert!(is_plugin_file(Path::new(&format!("Reverb.{}", ext))));
        assert!(is_plugin_file(Path::new(&format!(
            "Reverb.{}",
            ext.to_ascii_uppercase()
        ))));
        assert!(!is_plugin_file(Path::new("Reverb.vst3")));
        assert!(!is_plugin_file(Path::new("README")));
    }

    #[test]
    fn test_scan_directory_lists_plugins_only() {
        let dir = tempfile::tempdir().unwrap();
        let ext = file_extension();

        fs::write(dir.path().join(format!("b{}", ext)), b"").unwrap();
        fs::write(dir.path().join(format!("a{}", ext)), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join(format!("c{}", ext)), b"").unwrap();

        let found = scan_directory(dir.path()).unwrap();
        assert_eq!(
            found,
            vec![
                dir.path().join(format!("a{}", ext)),
                dir.path().join(format!("b{}", ext)),
            ]
        );
    }

    #[test]
    fn test_scan_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = scan_directory(dir.path().join("missing"));
        assert!(matches!(result, Err(crate::ProcessorError::Io(_))));
    }
}
