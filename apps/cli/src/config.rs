//! Config file location.
//!
//! - Linux: `~/.config/chunkline/uploader.toml`
//! - Windows: `%APPDATA%/chunkline/uploader.toml`

use std::path::PathBuf;

/// Returns the platform-specific configuration file path.
pub fn config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("chunkline").join("uploader.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("chunkline")
            .join("uploader.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_names_app() {
        let path = config_path();
        assert!(
            path.ends_with("chunkline/uploader.toml")
                || path.ends_with("chunkline\\uploader.toml")
        );
    }
}
