use std::path::{Path, PathBuf};

use directories_next::ProjectDirs;

pub const CONFIG_FILE: &str = "shadergen.toml";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Shadergen";
const APPLICATION: &str = "shadergen";

/// `<user config dir>/shadergen.toml`, if the platform has a config dir.
pub fn user_config_file() -> Option<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Picks the configuration file to load. An explicit path (flag or
/// `SHADERGEN_CONFIG`) must exist; the user file is optional.
pub fn resolve_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    user_config_file().filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let explicit = Path::new("/nonexistent/custom.toml");
        assert_eq!(resolve_config(Some(explicit)), Some(explicit.to_path_buf()));
    }

    #[test]
    fn user_file_is_named_after_the_tool() {
        if let Some(path) = user_config_file() {
            assert_eq!(path.file_name().and_then(|n| n.to_str()), Some(CONFIG_FILE));
        }
    }
}
