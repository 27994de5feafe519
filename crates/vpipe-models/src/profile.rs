//! Transcode profiles.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{ModelError, ModelResult};

/// One target rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Quality label, used in object keys and as the rendition's quality
    pub name: String,
    /// FFmpeg scale expression, e.g. "-2:720"
    pub resolution: String,
}

impl Profile {
    pub fn new(name: impl Into<String>, resolution: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolution: resolution.into(),
        }
    }

    /// Playlist file name for this profile.
    pub fn playlist_name(&self) -> String {
        format!("{}.m3u8", self.name)
    }

    /// Scratch subdirectory name for this profile.
    pub fn output_dir_name(&self) -> String {
        format!("hls_{}", self.name)
    }
}

/// Profiles used when no configuration is given.
pub fn default_profiles() -> Vec<Profile> {
    vec![Profile::new("360p", "-2:360"), Profile::new("720p", "-2:720")]
}

/// Check a profile list before the worker starts consuming.
///
/// Names end up verbatim in object keys and in the segment file pattern
/// ffmpeg derives from the playlist name, so they must be non-empty, unique,
/// free of path separators and whitespace, and must not contain `%`.
pub fn validate_profiles(profiles: &[Profile]) -> ModelResult<()> {
    if profiles.is_empty() {
        return Err(ModelError::invalid_profile("profile list is empty"));
    }

    let mut seen = HashSet::new();
    for profile in profiles {
        let name = profile.name.as_str();
        if name.is_empty() {
            return Err(ModelError::invalid_profile("profile name is empty"));
        }
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(ModelError::invalid_profile(format!(
                "profile name '{}' contains a path separator",
                name
            )));
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ModelError::invalid_profile(format!(
                "profile name '{}' contains whitespace",
                name
            )));
        }
        if name.contains('%') {
            return Err(ModelError::invalid_profile(format!(
                "profile name '{}' contains '%'",
                name
            )));
        }
        if profile.resolution.trim().is_empty() {
            return Err(ModelError::invalid_profile(format!(
                "profile '{}' has no resolution",
                name
            )));
        }
        if !seen.insert(name) {
            return Err(ModelError::invalid_profile(format!(
                "duplicate profile name '{}'",
                name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profiles_are_valid() {
        let profiles = default_profiles();
        assert_eq!(profiles.len(), 2);
        assert!(validate_profiles(&profiles).is_ok());
    }

    #[test]
    fn test_profile_names() {
        let profile = Profile::new("1080p", "-2:1080");
        assert_eq!(profile.playlist_name(), "1080p.m3u8");
        assert_eq!(profile.output_dir_name(), "hls_1080p");
    }

    #[test]
    fn test_validate_rejects_bad_lists() {
        assert!(validate_profiles(&[]).is_err());
        assert!(validate_profiles(&[Profile::new("", "-2:360")]).is_err());
        assert!(validate_profiles(&[Profile::new("a/b", "-2:360")]).is_err());
        assert!(validate_profiles(&[Profile::new("360p", " ")]).is_err());
        assert!(validate_profiles(&[Profile::new(" 720p", "-2:720")]).is_err());
        assert!(validate_profiles(&[Profile::new("720p\n", "-2:720")]).is_err());
        assert!(validate_profiles(&[Profile::new("hd 720", "-2:720")]).is_err());
        assert!(validate_profiles(&[Profile::new("720p%d", "-2:720")]).is_err());
        assert!(validate_profiles(&[
            Profile::new("360p", "-2:360"),
            Profile::new("360p", "640:360"),
        ])
        .is_err());
    }

    #[test]
    fn test_profiles_from_json() {
        let profiles: Vec<Profile> =
            serde_json::from_str(r#"[{"name":"480p","resolution":"-2:480"}]"#).unwrap();
        assert_eq!(profiles, vec![Profile::new("480p", "-2:480")]);
    }
}
