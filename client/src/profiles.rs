//! Presentation profiles loaded from `assets/profiles`

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use shared::config::{load_arms_profile_from_file, load_weapon_profile_from_file};
use shared::{ArmsProfile, ConfigError, WeaponProfile};

pub const RIFLE_PROFILE: &str = "profiles/rifle.ron";
pub const FISTS_PROFILE: &str = "profiles/fists.ron";
pub const CLIP_LIBRARY: &str = "profiles/clips.ron";

/// Everything the viewer can equip, plus the length of every known clip
#[derive(Resource, Clone, Debug)]
pub struct Armory {
    pub rifle: WeaponProfile,
    pub fists: ArmsProfile,
    pub clip_lengths: HashMap<String, f32>,
}

impl Armory {
    pub fn load(asset_root: &Path) -> Result<Self, ConfigError> {
        let rifle = load_weapon_profile_from_file(asset_root.join(RIFLE_PROFILE))?;
        let fists = load_arms_profile_from_file(asset_root.join(FISTS_PROFILE))?;
        let clip_lengths = load_clip_lengths(&asset_root.join(CLIP_LIBRARY))?;
        info!(
            "Loaded profiles {:?} and {:?} ({} clips)",
            rifle.name,
            fists.name,
            clip_lengths.len()
        );
        Ok(Self {
            rifle,
            fists,
            clip_lengths,
        })
    }
}

/// Clip name to length in seconds at playback speed 1
pub fn load_clip_lengths(path: &Path) -> Result<HashMap<String, f32>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: PathBuf::from(path),
        source,
    })?;
    parse_clip_lengths(&text)
}

fn parse_clip_lengths(text: &str) -> Result<HashMap<String, f32>, ConfigError> {
    let mut lengths: HashMap<String, f32> = ron::from_str(text)?;
    lengths.retain(|clip, length| {
        let valid = length.is_finite() && *length >= 0.0;
        if !valid {
            warn!("Ignoring clip {clip:?} with length {length}");
        }
        valid
    });
    Ok(lengths)
}
