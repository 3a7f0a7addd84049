//! Profile database for runtime loading and lookup
//!
//! Profiles are described in RON, one profile per file:
//!
//! ```ron
//! (
//!     name: "zerogravitas",
//!     description: "Zero Gravitas 3000 mAh single-cell pack",
//!     version: 5,
//!     blocks: [
//!         (class: 0x02, index: 0, data: [0x02, 0x26, 0x00, 0x00, 0x32], checksum: 0xA5),
//!         (class: 0x24, index: 0, data: [0x00, 0x19, 0x28, 0x63, 0x5F, 0xFF, 0x62, 0x00, 0x32]),
//!     ],
//! )
//! ```
//!
//! Block data shorter than 32 bytes is zero padded. A checksum, when given,
//! must agree with the padded data; otherwise it is computed.

use std::fs;
use std::io;
use std::path::Path;
use std::string::String;
use std::vec::Vec;
use std::{format, vec};

use super::GoldenConfig;
use crate::apply::ConfigVersion;
use crate::block::{checksum, BlockId, ExtendedCommand, BLOCK_SIZE, DEFAULT_SETTLE_MS};
use crate::gate::{ChipRevision, BQ27441_G1};

/// Error type for profile database operations
#[derive(Debug)]
pub enum ProfileDbError {
    /// I/O error reading files
    Io(io::Error),
    /// RON parsing error
    Parse(ron::error::SpannedError),
    /// Validation error
    Validation(String),
}

impl From<io::Error> for ProfileDbError {
    fn from(e: io::Error) -> Self {
        ProfileDbError::Io(e)
    }
}

impl From<ron::error::SpannedError> for ProfileDbError {
    fn from(e: ron::error::SpannedError) -> Self {
        ProfileDbError::Parse(e)
    }
}

impl std::fmt::Display for ProfileDbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileDbError::Io(e) => write!(f, "I/O error: {}", e),
            ProfileDbError::Parse(e) => write!(f, "Parse error: {}", e),
            ProfileDbError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ProfileDbError {}

// ============================================================================
// RON deserialization types (intermediate format)
// ============================================================================

#[derive(Debug, Clone, serde::Deserialize)]
struct BlockDef {
    class: u8,
    index: u8,
    data: Vec<u8>,
    #[serde(default)]
    checksum: Option<u8>,
    #[serde(default = "default_settle_ms")]
    settle_ms: u16,
}

fn default_settle_ms() -> u16 {
    DEFAULT_SETTLE_MS
}

#[derive(Debug, Clone, serde::Deserialize)]
struct ProfileDef {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_device_type")]
    device_type: u16,
    #[serde(default = "default_firmware_version")]
    firmware_version: u16,
    version: u8,
    blocks: Vec<BlockDef>,
}

fn default_device_type() -> u16 {
    BQ27441_G1.device_type
}

fn default_firmware_version() -> u16 {
    BQ27441_G1.firmware_version
}

impl BlockDef {
    fn into_command(self, profile: &str) -> Result<ExtendedCommand, ProfileDbError> {
        let block = BlockId::new(self.class, self.index);

        if self.data.len() > BLOCK_SIZE {
            return Err(ProfileDbError::Validation(format!(
                "{}: block {} has {} bytes of data, at most {} allowed",
                profile,
                block,
                self.data.len(),
                BLOCK_SIZE
            )));
        }

        let mut payload = [0u8; BLOCK_SIZE];
        payload[..self.data.len()].copy_from_slice(&self.data);
        let computed = checksum(&payload);

        match self.checksum {
            Some(given) if given != computed => Err(ProfileDbError::Validation(format!(
                "{}: block {} checksum 0x{:02X} does not match data (0x{:02X})",
                profile, block, given, computed
            ))),
            _ => Ok(ExtendedCommand::new(block, payload, computed, self.settle_ms)),
        }
    }
}

// ============================================================================
// Profile database
// ============================================================================

/// Owned golden profile loaded from a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Short identifier
    pub name: String,
    /// Human readable description
    pub description: String,
    /// Chip revision the blocks were generated for
    pub revision: ChipRevision,
    /// Version stamped after a successful apply
    pub version: ConfigVersion,
    /// Block writes, applied in order
    pub commands: Vec<ExtendedCommand>,
}

impl Profile {
    /// Borrow this profile in the form the applier consumes
    pub fn as_config(&self) -> GoldenConfig<'_> {
        GoldenConfig {
            name: &self.name,
            description: &self.description,
            revision: self.revision,
            version: self.version,
            commands: &self.commands,
        }
    }
}

impl From<&GoldenConfig<'_>> for Profile {
    fn from(config: &GoldenConfig<'_>) -> Self {
        Self {
            name: config.name.into(),
            description: config.description.into(),
            revision: config.revision,
            version: config.version,
            commands: config.commands.to_vec(),
        }
    }
}

/// Runtime profile database
#[derive(Debug, Clone, Default)]
pub struct ProfileDatabase {
    profiles: Vec<Profile>,
}

impl ProfileDatabase {
    /// Create an empty profile database
    pub fn new() -> Self {
        Self {
            profiles: Vec::new(),
        }
    }

    /// Create a database holding the built-in profiles
    pub fn with_builtin() -> Self {
        Self {
            profiles: super::builtin::all().iter().map(Profile::from).collect(),
        }
    }

    /// Load one profile from a RON string
    ///
    /// A profile with the same name as an existing one replaces it.
    pub fn load_ron(&mut self, content: &str) -> Result<usize, ProfileDbError> {
        let def: ProfileDef = ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .from_str(content)?;

        let mut commands = Vec::with_capacity(def.blocks.len());
        for block in def.blocks {
            commands.push(block.into_command(&def.name)?);
        }

        let profile = Profile {
            name: def.name,
            description: def.description,
            revision: ChipRevision {
                device_type: def.device_type,
                firmware_version: def.firmware_version,
            },
            version: ConfigVersion::new(def.version),
            commands,
        };

        log::debug!(
            "Loaded profile {} ({} blocks, version {})",
            profile.name,
            profile.commands.len(),
            profile.version
        );

        self.profiles.retain(|p| p.name != profile.name);
        self.profiles.push(profile);
        Ok(1)
    }

    /// Load one profile from a RON file
    pub fn load_file(&mut self, path: &Path) -> Result<usize, ProfileDbError> {
        let content = fs::read_to_string(path)?;
        self.load_ron(&content)
    }

    /// Load all RON files from a directory
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, ProfileDbError> {
        let mut total = 0;

        let mut paths = vec![];
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "ron") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            total += self.load_file(&path)?;
        }

        Ok(total)
    }

    /// Get all profiles in the database
    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    /// Get the number of profiles in the database
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Check if the database is empty
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Find a profile by name (case-insensitive)
    pub fn find(&self, name: &str) -> Option<&Profile> {
        self.profiles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Iterate over all profiles
    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::builtin;

    #[test]
    fn test_load_ron() {
        let ron = r#"
        (
            name: "bench",
            description: "Bench supply",
            version: 2,
            blocks: [
                (class: 0x02, index: 0, data: [0x02, 0x26, 0x00, 0x00, 0x32], checksum: 0xA5),
                (class: 0x70, index: 0, data: [0x80, 0x00, 0x80], settle_ms: 20),
            ],
        )
        "#;

        let mut db = ProfileDatabase::new();
        assert_eq!(db.load_ron(ron).unwrap(), 1);

        let profile = db.find("BENCH").unwrap();
        assert_eq!(profile.version, ConfigVersion::new(2));
        assert_eq!(profile.revision, BQ27441_G1);
        assert_eq!(profile.commands.len(), 2);
        assert_eq!(profile.commands[0].settle_ms, DEFAULT_SETTLE_MS);
        assert_eq!(profile.commands[1].checksum, 0xFF);
        assert_eq!(profile.commands[1].settle_ms, 20);
        assert_eq!(profile.commands[1].payload[3..], [0u8; 29]);
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let ron = r#"
        (
            name: "broken",
            version: 1,
            blocks: [(class: 0x02, index: 0, data: [0x01], checksum: 0x00)],
        )
        "#;

        let mut db = ProfileDatabase::new();
        assert!(matches!(
            db.load_ron(ron),
            Err(ProfileDbError::Validation(_))
        ));
        assert!(db.is_empty());
    }

    #[test]
    fn test_oversized_block_rejected() {
        let data: Vec<String> = (0..33).map(|_| "0".into()).collect();
        let ron = format!(
            "(name: \"big\", version: 1, blocks: [(class: 0x02, index: 0, data: [{}])])",
            data.join(", ")
        );

        let mut db = ProfileDatabase::new();
        assert!(matches!(
            db.load_ron(&ron),
            Err(ProfileDbError::Validation(_))
        ));
    }

    #[test]
    fn test_shipped_profile_matches_builtin() {
        let mut db = ProfileDatabase::new();
        db.load_ron(include_str!("../../../../profiles/zerogravitas.ron"))
            .unwrap();

        let loaded = db.find("zerogravitas").unwrap();
        assert_eq!(loaded.as_config().commands, builtin::ZEROGRAVITAS.commands);
        assert_eq!(loaded.version, builtin::ZEROGRAVITAS.version);
    }

    #[test]
    fn test_reload_replaces_by_name() {
        let mut db = ProfileDatabase::with_builtin();
        let before = db.len();
        db.load_ron("(name: \"zerogravitas\", version: 9, blocks: [])")
            .unwrap();

        assert_eq!(db.len(), before);
        assert_eq!(db.find("zerogravitas").unwrap().version.get(), 9);
    }
}
