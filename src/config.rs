use crate::errors::Result;
use crate::record::MarkerPair;
use crate::swapper::{SwapPolicy, SwapRequest, WidthAdjust};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The hex text form of the marker pair bounding each record.
#[derive(Debug, Deserialize, Clone)]
pub struct HexMarkers {
    /// The byte sequence opening a record, as hex text.
    pub start: String,
    /// The byte sequence closing a record, as hex text.
    pub end: String,
}

/// Configuration for one swap run.
///
/// ```yaml
/// swap_pairs:
///   - [333600100, 333600200]
/// hex_markers:
///   start: "aa78"
///   end: "9e78"
/// payload_width: 14
/// policy: symmetric
/// scale: none
/// ```
#[derive(Debug, Deserialize, Clone)]
pub struct SwapConfig {
    /// Pairs of lookup codes whose payloads are to be exchanged.
    pub swap_pairs: Vec<(u32, u32)>,
    /// The marker pair bounding each record, shared across all records.
    pub hex_markers: HexMarkers,
    /// The expected payload width in bytes.
    #[serde(default = "default_payload_width")]
    pub payload_width: usize,
    /// The validation strictness; the command line overrides this.
    #[serde(default)]
    pub policy: Option<SwapPolicy>,
    /// Numeric width adjustment; the command line overrides this.
    #[serde(default)]
    pub scale: Option<WidthAdjust>,
}

fn default_payload_width() -> usize {
    14
}

impl SwapConfig {
    /// Decodes the configured markers, validating the hex text.
    pub fn markers(&self) -> Result<MarkerPair> {
        MarkerPair::from_hex(&self.hex_markers.start, &self.hex_markers.end)
    }

    /// The configured pairs as swap requests.
    pub fn requests(&self) -> Vec<SwapRequest> {
        self.swap_pairs
            .iter()
            .map(|&(first, second)| SwapRequest { first, second })
            .collect()
    }

    /// Every lookup code referenced by any pair, deduplicated and ordered.
    pub fn codes(&self) -> BTreeSet<u32> {
        self.swap_pairs
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .collect()
    }
}

/// A utility for locating and loading swap configurations.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Finds the configuration file by searching in a prioritized list of locations.
    ///
    /// The search order is:
    /// 1. The absolute path provided in `config_path`, if it exists.
    /// 2. A path relative to the current directory.
    /// 3. A path relative to the `working_dir`.
    /// 4. Inside the `~/.blobswap` directory.
    /// 5. Next to the executable.
    /// 6. In the parent directory of the executable (to handle `target/release` builds).
    /// 7. In the grandparent directory of the executable.
    pub fn find_config(config_path: &Path, working_dir: &Path) -> Result<PathBuf> {
        // If the path is absolute and exists, use it
        if config_path.is_absolute() && config_path.exists() {
            return Ok(config_path.to_path_buf());
        }

        // Try relative to current directory
        if config_path.exists() {
            return Ok(config_path.to_path_buf());
        }

        // Try relative to the working directory
        let in_working_dir = working_dir.join(config_path);
        if in_working_dir.exists() {
            return Ok(in_working_dir);
        }

        // Try in the .blobswap config directory
        if let Some(home) = env::var_os("HOME") {
            let home_config = PathBuf::from(home).join(".blobswap").join(config_path);
            if home_config.exists() {
                return Ok(home_config);
            }
        }

        // Try in the executable's directory and its ancestors
        if let Ok(exe_path) = env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let exe_config = exe_dir.join(config_path);
                if exe_config.exists() {
                    return Ok(exe_config);
                }

                // Also check parent directory (in case we're in target/release)
                if let Some(parent) = exe_dir.parent() {
                    let parent_config = parent.join(config_path);
                    if parent_config.exists() {
                        return Ok(parent_config);
                    }

                    if let Some(grandparent) = parent.parent() {
                        let grandparent_config = grandparent.join(config_path);
                        if grandparent_config.exists() {
                            return Ok(grandparent_config);
                        }
                    }
                }
            }
        }

        // If we still haven't found it, provide a helpful error
        let mut tried_locations = vec![
            config_path.display().to_string(),
            in_working_dir.display().to_string(),
        ];

        if let Some(home) = env::var_os("HOME") {
            tried_locations.push(
                PathBuf::from(home)
                    .join(".blobswap")
                    .join(config_path)
                    .display()
                    .to_string(),
            );
        }

        if let Ok(exe_path) = env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                tried_locations.push(exe_dir.join(config_path).display().to_string());
            }
        }

        Err(format!(
            "Config file '{}' not found. Searched in:\n  - {}",
            config_path.display(),
            tried_locations.join("\n  - ")
        )
        .into())
    }

    /// Loads a `SwapConfig` from a YAML file.
    pub fn load(path: &Path) -> Result<SwapConfig> {
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }
}
