//! TOML configuration for the command-line adapter.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use buildgrid_core::{GridConfig, ValidityState};
use buildgrid_system_placement::SessionSettings;
use log::debug;
use serde::Deserialize;

/// File probed in the working directory when `--config` is omitted.
pub(crate) const DEFAULT_CONFIG_PATH: &str = "buildgrid.toml";

/// Fully resolved adapter configuration.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CliConfig {
    /// Grid construction parameters.
    pub(crate) grid: GridConfig,
    /// Tunables forwarded to every placement session.
    pub(crate) session: SessionSettings,
    /// Preview tints keyed by validity.
    pub(crate) palette: Palette,
}

/// RGBA tint applied to a preview for each validity state.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Palette {
    /// Tint for a placement that can be confirmed.
    pub(crate) valid: [f32; 4],
    /// Tint for a placement that is blocked.
    pub(crate) invalid: [f32; 4],
    /// Tint for an object hovering without a surface.
    pub(crate) floating: [f32; 4],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            valid: [0.0, 1.0, 0.0, 0.5],
            invalid: [1.0, 0.0, 0.0, 0.5],
            floating: [1.0, 1.0, 1.0, 0.5],
        }
    }
}

impl Palette {
    /// Tint associated with the provided validity.
    #[must_use]
    pub(crate) const fn tint(&self, validity: ValidityState) -> [f32; 4] {
        match validity {
            ValidityState::Valid => self.valid,
            ValidityState::Invalid => self.invalid,
            ValidityState::Floating => self.floating,
        }
    }
}

impl CliConfig {
    /// Loads the configuration from `path`, or from [`DEFAULT_CONFIG_PATH`]
    /// when it exists, falling back to defaults otherwise.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
                if !fallback.is_file() {
                    debug!("no {DEFAULT_CONFIG_PATH} found, using defaults");
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read configuration at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }

    /// Parses configuration from TOML text.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse configuration toml contents")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildgrid_core::LayerMask;

    #[test]
    fn empty_file_yields_defaults() {
        let config = CliConfig::parse("").expect("empty config parses");
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.grid.cell_size, 1.0);
        assert_eq!(config.session.max_placement_distance, 5.0);
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let config = CliConfig::parse(
            r#"
            [grid]
            cell_size = 0.5

            [session]
            layers = 3
            rotation_step_degrees = 90.0

            [palette]
            valid = [0.2, 0.8, 0.2, 1.0]
            "#,
        )
        .expect("config parses");

        assert_eq!(config.grid.cell_size, 0.5);
        assert_eq!(config.grid.max_stack_height, 64);
        assert_eq!(config.session.layers, LayerMask::from_bits(3));
        assert_eq!(config.session.rotation_step_degrees, 90.0);
        assert_eq!(config.session.max_placement_distance, 5.0);
        assert_eq!(config.palette.valid, [0.2, 0.8, 0.2, 1.0]);
        assert_eq!(config.palette.invalid, Palette::default().invalid);
    }

    #[test]
    fn unknown_tables_are_rejected() {
        let error = CliConfig::parse("[camera]\nfov = 60.0\n").expect_err("unknown table");
        assert!(
            format!("{error:#}").contains("configuration"),
            "unexpected error: {error:#}"
        );
    }

    #[test]
    fn palette_maps_every_validity() {
        let palette = Palette::default();
        assert_eq!(palette.tint(ValidityState::Valid), [0.0, 1.0, 0.0, 0.5]);
        assert_eq!(palette.tint(ValidityState::Invalid), [1.0, 0.0, 0.0, 0.5]);
        assert_eq!(palette.tint(ValidityState::Floating), [1.0, 1.0, 1.0, 0.5]);
    }

    #[test]
    fn missing_explicit_file_reports_its_path() {
        let error = CliConfig::load(Some(Path::new("does/not/exist.toml")))
            .expect_err("missing file fails");
        assert!(format!("{error:#}").contains("does/not/exist.toml"));
    }
}
