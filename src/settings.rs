use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::model::Participant;
use crate::output::OutputFormat;
use crate::parser::profile::{
    Disambiguation, DuplicatePolicy, FormatProfile, LineShape, PlausibleRange, Preset,
};

const DEFAULT_CONFIG: &str = "laptimes";
const ENV_PREFIX: &str = "LAPTIMES";

/// Run settings: defaults, then `laptimes.toml`, then `LAPTIMES_*` env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub profile: String,
    pub min_lap: Option<f64>,
    pub max_lap: Option<f64>,
    pub duplicate_policy: Option<DuplicatePolicy>,
    pub disambiguation_policy: Option<Disambiguation>,
    pub line_shape: Option<LineShape>,
    pub deactivate_on_empty_page: Option<bool>,
    pub verbose_logging: bool,
    pub output_dir: PathBuf,
    pub output_format: OutputFormat,
    pub archive_dir: PathBuf,
    pub roster: Vec<Participant>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            profile: Preset::Sparse.name().to_string(),
            min_lap: None,
            max_lap: None,
            duplicate_policy: None,
            disambiguation_policy: None,
            line_shape: None,
            deactivate_on_empty_page: None,
            verbose_logging: false,
            output_dir: PathBuf::from("laptimes"),
            output_format: OutputFormat::Csv,
            archive_dir: PathBuf::from("indycar_results"),
            roster: Vec::new(),
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG).required(false),
        };
        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to load settings")?
            .try_deserialize::<Settings>()
            .context("invalid settings")?;
        for car in &settings.roster {
            if let Err(e) = car.validate() {
                bail!("invalid roster entry in settings: {e}");
            }
        }
        Ok(settings)
    }

    /// The preset named by `profile` with every explicit override applied.
    pub fn format_profile(&self) -> Result<FormatProfile> {
        let Some(preset) = Preset::from_name(&self.profile) else {
            let known: Vec<&str> = Preset::ALL.iter().map(|p| p.name()).collect();
            bail!(
                "unknown profile {:?} (expected one of {})",
                self.profile,
                known.join(", ")
            );
        };
        let mut profile = FormatProfile::preset(preset);

        let range = PlausibleRange::new(
            self.min_lap.unwrap_or(profile.range.min),
            self.max_lap.unwrap_or(profile.range.max),
        );
        if !(range.min > 0.0 && range.min <= range.max) {
            bail!("invalid plausible range {}..={}", range.min, range.max);
        }
        profile.range = range;

        if let Some(d) = self.duplicate_policy {
            profile.duplicates = d;
        }
        if let Some(d) = self.disambiguation_policy {
            profile.disambiguation = d;
        }
        if let Some(s) = self.line_shape {
            profile.line_shape = s;
        }
        if let Some(flag) = self.deactivate_on_empty_page {
            profile.deactivate_on_empty_page = flag;
        }
        Ok(profile)
    }

    pub fn explicit_roster(&self) -> Option<&[Participant]> {
        if self.roster.is_empty() {
            None
        } else {
            Some(&self.roster)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_toml(body: &str) -> Result<Settings> {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("laptimes.toml");
        std::fs::write(&path, body).unwrap();
        Settings::load(Some(&path))
    }

    #[test]
    fn defaults_resolve_to_sparse() {
        let s = Settings::default();
        assert_eq!(s.format_profile().unwrap(), FormatProfile::preset(Preset::Sparse));
        assert!(s.explicit_roster().is_none());
    }

    #[test]
    fn file_overrides_preset_fields() {
        let s = load_toml(
            r#"
            profile = "sector-table"
            max_lap = 90.0
            duplicate_policy = "fastest-wins"
            deactivate_on_empty_page = true
            output_format = "json"

            [[roster]]
            id = "5"
            name = "O'Ward, Pato"
            "#,
        )
        .unwrap();
        let p = s.format_profile().unwrap();
        assert_eq!(p.range, PlausibleRange::new(65.0, 90.0));
        assert_eq!(p.duplicates, DuplicatePolicy::FastestWins);
        assert_eq!(p.disambiguation, Disambiguation::MinimumValid);
        assert!(p.deactivate_on_empty_page);
        assert_eq!(s.output_format, OutputFormat::Json);
        assert_eq!(s.explicit_roster().unwrap(), &[Participant::new("5", "O'Ward, Pato")]);
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let s = Settings {
            profile: "daytona".into(),
            ..Settings::default()
        };
        assert!(s.format_profile().is_err());
    }

    #[test]
    fn inverted_range_is_an_error() {
        let s = Settings {
            min_lap: Some(100.0),
            max_lap: Some(50.0),
            ..Settings::default()
        };
        assert!(s.format_profile().is_err());
    }

    #[test]
    fn bad_enum_value_fails_to_load() {
        assert!(load_toml("duplicate_policy = \"newest-wins\"\n").is_err());
    }

    #[test]
    fn roster_ids_from_file_must_be_numeric() {
        let err = load_toml("[[roster]]\nid = \"5a\"\nname = \"Ward, Pat\"\n").unwrap_err();
        assert!(err.to_string().contains("invalid roster entry"));
        assert!(load_toml("[[roster]]\nid = \"06\"\nname = \"Castroneves, Helio\"\n").is_ok());
    }

    #[test]
    fn missing_explicit_file_fails() {
        assert!(Settings::load(Some(Path::new("/nonexistent/laptimes.toml"))).is_err());
    }
}
