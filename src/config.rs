use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration file looked up in the working directory when no
/// explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "mlhd.toml";

/// Main configuration for the MLHD+ cleanup pipeline.
///
/// Built once at startup by [`Config::load`] and passed around by
/// reference afterwards. Constructing or loading a `Config` reads at
/// most the configuration file itself; it never creates directories or
/// opens connections.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the raw MLHD+ dump. None until an operator points the
    /// pipeline at a dataset.
    pub mlhd_root: Option<PathBuf>,
    /// Output directory for generated HTML reports.
    pub html_root: PathBuf,
    /// Output directory for cleaned listen files. None = cleanup stage
    /// not writing yet, so no directory is created for it.
    pub write_root: Option<PathBuf>,
    /// Output directory for dumped MusicBrainz reference tables.
    pub mb_root: PathBuf,
    /// Output directory for random sample extracts.
    pub sample_root: PathBuf,
    /// Output directory for run logs.
    pub log_write_root: PathBuf,
    /// Rewrite the run log every N processed files. Must be positive.
    pub log_epoch: u32,
    /// Output directory for mapper-stage results.
    pub mapper_output_root: PathBuf,
    /// MusicBrainz database settings, consumed by the table generator.
    pub db: DbConfig,
}

/// Connection settings for the MusicBrainz PostgreSQL instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub host: String,
    pub name: String,
    pub user: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mlhd_root: None,
            html_root: "warehouse/html".into(),
            write_root: None,
            mb_root: "warehouse/MB_tables".into(),
            sample_root: "warehouse/samples".into(),
            log_write_root: "warehouse/logs".into(),
            log_epoch: 10,
            mapper_output_root: "warehouse/mapper_output".into(),
            db: DbConfig::default(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            name: "musicbrainz_db".into(),
            user: "musicbrainz".into(),
            port: 5432,
        }
    }
}

impl Config {
    /// Parse a TOML configuration file. No overrides, no validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Resolve the startup configuration: the explicit file if given,
    /// else `mlhd.toml` when present, else built-in defaults; then
    /// `MLHD_*` environment overrides, normalization and validation.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_file = Path::new(DEFAULT_CONFIG_FILE);
                if default_file.is_file() {
                    Self::from_file(default_file)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Override single fields from `MLHD_*` variables. The lookup is
    /// injectable so tests don't mutate the process environment.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if let Some(v) = lookup("MLHD_ROOT") {
            self.mlhd_root = Some(v.into());
        }
        if let Some(v) = lookup("MLHD_HTML_ROOT") {
            self.html_root = v.into();
        }
        if let Some(v) = lookup("MLHD_WRITE_ROOT") {
            self.write_root = Some(v.into());
        }
        if let Some(v) = lookup("MLHD_MB_ROOT") {
            self.mb_root = v.into();
        }
        if let Some(v) = lookup("MLHD_SAMPLE_ROOT") {
            self.sample_root = v.into();
        }
        if let Some(v) = lookup("MLHD_LOG_WRITE_ROOT") {
            self.log_write_root = v.into();
        }
        if let Some(v) = lookup("MLHD_LOG_EPOCH") {
            self.log_epoch = v
                .trim()
                .parse()
                .with_context(|| format!("MLHD_LOG_EPOCH must be a positive integer, got {v:?}"))?;
        }
        if let Some(v) = lookup("MLHD_MAPPER_OUTPUT_ROOT") {
            self.mapper_output_root = v.into();
        }
        if let Some(v) = lookup("MLHD_DB_HOST") {
            self.db.host = v;
        }
        if let Some(v) = lookup("MLHD_DB_NAME") {
            self.db.name = v;
        }
        if let Some(v) = lookup("MLHD_DB_USER") {
            self.db.user = v;
        }
        if let Some(v) = lookup("MLHD_DB_PORT") {
            self.db.port = v
                .trim()
                .parse()
                .with_context(|| format!("MLHD_DB_PORT must be a TCP port number, got {v:?}"))?;
        }
        Ok(())
    }

    /// Collapse empty strings in the optional roots to "unset".
    pub fn normalize(&mut self) {
        if self.mlhd_root.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            self.mlhd_root = None;
        }
        if self.write_root.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            self.write_root = None;
        }
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.log_epoch == 0 {
            bail!("log_epoch must be a positive integer");
        }
        if self.db.port == 0 {
            bail!("db.port must be in 1..=65535");
        }
        for (name, root) in self.required_roots() {
            if root.as_os_str().is_empty() {
                bail!("{name} must not be empty");
            }
        }
        Ok(())
    }

    /// The five always-required output roots, with their config names.
    fn required_roots(&self) -> [(&'static str, &Path); 5] {
        [
            ("mb_root", self.mb_root.as_path()),
            ("sample_root", self.sample_root.as_path()),
            ("log_write_root", self.log_write_root.as_path()),
            ("html_root", self.html_root.as_path()),
            ("mapper_output_root", self.mapper_output_root.as_path()),
        ]
    }

    /// Directories the bootstrap must ensure, in creation order. The
    /// cleaned-listens root is included only when configured.
    pub fn output_roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = self
            .required_roots()
            .iter()
            .map(|(_, root)| root.to_path_buf())
            .collect();
        if let Some(write_root) = &self.write_root {
            roots.push(write_root.clone());
        }
        roots
    }

    /// Full path of a log file under the log root.
    pub fn log_write_path(&self, file_name: &str) -> PathBuf {
        self.log_write_root.join(file_name)
    }
}

impl DbConfig {
    /// Connection URL for the MusicBrainz database. Credentials beyond
    /// the user name are left to the usual PostgreSQL mechanisms.
    pub fn connection_url(&self) -> String {
        format!(
            "postgresql://{}@{}:{}/{}",
            self.user, self.host, self.port, self.name
        )
    }
}
