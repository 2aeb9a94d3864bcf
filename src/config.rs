use std::{path::PathBuf, sync::OnceLock};

use crate::{
    hostfile::HostFile,
    mdtest::{Mdtest, Phase},
    options::OptionValue,
    MDError, MDResult,
};

/// Run configuration in toml format.
///
/// ```toml
/// MpirunPath = "/usr/bin/mpirun"
/// Np = 4
/// TestDir = "/mnt/lustre/mdtest"
/// ItemsPerProcess = 1000
/// Phase = "write"
///
/// [MdtestOptions]
/// "-z" = 2
///
/// [[Host]]
/// Name = "node1"
/// Slots = 2
/// ```
#[derive(serde::Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    pub mpirun_path: Option<PathBuf>,
    pub mdtest_path: Option<PathBuf>,
    pub np: Option<usize>,
    pub test_dir: Option<PathBuf>,
    pub items_per_process: Option<usize>,
    pub unique: Option<bool>,
    pub mode: Option<Mode>,
    pub phase: Option<String>,
    pub hard: Option<bool>,
    pub mpirun_raw: Option<Vec<String>>,
    pub mpirun_options: Option<toml::Table>,
    pub mdtest_options: Option<toml::Table>,
    #[serde(default)]
    pub host: Vec<HostConfig>,
}

#[derive(serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Files,
    Dirs,
}

#[derive(serde::Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct HostConfig {
    pub name: String,
    pub slots: Option<usize>,
    pub max_slots: Option<usize>,
}

static CONFIG: OnceLock<Config> = OnceLock::new();

pub fn load_config_toml(config_file: &std::path::Path) -> MDResult<Config> {
    let text = std::fs::read_to_string(config_file)?;
    toml::from_str(&text).map_err(MDError::other)
}

pub fn init_config_toml(config_file: &std::path::Path) -> MDResult<()> {
    let config = load_config_toml(config_file)?;
    CONFIG
        .set(config)
        .map_err(|_| MDError::other("initialize config more than once"))
}

/// The global configuration, empty when none was loaded.
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(Config::default)
}

fn option_value(key: &str, value: &toml::Value) -> MDResult<OptionValue> {
    match value {
        toml::Value::Boolean(b) => Ok(OptionValue::flag(*b)),
        toml::Value::Integer(i) => Ok(OptionValue::from(*i)),
        toml::Value::Float(f) => Ok(OptionValue::from(*f)),
        toml::Value::String(s) => Ok(OptionValue::from(s.as_str())),
        _ => Err(MDError::invalid_arg(format!(
            "option `{key}` must be a boolean, number or string"
        ))),
    }
}

fn option_table(table: &toml::Table) -> MDResult<Vec<(String, OptionValue)>> {
    table
        .iter()
        .map(|(k, v)| Ok((k.to_owned(), option_value(k, v)?)))
        .collect()
}

impl Config {
    pub fn hostfile(&self) -> MDResult<HostFile> {
        let mut hostfile = HostFile::new();
        for host in self.host.iter() {
            let options = [("slots", host.slots), ("max_slots", host.max_slots)]
                .into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v)));
            hostfile.host(host.name.as_str(), options)?;
        }
        Ok(hostfile)
    }

    /// Transfer every configured value onto `mdtest`.
    ///
    /// # Return
    /// - [`Err(MDError::InvalidArg)`] for an unknown phase, an unusable option value
    ///   or a host entry that breaks the host file format
    pub fn apply(&self, mdtest: &mut Mdtest) -> MDResult<()> {
        if let Some(path) = &self.mpirun_path {
            mdtest.mpirun_path(path);
        }
        if let Some(path) = &self.mdtest_path {
            mdtest.mdtest_path(path);
        }
        if let Some(raw) = &self.mpirun_raw {
            mdtest.mpirun_options_raw(raw.iter().cloned());
        }
        if let Some(table) = &self.mpirun_options {
            mdtest.mpirun_options(option_table(table)?);
        }
        if let Some(np) = self.np {
            mdtest.np(np);
        }
        if let Some(table) = &self.mdtest_options {
            mdtest.mdtest_options(option_table(table)?);
        }
        if let Some(dir) = &self.test_dir {
            mdtest.test_dir(dir);
        }
        if let Some(n) = self.items_per_process {
            mdtest.items_per_process(n);
        }
        if let Some(unique) = self.unique {
            mdtest.unique(unique);
        }
        match self.mode {
            Some(Mode::Files) => {
                mdtest.only_files();
            }
            Some(Mode::Dirs) => {
                mdtest.only_dirs();
            }
            None => {}
        }
        if let Some(phase) = &self.phase {
            mdtest.only_phase(phase.parse::<Phase>()?);
        }
        if self.hard == Some(true) {
            mdtest.hard();
        }
        if !self.host.is_empty() {
            mdtest.hostfile(self.hostfile()?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const CONFIG: &str = r#"
MpirunPath = "/opt/mpi/bin/mpirun"
MdtestPath = "/opt/ior/bin/mdtest"
Np = 4
TestDir = "/mnt/fs"
ItemsPerProcess = 100
Unique = true
Mode = "files"
Phase = "stat"
MpirunRaw = ["--allow-run-as-root"]

[MdtestOptions]
"-z" = 2

[[Host]]
Name = "node1"
Slots = 2

[[Host]]
Name = "node2"
Slots = 2
MaxSlots = 4
"#;

    fn write_config(text: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdtest.toml");
        std::fs::write(&path, text).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_and_apply() {
        let (_dir, path) = write_config(CONFIG);
        let config = load_config_toml(&path).unwrap();
        assert_eq!(config.np, Some(4));
        assert_eq!(config.mode, Some(Mode::Files));
        assert_eq!(config.host.len(), 2);

        let mut mdtest = Mdtest::new();
        config.apply(&mut mdtest).unwrap();
        assert_eq!(
            mdtest.get_hostfile().to_string(),
            "node1 slots=2\nnode2 slots=2 max_slots=4"
        );
        let invocation = mdtest.compose(None);
        assert_eq!(
            invocation.to_string(),
            format!(
                "/opt/mpi/bin/mpirun --allow-run-as-root -np 4 -map-by node -rank-by slot \
                 -nooversubscribe /opt/ior/bin/mdtest -z 2 -d /mnt/fs{} -n 100 -u -F -T",
                std::path::MAIN_SEPARATOR
            )
        );
    }

    #[test]
    fn test_invalid_phase() {
        let (_dir, path) = write_config("Phase = \"bogus\"\n");
        let config = load_config_toml(&path).unwrap();
        let mut mdtest = Mdtest::new();
        assert!(config.apply(&mut mdtest).unwrap_err().is_invalid_arg());
    }

    #[test]
    fn test_invalid_option_value() {
        let (_dir, path) = write_config("[MdtestOptions]\n\"-x\" = [1, 2]\n");
        let config = load_config_toml(&path).unwrap();
        assert!(config.apply(&mut Mdtest::new()).unwrap_err().is_invalid_arg());
    }

    #[test]
    fn test_malformed_toml() {
        let (_dir, path) = write_config("Np = \"four\"\n");
        assert!(matches!(
            load_config_toml(&path).unwrap_err(),
            MDError::Other(_)
        ));
    }
}
