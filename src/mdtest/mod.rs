use std::{
    fmt::Display,
    path::{Path, PathBuf},
    str::FromStr,
};

use itertools::Itertools;

use crate::{
    hostfile::HostFile,
    options::{OptionValue, Options},
    report::Report,
    MDError, MDResult,
};

mod executor;

pub use executor::{ExecOutput, Executor, ProcessExecutor};

/// Per-file write/read size in bytes used by the hard mode.
pub const HARD_FILE_SIZE: u64 = 3901;

const DEFAULT_MPIRUN_PATH: &str = "mpirun";
const DEFAULT_MDTEST_PATH: &str = "mdtest";
const DEFAULT_NP: usize = 1;

const MPIRUN_NP: &str = "-np";
const MPIRUN_HOSTFILE: &str = "-hostfile";

/// Launcher options applied before any user configuration.
pub fn default_mpirun_options() -> Options {
    let mut options = Options::new();
    options
        .set_one(MPIRUN_NP, DEFAULT_NP)
        .set_one("-map-by", "node")
        .set_one("-rank-by", "slot")
        .set_one("-nooversubscribe", true);
    options
}

/// Benchmark phase that can be run in isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Write,
    Stat,
    Read,
    Delete,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Write, Phase::Stat, Phase::Read, Phase::Delete];

    /// Benchmark flag selecting this phase.
    pub fn flag(&self) -> &'static str {
        match self {
            Phase::Write => "-C",
            Phase::Stat => "-T",
            Phase::Read => "-E",
            Phase::Delete => "-r",
        }
    }
}

impl FromStr for Phase {
    type Err = MDError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "write" | "create" => Ok(Phase::Write),
            "stat" => Ok(Phase::Stat),
            "read" => Ok(Phase::Read),
            "delete" | "remove" => Ok(Phase::Delete),
            _ => Err(MDError::invalid_arg(format!("invalid phase `{s}`"))),
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Write => "write",
            Phase::Stat => "stat",
            Phase::Read => "read",
            Phase::Delete => "delete",
        };
        write!(f, "{name}")
    }
}

/// Composed command line, launcher binary plus its argument tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        if !self.args.is_empty() {
            write!(f, " {}", self.args.iter().join(" "))?;
        }
        Ok(())
    }
}

/// Output of a finished run together with what was launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    /// Command line text.
    pub cmd: String,
    /// Host file text, empty when no host was configured.
    pub hostfile: String,
}

/// mdtest invocation launched through mpirun.
#[derive(Debug, Clone)]
pub struct Mdtest {
    mpirun_path: PathBuf,
    mdtest_path: PathBuf,
    mpirun_options_raw: Vec<String>,
    mpirun_options: Options,
    mdtest_options: Options,
    hostfile: HostFile,
}

impl Default for Mdtest {
    fn default() -> Self {
        Self {
            mpirun_path: PathBuf::from(DEFAULT_MPIRUN_PATH),
            mdtest_path: PathBuf::from(DEFAULT_MDTEST_PATH),
            mpirun_options_raw: Vec::new(),
            mpirun_options: default_mpirun_options(),
            mdtest_options: Options::new(),
            hostfile: HostFile::new(),
        }
    }
}

impl Mdtest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mpirun_path(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.mpirun_path = path.as_ref().to_path_buf();
        self
    }

    pub fn mdtest_path(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.mdtest_path = path.as_ref().to_path_buf();
        self
    }

    /// Tokens placed verbatim in front of every other launcher option.
    pub fn mpirun_options_raw<S: Into<String>>(
        &mut self,
        raw: impl IntoIterator<Item = S>,
    ) -> &mut Self {
        self.mpirun_options_raw = raw.into_iter().map(Into::into).collect();
        self
    }

    pub fn mpirun_options<K, V>(&mut self, options: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<OptionValue>,
    {
        self.mpirun_options.set(options);
        self
    }

    pub fn mdtest_options<K, V>(&mut self, options: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<OptionValue>,
    {
        self.mdtest_options.set(options);
        self
    }

    pub fn hostfile(&mut self, hostfile: HostFile) -> &mut Self {
        self.hostfile = hostfile;
        self
    }

    /// Attach the host list stored at `path`.
    ///
    /// # Return
    /// - [`Err(MDError::InvalidArg)`] if the file is not a valid host list
    pub fn hostfile_path(&mut self, path: impl AsRef<Path>) -> MDResult<&mut Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let hostfile = text.parse::<HostFile>().map_err(|e| {
            MDError::invalid_arg(format!("{}: {e}", path.as_ref().display()))
        })?;
        Ok(self.hostfile(hostfile))
    }

    /// Number of processes, `0` falls back to the default of one.
    pub fn np(&mut self, n: usize) -> &mut Self {
        let n = if n == 0 { DEFAULT_NP } else { n };
        self.mpirun_options([(MPIRUN_NP, n)])
    }

    /// Directory the benchmark runs in, always ends with exactly one path separator.
    ///
    /// Repeated separators and inner `.` components are collapsed.
    pub fn test_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let mut dir = path
            .as_ref()
            .components()
            .collect::<PathBuf>()
            .display()
            .to_string();
        if !dir.ends_with(std::path::MAIN_SEPARATOR) {
            dir.push(std::path::MAIN_SEPARATOR);
        }
        self.mdtest_options([("-d", dir)])
    }

    pub fn items_per_process(&mut self, n: usize) -> &mut Self {
        self.mdtest_options([("-n", n)])
    }

    /// Unique working directory for each task.
    pub fn unique(&mut self, unique: bool) -> &mut Self {
        self.mdtest_options([("-u", unique)])
    }

    pub fn only_files(&mut self) -> &mut Self {
        self.mdtest_options([("-F", true), ("-D", false)])
    }

    pub fn only_dirs(&mut self) -> &mut Self {
        self.mdtest_options([("-F", false), ("-D", true)])
    }

    /// Run only `phase`, switching the other phases off.
    pub fn only_phase(&mut self, phase: Phase) -> &mut Self {
        self.mdtest_options(Phase::ALL.map(|p| (p.flag(), p == phase)))
    }

    /// Fixed-size file workload: `-t`, write/read [`HARD_FILE_SIZE`] bytes, files only.
    pub fn hard(&mut self) -> &mut Self {
        self.mdtest_options([
            ("-t", OptionValue::Present),
            ("-w", HARD_FILE_SIZE.into()),
            ("-e", HARD_FILE_SIZE.into()),
        ])
        .only_files()
    }

    pub fn get_mpirun_options(&self) -> &Options {
        &self.mpirun_options
    }

    pub fn get_mdtest_options(&self) -> &Options {
        &self.mdtest_options
    }

    pub fn get_hostfile(&self) -> &HostFile {
        &self.hostfile
    }

    /// Compose the command line, pointing the launcher at `hostfile` if given.
    pub fn compose(&self, hostfile: Option<&Path>) -> Invocation {
        let mpirun_args = match hostfile {
            Some(path) => {
                let mut options = self.mpirun_options.clone();
                options.set_one(MPIRUN_HOSTFILE, path);
                options.to_args()
            }
            None => self.mpirun_options.to_args(),
        };
        let args = self
            .mpirun_options_raw
            .iter()
            .cloned()
            .chain(mpirun_args)
            .chain(std::iter::once(self.mdtest_path.display().to_string()))
            .chain(self.mdtest_options.to_args())
            .collect();
        Invocation {
            program: self.mpirun_path.clone(),
            args,
        }
    }

    pub fn run(&self) -> MDResult<RunOutput> {
        self.run_with(&ProcessExecutor)
    }

    /// Run through `executor`.
    ///
    /// The temporary host file only exists while the executor runs and is
    /// removed whether or not the run succeeds.
    pub fn run_with<E: Executor + ?Sized>(&self, executor: &E) -> MDResult<RunOutput> {
        let hostfile = if self.hostfile.is_empty() {
            None
        } else {
            Some(self.hostfile.create_tmp_file()?)
        };
        let invocation = self.compose(hostfile.as_ref().map(|f| f.path()));
        log::info!("launching: {invocation}");
        let result = executor.exec(&invocation.program, &invocation.args);
        if let Some(f) = hostfile {
            let path = f.path().to_owned();
            match f.close() {
                Ok(()) => log::debug!("host file {} removed", path.display()),
                Err(e) => log::warn!("fail to remove host file {}: {e}", path.display()),
            }
        }
        let ExecOutput { stdout, stderr } = result?;
        log::info!("finished: {} byte(s) of output", stdout.len());
        Ok(RunOutput {
            stdout,
            stderr,
            cmd: invocation.to_string(),
            hostfile: self.hostfile.to_string(),
        })
    }

    /// Run and parse the report printed on standard output.
    pub fn run_and_parse(&self) -> MDResult<Report> {
        self.run()?.stdout.parse()
    }
}
