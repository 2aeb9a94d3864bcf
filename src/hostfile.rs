use std::{fmt::Display, io::Write, str::FromStr};

use indexmap::IndexMap;
use itertools::Itertools;

use crate::{MDError, MDResult};

const TMP_FILE_PREFIX: &str = "mdtest-hostfile-";

/// Options of a single host, `key=value` pairs in insertion order.
pub type HostOptions = IndexMap<String, String>;

/// Host list consumed by the launcher via `-hostfile`.
///
/// One line per host, `hostname key1=val1 key2=val2`. A host added twice
/// keeps its original position and takes the latest options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostFile {
    hosts: IndexMap<String, HostOptions>,
}

fn check_token(kind: &str, token: &str, allow_eq: bool) -> MDResult<()> {
    if token.is_empty() {
        return Err(MDError::invalid_arg(format!("empty host file {kind}")));
    }
    if token.chars().any(char::is_whitespace) || (!allow_eq && token.contains('=')) {
        return Err(MDError::invalid_arg(format!(
            "host file {kind} `{token}` contains a separator character"
        )));
    }
    // mpirun drops everything after `#`
    if token.contains('#') {
        return Err(MDError::invalid_arg(format!(
            "host file {kind} `{token}` contains a comment marker"
        )));
    }
    Ok(())
}

impl HostFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) -> &mut Self {
        self.hosts.clear();
        self
    }

    /// Insert or overwrite the entry for `name`.
    ///
    /// # Return
    /// - [`Err(MDError::InvalidArg)`] if the hostname, an option key or an option
    ///   value would break the line format
    pub fn host<K, V>(
        &mut self,
        name: impl Into<String>,
        options: impl IntoIterator<Item = (K, V)>,
    ) -> MDResult<&mut Self>
    where
        K: Into<String>,
        V: ToString,
    {
        let name = name.into();
        check_token("hostname", &name, false)?;
        let options = options
            .into_iter()
            .map(|(k, v)| {
                let (k, v) = (k.into(), v.to_string());
                check_token("option key", &k, false)?;
                check_token("option value", &v, true)?;
                Ok((k, v))
            })
            .collect::<MDResult<HostOptions>>()?;
        self.hosts.insert(name, options);
        Ok(self)
    }

    /// Insert or overwrite `name` with no options.
    pub fn host_bare(&mut self, name: impl Into<String>) -> MDResult<&mut Self> {
        self.host(name, std::iter::empty::<(String, String)>())
    }

    /// Number of distinct hosts.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&HostOptions> {
        self.hosts.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HostOptions)> {
        self.hosts.iter().map(|(name, opts)| (name.as_str(), opts))
    }

    /// Write the host list into a fresh temporary file.
    ///
    /// The file is removed when the returned handle is dropped or closed.
    pub fn create_tmp_file(&self) -> MDResult<tempfile::NamedTempFile> {
        let mut f = tempfile::Builder::new().prefix(TMP_FILE_PREFIX).tempfile()?;
        f.write_all(self.to_string().as_bytes())?;
        f.flush()?;
        log::debug!(
            "host file with {} host(s) written to {}",
            self.len(),
            f.path().display()
        );
        Ok(f)
    }
}

impl Display for HostFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines = self.hosts.iter().map(|(name, opts)| {
            std::iter::once(name.to_owned())
                .chain(opts.iter().map(|(k, v)| format!("{k}={v}")))
                .join(" ")
        });
        write!(f, "{}", lines.format("\n"))
    }
}

impl FromStr for HostFile {
    type Err = MDError;

    /// Parse host file text, blank lines and `#` comments are skipped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut hostfile = HostFile::new();
        for line in s.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let mut split = line.split_whitespace();
            let Some(name) = split.next() else {
                continue;
            };
            let options = split
                .map(|opt| {
                    opt.split_once('=').ok_or_else(|| {
                        MDError::invalid_arg(format!("malformed host option `{opt}` for {name}"))
                    })
                })
                .collect::<MDResult<Vec<_>>>()?;
            hostfile.host(name, options)?;
        }
        Ok(hostfile)
    }
}
