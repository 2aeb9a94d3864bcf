//! Structured form of the textual report printed by mdtest.
//!
//! Statistics and capacities are kept exactly as mdtest formatted them; only
//! counts are converted to integers.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{MDError, MDResult};

mod parser;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub metadata: Metadata,
    pub summary: Summary,
}

impl Report {
    /// Parse a complete report.
    ///
    /// # Return
    /// - [`Err(MDError::Parse)`] naming the first mandatory field that is missing
    pub fn parse(text: &str) -> MDResult<Self> {
        parser::parse(text)
    }
}

impl FromStr for Report {
    type Err = MDError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Report::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub timestamp: Timestamp,
    pub version: String,
    pub tasks: u64,
    pub nodes: u64,
    /// Total files/directories processed.
    pub items: u64,
    pub command_line: String,
    pub path: String,
    pub fs: Capacity,
    pub inodes: Capacity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub started: String,
    pub finished: String,
}

/// Capacity as printed, e.g. `244.0 GiB` and `32.3%`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub total: String,
    pub used: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub iterations: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<DirectoryStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<TreeStats>,
}

/// Rate statistics of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpStat {
    pub max: String,
    pub min: String,
    pub mean: String,
    pub std_dev: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation: Option<OpStat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat: Option<OpStat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removal: Option<OpStat>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation: Option<OpStat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat: Option<OpStat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<OpStat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removal: Option<OpStat>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation: Option<OpStat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removal: Option<OpStat>,
}

/// A group of operations sharing a label prefix in the summary table.
pub(crate) trait Category: Default {
    /// Label prefix, e.g. `Directory`.
    const NAME: &'static str;

    fn operations(&self) -> Vec<(&'static str, &Option<OpStat>)>;

    fn operations_mut(&mut self) -> Vec<(&'static str, &mut Option<OpStat>)>;
}

impl Category for DirectoryStats {
    const NAME: &'static str = "Directory";

    fn operations(&self) -> Vec<(&'static str, &Option<OpStat>)> {
        vec![
            ("creation", &self.creation),
            ("stat", &self.stat),
            ("removal", &self.removal),
        ]
    }

    fn operations_mut(&mut self) -> Vec<(&'static str, &mut Option<OpStat>)> {
        vec![
            ("creation", &mut self.creation),
            ("stat", &mut self.stat),
            ("removal", &mut self.removal),
        ]
    }
}

impl Category for FileStats {
    const NAME: &'static str = "File";

    fn operations(&self) -> Vec<(&'static str, &Option<OpStat>)> {
        vec![
            ("creation", &self.creation),
            ("stat", &self.stat),
            ("read", &self.read),
            ("removal", &self.removal),
        ]
    }

    fn operations_mut(&mut self) -> Vec<(&'static str, &mut Option<OpStat>)> {
        vec![
            ("creation", &mut self.creation),
            ("stat", &mut self.stat),
            ("read", &mut self.read),
            ("removal", &mut self.removal),
        ]
    }
}

impl Category for TreeStats {
    const NAME: &'static str = "Tree";

    fn operations(&self) -> Vec<(&'static str, &Option<OpStat>)> {
        vec![("creation", &self.creation), ("removal", &self.removal)]
    }

    fn operations_mut(&mut self) -> Vec<(&'static str, &mut Option<OpStat>)> {
        vec![("creation", &mut self.creation), ("removal", &mut self.removal)]
    }
}

fn fmt_category<C: Category>(f: &mut std::fmt::Formatter<'_>, category: &C) -> std::fmt::Result {
    for (op, stat) in category.operations() {
        if let Some(stat) = stat {
            let label = format!("{} {op}", C::NAME);
            writeln!(
                f,
                "   {label:<18}: {:>14} {:>14} {:>14} {:>14}",
                stat.max, stat.min, stat.mean, stat.std_dev
            )?;
        }
    }
    Ok(())
}

/// Human readable rendering, laid out like the mdtest summary table.
impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Metadata {
            timestamp,
            version,
            tasks,
            nodes,
            items,
            command_line,
            path,
            fs,
            inodes,
        } = &self.metadata;
        writeln!(f, "mdtest {version}: {tasks} task(s) on {nodes} node(s), {items} item(s)")?;
        writeln!(f, "command: {command_line}")?;
        writeln!(f, "path: {path}")?;
        writeln!(
            f,
            "fs: {} (used {}), inodes: {} (used {})",
            fs.total, fs.used, inodes.total, inodes.used
        )?;
        writeln!(f, "started: {}, finished: {}", timestamp.started, timestamp.finished)?;
        writeln!(f, "summary of {} iteration(s):", self.summary.iterations)?;
        writeln!(
            f,
            "   {:<18}  {:>14} {:>14} {:>14} {:>14}",
            "Operation", "Max", "Min", "Mean", "Std Dev"
        )?;
        if let Some(directory) = &self.summary.directory {
            fmt_category(f, directory)?;
        }
        if let Some(file) = &self.summary.file {
            fmt_category(f, file)?;
        }
        if let Some(tree) = &self.summary.tree {
            fmt_category(f, tree)?;
        }
        Ok(())
    }
}
