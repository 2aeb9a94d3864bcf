use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::{
    Capacity, Category, DirectoryStats, FileStats, Metadata, OpStat, Report, Summary, Timestamp,
    TreeStats,
};
use crate::{MDError, MDResult};

/// Mandatory field patterns, each probed independently over the whole text.
struct Patterns {
    started: Regex,
    finished: Regex,
    version: Regex,
    tasks: Regex,
    nodes: Regex,
    items: Regex,
    command_line: Regex,
    path: Regex,
    fs: Regex,
    iterations: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| {
        let re = |pattern: &str| Regex::new(pattern).expect("invalid report pattern");
        Patterns {
            started: re(r"-- started at (.+) --"),
            finished: re(r"-- finished at (.+) --"),
            version: re(r"mdtest-(.+) was launched with"),
            tasks: re(r"was launched with (\d+) total task"),
            nodes: re(r"total task\(s\) on (\d+) node"),
            items: re(r"\d+ tasks, (\d+) (?:files)?/?(?:directories)?"),
            command_line: re(r"Command line used: (.+)"),
            path: re(r"Path: (.+)"),
            fs: re(r"FS: (.+?)\s+Used FS: (.+%)\s+Inodes: (.+?)\s+Used Inodes: (.+%)"),
            iterations: re(r"SUMMARY(?: rate)?: \(of (\d+) iterations\)"),
        }
    })
}

fn captures<'t>(re: &Regex, text: &'t str, field: &str) -> MDResult<Captures<'t>> {
    re.captures(text).ok_or_else(|| MDError::missing_field(field))
}

/// First capture group as text, trailing whitespace (e.g. `\r`) dropped.
fn text_field(re: &Regex, text: &str, field: &str) -> MDResult<String> {
    Ok(captures(re, text, field)?[1].trim_end().to_owned())
}

fn count_field(re: &Regex, text: &str, field: &str) -> MDResult<u64> {
    let caps = captures(re, text, field)?;
    caps[1]
        .parse()
        .map_err(|e| MDError::Parse(format!("error: {{field `{field}`: {e}}}")))
}

/// Statistics line `<Category> <op> : max min mean stddev`.
fn op_stat(text: &str, category: &str, op: &str) -> MDResult<Option<OpStat>> {
    let re = Regex::new(&format!(
        r"{}\s*:\s+([0-9.]+)\s+([0-9.]+)\s+([0-9.]+)\s+([0-9.]+)",
        regex::escape(&format!("{category} {op}"))
    ))
    .map_err(MDError::other)?;
    Ok(re.captures(text).map(|caps| OpStat {
        max: caps[1].to_owned(),
        min: caps[2].to_owned(),
        mean: caps[3].to_owned(),
        std_dev: caps[4].to_owned(),
    }))
}

/// `None` unless at least one operation of the category is present.
fn category<C: Category>(text: &str) -> MDResult<Option<C>> {
    let mut stats = C::default();
    let mut found = false;
    for (op, slot) in stats.operations_mut() {
        *slot = op_stat(text, C::NAME, op)?;
        found |= slot.is_some();
    }
    Ok(found.then_some(stats))
}

pub(super) fn parse(text: &str) -> MDResult<Report> {
    let p = patterns();
    let fs = captures(&p.fs, text, "fs")?;
    let metadata = Metadata {
        timestamp: Timestamp {
            started: text_field(&p.started, text, "started")?,
            finished: text_field(&p.finished, text, "finished")?,
        },
        version: text_field(&p.version, text, "version")?,
        tasks: count_field(&p.tasks, text, "tasks")?,
        nodes: count_field(&p.nodes, text, "nodes")?,
        items: count_field(&p.items, text, "items")?,
        command_line: text_field(&p.command_line, text, "command line")?,
        path: text_field(&p.path, text, "path")?,
        fs: Capacity {
            total: fs[1].to_owned(),
            used: fs[2].to_owned(),
        },
        inodes: Capacity {
            total: fs[3].to_owned(),
            used: fs[4].to_owned(),
        },
    };
    let summary = Summary {
        iterations: count_field(&p.iterations, text, "iterations")?,
        directory: category::<DirectoryStats>(text)?,
        file: category::<FileStats>(text)?,
        tree: category::<TreeStats>(text)?,
    };
    log::debug!(
        "parsed report of mdtest-{}, {} iteration(s)",
        metadata.version,
        summary.iterations
    );
    Ok(Report { metadata, summary })
}

#[cfg(test)]
mod test {
    use super::*;

    const FULL: &str = include_str!("fixtures/full.txt");
    const FILES_ONLY: &str = include_str!("fixtures/files_only.txt");

    fn stat(max: &str, min: &str, mean: &str, std_dev: &str) -> Option<OpStat> {
        Some(OpStat {
            max: max.into(),
            min: min.into(),
            mean: mean.into(),
            std_dev: std_dev.into(),
        })
    }

    fn flat(value: &str) -> Option<OpStat> {
        stat(value, value, value, "0.000")
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse("").unwrap_err().is_parse_err());
        assert!(parse("mdtest was here").unwrap_err().is_parse_err());
    }

    #[test]
    fn test_missing_any_mandatory_field() {
        for line in [
            "-- started at",
            "-- finished at",
            "mdtest-",
            "Command line used:",
            "Path:",
            "FS:",
            "SUMMARY:",
            "4 tasks, 12",
        ] {
            let broken = FULL
                .lines()
                .filter(|l| !l.trim_start().starts_with(line))
                .collect::<Vec<_>>()
                .join("\n");
            let err = parse(&broken).unwrap_err();
            assert!(err.is_parse_err(), "{line}: {err}");
        }
    }

    #[test]
    fn test_parse_full() {
        let report = parse(FULL).unwrap();
        assert_eq!(
            report.metadata,
            Metadata {
                timestamp: Timestamp {
                    started: "05/27/2018 04:07:15".into(),
                    finished: "05/27/2018 04:07:15".into(),
                },
                version: "1.9.3".into(),
                tasks: 4,
                nodes: 1,
                items: 12,
                command_line: "mdtest -n 3".into(),
                path: "/tmp/dummy".into(),
                fs: Capacity {
                    total: "244.0 GiB".into(),
                    used: "32.3%".into(),
                },
                inodes: Capacity {
                    total: "15.5 Mi".into(),
                    used: "9.2%".into(),
                },
            }
        );
        assert_eq!(
            report.summary,
            Summary {
                iterations: 1,
                directory: Some(DirectoryStats {
                    creation: flat("113501.114"),
                    stat: flat("789830.624"),
                    removal: flat("81351.011"),
                }),
                file: Some(FileStats {
                    creation: flat("241789.498"),
                    stat: flat("1785168.770"),
                    read: flat("1155182.167"),
                    removal: flat("270385.896"),
                }),
                tree: Some(TreeStats {
                    creation: flat("111.431"),
                    removal: flat("17801.866"),
                }),
            }
        );
    }

    #[test]
    fn test_parse_files_only() {
        let report = parse(FILES_ONLY).unwrap();
        assert_eq!(report.metadata.items, 0);
        assert!(report.summary.directory.is_none());
        let file = report.summary.file.as_ref().unwrap();
        assert_eq!(file.creation.as_ref().unwrap().max, "0.000");
        let tree = report.summary.tree.as_ref().unwrap();
        assert_eq!(tree.creation.as_ref().unwrap().min, "80006.097");
        assert_eq!(tree.removal.as_ref().unwrap().mean, "62649.036");

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["summary"].get("directory").is_none());
        assert_eq!(json["summary"]["tree"]["removal"]["stdDev"], "0.000");
        assert_eq!(json["metadata"]["commandLine"], "mdtest -F");
    }

    #[test]
    fn test_partial_category() {
        let text = FULL
            .lines()
            .filter(|l| !l.contains("Directory stat") && !l.contains("File read"))
            .collect::<Vec<_>>()
            .join("\n");
        let report = parse(&text).unwrap();
        let directory = report.summary.directory.unwrap();
        assert!(directory.stat.is_none());
        assert!(directory.creation.is_some());
        let file = report.summary.file.unwrap();
        assert!(file.read.is_none());
        let json = serde_json::to_value(&file).unwrap();
        assert!(json.get("read").is_none());
    }

    #[test]
    fn test_summary_rate_header_and_crlf() {
        let text = FULL
            .replace("SUMMARY: (of 1 iterations)", "SUMMARY rate: (of 3 iterations)")
            .replace('\n', "\r\n");
        let report = parse(&text).unwrap();
        assert_eq!(report.summary.iterations, 3);
        assert_eq!(report.metadata.path, "/tmp/dummy");
        assert_eq!(report.metadata.command_line, "mdtest -n 3");
    }

    #[test]
    fn test_parse_deterministic() {
        assert_eq!(parse(FULL).unwrap(), parse(FULL).unwrap());
        let report: Report = FULL.parse().unwrap();
        let rendered = report.to_string();
        assert!(rendered.contains("Directory stat"));
        assert!(rendered.contains("789830.624"));
    }
}
