fn main() {
    env_logger::init();
    use clap::Parser;
    let args = Cli::parse();
    match args.cmd {
        Commands::Run(run_args) => run(run_args),
        Commands::Parse { report, json } => parse(&report, json),
    };
}

fn build_mdtest(args: &RunArgs) -> mdtest_mpi::MDResult<Mdtest> {
    if let Some(config) = args.config.as_ref() {
        config::init_config_toml(config)?;
    }
    let mut mdtest = Mdtest::new();
    config::get_config().apply(&mut mdtest)?;
    if let Some(np) = args.np {
        mdtest.np(np);
    }
    if let Some(dir) = args.dir.as_ref() {
        mdtest.test_dir(dir);
    }
    if let Some(n) = args.items {
        mdtest.items_per_process(n);
    }
    if args.unique {
        mdtest.unique(true);
    }
    if args.files {
        mdtest.only_files();
    }
    if args.dirs {
        mdtest.only_dirs();
    }
    if let Some(phase) = args.phase {
        mdtest.only_phase(phase);
    }
    if args.hard {
        mdtest.hard();
    }
    if let Some(hostfile) = args.hostfile.as_ref() {
        mdtest.hostfile_path(hostfile)?;
    }
    if !args.host.is_empty() {
        let mut hostfile = HostFile::new();
        for host in args.host.iter() {
            match host.split_once(':') {
                Some((name, slots)) => hostfile.host(name, [("slots", slots)])?,
                None => hostfile.host_bare(host.as_str())?,
            };
        }
        mdtest.hostfile(hostfile);
    }
    if !args.extra.is_empty() {
        mdtest.mdtest_options(args.extra.iter().map(|flag| (flag.as_str(), true)));
    }
    Ok(mdtest)
}

fn run(args: RunArgs) {
    let mdtest =
        build_mdtest(&args).unwrap_or_else(|e| panic!("fail to configure mdtest, {e}"));
    if args.dry_run {
        println!("{}", mdtest.compose(None));
        let hostfile = mdtest.get_hostfile();
        if !hostfile.is_empty() {
            println!("host file:\n{hostfile}");
        }
        return;
    }
    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.set_style(
        indicatif::ProgressStyle::with_template("{spinner} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner()),
    );
    spinner.set_message("running mdtest...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));
    let output = mdtest.run();
    spinner.finish_and_clear();
    let output = output.unwrap_or_else(|e| panic!("fail to run mdtest, {e}"));
    log::info!("command: {}", output.cmd);
    if args.raw {
        print!("{}", output.stdout);
        return;
    }
    let report: Report = output
        .stdout
        .parse()
        .unwrap_or_else(|e| panic!("fail to parse mdtest output, {e}"));
    print_report(&report, args.json);
}

fn parse(report: &std::path::Path, json: bool) {
    let text = std::fs::read_to_string(report)
        .unwrap_or_else(|e| panic!("fail to read {}, {e}", report.display()));
    let report: Report = text
        .parse()
        .unwrap_or_else(|e| panic!("fail to parse {}, {e}", report.display()));
    print_report(&report, json);
}

fn print_report(report: &Report, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_else(|e| panic!("{e}"))
        );
    } else {
        print!("{report}");
    }
}

use std::path::PathBuf;

use clap::Subcommand;
use mdtest_mpi::{config, hostfile::HostFile, Mdtest, Phase, Report};

#[derive(Debug, clap::Parser)]
#[command(name = "mdtest-mpi")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Launch mdtest through mpirun and print the parsed report
    Run(RunArgs),
    /// Parse a saved mdtest report
    #[command(arg_required_else_help = true)]
    Parse {
        /// report file
        report: PathBuf,
        /// print as json
        #[arg(short, long)]
        json: bool,
    },
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    /// configuration file in toml format
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// number of processes
    #[arg(long)]
    np: Option<usize>,
    /// test directory
    #[arg(short, long)]
    dir: Option<PathBuf>,
    /// items per process
    #[arg(short = 'n', long)]
    items: Option<usize>,
    /// unique working directory for each task
    #[arg(short, long)]
    unique: bool,
    /// files only
    #[arg(short = 'F', long, conflicts_with = "dirs")]
    files: bool,
    /// directories only
    #[arg(short = 'D', long)]
    dirs: bool,
    /// run a single phase: write, stat, read or delete
    #[arg(short, long)]
    phase: Option<Phase>,
    /// fixed-size file workload
    #[arg(long)]
    hard: bool,
    /// host file passed to mpirun
    #[arg(long)]
    hostfile: Option<PathBuf>,
    /// host as NAME[:SLOTS], may repeat
    #[arg(long)]
    host: Vec<String>,
    /// extra mdtest flags, e.g. `-X=-h`
    #[arg(short = 'X', long = "extra", allow_hyphen_values = true)]
    extra: Vec<String>,
    /// print the command without running it
    #[arg(long)]
    dry_run: bool,
    /// print mdtest output as is
    #[arg(long, conflicts_with = "json")]
    raw: bool,
    /// print the report as json
    #[arg(short, long)]
    json: bool,
}
