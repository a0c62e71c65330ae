use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use covid_charts::app::App;
use covid_charts::cache::HttpSeriesSource;
use covid_charts::config::{ConfigLoader, DEFAULT_COUNTRY, ResolvedConfig, RunConfig};
use covid_charts::domain::{ChartMode, RegionKey};
use covid_charts::output::{OutputMode, print_regions};
use covid_charts::viewer::{ChartViewer, PrintPathViewer, SystemViewer};

#[derive(Parser)]
#[command(name = "covid-charts")]
#[command(about = "Charts COVID-19 cases, recoveries and deaths of one country or state")]
#[command(version, author)]
struct Cli {
    #[arg(
        short = 't',
        long = "type",
        value_enum,
        default_value_t = ChartMode::Stacked,
        help = "Type of figure to be shown"
    )]
    mode: ChartMode,

    #[arg(short, long, default_value = DEFAULT_COUNTRY, help = "Country")]
    country: String,

    #[arg(short, long, default_value = "", help = "State, empty for the whole country")]
    state: String,

    #[arg(
        short,
        long,
        help = "List all available countries and their states (overrides -c, -s, -t)"
    )]
    list: bool,

    #[arg(short, long, help = "Force update of the cache files, even if they are not outdated")]
    update: bool,

    #[arg(short, long, help = "Print cache info and the matched rows to stdout")]
    verbose: bool,

    #[arg(long, help = "JSON configuration file (default: covid-charts.json if present)")]
    config: Option<String>,

    #[arg(short, long, help = "Where to write the chart")]
    output: Option<Utf8PathBuf>,

    #[arg(long, help = "Only write the chart and print its path")]
    no_show: bool,
}

impl Cli {
    fn run_config(&self, resolved: ResolvedConfig) -> RunConfig {
        let region = RegionKey::new(self.state.clone(), self.country.clone());
        let mut config = RunConfig::new(resolved, region, self.mode);
        config.force_update = self.update;
        config.verbose = self.verbose;
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        config
    }
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        println!("{report:?}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let resolved = ConfigLoader::resolve(cli.config.as_deref())?;
    let config = cli.run_config(resolved);
    let sink = OutputMode::from_verbose(config.verbose).sink();

    let source = HttpSeriesSource::new()?;
    let app = App::new(config, source);

    if cli.list {
        let result = app.list(sink)?;
        print_regions(&result.regions).into_diagnostic()?;
        return Ok(());
    }

    let viewer: Box<dyn ChartViewer> = if cli.no_show {
        Box::new(PrintPathViewer)
    } else {
        Box::new(SystemViewer::new())
    };
    app.run(viewer.as_ref(), sink)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use covid_charts::config::{FreshnessPolicy, default_start_date};

    fn resolved() -> ResolvedConfig {
        ResolvedConfig {
            cache_dir: Utf8PathBuf::from("cache"),
            base_url: "http://localhost/".to_string(),
            freshness: FreshnessPolicy::default(),
            start_date: default_start_date(),
        }
    }

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["covid-charts"]);
        let config = cli.run_config(resolved());
        assert_eq!(config.mode, ChartMode::Stacked);
        assert_eq!(config.region, RegionKey::new("", "Germany"));
        assert!(!config.force_update);
        assert!(!config.verbose);
        assert!(!cli.list);
    }

    #[test]
    fn short_flags() {
        let cli = Cli::parse_from([
            "covid-charts", "-t", "deaths", "-c", "China", "-s", "Hubei", "-u", "-v", "-l",
        ]);
        let config = cli.run_config(resolved());
        assert_eq!(config.mode, ChartMode::Deaths);
        assert_eq!(config.region, RegionKey::new("Hubei", "China"));
        assert!(config.force_update);
        assert!(config.verbose);
        assert!(cli.list);
    }

    #[test]
    fn output_override() {
        let cli = Cli::parse_from(["covid-charts", "--output", "/tmp/chart.svg", "--no-show"]);
        let config = cli.run_config(resolved());
        assert_eq!(config.output, Utf8PathBuf::from("/tmp/chart.svg"));
        assert!(cli.no_show);
    }

    #[test]
    fn rejects_unknown_chart_type() {
        assert!(Cli::try_parse_from(["covid-charts", "--type", "pie"]).is_err());
    }
}
