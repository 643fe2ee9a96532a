use etf_csv_autoloader::config::{
    named_universe, parse_timezone, today_at_default_hour, Config, FailurePolicy,
    DEFAULT_ENDPOINT, DEFAULT_START_DATE,
};
use etf_csv_autoloader::scrapers::yahoo::YahooScraper;
use etf_csv_autoloader::services::autoload_service::AutoloadService;
use etf_csv_autoloader::services::merge_service;
use etf_csv_autoloader::util;

use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use log::{info, error};
use std::sync::Arc;

fn common_args(cmd: Command<'static>) -> Command<'static> {
    cmd.arg(
        Arg::new("universe")
            .short('u')
            .long("universe")
            .value_name("UNIVERSE")
            .help("Built-in ticker universe (full, test)")
            .takes_value(true)
            .default_value("full"),
    )
    .arg(
        Arg::new("tickers")
            .short('t')
            .long("tickers")
            .value_name("TICKERS")
            .help("Comma separated tickers, overrides --universe")
            .takes_value(true),
    )
    .arg(
        Arg::new("data-dir")
            .short('o')
            .long("data-dir")
            .value_name("DIR")
            .help("Directory for the per-ticker CSVs and merged.csv")
            .takes_value(true)
            .default_value("."),
    )
}

fn fetch_args(cmd: Command<'static>) -> Command<'static> {
    common_args(cmd)
        .arg(
            Arg::new("start")
                .short('s')
                .long("start")
                .value_name("MM/DD/YYYY:HH")
                .help("Start date")
                .takes_value(true)
                .default_value(DEFAULT_START_DATE),
        )
        .arg(
            Arg::new("end")
                .short('e')
                .long("end")
                .value_name("MM/DD/YYYY:HH")
                .help("End date (defaults to today at 9am)")
                .takes_value(true),
        )
        .arg(
            Arg::new("timezone")
                .long("timezone")
                .value_name("TZ")
                .help("IANA timezone for the dates (defaults to the local zone)")
                .takes_value(true),
        )
        .arg(
            Arg::new("endpoint")
                .long("endpoint")
                .value_name("URL")
                .help("Quote download endpoint")
                .takes_value(true)
                .default_value(DEFAULT_ENDPOINT),
        )
        .arg(
            Arg::new("skip-failed")
                .long("skip-failed")
                .help("Leave failed tickers out of the merge instead of aborting")
                .takes_value(false),
        )
}

fn build_config(matches: &ArgMatches, with_dates: bool) -> anyhow::Result<Config> {
    let universe: Vec<String> = match matches.value_of("tickers") {
        Some(list) => list
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => {
            let name = matches.value_of("universe").unwrap_or("full");
            named_universe(name)?.iter().map(|s| s.to_string()).collect()
        }
    };

    let mut config = Config::new()
        .with_universe(&universe)
        .with_data_dir(matches.value_of("data-dir").unwrap_or("."));

    if with_dates {
        let timezone = matches
            .value_of("timezone")
            .map(parse_timezone)
            .transpose()?;
        let end = matches
            .value_of("end")
            .map(|s| s.to_string())
            .unwrap_or_else(|| today_at_default_hour(timezone));

        config = config
            .with_timezone(timezone)
            .with_start_date(matches.value_of("start").unwrap_or(DEFAULT_START_DATE))
            .with_end_date(&end)
            .with_endpoint(matches.value_of("endpoint").unwrap_or(DEFAULT_ENDPOINT));

        if matches.is_present("skip-failed") {
            config = config.with_failure_policy(FailurePolicy::SkipFailed);
        }
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init();

    let app = Command::new("etf_csv_autoloader")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Exports ETF price history into the merged CSV used by the backtesting sheet")
        .arg(
            Arg::new("clear")
                .long("clear")
                .global(true)
                .help("Clear the screen before running")
                .takes_value(false),
        )
        .subcommand(fetch_args(Command::new("run").about("Download every ticker, then merge")))
        .subcommand(fetch_args(Command::new("fetch").about("Download every ticker without merging")))
        .subcommand(common_args(Command::new("merge").about("Merge the CSVs already on disk")));

    let matches = app.get_matches();

    match matches.subcommand() {
        Some((name @ ("run" | "fetch"), sub)) => {
            if sub.is_present("clear") {
                util::clear_screen();
            }
            let config = build_config(sub, true)?;
            info!("Universe: {:?}", config.universe.iter().map(|t| t.as_str()).collect::<Vec<_>>());

            let scraper = Arc::new(YahooScraper::new(&config)?);
            let service = AutoloadService::new(config, scraper);

            if name == "run" {
                let data_dir = service.config().data_dir.display().to_string();
                let summary = service.run().await.map_err(|e| {
                    error!("Run failed: {}", e);
                    e
                }).with_context(|| format!("autoload into {} failed", data_dir))?;
                println!("Minimum rows: {}", summary.merge.rows);
                println!("{} written.", summary.merge.output.display());
            } else {
                let counts = service.fetch().await.context("fetch failed")?;
                for (ticker, rows) in counts.iter() {
                    println!("{} created ({} rows).", ticker, rows);
                }
            }
        }
        Some(("merge", sub)) => {
            if sub.is_present("clear") {
                util::clear_screen();
            }
            let config = build_config(sub, false)?;
            let summary = merge_service::merge_universe(&config).context("merge failed")?;
            println!("Minimum rows: {}", summary.rows);
            println!("{} written.", summary.output.display());
        }
        _ => {
            info!("No command specified. Use --help for usage information.");
        }
    }

    Ok(())
}
