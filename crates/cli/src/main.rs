//! CLI for the nftswap escrow engine.
//!
//! Pipeline: load scenario -> replay against a fresh registry and engine -> report.

use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use nftswap_core::TradeEvent;
use nftswap_engine::reporter::Report;
use nftswap_engine::scenario::ScenarioRun;
use nftswap_engine::sink::{self, json_stream::JsonStreamSink};
use nftswap_engine::{EngineConfig, Scenario, SwapEngine, DEFAULT_EVENT_CAPACITY, DEFAULT_IDENTITY};
use nftswap_registry::InMemoryRegistry;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser, Debug)]
#[command(
    name = "nftswap",
    version,
    about = "Two-party escrow swap engine for non-fungible assets"
)]
struct Cli {
    /// Escrow identity; holders approve this address as their asset's delegate.
    #[arg(long, global = true, env = "NFTSWAP_ENGINE", default_value_t = DEFAULT_IDENTITY)]
    engine: Address,

    /// Buffer size for live notification subscribers.
    #[arg(long, global = true, env = "NFTSWAP_EVENT_CAPACITY", default_value_t = DEFAULT_EVENT_CAPACITY)]
    event_capacity: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a scenario file against a fresh in-memory registry.
    Run {
        /// Path to the scenario JSON.
        scenario: PathBuf,

        #[arg(long, default_value_t = false)]
        json: bool,

        /// Sink output: "ndjson" writes NDJSON to stdout,
        /// "ndjson:/path/to/file" writes to file.
        #[arg(long, value_parser = parse_sink)]
        sink: Option<SinkTarget>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SinkTarget {
    Stdout,
    File(PathBuf),
}

fn parse_sink(value: &str) -> Result<SinkTarget, String> {
    match value.strip_prefix("ndjson") {
        Some("") => Ok(SinkTarget::Stdout),
        Some(rest) => match rest.strip_prefix(':') {
            Some(path) if !path.is_empty() => Ok(SinkTarget::File(PathBuf::from(path))),
            _ => Err(format!("unknown sink: {value}. Use 'ndjson' or 'ndjson:/path'")),
        },
        None => Err(format!("unknown sink: {value}. Use 'ndjson' or 'ndjson:/path'")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scenario,
            json,
            sink,
        } => {
            let script = Scenario::load(&scenario)?;
            let config = EngineConfig {
                identity: cli.engine,
                event_capacity: cli.event_capacity,
            };
            tracing::info!(
                path = %scenario.display(),
                steps = script.steps.len(),
                engine = %config.identity,
                "loaded scenario"
            );

            let registry = Arc::new(InMemoryRegistry::new());
            let engine = Arc::new(SwapEngine::new(config, registry));

            // 1. Follow notifications while the scenario runs.
            let mut rx = engine.subscribe();
            let follower = tokio::spawn(async move {
                let mut seen = 0usize;
                loop {
                    match rx.recv().await {
                        Ok(event) => {
                            seen += 1;
                            log_event(&event);
                        }
                        Err(RecvError::Lagged(missed)) => {
                            tracing::warn!(missed, "notification follower lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                seen
            });

            // 2. Run. Engine calls block, so keep them off the async workers.
            let run = tokio::task::spawn_blocking({
                let engine = Arc::clone(&engine);
                move || nftswap_engine::scenario::run(&engine, &script)
            })
            .await?;

            // 3. Collect final state, then drop the engine to close the channel.
            let history = engine.history();
            let report = Report::build(&run, engine.trades(), history.len());
            drop(engine);

            let followed = follower.await?;
            tracing::info!(followed, published = history.len(), "notifications done");

            // 4. Output.
            match &sink {
                Some(SinkTarget::Stdout) => {
                    let mut s = JsonStreamSink::stdout();
                    write_rows(&mut s, &report, &run, &history)?;
                    let n = s.finish()?;
                    tracing::info!(rows = n, "ndjson sink: wrote to stdout");
                }
                Some(SinkTarget::File(path)) => {
                    let file = std::fs::File::create(path)?;
                    let mut s = JsonStreamSink::new(file);
                    write_rows(&mut s, &report, &run, &history)?;
                    let n = s.finish()?;
                    tracing::info!(rows = n, path = %path.display(), "ndjson sink: wrote to file");
                }
                None if json => println!("{}", serde_json::to_string_pretty(&report)?),
                None => print!("{}", report.render(&run)),
            }

            // Still print report to stderr so it's visible.
            if sink.is_some() {
                eprint!("{}", report.render(&run));
            }
        }
    }

    Ok(())
}

fn write_rows<W: Write>(
    s: &mut JsonStreamSink<W>,
    report: &Report,
    run: &ScenarioRun,
    history: &[TradeEvent],
) -> std::io::Result<()> {
    let (summary, trades) = report.to_rows();
    s.write_summary(&summary)?;
    s.write_steps(&sink::step_rows(run))?;
    s.write_trades(&trades)?;
    s.write_events(&sink::event_rows(history))
}

fn log_event(event: &TradeEvent) {
    match event {
        TradeEvent::TradeCreated {
            id,
            requester,
            counterparty,
            offered_asset,
            requested_asset,
        } => tracing::info!(
            id,
            %requester,
            %counterparty,
            %offered_asset,
            %requested_asset,
            "TradeCreated"
        ),
        TradeEvent::TradeUpdated { id, outcome } => {
            tracing::info!(id, %outcome, "TradeUpdated")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_and_overrides() {
        let cli = Cli::try_parse_from(["nftswap", "run", "s.json"]).unwrap();
        assert_eq!(cli.engine, DEFAULT_IDENTITY);
        assert_eq!(cli.event_capacity, DEFAULT_EVENT_CAPACITY);

        let cli = Cli::try_parse_from([
            "nftswap",
            "run",
            "s.json",
            "--engine",
            "0x00000000000000000000000000000000000000ff",
            "--event-capacity",
            "8",
            "--sink",
            "ndjson",
        ])
        .unwrap();
        assert_eq!(cli.engine, Address::with_last_byte(0xff));
        assert_eq!(cli.event_capacity, 8);
        match cli.command {
            Commands::Run { sink, json, .. } => {
                assert_eq!(sink, Some(SinkTarget::Stdout));
                assert!(!json);
            }
        }
    }

    #[test]
    fn sink_targets() {
        assert_eq!(parse_sink("ndjson"), Ok(SinkTarget::Stdout));
        assert_eq!(
            parse_sink("ndjson:/tmp/out.ndjson"),
            Ok(SinkTarget::File(PathBuf::from("/tmp/out.ndjson")))
        );
        for bad in ["csv", "ndjson:", "ndjsonx", "starrocks:host"] {
            assert!(parse_sink(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn unknown_sink_fails_before_running() {
        let err = Cli::try_parse_from(["nftswap", "run", "s.json", "--sink", "csv"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(err.to_string().contains("unknown sink: csv"));
    }

    #[test]
    fn bad_engine_address_is_rejected() {
        assert!(Cli::try_parse_from(["nftswap", "--engine", "nope", "run", "s.json"]).is_err());
    }
}
