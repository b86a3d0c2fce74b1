//! Interactive UIN availability check against a running registry server.
//!
//! Reads candidate UINs from stdin, one line per keystroke-sized edit, and
//! prints each availability state change as it happens.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::io;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use inspectorate::domain::{DebouncedUinChecker, UinAvailability};
use inspectorate::outbound::uin_http::HttpUinLookup;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};
use url::Url;

/// `check-uin` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "check-uin",
    about = "Check UIN availability as it is typed, with debounced lookups",
    version
)]
struct CliArgs {
    /// Base URL of the registry server.
    #[arg(long = "base-url", value_name = "url", value_parser = parse_base_url)]
    base_url: Url,
    /// Quiet period before a lookup is issued.
    #[arg(long = "debounce-ms", value_name = "ms", default_value_t = 500)]
    debounce_ms: u64,
    /// Lookup request timeout.
    #[arg(long = "timeout-secs", value_name = "secs", default_value_t = 10)]
    timeout_secs: u64,
}

fn parse_base_url(raw: &str) -> Result<Url, String> {
    let raw = raw.trim();
    let normalised = if raw.ends_with('/') {
        raw.to_owned()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalised).map_err(|error| format!("invalid base URL '{raw}': {error}"))
}

fn describe(state: &UinAvailability) -> String {
    match state {
        UinAvailability::Idle => "idle".to_owned(),
        UinAvailability::Checking { uin } => format!("checking {uin}"),
        UinAvailability::Available { uin } => format!("available {uin}"),
        UinAvailability::Taken { uin } => {
            format!("taken {uin}: a report with this UIN already exists")
        }
        UinAvailability::Unverified { uin, warning } => format!("unverified {uin}: {warning}"),
    }
}

async fn print_line<W>(out: &mut W, line: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(format!("{line}\n").as_bytes()).await?;
    out.flush().await
}

fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let lookup = HttpUinLookup::new(&args.base_url, Duration::from_secs(args.timeout_secs))?;
    let checker =
        DebouncedUinChecker::new(Arc::new(lookup), Duration::from_millis(args.debounce_ms));

    // The watch channel closes once the checker and every pending lookup
    // are dropped, which ends the printer after the last state change.
    let mut states = checker.subscribe();
    let printer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while states.changed().await.is_ok() {
            let line = describe(&states.borrow_and_update());
            if let Err(error) = print_line(&mut stdout, &line).await {
                warn!(%error, "stopped printing availability states");
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        checker.submit(&line);
    }
    drop(checker);

    printer
        .await
        .map_err(|error| io::Error::other(format!("output task failed: {error}")))
}
