use std::io;

use anyhow::Result;
use tracing::instrument;

use crate::cli::{Command, FakeArgs, LogLevel, OutputFormat};
use crate::hw::{HardwareBackend, TransportProvider, transport_provider_from_backend};
use crate::telemetry;
use crate::terminal::{SystemTerminalClient, TerminalClient};

/// Creates a transport provider backed by the first `btleplug` adapter.
#[must_use]
pub fn real_transport_provider() -> Box<dyn TransportProvider> {
    transport_provider_from_backend(HardwareBackend::Real)
}

/// Creates a transport provider backed by fake BLE fixtures.
#[must_use]
pub fn fake_transport_provider(fake_args: FakeArgs) -> Box<dyn TransportProvider> {
    transport_provider_from_backend(HardwareBackend::Fake(fake_args.into_backend_config()))
}

/// Runs the CLI command against the process terminal.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = blecentral::Args::try_parse_from([
///     "blecentral",
///     "--fake",
///     "--fake-scan",
///     "AA:BB|Sensor",
///     "scan",
///     "--duration",
///     "10ms",
/// ])?;
/// let (command, maybe_fake_args) = args.into_command_and_fake_args()?;
/// let provider = match maybe_fake_args {
///     Some(fake_args) => blecentral::fake_transport_provider(fake_args),
///     None => blecentral::real_transport_provider(),
/// };
/// let mut out = Vec::new();
/// blecentral::run(command, &mut out, provider, blecentral::OutputFormat::Json).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, BLE interaction fails, or
/// output writing fails.
pub async fn run<W>(
    command: Command,
    out: &mut W,
    provider: Box<dyn TransportProvider>,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    run_with_log_level(command, out, provider, output_format, None).await
}

/// Runs the CLI command with an explicit telemetry log-level override.
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, BLE interaction fails, or
/// output writing fails.
pub async fn run_with_log_level<W>(
    command: Command,
    out: &mut W,
    provider: Box<dyn TransportProvider>,
    output_format: OutputFormat,
    log_level: Option<LogLevel>,
) -> Result<()>
where
    W: io::Write,
{
    run_with_clients_and_log_level(
        command,
        out,
        &SystemTerminalClient,
        provider,
        output_format,
        log_level,
    )
    .await
}

/// Runs the CLI command with injected clients.
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, BLE interaction fails, or
/// output writing fails.
pub async fn run_with_clients<W>(
    command: Command,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    provider: Box<dyn TransportProvider>,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    run_with_clients_and_log_level(command, out, terminal_client, provider, output_format, None)
        .await
}

/// Runs the CLI command with injected clients and explicit telemetry settings.
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, BLE interaction fails, or
/// output writing fails.
#[instrument(
    skip(command, out, terminal_client, provider),
    level = "info",
    fields(command = command.name(), ?log_level)
)]
pub async fn run_with_clients_and_log_level<W>(
    command: Command,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    provider: Box<dyn TransportProvider>,
    output_format: OutputFormat,
    log_level: Option<LogLevel>,
) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing(
        "blecentral",
        terminal_client.stderr_is_terminal(),
        log_level.map(LogLevel::as_level_filter),
    )?;

    match command {
        Command::Scan(args) => {
            crate::cli::scan::run(provider, &args, out, terminal_client, output_format).await
        }
        Command::Inspect(args) => {
            crate::cli::inspect::run(provider, &args, out, terminal_client, output_format).await
        }
        Command::Read(args) => {
            crate::cli::read::run(provider, &args, out, terminal_client, output_format).await
        }
        Command::Write(args) => {
            crate::cli::write::run(provider, &args, out, terminal_client, output_format).await
        }
        Command::Listen(args) => {
            crate::cli::listen::run(provider, &args, out, terminal_client, output_format).await
        }
    }
}
