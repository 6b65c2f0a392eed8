use assert_matches::assert_matches;
use clap::Parser;
use clap::error::ErrorKind;
use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use serde_json::Value;

const MEASUREMENT: &str = "00002a37-0000-1000-8000-00805f9b34fb";
const BODY_SENSOR_LOCATION: &str = "00002a38-0000-1000-8000-00805f9b34fb";
const CUSTOM_DATA: &str = "0000fff1-0000-1000-8000-00805f9b34fb";

#[derive(Debug, Default)]
struct FakeTerminalClient;

impl blecentral::TerminalClient for FakeTerminalClient {
    fn stdout_is_terminal(&self) -> bool {
        false
    }

    fn stderr_is_terminal(&self) -> bool {
        false
    }
}

async fn run_with_parsed_args(args: blecentral::Args) -> anyhow::Result<String> {
    let mut output = Vec::new();
    let output_format = args
        .output_format()
        .unwrap_or(blecentral::OutputFormat::Pretty);
    let (command, maybe_fake_args) = args.into_command_and_fake_args()?;
    let provider = match maybe_fake_args {
        Some(fake_args) => blecentral::fake_transport_provider(fake_args),
        None => blecentral::real_transport_provider(),
    };
    blecentral::run_with_clients(
        command,
        &mut output,
        &FakeTerminalClient,
        provider,
        output_format,
    )
    .await?;
    Ok(String::from_utf8(output)?)
}

async fn run_with_argv<const N: usize>(argv: [&str; N]) -> anyhow::Result<String> {
    let parsed_args = blecentral::Args::try_parse_from(argv)?;
    run_with_parsed_args(parsed_args).await
}

#[tokio::test]
async fn scan_command_reports_fixture_devices_as_json() -> anyhow::Result<()> {
    let stdout = run_with_argv([
        "blecentral",
        "--fake",
        "--fake-scan",
        "00:11:22|Speaker;AA:BB:CC|-",
        "--output",
        "json",
        "scan",
        "--duration",
        "10ms",
    ])
    .await?;

    let report: Value = serde_json::from_str(&stdout)?;
    let mut devices: Vec<(String, Value)> = report["devices"]
        .as_array()
        .map(|devices| {
            devices
                .iter()
                .map(|device| (device["device"].to_string(), device["name"].clone()))
                .collect()
        })
        .unwrap_or_default();
    devices.sort_by(|left, right| left.0.cmp(&right.0));

    assert_eq!(
        vec![
            ("\"00:11:22\"".to_string(), Value::from("Speaker")),
            ("\"AA:BB:CC\"".to_string(), Value::Null),
        ],
        devices
    );
    Ok(())
}

#[tokio::test]
async fn scan_command_filters_by_name() -> anyhow::Result<()> {
    let fake = blecentral::FakeArgs::builder()
        .scan_fixture("00:11:22|Speaker;AA:BB:CC|Thermometer")?
        .build();
    let args = blecentral::Args::new(blecentral::Command::Scan(
        blecentral::ScanArgs::new(std::time::Duration::from_millis(10)).with_name("Thermometer"),
    ))
    .with_fake(fake);

    let stdout = run_with_parsed_args(args).await?;

    assert!(stdout.contains("AA:BB:CC"), "{stdout}");
    assert!(!stdout.contains("Speaker"), "{stdout}");
    Ok(())
}

#[tokio::test]
async fn inspect_command_prints_the_service_tree() -> anyhow::Result<()> {
    let fake = blecentral::FakeArgs::builder()
        .scan_fixture("AA:BB:CC|Sensor")?
        .build();
    let args = blecentral::Args::new(blecentral::Command::Inspect(blecentral::InspectArgs::new(
        blecentral::DeviceArgs::address("AA:BB:CC"),
    )))
    .with_fake(fake);

    let stdout = run_with_parsed_args(args).await?;

    assert!(stdout.starts_with("Connected device:"), "{stdout}");
    assert!(stdout.contains("GATT services:"), "{stdout}");
    assert!(stdout.contains(MEASUREMENT), "{stdout}");
    assert!(stdout.contains(CUSTOM_DATA), "{stdout}");
    Ok(())
}

#[tokio::test]
async fn read_command_decodes_the_fixture_payload() -> anyhow::Result<()> {
    let stdout = run_with_argv([
        "blecentral",
        "--fake",
        "--fake-scan",
        "AA:BB:CC|Sensor",
        "--fake-read",
        "2A000000",
        "--output",
        "json",
        "read",
        "--address",
        "AA:BB:CC",
        "--uuid",
        BODY_SENSOR_LOCATION,
        "--encoding",
        "int32",
    ])
    .await?;

    let report: Value = serde_json::from_str(&stdout)?;
    assert_eq!(Value::from("AA:BB:CC"), report["device"]["device"]);
    assert_eq!(Value::from("Sensor"), report["device"]["name"]);
    assert_eq!(Value::from("2A000000"), report["value"]);
    assert_eq!(Value::from("42"), report["decoded"]);
    Ok(())
}

#[tokio::test]
async fn write_command_reports_the_encoded_payload() -> anyhow::Result<()> {
    let stdout = run_with_argv([
        "blecentral",
        "--fake",
        "--fake-scan",
        "AA:BB:CC|Sensor",
        "--output",
        "json",
        "write",
        "--name",
        "Sensor",
        "--uuid",
        CUSTOM_DATA,
        "--encoding",
        "int32",
        "-2",
    ])
    .await?;

    let report: Value = serde_json::from_str(&stdout)?;
    assert_eq!(Value::from("FEFFFFFF"), report["payload"]);
    assert_eq!(Value::from("dispatched"), report["outcome"]["status"]);
    Ok(())
}

#[tokio::test]
async fn write_command_rejects_a_value_that_does_not_parse() {
    let result = run_with_argv([
        "blecentral",
        "--fake",
        "--fake-scan",
        "AA:BB:CC|Sensor",
        "write",
        "--address",
        "AA:BB:CC",
        "--uuid",
        CUSTOM_DATA,
        "--encoding",
        "float32",
        "warm",
    ])
    .await;

    let error = result.expect_err("value should not parse");
    assert!(error.to_string().contains("warm"), "{error:#}");
}

#[tokio::test]
async fn listen_command_streams_until_the_limit() -> anyhow::Result<()> {
    let stdout = run_with_argv([
        "blecentral",
        "--fake",
        "--fake-scan",
        "AA:BB:CC|Sensor",
        "listen",
        "--address",
        "AA:BB:CC",
        "--uuid",
        MEASUREMENT,
        "--max-notifications",
        "2",
    ])
    .await?;

    let notifications: Vec<&str> = stdout
        .lines()
        .filter(|line| line.starts_with('['))
        .collect();
    assert_snapshot!(notifications.join("\n"), @r"
    [0001] 16 48
    [0002] 16 4A
    ");
    assert!(stdout.contains("reached limit"), "{stdout}");
    Ok(())
}

#[tokio::test]
async fn listen_command_rejects_a_characteristic_without_notify() {
    let result = run_with_argv([
        "blecentral",
        "--fake",
        "--fake-scan",
        "AA:BB:CC|Sensor",
        "listen",
        "--address",
        "AA:BB:CC",
        "--uuid",
        BODY_SENSOR_LOCATION,
    ])
    .await;

    let error = result.expect_err("body sensor location does not notify");
    assert_matches!(
        error.downcast_ref::<blecentral::OperationError>(),
        Some(blecentral::OperationError::UnsupportedOperation { .. })
    );
}

#[tokio::test]
async fn connecting_to_an_unknown_device_reports_the_gatt_status() {
    let result = run_with_argv([
        "blecentral",
        "--fake",
        "--fake-scan",
        "AA:BB:CC|Sensor",
        "inspect",
        "--address",
        "FF:FF",
    ])
    .await;

    let error = result.expect_err("unknown device should not connect");
    assert_eq!(
        "Connection Error 133 encountered for FF:FF! Disconnecting...",
        error.to_string()
    );
}

#[test]
fn device_arguments_require_an_address_or_a_name() {
    let result = blecentral::Args::try_parse_from(["blecentral", "inspect"]);

    assert_matches!(result, Err(error) if error.kind() == ErrorKind::MissingRequiredArgument);
}

#[test]
fn device_arguments_reject_both_address_and_name() {
    let result = blecentral::Args::try_parse_from([
        "blecentral",
        "inspect",
        "--address",
        "AA:BB",
        "--name",
        "Sensor",
    ]);

    assert_matches!(result, Err(error) if error.kind() == ErrorKind::ArgumentConflict);
}

#[test]
fn fake_fixture_builder_rejects_invalid_records() {
    let result = blecentral::FakeArgs::builder().scan_fixture("AA|BB|CC");

    assert_matches!(result, Err(blecentral::FixtureError::InvalidRecordFieldCount));
}
