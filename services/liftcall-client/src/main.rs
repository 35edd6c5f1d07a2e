use anyhow::{bail, Context, Result};
use liftcall_api::{
    migrate_call_payload, CallFlow, CallRequest, LoggingHandler, RunMode, TokenProvider,
    Transport, ValidationOutcome, WsTransport,
};
use liftcall_core::{logging, Config, LogFormat};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const USAGE: &str = "usage: liftcall-client [--config <path>] [--request <path.json>] [--cancel-test]";

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    config_path: Option<PathBuf>,
    request_path: Option<PathBuf>,
    mode: RunMode,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("{USAGE}");
        return Ok(());
    }
    let cli = parse_args(&args)?;

    logging::init_with(LogFormat::from_value(
        std::env::var("LOG_FORMAT").ok().as_deref(),
    ));

    let config = Config::load(cli.config_path.as_deref()).context("loading configuration")?;
    config
        .validate_credentials()
        .context("checking client credentials")?;

    let request = match &cli.request_path {
        Some(path) => load_request(path)?,
        None => default_request(),
    };
    info!(?request, mode = ?cli.mode, "candidate call");

    let flow = CallFlow::from_config(&config);
    let accepted = match flow.screen(&request) {
        ValidationOutcome::Accepted(accepted) => accepted,
        refused => {
            info!(outcome = ?refused, "call not sent");
            return Ok(());
        }
    };

    let token = TokenProvider::new(&config.gateway.api_host)
        .fetch(&config.credentials, &config.gateway.token_scopes())
        .await
        .context("fetching access token")?;

    let mut transport = WsTransport::open(&config.gateway.api_host, &token.access_token)
        .await
        .context("opening gateway stream")?;

    tokio::select! {
        report = flow.execute(&mut transport, &accepted, cli.mode, LoggingHandler) => {
            let report = report.context("running call")?;
            info!(?report, "call attempt finished");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
        }
    }

    if let Err(e) = transport.close().await {
        warn!("closing gateway stream: {}", e);
    }
    Ok(())
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut args_iter = args.iter().skip(1);
    while let Some(arg) = args_iter.next() {
        match arg.as_str() {
            "--config" => match args_iter.next() {
                Some(path) => cli.config_path = Some(PathBuf::from(path)),
                None => bail!("--config was provided without a path"),
            },
            "--request" => match args_iter.next() {
                Some(path) => cli.request_path = Some(PathBuf::from(path)),
                None => bail!("--request was provided without a path"),
            },
            "--cancel-test" => cli.mode = RunMode::CancelTest,
            other => bail!("unknown argument {other}\n{USAGE}"),
        }
    }
    Ok(cli)
}

fn load_request(path: &Path) -> Result<CallRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading call payload {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing call payload {}", path.display()))?;
    let (request, version) = migrate_call_payload(value)?;
    info!(?version, "loaded call payload");
    Ok(request)
}

fn default_request() -> CallRequest {
    CallRequest::destination_call(1000, 3000, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("liftcall-client")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_defaults() {
        assert_eq!(parse_args(&args(&[])).unwrap(), CliArgs::default());
    }

    #[test]
    fn test_parse_all_flags() {
        let cli = parse_args(&args(&[
            "--config",
            "liftcall.toml",
            "--request",
            "call.json",
            "--cancel-test",
        ]))
        .unwrap();
        assert_eq!(cli.config_path, Some(PathBuf::from("liftcall.toml")));
        assert_eq!(cli.request_path, Some(PathBuf::from("call.json")));
        assert_eq!(cli.mode, RunMode::CancelTest);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&["--config"])).is_err());
        assert!(parse_args(&args(&["--frobnicate"])).is_err());
    }

    #[test]
    fn test_load_flat_request_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("call.json");
        std::fs::write(
            &path,
            r#"{"payload":{"request_id":1,"area":1000,"time":"t","terminal":1,"action":2,"destination":3000,"delay":40}}"#,
        )
        .unwrap();

        let request = load_request(&path).unwrap();
        assert_eq!(request.delay_seconds, Some(40));
        assert_eq!(request.destination_area, Some(3000));
    }

    #[test]
    fn test_default_request_is_accepted() {
        let flow = CallFlow::from_config(&Config::default_config());
        assert!(flow.screen(&default_request()).is_accepted());
    }
}
