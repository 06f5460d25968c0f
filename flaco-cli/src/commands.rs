//! Subcommand handlers.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use flaco_remote::{Credentials, Dispatcher, Job, RemoteError, RemoteSession, SessionOptions};
use flaco_toolkit::{DnsQueryType, PingStatistics, ProbeError, ProbeToolkit, Protocol};
use serde::Serialize;
use serde_json::json;

use crate::cli::{Cli, Command, SshArgs};
use crate::config::Config;
use crate::element::{Element, join_or_error, status_or_error};

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref())?;
    let json = cli.json;

    match cli.command {
        Command::Dns {
            host,
            servers,
            query_type,
        } => dns(&config, json, &host, &servers, query_type).await,
        Command::Ping { host, count } => ping(&config, json, &host, count).await,
        Command::Socket {
            host,
            port,
            protocol,
        } => socket(&config, json, &host, port, protocol).await,
        Command::Url { url } => self::url(&config, json, &url).await,
        Command::Check { element } => check(&config, json, element.as_deref()).await,
        Command::Dispatch {
            devices,
            output,
            commands,
            ssh,
        } => dispatch(&config, json, Job::new(devices, commands, output), &ssh).await,
        Command::Fetch {
            host,
            source,
            destination,
            ssh,
        } => fetch(&config, json, &host, &source, &destination, &ssh).await,
    }
}

async fn dns(
    config: &Config,
    json: bool,
    host: &str,
    servers: &[String],
    query_type: DnsQueryType,
) -> Result<ExitCode> {
    let servers = if servers.is_empty() {
        config.probe.nameservers.as_slice()
    } else {
        servers
    };
    let toolkit = ProbeToolkit::new(host)?.with_options(config.probe_options());
    let result = toolkit.resolve(servers, query_type).await;

    emit(
        json,
        &json!({ "record": host, "queryType": query_type, "resolution": result }),
        || format!("Record=[{host}] Resolution=[{}]", join_or_error(&result)),
    )?;
    Ok(exit_code(result.as_ref().err()))
}

async fn ping(config: &Config, json: bool, host: &str, count: Option<u32>) -> Result<ExitCode> {
    let toolkit = ProbeToolkit::new(host)?.with_options(config.probe_options());
    let result = toolkit.ping(count.unwrap_or(config.probe.ping_count)).await;

    let statistics = result.as_ref().ok().and_then(|s| PingStatistics::parse(s));
    emit(
        json,
        &json!({ "target": host, "statistics": statistics, "output": result }),
        || match &result {
            Ok(stats) => stats.clone(),
            Err(e) => format!("Unable to ping {host}: {e}"),
        },
    )?;
    Ok(exit_code(result.as_ref().err()))
}

async fn socket(
    config: &Config,
    json: bool,
    host: &str,
    port: u16,
    protocol: Protocol,
) -> Result<ExitCode> {
    let toolkit = ProbeToolkit::new(host)?.with_options(config.probe_options());
    let result = toolkit.probe_port(port, protocol).await;

    emit(json, &result, || {
        format!(
            "Type=[{protocol}] Socket=[{host}]:[{port}] Status=[{}]",
            status_or_error(&result)
        )
    })?;
    Ok(exit_code(result.as_ref().err()))
}

async fn url(config: &Config, json: bool, url: &str) -> Result<ExitCode> {
    let result = flaco_toolkit::probe_url(url, config.probe_options().http_timeout).await;

    emit(json, &json!({ "uri": url, "status": result }), || {
        format!("URI=[{url}] Status=[{}]", status_or_error(&result))
    })?;
    Ok(exit_code(result.as_ref().err()))
}

async fn check(config: &Config, json: bool, only: Option<&str>) -> Result<ExitCode> {
    let profiles: Vec<_> = config
        .elements
        .iter()
        .filter(|p| only.is_none_or(|name| p.name == name))
        .collect();
    if profiles.is_empty() {
        match only {
            Some(name) => bail!("No [[element]] profile named '{name}'"),
            None => bail!(
                "No [[element]] profiles configured in {}",
                Config::default_path().display()
            ),
        }
    }

    if !json {
        println!("Checking {} element(s); please wait...", profiles.len());
    }
    let mut reports = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let element = Element::new(&profile.name, &profile.kind, config.probe_options())?;
        let report = element
            .run(profile, &config.probe.nameservers, config.probe.ping_count)
            .await;
        if !json {
            for line in report.lines() {
                println!("{line}");
            }
        }
        reports.push(report);
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    let failed = reports.iter().filter(|r| r.has_failures()).count();
    if failed > 0 {
        tracing::warn!("{failed} element(s) reported failures");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn dispatch(config: &Config, json: bool, job: Job, ssh: &SshArgs) -> Result<ExitCode> {
    let credentials = credentials(config, ssh)?;
    let dispatcher = Dispatcher::ssh(credentials, session_options(config, ssh));

    if !json {
        println!("Job: {}", job.summary());
    }
    match dispatcher.dispatch(&job).await {
        Ok(report) => {
            emit(json, &report, || {
                let mut text = String::new();
                for host in &report.hosts {
                    let status = host
                        .error
                        .as_ref()
                        .map_or_else(|| "ok".to_string(), ToString::to_string);
                    text.push_str(&format!(
                        "Device [{}]: {} command(s) captured, {status}\n",
                        host.host, host.completed
                    ));
                }
                text.push_str(&format!(
                    "{} succeeded, {} failed; output appended to {}",
                    report.succeeded(),
                    report.failed(),
                    report.output.display()
                ));
                text
            })?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => report_remote_error(json, &e),
    }
}

async fn fetch(
    config: &Config,
    json: bool,
    host: &str,
    source: &str,
    destination: &Path,
    ssh: &SshArgs,
) -> Result<ExitCode> {
    let credentials = credentials(config, ssh)?;
    let mut session = RemoteSession::ssh(session_options(config, ssh));

    if let Err(e) = session.connect(host, &credentials).await {
        return report_remote_error(json, &e);
    }
    match session.fetch_file(source, destination).await {
        Ok(bytes) => {
            let value = json!({
                "host": host,
                "source": source,
                "destination": destination,
                "bytes": bytes,
            });
            emit(json, &value, || {
                format!("Fetched {host}:{source} -> {} ({bytes} bytes)", destination.display())
            })?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => report_remote_error(json, &e),
    }
}

fn credentials(config: &Config, ssh: &SshArgs) -> Result<Credentials> {
    let username = ssh
        .username
        .clone()
        .or_else(|| config.ssh.username.clone())
        .context("SSH username required: pass --username or set [ssh] username")?;
    Ok(Credentials::new(username, ssh.password.clone()))
}

fn session_options(config: &Config, ssh: &SshArgs) -> SessionOptions {
    let mut options = config.session_options();
    if let Some(port) = ssh.port {
        options.port = port;
    }
    options
}

/// Print `value` as JSON or the text rendering.
fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

fn exit_code(error: Option<&ProbeError>) -> ExitCode {
    match error {
        None => ExitCode::SUCCESS,
        Some(e) if e.is_expected() => {
            tracing::warn!("{e}");
            ExitCode::FAILURE
        }
        Some(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn report_remote_error(json: bool, error: &RemoteError) -> Result<ExitCode> {
    if error.is_fatal() {
        tracing::error!("Aborting: {error}");
    }
    emit(json, &json!({ "error": error }), || error.to_string())?;
    Ok(ExitCode::FAILURE)
}
