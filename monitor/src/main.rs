use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::warn;
use lotcore::{HttpBackend, Session, SubmitMode};
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::MonitorConfig;
use workflow::report::append_report;
use workflow::runner::Runner;

mod workflow;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    /// Backend only acknowledges the upload
    Acknowledge,
    /// Backend returns the full occupancy result
    ImmediateResult,
}

impl From<ModeArg> for SubmitMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Acknowledge => SubmitMode::Acknowledge,
            ModeArg::ImmediateResult => SubmitMode::ImmediateResult,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about = "Headless parking lot occupancy monitor")]
struct Args {
    /// Load monitor settings from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Analysis backend base URL
    #[arg(long)]
    server: Option<String>,
    /// Video or image to submit for analysis
    #[arg(long)]
    file: Option<PathBuf>,
    /// Declared MIME type of the file (otherwise inferred from its extension)
    #[arg(long)]
    mime: Option<String>,
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    #[arg(long)]
    interval_ms: Option<u64>,
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Stop after this many seconds instead of waiting for Ctrl+C
    #[arg(long)]
    run_secs: Option<u64>,
    /// Append a JSON run summary to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<MonitorConfig> {
        let mut config = match &self.config {
            Some(path) => MonitorConfig::load(path)?,
            None => MonitorConfig::default(),
        };
        if let Some(server) = self.server {
            config.client.base_url = server;
        }
        if let Some(mode) = self.mode {
            config.client.submit_mode = mode.into();
        }
        if let Some(interval) = self.interval_ms {
            config.client.poll_interval_ms = interval;
        }
        if let Some(timeout) = self.timeout_ms {
            config.client.request_timeout_ms = timeout;
        }
        config.media = self.file.or(config.media);
        config.mime = self.mime.or(config.mime);
        config.run_secs = self.run_secs.or(config.run_secs);
        config.report = self.report.or(config.report);
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Args::parse().into_config()?;

    let backend = HttpBackend::new(config.client.clone()).context("building HTTP client")?;
    let session = Session::new(config.client.clone(), backend);
    let runner = Runner::new(config.clone());

    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating runtime for the monitor")?;
    let summary = runtime.block_on(runner.execute(&session, async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("cannot listen for Ctrl+C ({err}); waiting for the run limit");
            std::future::pending::<()>().await;
        }
    }))?;

    println!(
        "Session ended -> {} updates, {} polls applied, {} failed",
        summary.updates, summary.metrics.polls_applied, summary.metrics.polls_failed
    );
    if let Some(path) = &config.report {
        append_report(path, &summary)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "lotmonitor",
            "--server",
            "http://lot.local:9000",
            "--file",
            "lot.mp4",
            "--mode",
            "immediate-result",
            "--interval-ms",
            "250",
        ]);
        let config = args.into_config().unwrap();
        assert_eq!(config.client.base_url, "http://lot.local:9000");
        assert_eq!(config.client.submit_mode, SubmitMode::ImmediateResult);
        assert_eq!(config.client.poll_interval_ms, 250);
        assert_eq!(config.client.request_timeout_ms, 5000);
        assert_eq!(config.media, Some(PathBuf::from("lot.mp4")));
        assert!(config.run_secs.is_none());
    }
}
