//! Batch command dispatch across a device list.

use std::path::Path;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::interrupt::Interrupt;
use super::session::RemoteSession;
use crate::adapters::SshTransport;
use crate::error::{RemoteError, RemoteResult};
use crate::traits::Transport;
use crate::types::{Credentials, DispatchReport, HostOutcome, Job, SessionOptions, Transcript};

/// Runs a [`Job`] host by host and appends every transcript to the job file.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    credentials: Credentials,
    options: SessionOptions,
    interrupt: Option<Interrupt>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Credentials,
        options: SessionOptions,
    ) -> Self {
        Self {
            transport,
            credentials,
            options,
            interrupt: None,
        }
    }

    /// Share `interrupt` with every session instead of listening for Ctrl-C.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Dispatcher over the production SSH transport.
    pub fn ssh(credentials: Credentials, options: SessionOptions) -> Self {
        Self::new(Arc::new(SshTransport::new()), credentials, options)
    }

    /// Run `job` against every host in its device list, sequentially.
    ///
    /// Each host gets one `Device [<host>]:` block in the output file with
    /// its transcript and, if it failed, the error text. A failing host does
    /// not stop the batch unless the error [`is_fatal`](RemoteError::is_fatal),
    /// in which case the block is still written and the error returned.
    ///
    /// # Errors
    /// * `DeviceList` - the device list cannot be read; nothing is written
    /// * `Output` - the job file cannot be opened or written
    /// * any fatal per-host error
    pub async fn dispatch(&self, job: &Job) -> RemoteResult<DispatchReport> {
        info!("[DISPATCH] {}", job.summary());
        let hosts = read_device_list(&job.device_list).await?;
        info!("[DISPATCH] {} device(s) loaded", hosts.len());

        let mut file = open_output(&job.output).await?;
        let mut report = DispatchReport::new(&job.output);
        let interrupt = self.listen();

        for host in hosts {
            let mut transcript = Transcript::new();
            let result = self
                .run_host(&host, &job.commands, interrupt.as_ref(), &mut transcript)
                .await;

            let error = result.err();
            match &error {
                Some(e) if e.is_fatal() => error!("[DISPATCH] {host}: {e}"),
                Some(e) => warn!("[DISPATCH] {host}: {e}"),
                None => info!("[DISPATCH] {host}: {} command(s) captured", transcript.len()),
            }

            let block = render_host_block(&host, &transcript, error.as_ref());
            write_output(&mut file, &job.output, &block).await?;

            let fatal = error.clone().filter(RemoteError::is_fatal);
            report.hosts.push(HostOutcome {
                host,
                completed: transcript.len(),
                error,
            });
            if let Some(e) = fatal {
                flush_output(&mut file, &job.output).await?;
                return Err(e);
            }
        }

        flush_output(&mut file, &job.output).await?;
        info!(
            "[DISPATCH] Done: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        Ok(report)
    }

    async fn run_host(
        &self,
        host: &str,
        commands: &[String],
        interrupt: Option<&Interrupt>,
        transcript: &mut Transcript,
    ) -> RemoteResult<usize> {
        let mut session = RemoteSession::new(Arc::clone(&self.transport), self.options.clone());
        if let Some(interrupt) = interrupt {
            session = session.with_interrupt(interrupt.clone());
        }
        session.connect(host, &self.credentials).await?;
        session.run_commands(commands, transcript).await
    }

    /// One interrupt for the whole run, so Ctrl-C between hosts is not lost.
    fn listen(&self) -> Option<Interrupt> {
        if self.interrupt.is_some() || !self.options.cancel_on_interrupt {
            return self.interrupt.clone();
        }
        match Interrupt::ctrl_c() {
            Ok(interrupt) => Some(interrupt),
            Err(e) => {
                warn!("[DISPATCH] Cannot listen for Ctrl-C: {e}");
                None
            }
        }
    }
}

/// Trimmed, non-blank lines of the device list.
async fn read_device_list(path: &Path) -> RemoteResult<Vec<String>> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        error!("[DISPATCH] Cannot read device list {}: {e}", path.display());
        RemoteError::DeviceList {
            path: path.display().to_string(),
            message: e.to_string(),
        }
    })?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn render_host_block(host: &str, transcript: &Transcript, error: Option<&RemoteError>) -> String {
    let mut block = format!("\nDevice [{host}]:\n");
    for entry in transcript {
        block.push_str(&entry.render());
    }
    if let Some(e) = error {
        block.push_str(&e.to_string());
        block.push('\n');
    }
    block
}

async fn open_output(path: &Path) -> RemoteResult<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| output_error(path, &e))
}

async fn write_output(file: &mut File, path: &Path, text: &str) -> RemoteResult<()> {
    file.write_all(text.as_bytes())
        .await
        .map_err(|e| output_error(path, &e))
}

async fn flush_output(file: &mut File, path: &Path) -> RemoteResult<()> {
    file.flush().await.map_err(|e| output_error(path, &e))
}

fn output_error(path: &Path, err: &std::io::Error) -> RemoteError {
    RemoteError::Output {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_mocks::{HostScript, MockTransport};

    fn dispatcher(transport: &Arc<MockTransport>) -> Dispatcher {
        Dispatcher::new(
            transport.clone(),
            Credentials::new("rafael", "secret"),
            SessionOptions {
                command_interval: Duration::ZERO,
                cancel_on_interrupt: false,
                ..SessionOptions::default()
            },
        )
    }

    fn write_devices(dir: &Path, contents: &str) -> std::path::PathBuf {
        let path = dir.join("devices.txt");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_reachable_and_unreachable_host() {
        let dir = tempfile::tempdir().unwrap();
        let devices = write_devices(dir.path(), "r1\n  r2  \n\n");
        let output = dir.path().join("job.txt");
        let transport = Arc::new(MockTransport::new().with_host("r1", HostScript::echo()));

        let job = Job::new(&devices, ["show version", "show clock"], &output);
        let report = dispatcher(&transport).dispatch(&job).await.unwrap();

        assert_eq!(report.hosts.len(), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.hosts[0].completed, 2);
        assert_eq!(report.hosts[1].host, "r2");
        assert!(matches!(
            report.hosts[1].error,
            Some(RemoteError::ConnectionFailed { .. })
        ));

        let text = std::fs::read_to_string(&output).unwrap();
        assert_eq!(text.matches("Device [").count(), 2);
        assert!(text.starts_with("\nDevice [r1]:\nDATE/TIME: "));
        assert!(text.contains(" CLI: show version\nr1: show version\n"));
        assert!(text.contains(" CLI: show clock\nr1: show clock\n"));
        assert!(text.ends_with("\nDevice [r2]:\nConnection to r2 failed: No route to host\n"));
    }

    #[tokio::test]
    async fn test_blocks_follow_device_order() {
        let dir = tempfile::tempdir().unwrap();
        let devices = write_devices(dir.path(), "r2\nr1\n");
        let output = dir.path().join("job.txt");
        let transport = Arc::new(
            MockTransport::new()
                .with_host("r1", HostScript::echo())
                .with_host("r2", HostScript::refused()),
        );

        let job = Job::new(&devices, ["whoami"], &output);
        dispatcher(&transport).dispatch(&job).await.unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        let r2 = text.find("Device [r2]:").unwrap();
        let r1 = text.find("Device [r1]:").unwrap();
        assert!(r2 < r1);
        assert!(text.contains("Device [r2]:\nConnection refused on r2.\n"));
    }

    #[tokio::test]
    async fn test_output_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let devices = write_devices(dir.path(), "r1\n");
        let output = dir.path().join("job.txt");
        std::fs::write(&output, "previous run\n").unwrap();
        let transport = Arc::new(MockTransport::new().with_host("r1", HostScript::echo()));

        let job = Job::new(&devices, ["whoami"], &output);
        dispatcher(&transport).dispatch(&job).await.unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.starts_with("previous run\n\nDevice [r1]:\n"));
    }

    #[tokio::test]
    async fn test_command_failure_keeps_partial_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let devices = write_devices(dir.path(), "r1\nr2\n");
        let output = dir.path().join("job.txt");
        let transport = Arc::new(
            MockTransport::new()
                .with_host("r1", HostScript::echo().failing_on("reload"))
                .with_host("r2", HostScript::echo()),
        );

        let job = Job::new(&devices, ["show version", "reload", "show clock"], &output);
        let report = dispatcher(&transport).dispatch(&job).await.unwrap();

        assert_eq!(report.hosts[0].completed, 1);
        assert!(report.hosts[0].error.is_some());
        assert_eq!(report.hosts[1].completed, 3);
        assert_eq!(transport.closed("r1"), 1);
    }

    #[tokio::test]
    async fn test_fatal_auth_failure_aborts_batch() {
        let dir = tempfile::tempdir().unwrap();
        let devices = write_devices(dir.path(), "r1\nr2\nr3\n");
        let output = dir.path().join("job.txt");
        let transport = Arc::new(
            MockTransport::new()
                .with_host("r1", HostScript::echo())
                .with_host("r2", HostScript::bad_auth())
                .with_host("r3", HostScript::echo()),
        );

        let job = Job::new(&devices, ["whoami"], &output);
        let err = dispatcher(&transport).dispatch(&job).await.unwrap_err();

        assert_eq!(err, RemoteError::AuthenticationFailed("r2".to_string()));
        assert_eq!(transport.connects("r3"), 0);
        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.ends_with("Device [r2]:\nAuthentication failed on r2.\n"));
        assert!(!text.contains("Device [r3]"));
    }

    #[tokio::test]
    async fn test_missing_device_list_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("job.txt");
        let transport = Arc::new(MockTransport::new());

        let job = Job::new(dir.path().join("missing.txt"), ["whoami"], &output);
        let err = dispatcher(&transport).dispatch(&job).await.unwrap_err();

        assert!(matches!(err, RemoteError::DeviceList { .. }));
        assert!(!err.is_fatal());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_empty_device_list() {
        let dir = tempfile::tempdir().unwrap();
        let devices = write_devices(dir.path(), "\n   \n");
        let output = dir.path().join("job.txt");
        let transport = Arc::new(MockTransport::new());

        let job = Job::new(&devices, ["whoami"], &output);
        let report = dispatcher(&transport).dispatch(&job).await.unwrap();

        assert!(report.hosts.is_empty());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "");
    }

    #[tokio::test]
    async fn test_interrupt_stops_batch_after_current_host() {
        let dir = tempfile::tempdir().unwrap();
        let devices = write_devices(dir.path(), "r1\nr2\n");
        let output = dir.path().join("job.txt");
        let transport = Arc::new(
            MockTransport::new()
                .with_host("r1", HostScript::echo().hanging_on("show tech"))
                .with_host("r2", HostScript::echo()),
        );
        let interrupt = Interrupt::new();
        let trigger = interrupt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.trigger();
        });

        let job = Job::new(&devices, ["show version", "show tech"], &output);
        let err = tokio::time::timeout(
            Duration::from_secs(5),
            dispatcher(&transport).with_interrupt(interrupt).dispatch(&job),
        )
        .await
        .unwrap()
        .unwrap_err();

        assert_eq!(err, RemoteError::Cancelled("r1".to_string()));
        assert_eq!(transport.connects("r2"), 0);
        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains(" CLI: show version\nr1: show version\n"));
        assert!(text.ends_with("Interrupted on r1\n"));
        assert!(!text.contains("Device [r2]"));
    }
}
