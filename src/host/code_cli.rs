use crate::backup::backup_config::RepairConfig;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::host::{ExtensionHost, HostInfo};
use bon::Builder;
use getset::Getters;
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static VERSION_TIMEOUT: Duration = Duration::from_secs(5);
static UNINSTALL_TIMEOUT: Duration = Duration::from_secs(30);
static INSTALL_TIMEOUT: Duration = Duration::from_secs(60);
static COMMAND_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[cfg(target_os = "macos")]
static PROCESS_PATTERN: &str = "Visual Studio Code";
#[cfg(not(target_os = "macos"))]
static PROCESS_PATTERN: &str = "code";

/// Drives the editor through its command line (`code --install-extension` ...)
#[derive(Clone, Debug, Builder, Getters)]
#[getset(get = "pub")]
pub struct CodeCli {
    #[builder(into)]
    command: String,
    #[builder(into)]
    extension_id: String,
    #[builder(into)]
    extensions_dir: PathBuf,
    /// Install is confirmed by polling for the extension directory
    #[builder(default = 5)]
    install_poll_attempts: u32,
    #[builder(default = Duration::from_secs(1))]
    install_poll_interval: Duration,
}

impl CodeCli {
    pub fn from_config(config: &RepairConfig) -> Self {
        Self::builder()
            .command(config.editor_command())
            .extension_id(config.extension_id())
            .extensions_dir(config.extensions_dir())
            .build()
    }

    /// Runs the editor command, killing it once `timeout` has passed
    fn run(&self, args: &[&str], timeout: Duration) -> Result<Output> {
        debug!("Running {} {}", self.command, args.join(" "));
        let mut child = Command::new(&self.command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    Error::HostNotFound(self.command.clone())
                } else {
                    Error::from(e)
                }
            })?;

        // pipes must be drained while waiting or a full pipe blocks the child
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let start = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if start.elapsed() >= timeout {
                warn!(
                    "{} {} still running after {:?}, killing it",
                    self.command,
                    args.join(" "),
                    timeout
                );
                child.kill()?;
                child.wait()?;
                return Err(Error::ExternalCommand {
                    command: format!("{} {}", self.command, args.join(" ")),
                    detail: format!("timed out after {:?}", timeout),
                });
            }
            thread::sleep(COMMAND_POLL_INTERVAL);
        };

        Ok(Output {
            status,
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }

    fn command_error(&self, args: &[&str], output: &Output) -> Error {
        Error::ExternalCommand {
            command: format!("{} {}", self.command, args.join(" ")),
            detail: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        }
    }

    /// Installed copies of the extension, one directory per version
    fn extension_dirs(&self) -> Result<Vec<PathBuf>> {
        if !self.extensions_dir.exists() {
            return Ok(vec![]);
        }
        let mut dirs = vec![];
        for entry in fs::read_dir(&self.extensions_dir)? {
            let entry = entry?;
            let is_extension = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(self.extension_id.as_str()));
            if is_extension && entry.file_type()?.is_dir() {
                dirs.push(entry.path());
            }
        }
        Ok(dirs)
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = vec![];
        if let Err(e) = reader.read_to_end(&mut buf) {
            debug!("Reading command output failed: {e}");
        }
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

impl ExtensionHost for CodeCli {
    fn detect(&self) -> Result<HostInfo> {
        let output = self.run(&["--version"], VERSION_TIMEOUT)?;
        if !output.status.success() {
            return Err(Error::HostNotFound(self.command.clone()));
        }
        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        info!("Editor command found, version {:?}", version);
        Ok(HostInfo { version })
    }

    fn running_processes(&self) -> Result<usize> {
        let output = match Command::new("pgrep").args(["-f", PROCESS_PATTERN]).output() {
            Ok(output) => output,
            Err(e) => {
                debug!("pgrep unavailable, assuming editor is closed: {e}");
                return Ok(0);
            }
        };
        if !output.status.success() {
            return Ok(0);
        }
        let own_pid = std::process::id().to_string();
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|pid| !pid.is_empty() && *pid != own_pid)
            .count())
    }

    fn uninstall(&self) -> Result<()> {
        let args = ["--uninstall-extension", self.extension_id.as_str()];
        let output = self.run(&args, UNINSTALL_TIMEOUT)?;
        if !output.status.success() {
            warn!("{}", self.command_error(&args, &output));
        }

        for dir in self.extension_dirs()? {
            info!("Removing leftover extension dir {:?}", dir);
            fs::remove_dir_all(&dir)
                .map_err(Error::from)
                .with_msg(format!("Removing {:?} failed", dir))?;
        }
        Ok(())
    }

    fn install(&self) -> Result<()> {
        let args = ["--install-extension", self.extension_id.as_str()];
        let output = self.run(&args, INSTALL_TIMEOUT)?;
        if !output.status.success() {
            return Err(self.command_error(&args, &output));
        }

        for attempt in 1..=self.install_poll_attempts {
            if !self.extension_dirs()?.is_empty() {
                info!("Extension {} installed", self.extension_id);
                return Ok(());
            }
            debug!("Extension dir not there yet, attempt {attempt}");
            thread::sleep(self.install_poll_interval);
        }
        Err(Error::ExternalCommand {
            command: format!("{} {}", self.command, args.join(" ")),
            detail: format!("no {}* directory in {:?}", self.extension_id, self.extensions_dir),
        })
    }
}
