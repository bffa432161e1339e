use motion_snap_common::config::Resolution;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Output target that makes capture programs write the image to stdout.
const STDOUT_TARGET: &str = "-";

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to spawn {0}: {1}")]
    Spawn(String, std::io::Error),
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("camera returned no image data")]
    Empty,
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("failed to write {0}: {1}")]
    Write(String, std::io::Error),
}

/// A still-image capture device.
pub trait Camera {
    /// Capture one still at `res` and return the encoded image bytes.
    async fn capture(&self, res: Resolution) -> Result<Vec<u8>, CaptureError>;

    /// Capture one still at `res` straight into `path`.
    async fn capture_to_file(&self, res: Resolution, path: &Path) -> Result<(), CaptureError> {
        let data = self.capture(res).await?;
        tokio::fs::write(path, &data)
            .await
            .map_err(|e| CaptureError::Write(path.display().to_string(), e))
    }
}

/// Runs an external still-capture program (fswebcam, libcamera-still, ...)
/// once per frame.
pub struct CommandCamera {
    program: String,
    args: Vec<String>,
}

impl CommandCamera {
    pub fn new(program: String, args: Vec<String>) -> Self {
        Self { program, args }
    }

    fn expand_args(&self, res: Resolution, output: &str) -> Vec<String> {
        let width = res.width.to_string();
        let height = res.height.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{width}", &width)
                    .replace("{height}", &height)
                    .replace("{output}", output)
            })
            .collect()
    }

    async fn run(&self, res: Resolution, output: &str) -> Result<Vec<u8>, CaptureError> {
        let args = self.expand_args(res, output);
        debug!(program = self.program, ?args, "running capture command");

        let out = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| CaptureError::Spawn(self.program.clone(), e))?;

        if !out.status.success() {
            return Err(CaptureError::Failed {
                program: self.program.clone(),
                status: out.status.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }

        Ok(out.stdout)
    }
}

impl Camera for CommandCamera {
    async fn capture(&self, res: Resolution) -> Result<Vec<u8>, CaptureError> {
        let data = self.run(res, STDOUT_TARGET).await?;
        if data.is_empty() {
            return Err(CaptureError::Empty);
        }
        Ok(data)
    }

    async fn capture_to_file(&self, res: Resolution, path: &Path) -> Result<(), CaptureError> {
        self.run(res, &path.to_string_lossy()).await?;
        Ok(())
    }
}

/// Fetches stills from an HTTP endpoint, passing the wanted resolution as
/// `width`/`height` query parameters.
pub struct HttpCamera {
    client: reqwest::Client,
    url: String,
}

impl HttpCamera {
    pub fn new(url: String) -> Result<Self, CaptureError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(CaptureError::Http)?;
        Ok(Self { client, url })
    }
}

impl Camera for HttpCamera {
    async fn capture(&self, res: Resolution) -> Result<Vec<u8>, CaptureError> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[("width", res.width), ("height", res.height)])
            .send()
            .await
            .map_err(CaptureError::Http)?;

        if !resp.status().is_success() {
            return Err(CaptureError::HttpStatus(resp.status().as_u16()));
        }

        let data = resp.bytes().await.map_err(CaptureError::Http)?;
        if data.is_empty() {
            return Err(CaptureError::Empty);
        }
        debug!(url = self.url, bytes = data.len(), "fetched frame");
        Ok(data.to_vec())
    }
}
