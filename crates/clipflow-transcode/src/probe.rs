//! Source resolution probing via ffprobe.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::JobError;

/// Read the first video stream's dimensions.
pub async fn probe_resolution(ffprobe_path: &str, input: &Path) -> Result<(u32, u32), JobError> {
    let output = Command::new(ffprobe_path)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=p=0",
        ])
        .arg(input)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| JobError::Probe(format!("failed to run {}: {}", ffprobe_path, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(JobError::Probe(format!(
            "ffprobe exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_probe_output(&stdout)
}

/// Parse `width,height` from ffprobe's csv output.
fn parse_probe_output(output: &str) -> Result<(u32, u32), JobError> {
    let line = output
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| JobError::Probe("empty ffprobe output".to_string()))?;

    let mut parts = line.trim().trim_end_matches(',').split(',');
    let width = parts
        .next()
        .and_then(|w| w.trim().parse::<u32>().ok())
        .ok_or_else(|| JobError::Probe(format!("unparsable ffprobe output: {:?}", line)))?;
    let height = parts
        .next()
        .and_then(|h| h.trim().parse::<u32>().ok())
        .ok_or_else(|| JobError::Probe(format!("unparsable ffprobe output: {:?}", line)))?;

    if width == 0 || height == 0 {
        return Err(JobError::Probe(format!(
            "degenerate resolution {}x{}",
            width, height
        )));
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_csv() {
        assert_eq!(parse_probe_output("1920,1080\n").unwrap(), (1920, 1080));
    }

    #[test]
    fn tolerates_trailing_comma() {
        // Some ffprobe builds emit a trailing comma in csv mode.
        assert_eq!(parse_probe_output("1280,720,\n").unwrap(), (1280, 720));
    }

    #[test]
    fn rejects_empty_output() {
        assert!(parse_probe_output("").is_err());
        assert!(parse_probe_output("\n\n").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_probe_output("N/A,N/A").is_err());
        assert!(parse_probe_output("widthxheight").is_err());
    }

    #[test]
    fn rejects_zero_dimensions() {
        assert!(parse_probe_output("0,720").is_err());
    }
}
