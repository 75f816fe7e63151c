use log::{debug, error, info};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::config::Config;
use crate::error::{Error, Result};

/// Suffix exiftool gives the untouched copy it keeps after writing
pub const ORIGINAL_SUFFIX: &str = "_original";

/// Path of the pre-write backup the tagging utility leaves next to `path`
pub fn original_backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(ORIGINAL_SUFFIX);
    PathBuf::from(name)
}

/// Reads and writes the keyword metadata of an image
pub trait MetadataTool {
    /// Whether the file already carries keywords
    fn already_tagged(&self, path: &Path) -> Result<bool>;

    /// Set the keywords; `Ok(false)` when the tool reported failure.
    ///
    /// On success the tool leaves the previous file at [`original_backup_path`].
    fn write_tags(&self, path: &Path, tags: &str) -> Result<bool>;
}

/// The exiftool command-line utility
pub struct ExifTool {
    program: PathBuf,
    field: String,
}

impl ExifTool {
    pub fn new(program: impl Into<PathBuf>, field: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            field: field.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.exiftool_path, &config.keyword_field)
    }

    fn run(&self, path: &Path, mut command: Command) -> Result<Output> {
        let program = command.get_program().to_string_lossy().into_owned();
        let args: Vec<_> = command
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        debug!("exiftool command: {} {}", program, args.join(" "));

        command.output().map_err(|e| {
            error!("Failed to execute {}: {}", program, e);
            Error::Tool {
                path: path.to_path_buf(),
                message: format!("failed to execute {}: {}", program, e),
            }
        })
    }
}

impl MetadataTool for ExifTool {
    fn already_tagged(&self, path: &Path) -> Result<bool> {
        let mut command = Command::new(&self.program);
        command.arg(format!("-{}", self.field)).arg(path);

        let output = self.run(path, command)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        // Anything on stderr means we can't tell "no tags" from a broken read
        if !stderr.trim().is_empty() {
            return Err(Error::Tool {
                path: path.to_path_buf(),
                message: stderr.trim().to_string(),
            });
        }

        Ok(!stdout.trim().is_empty())
    }

    fn write_tags(&self, path: &Path, tags: &str) -> Result<bool> {
        info!("Attempting to tag {}", path.display());

        let mut command = Command::new(&self.program);
        command.arg(format!("-{}={}", self.field, tags)).arg(path);

        let output = self.run(path, command)?;
        if output.status.success() {
            Ok(true)
        } else {
            error!(
                "exiftool failed: status={}, stderr={}, stdout={}",
                output.status,
                String::from_utf8_lossy(&output.stderr),
                String::from_utf8_lossy(&output.stdout)
            );
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_backup_path() {
        assert_eq!(
            original_backup_path(Path::new("/img/0123456789abcdef0123456789abcdef.jpg")),
            PathBuf::from("/img/0123456789abcdef0123456789abcdef.jpg_original")
        );
    }

    #[test]
    fn test_missing_program_is_tool_error() {
        let tool = ExifTool::new("/nonexistent/exiftool-binary", "XPKeywords");
        let path = Path::new("/tmp/0123456789abcdef0123456789abcdef.jpg");

        assert!(matches!(tool.already_tagged(path), Err(Error::Tool { .. })));
        assert!(matches!(tool.write_tags(path, "solo"), Err(Error::Tool { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_stderr_output_is_an_error() {
        // `cat` rejects the keyword flag as an unknown option on stderr
        let tool = ExifTool::new("cat", "XPKeywords");
        let result = tool.already_tagged(Path::new("/nonexistent/image.jpg"));
        assert!(matches!(result, Err(Error::Tool { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_means_tagged_and_exit_status_decides_write() {
        let image = Path::new("/tmp/0123456789abcdef0123456789abcdef.jpg");

        // `echo` prints its arguments and exits zero
        let echo = ExifTool::new("echo", "XPKeywords");
        assert!(echo.already_tagged(image).unwrap());
        assert!(echo.write_tags(image, "solo").unwrap());

        let failing = ExifTool::new("false", "XPKeywords");
        assert!(!failing.write_tags(image, "solo").unwrap());
    }
}
