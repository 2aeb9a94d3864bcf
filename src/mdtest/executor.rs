use std::path::Path;

use crate::{MDError, MDResult};

/// Captured output of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs an external program to completion.
pub trait Executor {
    fn exec(&self, program: &Path, args: &[String]) -> MDResult<ExecOutput>;
}

/// Spawns the program as a child process and waits for it.
///
/// A non-zero exit status is reported as [`MDError::Exec`] carrying the
/// tail of standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    fn exec(&self, program: &Path, args: &[String]) -> MDResult<ExecOutput> {
        let output = std::process::Command::new(program)
            .args(args)
            .output()
            .map_err(|e| MDError::exec(format!("fail to launch {}: {e}", program.display())))?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(MDError::exec(format!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(ExecOutput { stdout, stderr })
    }
}

#[cfg(all(test, unix))]
mod test {
    use super::*;

    #[test]
    fn test_capture_stdout() {
        let out = ProcessExecutor
            .exec(Path::new("echo"), &["hello".to_string()])
            .unwrap();
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn test_spawn_failure() {
        let err = ProcessExecutor
            .exec(Path::new("/nonexistent/mpirun"), &[])
            .unwrap_err();
        assert!(matches!(err, MDError::Exec(_)));
    }

    #[test]
    fn test_non_zero_exit() {
        let err = ProcessExecutor.exec(Path::new("false"), &[]).unwrap_err();
        assert!(matches!(err, MDError::Exec(_)));
    }
}
