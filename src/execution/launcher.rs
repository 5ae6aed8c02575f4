//! Process Launching
//!
//! Steps never build OS commands directly. They ask a [`ProcessLauncher`]
//! for a command, then apply their own working directory, stdio and kill
//! policy before spawning it. Swapping the launcher lets tests stand in
//! fake tools for `go`, `gofmt`, `git` and friends.

use std::fmt;
use std::sync::Arc;

use tokio::process::Command;

/// Builds the command used to run a step's executable.
pub trait ProcessLauncher: Send + Sync + fmt::Debug {
    fn command(&self, program: &str, args: &[String]) -> Command;
}

/// Launches the real executable found on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn command(&self, program: &str, args: &[String]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd
    }
}

/// Shared handle to a launcher, defaulting to [`SystemLauncher`].
pub fn system_launcher() -> Arc<dyn ProcessLauncher> {
    Arc::new(SystemLauncher)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::*;

    /// Runs a shell script in place of each named executable.
    ///
    /// The script sees the step's arguments as `"$@"` and the program name
    /// as `$0`. Unknown executables exit 1.
    #[derive(Debug, Default)]
    pub struct ScriptLauncher {
        scripts: HashMap<String, String>,
    }

    impl ScriptLauncher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_script(mut self, program: &str, script: &str) -> Self {
            self.scripts.insert(program.to_string(), script.to_string());
            self
        }

        pub fn shared(self) -> Arc<dyn ProcessLauncher> {
            Arc::new(self)
        }
    }

    impl ProcessLauncher for ScriptLauncher {
        fn command(&self, program: &str, args: &[String]) -> Command {
            let script = self
                .scripts
                .get(program)
                .map(String::as_str)
                .unwrap_or("exit 1");
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(script).arg(program).args(args);
            cmd
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptLauncher;
    use super::*;

    #[tokio::test]
    async fn test_system_launcher_passes_arguments() {
        let output = SystemLauncher
            .command("echo", &["hello".to_string(), "world".to_string()])
            .output()
            .await
            .unwrap();

        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout), "hello world\n");
    }

    #[tokio::test]
    async fn test_script_launcher_substitutes_program() {
        let launcher = ScriptLauncher::new().with_script("go", "echo faked");
        let output = launcher.command("go", &[]).output().await.unwrap();

        assert_eq!(String::from_utf8_lossy(&output.stdout), "faked\n");
    }

    #[tokio::test]
    async fn test_script_launcher_passes_arguments() {
        let launcher = ScriptLauncher::new().with_script("git", "echo \"$0 $*\"");
        let args = vec!["push".to_string(), "origin".to_string(), "main".to_string()];
        let output = launcher.command("git", &args).output().await.unwrap();

        assert_eq!(String::from_utf8_lossy(&output.stdout), "git push origin main\n");
    }

    #[tokio::test]
    async fn test_script_launcher_unknown_program_fails() {
        let launcher = ScriptLauncher::new();
        let status = launcher.command("gofmt", &[]).status().await.unwrap();

        assert!(!status.success());
    }
}
