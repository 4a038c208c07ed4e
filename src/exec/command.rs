// src/exec/command.rs

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::task::TaskSpec;

/// Build the child command for a validated task.
///
/// - `useShell`: `<shell> -c "<tokens joined by a space>"`. Tokens carry no
///   quotes, so whitespace runs inside a quoted word collapse when the shell
///   re-splits the joined line.
/// - otherwise the first token is the program and the rest its arguments.
///
/// The child inherits the ambient environment with the task's `env` layered
/// on top, gets a null stdin and piped stdout/stderr, and is killed if the
/// handle is dropped.
pub fn build_command(spec: &TaskSpec) -> Command {
    let options = &spec.options;

    let mut cmd = if options.use_shell {
        let mut c = Command::new(&options.shell);
        c.arg("-c").arg(spec.cmd_line.join(" "));
        c
    } else {
        let mut c = Command::new(program_path(spec.program(), options.use_path));
        c.args(spec.args());
        c
    };

    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }
    cmd.envs(&options.env);

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    cmd
}

/// Program path to execute.
///
/// Without `usePath`, a bare name is anchored to the working directory so it
/// is never looked up in `PATH`.
pub fn program_path(program: &str, use_path: bool) -> PathBuf {
    let path = Path::new(program);
    let is_bare = !program.is_empty() && !path.is_absolute() && path.components().count() == 1;
    if use_path || !is_bare {
        PathBuf::from(program)
    } else {
        Path::new(".").join(program)
    }
}

/// Human-readable rendering of what will be run, for logs.
pub fn describe(spec: &TaskSpec) -> String {
    if spec.options.use_shell {
        format!("{} -c {:?}", spec.options.shell, spec.cmd_line.join(" "))
    } else {
        format!("{:?}", spec.cmd_line)
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;
    use crate::task::TaskOptions;

    fn spec(cmd_line: &[&str], options: TaskOptions) -> TaskSpec {
        TaskSpec {
            cmd_line: cmd_line.iter().map(|s| s.to_string()).collect(),
            options,
        }
    }

    #[test]
    fn direct_command_uses_argv() {
        let cmd = build_command(&spec(&["echo", "a b"], TaskOptions::default()));
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), OsStr::new("echo"));
        assert_eq!(std_cmd.get_args().collect::<Vec<_>>(), vec![OsStr::new("a b")]);
    }

    #[test]
    fn shell_command_joins_tokens() {
        let options = TaskOptions {
            use_shell: true,
            shell: "/bin/bash".into(),
            ..TaskOptions::default()
        };
        let cmd = build_command(&spec(&["echo", "\"x y\"", "|", "wc"], options));
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), OsStr::new("/bin/bash"));
        assert_eq!(
            std_cmd.get_args().collect::<Vec<_>>(),
            vec![OsStr::new("-c"), OsStr::new("echo \"x y\" | wc")]
        );
    }

    #[test]
    fn env_and_cwd_are_applied() {
        let mut options = TaskOptions {
            cwd: Some("/tmp".into()),
            ..TaskOptions::default()
        };
        options.env.insert("GREETING".into(), "hi".into());

        let cmd = build_command(&spec(&["env"], options));
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_current_dir(), Some(Path::new("/tmp")));
        assert!(
            std_cmd
                .get_envs()
                .any(|(k, v)| k == "GREETING" && v == Some(OsStr::new("hi")))
        );
    }

    #[test]
    fn bare_names_skip_path_lookup_when_disabled() {
        assert_eq!(program_path("tool", true), PathBuf::from("tool"));
        assert_eq!(program_path("tool", false), PathBuf::from("./tool"));
        assert_eq!(program_path("bin/tool", false), PathBuf::from("bin/tool"));
        assert_eq!(program_path("/usr/bin/env", false), PathBuf::from("/usr/bin/env"));
    }
}
