//! Drives the target process. Every fuzz-case gets a fresh process, the input is written to its
//! stdin, and its combined stdout/stderr is captured. The first non-zero exit code ends the run

use crate::{
    Statistics,
    configurables::WORKING_DIR,
    error::{ExecutionError, TargetFailure, UsageError},
    mutator::{InputBatch, TestCase},
    pretty_printing::{dbg_log, print_execution_error, LogType},
};

use core::fmt;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{ChildStdin, Command, ExitStatus, Stdio};
use std::thread;

/// How the target command is launched
#[derive(Copy, Debug, Clone, Eq, PartialEq)]
pub enum LaunchMode {
    /// Hand the command string to the system shell (`sh -c` or `cmd.exe /c`). Shell
    /// metacharacters in the command are interpreted
    Shell,

    /// Execute the command path directly with an explicit argument vector
    Direct,
}

/// Fixed description of the target that is used to spawn a process for every fuzz-case
#[derive(Debug, Clone)]
pub struct TargetCommand {
    pub mode:        LaunchMode,
    pub program:     String,
    pub args:        Vec<String>,
    pub working_dir: PathBuf,

    /// Command line handed to the shell, target arguments are quoted so they reach the target as
    /// the same words they would in `Direct` mode
    shell_line:      String,
}

/// Exit code and combined output of one execution
#[derive(Debug, Clone)]
pub struct CaseResult {
    pub exit_code: i32,
    pub output:    String,
}

impl TargetCommand {
    /// Fails if one of the target arguments cannot be quoted for the shell (eg. contains a NUL)
    pub fn new(program: String, args: Vec<String>, mode: LaunchMode) -> Result<Self, UsageError> {
        let mut shell_line = program.clone();
        if !args.is_empty() {
            let quoted = shlex::try_join(args.iter().map(String::as_str))
                .map_err(|err| UsageError::TargetArgs(err.to_string()))?;
            shell_line.push(' ');
            shell_line.push_str(&quoted);
        }

        Ok(TargetCommand {
            mode,
            program,
            args,
            working_dir: PathBuf::from(WORKING_DIR),
            shell_line,
        })
    }

    /// Path used to execute the target in `Direct` mode. Bare names are resolved against the
    /// working directory instead of being looked up in `PATH`
    fn program_path(&self) -> String {
        let path = Path::new(&self.program);
        if path.is_relative() && path.parent() == Some(Path::new("")) {
            self.working_dir.join(path).to_string_lossy().into_owned()
        } else {
            self.program.clone()
        }
    }

    /// Full argument vector used to start the target, including the program itself
    pub fn argv(&self) -> Vec<String> {
        match self.mode {
            LaunchMode::Shell => {
                if cfg!(windows) {
                    vec!["cmd.exe".to_string(), "/c".to_string(), self.shell_line.clone()]
                } else {
                    vec!["sh".to_string(), "-c".to_string(), self.shell_line.clone()]
                }
            },
            LaunchMode::Direct => {
                std::iter::once(self.program_path()).chain(self.args.iter().cloned()).collect()
            },
        }
    }

    fn build(&self) -> Command {
        let argv = self.argv();
        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]).current_dir(&self.working_dir);
        cmd
    }

    /// Run the target once with `input` on stdin and wait for it to exit
    pub fn run_case(&self, input: &str) -> Result<CaseResult, ExecutionError> {
        // stdout and stderr share the write end of a single pipe so their output is interleaved
        // in the order the target produced it
        let (mut reader, writer) = io::pipe().map_err(ExecutionError::Pipe)?;
        let writer_err = writer.try_clone().map_err(ExecutionError::Pipe)?;

        let mut cmd = self.build();
        cmd.stdin(Stdio::piped()).stdout(writer).stderr(writer_err);

        let mut child = cmd.spawn().map_err(|source| ExecutionError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        // The command still holds our copies of the write end, reading would never hit EOF
        drop(cmd);

        let stdin = child.stdin.take();
        let mut output = Vec::new();

        // Feed stdin from a helper thread while draining the output here, a target that writes
        // more than a pipe-buffer worth before reading its input would otherwise deadlock us
        let (write_res, read_res) = thread::scope(|s| {
            let handle = s.spawn(move || write_input(stdin, input.as_bytes()));
            let read_res = reader.read_to_end(&mut output);
            (handle.join(), read_res)
        });

        // Always reap the child, even if feeding it failed
        let status = child.wait().map_err(ExecutionError::Wait)?;

        write_res.map_err(|_| ExecutionError::WriterPanicked)?
            .map_err(ExecutionError::WriteInput)?;
        read_res.map_err(ExecutionError::ReadOutput)?;

        Ok(CaseResult {
            exit_code: exit_code(status),
            output:    String::from_utf8_lossy(&output).into_owned(),
        })
    }
}

impl fmt::Display for TargetCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}]", self.argv().join(", "))
    }
}

/// Write the entire input and close stdin so the target sees EOF. A target that exits without
/// consuming all of its input closes the pipe on us, its exit code still decides the case
fn write_input(stdin: Option<ChildStdin>, data: &[u8]) -> io::Result<()> {
    let Some(mut stdin) = stdin else { return Ok(()) };

    match stdin.write_all(data).and_then(|_| stdin.flush()) {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        res => res,
    }
}

/// Numeric exit code of the target. Targets killed by a signal are reported as `128 + signal`
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }

    1
}

/// Run every case of `batch` against `target` in order. Execution errors are logged and skipped,
/// the first case that makes the target exit with a non-zero code is returned as a failure
pub fn run_campaign(target: &TargetCommand, batch: &InputBatch) -> Result<Statistics, TargetFailure> {
    let mut stats = Statistics::new(batch.rng_seed);

    for case in batch.cases() {
        stats.total_cases += 1;

        match target.run_case(case.input) {
            Ok(res) if res.exit_code == 0 => {
                dbg_log(LogType::Success, &format!("case {:3} ({}) exited cleanly",
                        case.index, case.kind));
            },
            Ok(res) => return Err(failure(case, res)),
            Err(err) => {
                stats.exec_errors += 1;
                print_execution_error(case.index, case.kind, &err);
            },
        }
    }

    Ok(stats)
}

fn failure(case: TestCase<'_>, res: CaseResult) -> TargetFailure {
    TargetFailure {
        index:     case.index,
        kind:      case.kind,
        input:     case.input.to_string(),
        output:    res.output,
        exit_code: res.exit_code,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::configurables::SEED_INPUT;
    use crate::mutator::MutationKind;

    fn shell(cmd: &str) -> TargetCommand {
        TargetCommand::new(cmd.to_string(), Vec::new(), LaunchMode::Shell).unwrap()
    }

    #[test]
    fn shell_argv_joins_target_args() {
        let target = TargetCommand::new("./t".into(), vec!["x".into(), "y".into()],
                                        LaunchMode::Shell).unwrap();
        assert_eq!(target.argv(), vec!["sh", "-c", "./t x y"]);
        assert_eq!(target.to_string(), "[sh, -c, ./t x y]");
    }

    #[test]
    fn shell_target_args_reach_target_as_single_words() {
        let target = TargetCommand::new("printf '%s\\n'".into(),
                                        vec!["a b".into(), "$(echo hi)".into()],
                                        LaunchMode::Shell).unwrap();
        let res = target.run_case("").unwrap();
        assert_eq!(res.exit_code, 0);
        assert_eq!(res.output, "a b\n$(echo hi)\n");
    }

    #[test]
    fn unquotable_target_arg_is_rejected() {
        let res = TargetCommand::new("./t".into(), vec!["a\0b".into()], LaunchMode::Shell);
        assert!(matches!(res, Err(UsageError::TargetArgs(_))));
    }

    #[test]
    fn direct_argv_keeps_arguments_separate() {
        let target = TargetCommand::new("./t".into(), vec!["a b".into()], LaunchMode::Direct)
            .unwrap();
        assert_eq!(target.argv(), vec!["./t", "a b"]);
    }

    #[test]
    fn direct_bare_name_is_not_looked_up_in_path() {
        let target = TargetCommand::new("sh".into(), Vec::new(), LaunchMode::Direct).unwrap();
        assert_eq!(target.argv(), vec!["./sh"]);

        let target = TargetCommand::new("/bin/sh".into(), Vec::new(), LaunchMode::Direct)
            .unwrap();
        assert_eq!(target.argv(), vec!["/bin/sh"]);
    }

    #[test]
    fn captures_stdin_echo_and_exit_code() {
        let res = shell("cat; exit 3").run_case("hello").unwrap();
        assert_eq!(res.exit_code, 3);
        assert_eq!(res.output, "hello");
    }

    #[test]
    fn merges_stdout_and_stderr() {
        let res = shell("echo out; echo err 1>&2").run_case("").unwrap();
        assert_eq!(res.exit_code, 0);
        assert_eq!(res.output, "out\nerr\n");
    }

    #[test]
    fn large_output_does_not_deadlock() {
        let input = "A".repeat(1024 * 1024);
        let res = shell("cat").run_case(&input).unwrap();
        assert_eq!(res.output.len(), input.len());
    }

    #[test]
    fn target_ignoring_stdin_is_not_an_error() {
        let input = "B".repeat(1024 * 1024);
        let res = shell("exit 4").run_case(&input).unwrap();
        assert_eq!(res.exit_code, 4);
    }

    #[test]
    fn signal_is_mapped_to_exit_code() {
        let res = shell("kill -9 $$").run_case("").unwrap();
        assert_eq!(res.exit_code, 128 + 9);
    }

    #[test]
    fn spawn_failure_is_an_execution_error() {
        let target = TargetCommand::new("./does/not/exist".into(), Vec::new(), LaunchMode::Direct)
            .unwrap();
        assert!(matches!(target.run_case("x"), Err(ExecutionError::Spawn { .. })));
    }

    #[test]
    fn campaign_stops_on_first_failure() {
        let batch = InputBatch::generate(SEED_INPUT, 7);
        let target = shell("n=$(wc -c); [ \"$n\" -gt 1000 ] && exit 2; exit 0");

        let failure = run_campaign(&target, &batch).unwrap_err();
        assert_eq!(failure.index, 2);
        assert_eq!(failure.kind, MutationKind::SpecialChars);
        assert_eq!(failure.exit_code, 2);
        assert_eq!(failure.input, SEED_INPUT.repeat(100));
    }

    #[test]
    fn campaign_swallows_execution_errors() {
        let batch = InputBatch::generate(SEED_INPUT, 7);
        let target = TargetCommand::new("./does/not/exist".into(), Vec::new(), LaunchMode::Direct)
            .unwrap();

        let stats = run_campaign(&target, &batch).unwrap();
        assert_eq!(stats.total_cases, 102);
        assert_eq!(stats.exec_errors, 102);
    }

    #[test]
    fn campaign_completes_on_clean_target() {
        let batch = InputBatch::generate(SEED_INPUT, 7);
        let stats = run_campaign(&shell("cat > /dev/null"), &batch).unwrap();
        assert_eq!(stats.total_cases, 102);
        assert_eq!(stats.exec_errors, 0);
    }
}
