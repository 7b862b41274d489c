//! Drives an external SMT-LIB2 solver binary (z3, cvc5, ...) over its
//! interactive stdin/stdout protocol.
//!
//! Solver output is read on a helper thread so that `check-sat` can be
//! bounded by a wall-clock deadline. A solver that misses the deadline is
//! killed and the check reports `unknown`.

use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::backends::sexp;
use crate::backends::smtlib_printer::{sort_to_smtlib, to_smtlib};
use crate::solver::{Model, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

#[derive(Debug, Error)]
pub enum SmtLibError {
    #[error("solver I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("solver not found: {0}")]
    NotFound(String),
    #[error("solver error: {0}")]
    SolverError(String),
    #[error("failed to parse solver output: {0}")]
    ParseError(String),
    #[error("solver did not answer before the deadline")]
    Timeout,
    #[error("{0} was stopped after a timeout")]
    Stopped(String),
}

/// How to launch a particular solver binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Wall-clock limit on each `check-sat`, independent of solver flags.
    pub deadline: Option<Duration>,
}

impl SolverCommand {
    /// `z3 -in -smt2`, with z3's soft timeout flag when requested.
    pub fn z3(timeout_ms: Option<u64>) -> Self {
        let mut args = vec!["-in".to_string(), "-smt2".to_string()];
        if let Some(ms) = timeout_ms {
            args.push(format!("-t:{ms}"));
        }
        Self {
            program: "z3".to_string(),
            args,
            deadline: None,
        }
    }

    /// `cvc5` in incremental SMT-LIB2 mode with models enabled.
    pub fn cvc5(timeout_ms: Option<u64>) -> Self {
        let mut args = vec![
            "--lang".to_string(),
            "smt2".to_string(),
            "--incremental".to_string(),
            "--produce-models".to_string(),
        ];
        if let Some(ms) = timeout_ms {
            args.push(format!("--tlimit-per={ms}"));
        }
        Self {
            program: "cvc5".to_string(),
            args,
            deadline: None,
        }
    }

    /// Parse a whitespace-separated command line such as `"z3 -in"`.
    pub fn parse(cmdline: &str) -> Option<Self> {
        let mut parts = cmdline.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            deadline: None,
        })
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }
}

fn spawn_reader(stdout: ChildStdout) -> Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut reader = BufReader::new(stdout);
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    });
    rx
}

pub struct SmtLibProcess {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<io::Result<String>>,
    stderr: BufReader<ChildStderr>,
    name: String,
    deadline: Option<Duration>,
    stopped: bool,
}

impl SmtLibProcess {
    pub fn z3() -> Result<Self, SmtLibError> {
        Self::spawn(&SolverCommand::z3(None))
    }

    pub fn cvc5() -> Result<Self, SmtLibError> {
        Self::spawn(&SolverCommand::cvc5(None))
    }

    pub fn spawn(cmd: &SolverCommand) -> Result<Self, SmtLibError> {
        let mut child = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SmtLibError::NotFound(format!("{}: {e}", cmd.program)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SmtLibError::SolverError("failed to capture solver stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SmtLibError::SolverError("failed to capture solver stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SmtLibError::SolverError("failed to capture solver stderr".into()))?;

        let mut solver = Self {
            child,
            stdin,
            lines: spawn_reader(stdout),
            stderr: BufReader::new(stderr),
            name: cmd.program.clone(),
            deadline: cmd.deadline,
            stopped: false,
        };
        solver.send_command_no_response("(set-option :print-success false)")?;
        solver.send_command_no_response("(set-option :produce-models true)")?;
        Ok(solver)
    }

    fn send_command(&mut self, cmd: &str) -> Result<String, SmtLibError> {
        self.send_command_within(cmd, None)
    }

    /// Send a command and read one complete (paren-balanced) response,
    /// giving up once `limit` has elapsed.
    fn send_command_within(
        &mut self,
        cmd: &str,
        limit: Option<Duration>,
    ) -> Result<String, SmtLibError> {
        self.send_command_no_response(cmd)?;
        let deadline = limit.map(|d| Instant::now() + d);

        let mut response = String::new();
        loop {
            let next = match deadline {
                Some(at) => self
                    .lines
                    .recv_timeout(at.saturating_duration_since(Instant::now())),
                None => self.lines.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            let line = match next {
                Ok(line) => line?,
                Err(RecvTimeoutError::Timeout) => return Err(SmtLibError::Timeout),
                Err(RecvTimeoutError::Disconnected) => {
                    let mut stderr = String::new();
                    let _ = self.stderr.read_line(&mut stderr);
                    return Err(SmtLibError::SolverError(format!(
                        "No response from {} for command `{cmd}`. stderr: {}",
                        self.name,
                        stderr.trim()
                    )));
                }
            };
            response.push_str(&line);
            if !response.trim().is_empty() && sexp::paren_balance(&response) <= 0 {
                break;
            }
        }
        let response = response.trim().to_string();
        if response.starts_with("(error") {
            return Err(SmtLibError::SolverError(response));
        }
        Ok(response)
    }

    fn send_command_no_response(&mut self, cmd: &str) -> Result<(), SmtLibError> {
        if self.stopped {
            return Err(SmtLibError::Stopped(self.name.clone()));
        }
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;
        Ok(())
    }

    fn read_sat_result(&mut self) -> Result<SatResult, SmtLibError> {
        let response = match self.send_command_within("(check-sat)", self.deadline) {
            Err(SmtLibError::Timeout) => {
                self.stop();
                return Ok(SatResult::Unknown("timeout".into()));
            }
            other => other?,
        };
        match response.as_str() {
            "sat" => Ok(SatResult::Sat),
            "unsat" => Ok(SatResult::Unsat),
            "unknown" => {
                let reason = self
                    .send_command("(get-info :reason-unknown)")
                    .unwrap_or_else(|_| "unknown".to_string());
                Ok(SatResult::Unknown(reason))
            }
            "timeout" => Ok(SatResult::Unknown("timeout".into())),
            other => Err(SmtLibError::SolverError(other.to_string())),
        }
    }

    /// Kill a solver that missed its deadline. Its scopes are gone with it.
    fn stop(&mut self) {
        warn!(solver = %self.name, "solver missed its deadline, killing it");
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.stopped = true;
    }
}

impl Drop for SmtLibProcess {
    fn drop(&mut self) {
        if self.stopped {
            return;
        }
        let _ = writeln!(self.stdin, "(exit)");
        let _ = self.stdin.flush();
        let _ = self.child.wait();
    }
}

impl SmtSolver for SmtLibProcess {
    type Error = SmtLibError;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), SmtLibError> {
        let sort_str = sort_to_smtlib(sort);
        self.send_command_no_response(&format!("(declare-const {name} {sort_str})"))
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), SmtLibError> {
        let smt_str = to_smtlib(term);
        self.send_command_no_response(&format!("(assert {smt_str})"))
    }

    fn push(&mut self) -> Result<(), SmtLibError> {
        self.send_command_no_response("(push 1)")
    }

    fn pop(&mut self) -> Result<(), SmtLibError> {
        if self.stopped {
            return Ok(());
        }
        self.send_command_no_response("(pop 1)")
    }

    fn check_sat(&mut self) -> Result<SatResult, SmtLibError> {
        self.read_sat_result()
    }

    fn check_sat_with_values(
        &mut self,
        observations: &[(String, SmtTerm)],
    ) -> Result<(SatResult, Option<Model>), SmtLibError> {
        let result = self.read_sat_result()?;
        if result != SatResult::Sat {
            return Ok((result, None));
        }
        let mut model = Model::default();
        if observations.is_empty() {
            return Ok((result, Some(model)));
        }

        let payload: Vec<String> = observations.iter().map(|(_, t)| to_smtlib(t)).collect();
        let response = self.send_command(&format!("(get-value ({}))", payload.join(" ")))?;
        debug!(solver = %self.name, bytes = response.len(), "get-value response");
        let parsed = sexp::parse(&response)
            .ok_or_else(|| SmtLibError::ParseError(response.clone()))?;
        let pairs = parsed
            .as_list()
            .ok_or_else(|| SmtLibError::ParseError(response.clone()))?;
        if pairs.len() != observations.len() {
            return Err(SmtLibError::ParseError(format!(
                "expected {} values, got {}",
                observations.len(),
                pairs.len()
            )));
        }
        for ((label, _), pair) in observations.iter().zip(pairs) {
            match pair.as_list() {
                Some([_, value]) => {
                    model.values.insert(label.clone(), sexp::model_value(value));
                }
                _ => return Err(SmtLibError::ParseError(pair.to_string())),
            }
        }
        Ok((SatResult::Sat, Some(model)))
    }

    fn reset(&mut self) -> Result<(), SmtLibError> {
        self.send_command_no_response("(reset)")?;
        self.send_command_no_response("(set-option :print-success false)")?;
        self.send_command_no_response("(set-option :produce-models true)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z3_command_carries_timeout_flag() {
        let cmd = SolverCommand::z3(Some(2500));
        assert_eq!(cmd.program, "z3");
        assert_eq!(cmd.args, vec!["-in", "-smt2", "-t:2500"]);
    }

    #[test]
    fn cvc5_command_without_timeout() {
        let cmd = SolverCommand::cvc5(None);
        assert!(cmd.args.iter().any(|a| a == "--produce-models"));
        assert!(!cmd.args.iter().any(|a| a.starts_with("--tlimit")));
    }

    #[test]
    fn parse_command_line() {
        let cmd = SolverCommand::parse("bitwuzla --lang smt2").expect("non-empty");
        assert_eq!(cmd.program, "bitwuzla");
        assert_eq!(cmd.args, vec!["--lang", "smt2"]);
        assert!(SolverCommand::parse("   ").is_none());
    }

    #[test]
    fn missing_binary_is_reported_as_not_found() {
        let cmd = SolverCommand {
            program: "slotguard-no-such-solver".to_string(),
            args: Vec::new(),
            deadline: None,
        };
        match SmtLibProcess::spawn(&cmd) {
            Err(SmtLibError::NotFound(msg)) => assert!(msg.contains("slotguard-no-such-solver")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("spawning a missing binary should fail"),
        }
    }

    #[test]
    fn deadline_is_kept_by_parsed_commands() {
        let cmd = SolverCommand::parse("z3 -in")
            .expect("non-empty")
            .with_deadline(Some(Duration::from_secs(3)));
        assert_eq!(cmd.args, vec!["-in"]);
        assert_eq!(cmd.deadline, Some(Duration::from_secs(3)));
    }

    /// `sleep` reads nothing and prints nothing, like a solver stuck on a
    /// hard query.
    #[cfg(unix)]
    #[test]
    fn silent_solver_times_out_as_unknown() {
        let cmd = SolverCommand::parse("sleep 30")
            .expect("non-empty")
            .with_deadline(Some(Duration::from_millis(200)));
        let mut solver = SmtLibProcess::spawn(&cmd).expect("sleep is on PATH");
        solver.push().expect("push");
        solver.assert(&SmtTerm::bool(true)).expect("assert");

        let started = Instant::now();
        let (result, model) = solver.check_sat_with_values(&[]).expect("timeout is a verdict");
        assert_eq!(result, SatResult::Unknown("timeout".into()));
        assert!(model.is_none());
        assert!(started.elapsed() < Duration::from_secs(10));

        solver.pop().expect("pop on a stopped solver");
        assert!(matches!(
            solver.assert(&SmtTerm::bool(true)),
            Err(SmtLibError::Stopped(_))
        ));
    }
}
