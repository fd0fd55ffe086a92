use crate::command::{Command, ExitCode};
use crate::error::ShellResult;
use crate::history::Recall;
use crate::launcher::{self, Outcome};
use crate::lexer::{tokenize, truncate_line};
use crate::parser::resolve;
use crate::reaper;
use crate::session::{Config, Session};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Write};

/// The read-eval loop of the shell.
///
/// Each cycle reclaims finished background children, reads one line, resolves
/// `!!`, classifies the line and runs it. Errors are reported as a single line
/// and never end the loop; only `exit` or end-of-input do.
///
/// Example
/// ```no_run
/// use uinxsh::Interpreter;
/// let mut sh = Interpreter::default();
/// sh.execute_line("ls -l | wc -l", &mut std::io::stdout()).unwrap();
/// ```
pub struct Interpreter {
    session: Session,
}

impl Interpreter {
    pub fn new(config: Config) -> Self {
        Self {
            session: Session::new(config),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Interactive loop on the terminal until `exit` or end-of-input.
    pub fn repl(&mut self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;

        while !self.session.should_exit {
            reaper::reap();

            match rl.readline(&self.session.config.prompt) {
                Ok(line) => {
                    let line = truncate_line(&line, self.session.config.max_line);
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line)?;
                    }
                    self.cycle(line);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Run one line and report any failure on stderr.
    pub fn cycle(&mut self, line: &str) {
        let mut stdout = io::stdout();
        if let Err(e) = self.execute_line(line, &mut stdout) {
            eprintln!("uinxsh: {}", e);
        }
    }

    /// Execute one input line, writing shell output (not child output) to `stdout`.
    pub fn execute_line(&mut self, line: &str, stdout: &mut dyn Write) -> ShellResult<ExitCode> {
        let recalled = match self.session.history.recall(line) {
            Recall::NotRequested => None,
            Recall::Empty => {
                writeln!(stdout, "No commands in history.")?;
                return Ok(1);
            }
            Recall::Line(last) => Some(last.to_string()),
        };
        let line = match &recalled {
            Some(last) => {
                writeln!(stdout, "{}", last)?;
                last.as_str()
            }
            None => {
                self.session.history.record(line);
                line
            }
        };

        let tokens = tokenize(line);
        let command = resolve(&tokens)?;
        self.dispatch(command, stdout)
    }

    fn dispatch(&mut self, command: Command<'_>, stdout: &mut dyn Write) -> ShellResult<ExitCode> {
        match command {
            Command::Empty => Ok(0),
            Command::Builtin(builtin) => Ok(builtin.run(stdout, &mut self.session)?),
            Command::External { argv, background } => {
                stdout.flush()?;
                match launcher::launch(&argv, background)? {
                    Outcome::Completed(code) => Ok(code),
                    Outcome::Detached(job) => {
                        writeln!(stdout, "[Process running in background, PID: {}]", job.pid)?;
                        Ok(0)
                    }
                }
            }
            Command::Pipeline { left, right } => {
                stdout.flush()?;
                let (_, code) = launcher::launch_pipeline(&left, &right)?;
                Ok(code)
            }
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
