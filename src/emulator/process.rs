use crate::debugger::error::Error;
use std::io;
use std::marker::PhantomData;
use std::mem;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};

/// Emulator process state.
pub trait State {}

/// Process is spawned, its standard streams are piped to the debugger.
pub struct Connected;

impl State for Connected {}

/// Process prepared for spawn.
pub struct Template;

impl State for Template {}

/// External emulator process.
pub struct Emulator<S: State> {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    child: Option<Child>,
    _p: PhantomData<S>,
}

/// Connected emulator and its protocol streams.
pub struct Connection {
    pub process: Emulator<Connected>,
    pub input: ChildStdin,
    pub output: ChildStdout,
}

impl Emulator<Template> {
    /// Create new emulator process, but dont start it.
    ///
    /// # Arguments
    ///
    /// * `program`: emulator executable
    /// * `args`: emulator arguments (usually a program image)
    /// * `cwd`: working directory
    pub fn new<ARGS: IntoIterator<Item = I>, I: Into<String>>(
        program: impl Into<PathBuf>,
        args: ARGS,
        cwd: Option<impl Into<PathBuf>>,
    ) -> Emulator<Template> {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.map(Into::into),
            child: None,
            _p: PhantomData,
        }
    }

    /// Spawn emulator with piped stdin and stdout.
    pub fn connect(mut self) -> Result<Connection, Error> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        if let Some(cwd) = self.cwd.as_deref() {
            cmd.current_dir(cwd);
        }

        let program_name = self.program.display().to_string();
        let spawn_err = |source: io::Error| Error::Spawn {
            program: program_name.clone(),
            source,
        };

        let mut child = cmd.spawn().map_err(spawn_err)?;
        let missing = |name: &str| io::Error::new(io::ErrorKind::BrokenPipe, format!("no {name}"));
        let (input, output) = match (child.stdin.take(), child.stdout.take()) {
            (Some(input), Some(output)) => (input, output),
            _ => {
                _ = child.kill();
                _ = child.wait();
                return Err(spawn_err(missing("stdio pipes")));
            }
        };

        log::info!(target: "emudbg", "emulator started, pid {}", child.id());

        Ok(Connection {
            process: Emulator {
                program: mem::take(&mut self.program),
                args: mem::take(&mut self.args),
                cwd: self.cwd.take(),
                child: Some(child),
                _p: PhantomData,
            },
            input,
            output,
        })
    }
}

impl Emulator<Connected> {
    /// Return emulator process id, `None` if process already reaped.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Kill emulator process and wait for it.
    /// Killing a process that already exited is not an error.
    pub fn disconnect(&mut self) -> Result<Option<ExitStatus>, Error> {
        let Some(mut child) = self.child.take() else {
            return Ok(None);
        };

        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        match child.kill() {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e.into()),
        }
        Ok(Some(child.wait()?))
    }
}

impl<S: State> Emulator<S> {
    /// Return emulator executable path.
    pub fn program(&self) -> &Path {
        self.program.as_path()
    }

    /// Return emulator arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Return working directory of the emulator.
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }
}

impl<S: State> Drop for Emulator<S> {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            _ = child.kill();
            _ = child.wait();
        }
    }
}
