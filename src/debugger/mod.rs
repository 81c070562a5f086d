//! Debug session over an emulator connection.
//!
//! [`Target`] keeps run state, current location and registers of the debugged program and
//! translates debugger operations into emulator commands. All emulator output is handled
//! by a single read loop thread, state changes are reported through [`EventHook`].

pub mod breakpoint;
pub mod error;
pub mod memory;
pub mod project;
pub mod register;

pub use breakpoint::{
    toggle_line_breakpoint, BreakpointEvent, BreakpointRegistry, BreakpointStore,
    LogicalBreakpoint, Toggle,
};
pub use error::Error;
pub use memory::MemoryBlock;
pub use project::{launch, LaunchConfig, Notifier, Project, ProjectResolver};
pub use register::{RegisterFile, RegisterFormat};

use crate::debugger::error::ProtocolError;
use crate::debugger::register::RegisterUpdate;
use crate::emulator::command::Command;
use crate::emulator::correlator::{Continuation, Correlator};
use crate::emulator::dispatch::EventDispatcher;
use crate::emulator::framer::{Line, Tokens};
use crate::emulator::process::{Connected, Connection, Emulator, Template};
use crate::emulator::{self, LineHandler};
use crate::{muted_error, weak_error};
use log::{debug, warn};
use std::io::Write;
use std::mem;
use std::ops::Deref;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use strum_macros::Display;

/// Event sent by emulator once it is ready: `started <file> <line> [registers]`.
pub const EVENT_STARTED: &str = "started";
/// Event sent by emulator when execution stops at breakpoint: `breakpoint-hit <file> <line> [registers]`.
pub const EVENT_BREAKPOINT_HIT: &str = "breakpoint-hit";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RunState {
    /// Program is stopped, initial state of any session.
    Suspended,
    Running,
    /// Step command is sent, waiting for the emulator answer.
    Stepping,
    /// Session is over, no commands can be sent anymore.
    Terminated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SuspendReason {
    Breakpoint,
    ClientRequest,
    StepEnd,
    /// Execution command was not delivered to emulator.
    Aborted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ResumeReason {
    ClientRequest,
    StepInto,
}

/// The only stack frame the emulator exposes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackFrame {
    pub file: String,
    pub line: u32,
}

/// Session state observer.
///
/// All methods, except `on_resume`, are called from the read loop thread.
/// Hook is never called while session lock is held, so it is free to call back
/// into [`Target`].
pub trait EventHook: Send + Sync {
    /// Emulator loaded the program and is ready.
    fn on_started(&self, frame: &StackFrame);

    fn on_suspend(&self, reason: SuspendReason, frame: &StackFrame);

    /// Called before the execution command is sent. If sending fails, `on_suspend`
    /// with [`SuspendReason::Aborted`] follows.
    fn on_resume(&self, reason: ResumeReason);

    /// Called once per session.
    fn on_terminate(&self);

    /// Contents of a previously requested memory block arrived.
    fn on_memory_changed(&self, block: &MemoryBlock);

    fn on_breakpoint(&self, event: BreakpointEvent);
}

pub struct NopHook {}

impl EventHook for NopHook {
    fn on_started(&self, _: &StackFrame) {}

    fn on_suspend(&self, _: SuspendReason, _: &StackFrame) {}

    fn on_resume(&self, _: ResumeReason) {}

    fn on_terminate(&self) {}

    fn on_memory_changed(&self, _: &MemoryBlock) {}

    fn on_breakpoint(&self, _: BreakpointEvent) {}
}

struct TargetState {
    run: RunState,
    started: bool,
    frame: StackFrame,
    registers: RegisterFile,
}

struct Transport {
    process: Emulator<Connected>,
    reader: Option<JoinHandle<()>>,
}

impl Transport {
    /// Kill emulator and wait until read loop observes the end of stream.
    fn shutdown(mut self) -> Result<(), Error> {
        let status = self.process.disconnect()?;
        debug!(target: "emudbg", "emulator stopped with {status:?}");

        if let Some(reader) = self.reader.take() {
            // terminate may be called by a hook from the read loop itself
            if reader.thread().id() != thread::current().id() && reader.join().is_err() {
                warn!(target: "emudbg", "emulator read loop panicked");
            }
        }
        Ok(())
    }
}

/// Program under debugging.
pub struct Target {
    state: Mutex<TargetState>,
    correlator: Correlator<Target>,
    events: EventDispatcher<Target>,
    hook: Box<dyn EventHook>,
    breakpoints: Arc<dyn BreakpointStore>,
    transport: Mutex<Option<Transport>>,
}

fn parse_location(tokens: &[String]) -> Result<(StackFrame, Vec<RegisterUpdate>), ProtocolError> {
    let file = tokens.first().ok_or(ProtocolError::MissingField("file"))?;
    let line = tokens.get(1).ok_or(ProtocolError::MissingField("line"))?;
    let line = line
        .parse::<u32>()
        .map_err(|_| ProtocolError::InvalidLine(line.clone()))?;
    let updates = register::parse_updates(&tokens[2..])?;

    Ok((
        StackFrame {
            file: file.clone(),
            line,
        },
        updates,
    ))
}

fn expect_state(actual: RunState, expected: RunState, op: &'static str) -> Result<(), Error> {
    if actual != expected {
        return Err(Error::InvalidState { op, state: actual });
    }
    Ok(())
}

impl Target {
    /// Return current run state.
    pub fn state(&self) -> RunState {
        self.state.lock().unwrap().run
    }

    /// Return true if emulator reported that program is loaded.
    pub fn is_started(&self) -> bool {
        self.state.lock().unwrap().started
    }

    pub fn is_suspended(&self) -> bool {
        self.state() == RunState::Suspended
    }

    pub fn is_terminated(&self) -> bool {
        self.state() == RunState::Terminated
    }

    /// Return current source file name.
    pub fn file(&self) -> String {
        self.state.lock().unwrap().frame.file.clone()
    }

    /// Return current source line.
    pub fn line(&self) -> u32 {
        self.state.lock().unwrap().frame.line
    }

    /// Return snapshot of the current stack frame.
    /// There is no frame until emulator starts and while the program is not suspended.
    pub fn top_frame(&self) -> Option<StackFrame> {
        let state = self.state.lock().unwrap();
        (state.started && state.run == RunState::Suspended).then(|| state.frame.clone())
    }

    /// Return snapshot of target registers.
    pub fn registers(&self) -> RegisterFile {
        self.state.lock().unwrap().registers.clone()
    }

    pub fn can_resume(&self) -> bool {
        self.is_suspended()
    }

    pub fn can_suspend(&self) -> bool {
        self.state() == RunState::Running
    }

    pub fn can_step_into(&self) -> bool {
        self.is_suspended()
    }

    /// Emulator has no step over support.
    pub fn can_step_over(&self) -> bool {
        false
    }

    /// Emulator has no step return support.
    pub fn can_step_return(&self) -> bool {
        false
    }

    pub fn can_terminate(&self) -> bool {
        !self.is_terminated()
    }

    /// Memory can be read with [`Target::memory_block`].
    pub fn supports_storage_retrieval(&self) -> bool {
        true
    }

    /// Return breakpoint store used by this session.
    pub fn breakpoints(&self) -> &dyn BreakpointStore {
        self.breakpoints.as_ref()
    }

    pub(crate) fn hook(&self) -> &dyn EventHook {
        self.hook.as_ref()
    }

    /// Send command to emulator, continuation is called with the reply.
    pub(crate) fn send(
        &self,
        cmd: Command,
        continuation: Option<Continuation<Target>>,
    ) -> Result<(), Error> {
        let state = self.state();
        if state == RunState::Terminated {
            return Err(Error::InvalidState {
                op: cmd.verb(),
                state,
            });
        }
        self.correlator.send(&cmd, continuation)
    }

    /// Continue program execution. Target is considered running right after the command
    /// is sent, next stop is reported by a breakpoint hit or a suspend reply.
    pub fn resume(&self) -> Result<(), Error> {
        self.start_execution(
            RunState::Running,
            ResumeReason::ClientRequest,
            Command::Resume,
            None,
        )
    }

    /// Stop running program.
    pub fn suspend(&self) -> Result<(), Error> {
        expect_state(self.state(), RunState::Running, "suspend")?;
        self.send(
            Command::Suspend,
            Some(Box::new(|target: &Target, reply: Tokens| {
                target.stopped(SuspendReason::ClientRequest, Some(RunState::Running), reply)
            })),
        )
    }

    /// Execute single source line, entering calls.
    pub fn step_into(&self) -> Result<(), Error> {
        self.start_execution(
            RunState::Stepping,
            ResumeReason::StepInto,
            Command::StepInto,
            Some(Box::new(|target: &Target, reply: Tokens| {
                target.stopped(SuspendReason::StepEnd, Some(RunState::Stepping), reply)
            })),
        )
    }

    /// Always fails, see [`Target::can_step_over`].
    pub fn step_over(&self) -> Result<(), Error> {
        Err(Error::Unavailable(Command::StepOver.verb()))
    }

    /// Always fails, see [`Target::can_step_return`].
    pub fn step_return(&self) -> Result<(), Error> {
        Err(Error::Unavailable(Command::StepReturn.verb()))
    }

    /// Move suspended target into `new_state` and send execution command.
    /// Resume is reported before the command is sent, so observers never see
    /// the next stop ahead of it. If the command can't be sent, target is suspended
    /// again and observers receive [`SuspendReason::Aborted`].
    fn start_execution(
        &self,
        new_state: RunState,
        reason: ResumeReason,
        cmd: Command,
        continuation: Option<Continuation<Target>>,
    ) -> Result<(), Error> {
        {
            let mut state = self.state.lock().unwrap();
            expect_state(state.run, RunState::Suspended, cmd.verb())?;
            state.run = new_state;
        }
        self.hook.on_resume(reason);

        if let Err(e) = self.correlator.send(&cmd, continuation) {
            let frame = {
                let mut state = self.state.lock().unwrap();
                if state.run != new_state {
                    return Err(e);
                }
                state.run = RunState::Suspended;
                state.frame.clone()
            };
            self.hook.on_suspend(SuspendReason::Aborted, &frame);
            return Err(e);
        }
        Ok(())
    }

    /// Return a zero-filled memory block and request its contents from emulator.
    /// Block is filled when emulator answers, hook receives `on_memory_changed` notification.
    pub fn memory_block(&self, start: u64, length: usize) -> Result<MemoryBlock, Error> {
        let block = MemoryBlock::new(start, length);
        // emulator answers an empty line that can't be correlated
        if length == 0 {
            return Ok(block);
        }

        let shared = block.clone();
        self.send(
            Command::ReadMemory { start, length },
            Some(Box::new(move |target: &Target, reply: Tokens| {
                shared.replace_from_reply(&reply)?;
                target.hook.on_memory_changed(&shared);
                Ok(())
            })),
        )?;
        Ok(block)
    }

    /// Stop debugging: drop pending commands, kill emulator and wait for read loop.
    /// Fails if session already terminated, emulator is released anyway.
    pub fn terminate(&self) -> Result<(), Error> {
        let was_alive = self.mark_terminated();

        let transport = self.transport.lock().unwrap().take();
        if let Some(transport) = transport {
            transport.shutdown()?;
        }

        if !was_alive {
            return Err(Error::InvalidState {
                op: "terminate",
                state: RunState::Terminated,
            });
        }
        Ok(())
    }

    /// Return false if target was already terminated.
    fn mark_terminated(&self) -> bool {
        let prev = mem::replace(&mut self.state.lock().unwrap().run, RunState::Terminated);

        let abandoned = self.correlator.close();
        if abandoned > 0 {
            debug!(target: "emudbg", "{abandoned} commands abandoned");
        }

        if prev == RunState::Terminated {
            return false;
        }
        self.hook.on_terminate();
        true
    }

    fn started(&self, args: Tokens) -> Result<(), Error> {
        let (frame, updates) = parse_location(&args)?;
        {
            let mut state = self.state.lock().unwrap();
            if state.run == RunState::Terminated {
                return Ok(());
            }
            if state.started {
                warn!(target: "emudbg", "emulator started twice");
            }
            state.started = true;
            state.frame = frame.clone();
            state.registers.apply(&updates);
        }
        self.hook.on_started(&frame);
        Ok(())
    }

    /// Handle emulator report about stopped execution. Target becomes suspended even if
    /// the report is malformed, location is kept unchanged in this case.
    ///
    /// Reply to a command is applied to run state only if target is still in `expected` state
    /// (`None` for events, which always suspend). A stale reply refreshes location and
    /// registers only.
    fn stopped(
        &self,
        reason: SuspendReason,
        expected: Option<RunState>,
        tokens: Tokens,
    ) -> Result<(), Error> {
        let location = parse_location(&tokens);
        let frame = {
            let mut state = self.state.lock().unwrap();
            if state.run == RunState::Terminated {
                return Ok(());
            }
            if let Ok((frame, updates)) = &location {
                state.frame = frame.clone();
                state.registers.apply(updates);
            }
            match expected {
                Some(expected) if expected != state.run => {
                    debug!(target: "emudbg", "stale {reason} reply while {}", state.run);
                    None
                }
                _ => {
                    state.run = RunState::Suspended;
                    Some(state.frame.clone())
                }
            }
        };

        if let Some(frame) = frame {
            self.hook.on_suspend(reason, &frame);
        }
        location.map(|_| ()).map_err(Into::into)
    }
}

impl LineHandler for Target {
    fn on_line(&self, line: Line) {
        match line {
            Line::Event { kind, args } => {
                if let Some(false) = weak_error!(
                    self.events.dispatch(self, &kind, args),
                    "emulator event:"
                ) {
                    debug!(target: "emudbg", "unknown event `{kind}` dropped");
                }
            }
            Line::Reply(tokens) => {
                weak_error!(self.correlator.complete(self, tokens), "emulator reply:");
            }
            Line::Empty | Line::Comment(_) => {}
        }
    }

    fn on_disconnect(&self) {
        if self.mark_terminated() {
            debug!(target: "emudbg", "emulator output closed");
        }
    }
}

/// Debug session builder.
pub struct TargetBuilder {
    hook: Box<dyn EventHook>,
    breakpoints: Arc<dyn BreakpointStore>,
}

impl Default for TargetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetBuilder {
    pub fn new() -> Self {
        Self {
            hook: Box::new(NopHook {}),
            breakpoints: Arc::new(BreakpointRegistry::new()),
        }
    }

    pub fn with_hooks(self, hook: impl EventHook + 'static) -> Self {
        Self {
            hook: Box::new(hook),
            ..self
        }
    }

    pub fn with_breakpoints(self, breakpoints: Arc<dyn BreakpointStore>) -> Self {
        Self {
            breakpoints,
            ..self
        }
    }

    fn build(self, input: impl Write + Send + 'static) -> Target {
        let mut events = EventDispatcher::default();
        events.register(EVENT_STARTED, |target: &Target, args: Tokens| {
            target.started(args)
        });
        events.register(EVENT_BREAKPOINT_HIT, |target: &Target, args: Tokens| {
            target.stopped(SuspendReason::Breakpoint, None, args)
        });

        Target {
            state: Mutex::new(TargetState {
                run: RunState::Suspended,
                started: false,
                frame: StackFrame::default(),
                registers: RegisterFile::default(),
            }),
            correlator: Correlator::new(input),
            events,
            hook: self.hook,
            breakpoints: self.breakpoints,
            transport: Mutex::new(None),
        }
    }

    /// Spawn emulator, start reading its output and offer known breakpoints to it.
    pub fn connect(self, emulator: Emulator<Template>) -> Result<Session, Error> {
        let Connection {
            process,
            input,
            output,
        } = emulator.connect()?;

        let target = Arc::new(self.build(input));
        // process is killed on drop if read loop can't be started
        let reader = emulator::spawn_read_loop(output, target.clone())?;
        *target.transport.lock().unwrap() = Some(Transport {
            process,
            reader: Some(reader),
        });

        let session = Session { target };
        session.install_breakpoints()?;
        Ok(session)
    }

    /// Build target without emulator process, commands are written into `input`.
    #[cfg(test)]
    pub(crate) fn detached(self, input: impl Write + Send + 'static) -> Arc<Target> {
        Arc::new(self.build(input))
    }
}

/// Owned debug session, emulator is terminated when session dropped.
pub struct Session {
    target: Arc<Target>,
}

impl Session {
    /// Return shared handle of the target, for use in other threads.
    pub fn target(&self) -> &Arc<Target> {
        &self.target
    }
}

impl Deref for Session {
    type Target = Target;

    fn deref(&self) -> &Self::Target {
        &self.target
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.target.can_terminate() {
            muted_error!(self.target.terminate());
        } else if let Some(transport) = self.target.transport.lock().unwrap().take() {
            muted_error!(transport.shutdown());
        }
    }
}
