use emudbg::debugger::{
    BreakpointEvent, BreakpointStore, EventHook, MemoryBlock, ResumeReason, Session,
    StackFrame, SuspendReason, TargetBuilder,
};
use emudbg::emulator::process::Emulator;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

pub const MOCK_EMULATOR: &str = env!("CARGO_BIN_EXE_mock_emulator");
pub const IMAGE: &str = "demo.hex";
pub const SOURCE: &str = "demo.asm";
pub const PROGRAM_END: u32 = 20;

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Started(StackFrame),
    Suspend(SuspendReason, StackFrame),
    Resume(ResumeReason),
    Terminate,
    Memory(u64, Vec<u8>),
    Breakpoint(BreakpointEvent),
}

#[derive(Default)]
struct Journal {
    events: Mutex<Vec<Event>>,
    cond: Condvar,
}

/// Hook that records session events, tests wait for events they expect.
#[derive(Clone, Default)]
pub struct TestHooks(Arc<Journal>);

impl TestHooks {
    fn push(&self, event: Event) {
        self.0.events.lock().unwrap().push(event);
        self.0.cond.notify_all();
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.events.lock().unwrap().clone()
    }

    /// Block until an event matching `pred` is recorded, return it.
    pub fn wait_for(&self, pred: impl Fn(&Event) -> bool) -> Event {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        let mut events = self.0.events.lock().unwrap();
        loop {
            if let Some(event) = events.iter().find(|e| pred(e)) {
                return event.clone();
            }
            let now = Instant::now();
            assert!(now < deadline, "event not received, got: {:?}", *events);
            events = self.0.cond.wait_timeout(events, deadline - now).unwrap().0;
        }
    }

    /// Wait for `n`-th (counting from 1) suspend of the session.
    pub fn wait_suspend(&self, n: usize) -> (SuspendReason, StackFrame) {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        let mut events = self.0.events.lock().unwrap();
        loop {
            let found = events
                .iter()
                .filter_map(|e| match e {
                    Event::Suspend(reason, frame) => Some((*reason, frame.clone())),
                    _ => None,
                })
                .nth(n - 1);
            if let Some(suspend) = found {
                return suspend;
            }
            let now = Instant::now();
            assert!(now < deadline, "suspend #{n} not received, got: {:?}", *events);
            events = self.0.cond.wait_timeout(events, deadline - now).unwrap().0;
        }
    }
}

impl EventHook for TestHooks {
    fn on_started(&self, frame: &StackFrame) {
        self.push(Event::Started(frame.clone()));
    }

    fn on_suspend(&self, reason: SuspendReason, frame: &StackFrame) {
        self.push(Event::Suspend(reason, frame.clone()));
    }

    fn on_resume(&self, reason: ResumeReason) {
        self.push(Event::Resume(reason));
    }

    fn on_terminate(&self) {
        self.push(Event::Terminate);
    }

    fn on_memory_changed(&self, block: &MemoryBlock) {
        self.push(Event::Memory(block.start(), block.bytes()));
    }

    fn on_breakpoint(&self, event: BreakpointEvent) {
        self.push(Event::Breakpoint(event));
    }
}

pub fn frame(line: u32) -> StackFrame {
    StackFrame {
        file: SOURCE.to_string(),
        line,
    }
}

/// Start session with mock emulator and wait until program is loaded.
pub fn start_session(hooks: &TestHooks, store: Arc<dyn BreakpointStore>) -> Session {
    let emulator = Emulator::new(MOCK_EMULATOR, [IMAGE], None::<PathBuf>);
    let session = TargetBuilder::new()
        .with_hooks(hooks.clone())
        .with_breakpoints(store)
        .connect(emulator)
        .unwrap();
    hooks.wait_for(|e| matches!(e, Event::Started(_)));
    session
}
