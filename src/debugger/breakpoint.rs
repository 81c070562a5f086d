use crate::debugger::error::{Error, ProtocolError};
use crate::debugger::{RunState, Target};
use crate::emulator::command::Command;
use crate::emulator::framer::Tokens;
use crate::weak_error;
use anyhow::Context;
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// Reply of the emulator on successful breakpoint placement.
const BREAKPOINT_SET: &str = "breakpoint-set";

/// User level breakpoint, lives longer than any debug session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalBreakpoint {
    pub id: Uuid,
    pub file: String,
    pub line: u32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl LogicalBreakpoint {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            file: file.into(),
            line,
            enabled: true,
        }
    }
}

/// Persistent set of logical breakpoints.
pub trait BreakpointStore: Send + Sync {
    /// Return all breakpoints in insertion order.
    fn all(&self) -> Vec<LogicalBreakpoint>;

    fn get(&self, id: Uuid) -> Option<LogicalBreakpoint>;

    fn find(&self, file: &str, line: u32) -> Option<LogicalBreakpoint>;

    fn add(&self, brkpt: LogicalBreakpoint);

    fn remove(&self, id: Uuid) -> Option<LogicalBreakpoint>;

    /// Replace breakpoint with the same id. Return false if there is no such breakpoint.
    fn update(&self, brkpt: LogicalBreakpoint) -> bool;
}

/// Breakpoint reconciliation results, reported to [`crate::debugger::EventHook`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BreakpointEvent {
    /// Emulator accepted the breakpoint at the requested line.
    Placed(LogicalBreakpoint),
    /// Emulator moved the breakpoint to the nearest line with code.
    Relocated { brkpt: LogicalBreakpoint, from: u32 },
    /// Emulator refused a known breakpoint, it stays in store as disabled.
    Disabled(LogicalBreakpoint),
    /// Emulator refused a new breakpoint, nothing was created.
    Rejected { file: String, line: u32 },
}

/// Result of toggling a breakpoint at a source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Toggle {
    Removed(LogicalBreakpoint),
    Added(LogicalBreakpoint),
    /// Placement request sent to emulator, breakpoint is created when it is accepted.
    Requested,
}

enum Placement {
    At(u32),
    Refused(String),
}

fn parse_placement(reply: &[String]) -> Result<Placement, ProtocolError> {
    if reply.first().map(String::as_str) != Some(BREAKPOINT_SET) {
        return Ok(Placement::Refused(reply.join(" ")));
    }
    let line = reply.get(1).ok_or(ProtocolError::MissingField("line"))?;
    line.parse()
        .map(Placement::At)
        .map_err(|_| ProtocolError::InvalidLine(line.clone()))
}

#[derive(Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default, rename = "breakpoint")]
    breakpoints: Vec<LogicalBreakpoint>,
}

/// In-memory [`BreakpointStore`], optionally mirrored into a toml file.
#[derive(Default)]
pub struct BreakpointRegistry {
    breakpoints: Mutex<IndexMap<Uuid, LogicalBreakpoint>>,
    path: Option<PathBuf>,
}

impl BreakpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create registry backed by a file. Breakpoints are loaded if file exists.
    pub fn with_file(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let breakpoints = if path.exists() {
            let data = fs::read_to_string(&path)
                .with_context(|| format!("read breakpoints from {}", path.display()))?;
            let file: StoreFile = toml::from_str(&data)
                .with_context(|| format!("parse breakpoints file {}", path.display()))?;
            file.breakpoints.into_iter().map(|b| (b.id, b)).collect()
        } else {
            IndexMap::new()
        };

        Ok(Self {
            breakpoints: Mutex::new(breakpoints),
            path: Some(path),
        })
    }

    /// Return path of the backing file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write breakpoints into the backing file, do nothing for in-memory registry.
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let file = StoreFile {
            breakpoints: self.all(),
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, toml::to_string(&file)?)
            .with_context(|| format!("write breakpoints to {}", path.display()))?;
        Ok(())
    }

    fn persist(&self) {
        weak_error!(self.save(), "save breakpoints:");
    }
}

impl BreakpointStore for BreakpointRegistry {
    fn all(&self) -> Vec<LogicalBreakpoint> {
        self.breakpoints.lock().unwrap().values().cloned().collect()
    }

    fn get(&self, id: Uuid) -> Option<LogicalBreakpoint> {
        self.breakpoints.lock().unwrap().get(&id).cloned()
    }

    fn find(&self, file: &str, line: u32) -> Option<LogicalBreakpoint> {
        self.breakpoints
            .lock()
            .unwrap()
            .values()
            .find(|b| b.file == file && b.line == line)
            .cloned()
    }

    fn add(&self, brkpt: LogicalBreakpoint) {
        self.breakpoints.lock().unwrap().insert(brkpt.id, brkpt);
        self.persist();
    }

    fn remove(&self, id: Uuid) -> Option<LogicalBreakpoint> {
        let removed = self.breakpoints.lock().unwrap().shift_remove(&id);
        if removed.is_some() {
            self.persist();
        }
        removed
    }

    fn update(&self, brkpt: LogicalBreakpoint) -> bool {
        let updated = match self.breakpoints.lock().unwrap().get_mut(&brkpt.id) {
            None => false,
            Some(existing) => {
                *existing = brkpt;
                true
            }
        };
        if updated {
            self.persist();
        }
        updated
    }
}

impl Target {
    /// Offer every enabled logical breakpoint to the emulator.
    /// Breakpoints are relocated or disabled when emulator answers.
    ///
    /// Return number of offered breakpoints.
    pub fn install_breakpoints(&self) -> Result<usize, Error> {
        let mut offered = 0;
        for brkpt in self.breakpoints().all().into_iter().filter(|b| b.enabled) {
            let id = brkpt.id;
            self.send(
                Command::SetBreakpoint {
                    file: brkpt.file,
                    line: brkpt.line,
                },
                Some(Box::new(move |target: &Target, reply: Tokens| {
                    target.reconcile_installed(id, reply)
                })),
            )?;
            offered += 1;
        }
        Ok(offered)
    }

    /// Ask emulator for a new breakpoint. Logical breakpoint is created only if emulator
    /// accepts it, at the line where the emulator placed it.
    pub fn set_breakpoint(&self, file: &str, line: u32) -> Result<(), Error> {
        let requested_file = file.to_string();
        self.send(
            Command::SetBreakpoint {
                file: file.to_string(),
                line,
            },
            Some(Box::new(move |target: &Target, reply: Tokens| {
                target.reconcile_requested(requested_file, line, reply)
            })),
        )
    }

    /// Remove breakpoint from emulator. Reply is not awaited.
    pub fn clear_breakpoint(&self, file: &str, line: u32) -> Result<(), Error> {
        self.send(
            Command::DeleteBreakpoint {
                file: file.to_string(),
                line,
            },
            None,
        )
    }

    fn reconcile_installed(&self, id: Uuid, reply: Tokens) -> Result<(), Error> {
        let placement = parse_placement(&reply)?;
        let store = self.breakpoints();
        let Some(mut brkpt) = store.get(id) else {
            debug!(target: "emudbg", "breakpoint {id} removed before emulator answer");
            return Ok(());
        };

        let event = match placement {
            Placement::At(line) if line == brkpt.line => BreakpointEvent::Placed(brkpt),
            Placement::At(line) => {
                let from = brkpt.line;
                brkpt.line = line;
                store.update(brkpt.clone());
                info!(target: "emudbg", "breakpoint {}:{from} relocated to line {line}", brkpt.file);
                BreakpointEvent::Relocated { brkpt, from }
            }
            Placement::Refused(reason) => {
                brkpt.enabled = false;
                store.update(brkpt.clone());
                info!(target: "emudbg", "breakpoint {}:{} disabled: {reason}", brkpt.file, brkpt.line);
                BreakpointEvent::Disabled(brkpt)
            }
        };
        self.hook().on_breakpoint(event);
        Ok(())
    }

    fn reconcile_requested(
        &self,
        file: String,
        requested: u32,
        reply: Tokens,
    ) -> Result<(), Error> {
        let event = match parse_placement(&reply)? {
            Placement::Refused(reason) => {
                info!(target: "emudbg", "breakpoint {file}:{requested} rejected: {reason}");
                BreakpointEvent::Rejected {
                    file,
                    line: requested,
                }
            }
            Placement::At(line) => {
                let store = self.breakpoints();
                if store.find(&file, line).is_some() {
                    debug!(target: "emudbg", "breakpoint {file}:{line} already exists");
                    return Ok(());
                }

                let brkpt = LogicalBreakpoint::new(file, line);
                store.add(brkpt.clone());
                if line == requested {
                    BreakpointEvent::Placed(brkpt)
                } else {
                    BreakpointEvent::Relocated {
                        brkpt,
                        from: requested,
                    }
                }
            }
        };
        self.hook().on_breakpoint(event);
        Ok(())
    }
}

/// Toggle breakpoint at source line.
///
/// Existing breakpoint is removed (and deleted from emulator if session is active).
/// Otherwise, with an active session the emulator is asked to place a breakpoint, without
/// session a logical breakpoint is created at the requested line and reconciled on the
/// next session start.
///
/// # Arguments
///
/// * `store`: breakpoint store, must be the one that the session uses
/// * `session`: active debug session if any
/// * `file`: source file name
/// * `line`: source line number
pub fn toggle_line_breakpoint(
    store: &dyn BreakpointStore,
    session: Option<&Target>,
    file: &str,
    line: u32,
) -> Result<Toggle, Error> {
    let session = session.filter(|target| target.state() != RunState::Terminated);

    if let Some(existing) = store.find(file, line) {
        store.remove(existing.id);
        if let Some(target) = session {
            target.clear_breakpoint(file, line)?;
        }
        return Ok(Toggle::Removed(existing));
    }

    match session {
        Some(target) => {
            target.set_breakpoint(file, line)?;
            Ok(Toggle::Requested)
        }
        None => {
            let brkpt = LogicalBreakpoint::new(file, line);
            store.add(brkpt.clone());
            Ok(Toggle::Added(brkpt))
        }
    }
}
