use std::fmt::{Display, Formatter};
use strum_macros::IntoStaticStr;

/// Outbound emulator command.
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Command {
    Resume,
    Suspend,
    StepInto,
    StepOver,
    StepReturn,
    SetBreakpoint { file: String, line: u32 },
    DeleteBreakpoint { file: String, line: u32 },
    ReadMemory { start: u64, length: usize },
}

impl Command {
    /// Protocol verb of the command.
    pub fn verb(&self) -> &'static str {
        self.into()
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.verb())?;
        match self {
            Command::SetBreakpoint { file, line } | Command::DeleteBreakpoint { file, line } => {
                write!(f, " {file} {line}")
            }
            Command::ReadMemory { start, length } => write!(f, " {start} {length}"),
            _ => Ok(()),
        }
    }
}
