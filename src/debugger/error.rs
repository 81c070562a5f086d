use crate::debugger::RunState;

/// Malformed traffic received from the emulator.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("invalid line number `{0}`")]
    InvalidLine(String),
    #[error("invalid register tag `{0}`")]
    InvalidRegisterTag(String),
    #[error("register index {0} out of range")]
    RegisterOutOfRange(usize),
    #[error("register `{0}` has no value")]
    MissingRegisterValue(String),
    #[error("invalid register value `{value}` for `{tag}`")]
    InvalidRegisterValue { tag: String, value: String },
    #[error("invalid memory byte `{0}`")]
    InvalidByte(String),
    #[error("expected {expected} memory bytes, got {actual}")]
    MemoryLength { expected: usize, actual: usize },
    #[error("reply `{0}` without pending command")]
    UnexpectedReply(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- generic errors --------------------------------------------
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    // --------------------------------- launch errors ---------------------------------------------
    #[error("No project is currently selected")]
    NoProject,
    #[error("emulator path is not set")]
    EmulatorPathUnset,
    #[error("emulator `{0}` not found: {1}")]
    EmulatorNotFound(String, which::Error),
    #[error("spawn emulator `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    // --------------------------------- session errors --------------------------------------------
    #[error("emulator is disconnected")]
    Disconnected,
    #[error("`{op}` is not allowed while {state}")]
    InvalidState { op: &'static str, state: RunState },
    #[error("`{0}` is not supported by the emulator")]
    Unavailable(&'static str),
}

impl Error {
    /// Return a hint to an interface - continue debugging after error or stop whole session.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::IO(_) => false,
            Error::Protocol(_) => false,
            Error::InvalidState { .. } => false,
            Error::Unavailable(_) => false,

            // session can't be continued
            Error::NoProject => true,
            Error::EmulatorPathUnset => true,
            Error::EmulatorNotFound(_, _) => true,
            Error::Spawn { .. } => true,
            Error::Disconnected => true,
        }
    }
}

#[macro_export]
macro_rules! _error {
    ($log_fn: path, $res: expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "emudbg", "{:#}", e);
                None
            }
        }
    };
    ($log_fn: path, $res: expr, $msg: tt) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "emudbg", concat!($msg, " {:#}"), e);
                None
            }
        }
    };
}

/// Transforms `Result` into `Option` and logs an error if it occurs.
#[macro_export]
macro_rules! weak_error {
    ($res: expr) => {
        $crate::_error!(log::warn, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::warn, $res, $msg)
    };
}

/// Transforms `Result` into `Option` and put error into debug logs if it occurs.
#[macro_export]
macro_rules! muted_error {
    ($res: expr) => {
        $crate::_error!(log::debug, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::debug, $res, $msg)
    };
}
