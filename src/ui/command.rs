//! Console commands and their parser.

use crate::debugger::register::{Register, RegisterFormat, RegisterKind};
use crate::debugger::Error;

pub const RESUME_COMMAND: &str = "resume";
pub const RESUME_COMMAND_SHORT: &str = "r";
pub const SUSPEND_COMMAND: &str = "suspend";
pub const SUSPEND_COMMAND_SHORT: &str = "p";
pub const STEP_INTO_COMMAND: &str = "step";
pub const STEP_INTO_COMMAND_SHORT: &str = "s";
pub const STEP_OVER_COMMAND: &str = "next";
pub const STEP_OVER_COMMAND_SHORT: &str = "n";
pub const STEP_RETURN_COMMAND: &str = "finish";
pub const BREAK_COMMAND: &str = "break";
pub const BREAK_COMMAND_SHORT: &str = "b";
pub const BREAKPOINTS_COMMAND: &str = "breakpoints";
pub const BREAKPOINTS_COMMAND_SHORT: &str = "bl";
pub const REGISTERS_COMMAND: &str = "regs";
pub const REGISTER_COMMAND: &str = "reg";
pub const MEMORY_COMMAND: &str = "mem";
pub const WHERE_COMMAND: &str = "where";
pub const HELP_COMMAND: &str = "help";
pub const HELP_COMMAND_SHORT: &str = "h";
pub const QUIT_COMMAND: &str = "quit";
pub const QUIT_COMMAND_SHORT: &str = "q";

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("malformed command: {0}")]
    Parsing(String),
    #[error(transparent)]
    Handle(#[from] Error),
}

pub type CommandResult<T> = Result<T, CommandError>;

/// User request to debugger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Resume,
    Suspend,
    StepInto,
    StepOver,
    StepReturn,
    ToggleBreakpoint {
        file: String,
        line: u32,
    },
    ListBreakpoints,
    /// Print all registers, or registers of a single kind.
    Registers {
        kind: Option<RegisterKind>,
        format: RegisterFormat,
    },
    Register {
        register: Register,
        format: RegisterFormat,
    },
    Memory {
        start: u64,
        length: usize,
    },
    Where,
    Help(Option<String>),
    Quit,
    SkipInput,
}

fn malformed(msg: impl Into<String>) -> CommandError {
    CommandError::Parsing(msg.into())
}

fn parse_format(arg: &str) -> CommandResult<RegisterFormat> {
    arg.parse()
        .map_err(|_| malformed(format!("unknown register format `{arg}`")))
}

/// Parse decimal or `0x` prefixed hex number.
fn parse_number(arg: &str) -> CommandResult<u64> {
    let parsed = match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => arg.parse(),
    };
    parsed.map_err(|_| malformed(format!("invalid number `{arg}`")))
}

impl Command {
    pub fn parse(input: &str) -> CommandResult<Command> {
        let mut args = input.split_whitespace();
        let Some(cmd) = args.next() else {
            return Ok(Command::SkipInput);
        };
        let args: Vec<&str> = args.collect();

        let no_args = |command: Command| {
            if args.is_empty() {
                Ok(command)
            } else {
                Err(malformed(format!("`{cmd}` takes no arguments")))
            }
        };

        match cmd {
            RESUME_COMMAND | RESUME_COMMAND_SHORT => no_args(Command::Resume),
            SUSPEND_COMMAND | SUSPEND_COMMAND_SHORT => no_args(Command::Suspend),
            STEP_INTO_COMMAND | STEP_INTO_COMMAND_SHORT => no_args(Command::StepInto),
            STEP_OVER_COMMAND | STEP_OVER_COMMAND_SHORT => no_args(Command::StepOver),
            STEP_RETURN_COMMAND => no_args(Command::StepReturn),
            BREAKPOINTS_COMMAND | BREAKPOINTS_COMMAND_SHORT => no_args(Command::ListBreakpoints),
            WHERE_COMMAND => no_args(Command::Where),
            QUIT_COMMAND | QUIT_COMMAND_SHORT => no_args(Command::Quit),
            HELP_COMMAND | HELP_COMMAND_SHORT => {
                Ok(Command::Help(args.first().map(|s| s.to_string())))
            }
            BREAK_COMMAND | BREAK_COMMAND_SHORT => {
                let [place] = args[..] else {
                    return Err(malformed("usage: break <file>:<line>"));
                };
                let (file, line) = place
                    .rsplit_once(':')
                    .filter(|(file, _)| !file.is_empty())
                    .ok_or_else(|| malformed("usage: break <file>:<line>"))?;
                let line = line
                    .parse()
                    .map_err(|_| malformed(format!("invalid line `{line}`")))?;
                Ok(Command::ToggleBreakpoint {
                    file: file.to_string(),
                    line,
                })
            }
            REGISTERS_COMMAND => {
                let mut kind = None;
                let mut format = RegisterFormat::default();
                for &arg in &args {
                    match arg {
                        "s" => kind = Some(RegisterKind::Scalar),
                        "v" => kind = Some(RegisterKind::Vector),
                        other => format = parse_format(other)?,
                    }
                }
                Ok(Command::Registers { kind, format })
            }
            REGISTER_COMMAND => {
                let (name, format) = match args[..] {
                    [name] => (name, RegisterFormat::default()),
                    [name, format] => (name, parse_format(format)?),
                    _ => return Err(malformed("usage: reg <name> [int|fp]")),
                };
                let register = name.parse().map_err(|e| malformed(format!("{e}")))?;
                Ok(Command::Register { register, format })
            }
            MEMORY_COMMAND => {
                let [start, length] = args[..] else {
                    return Err(malformed("usage: mem <address> <length>"));
                };
                let start = parse_number(start)?;
                let length = parse_number(length)?;
                let length = usize::try_from(length)
                    .map_err(|_| malformed(format!("length {length} is too large")))?;
                Ok(Command::Memory { start, length })
            }
            _ => Err(malformed(format!("unknown command `{cmd}`"))),
        }
    }
}
