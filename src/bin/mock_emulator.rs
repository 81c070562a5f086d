//! Emulator stand-in speaking the debugger line protocol over stdin/stdout.
//!
//! The program has `PROGRAM_END` lines of code, source file is `<image stem>.asm`.
//! Even lines have no code: breakpoints there are moved to the next line, breakpoints
//! after the program end are refused. `s0` holds current line, `v1` lanes hold
//! `line..line + 16`. Stepping past the last line finishes the program and closes the stream.

use emudbg::debugger::register::{RegisterValue, VECTOR_LANES};
use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};
use std::path::Path;

const PROGRAM_END: u32 = 20;

struct Machine {
    file: String,
    line: u32,
    running: bool,
    breakpoints: BTreeSet<u32>,
}

impl Machine {
    fn registers(&self) -> String {
        let mut lanes = [0; VECTOR_LANES];
        for (i, lane) in lanes.iter_mut().enumerate() {
            *lane = self.line + i as u32;
        }
        format!(
            "s0 {} v1 {}",
            RegisterValue::Scalar(self.line).to_wire(),
            RegisterValue::Vector(lanes).to_wire()
        )
    }

    fn location(&self) -> String {
        format!("{} {} {}", self.file, self.line, self.registers())
    }

    /// Handle command, return reply lines. `None` means the program finished.
    fn handle(&mut self, cmd: &str) -> Option<Vec<String>> {
        let args: Vec<&str> = cmd.split_whitespace().collect();
        let reply = match args.as_slice() {
            ["resume"] => {
                let mut out = vec!["running".to_string()];
                match self.breakpoints.range(self.line + 1..).next() {
                    Some(&line) => {
                        self.line = line;
                        out.push(format!("!breakpoint-hit {}", self.location()));
                    }
                    None => self.running = true,
                }
                out
            }
            ["suspend"] => {
                if self.running {
                    self.running = false;
                    self.line = PROGRAM_END;
                }
                vec![self.location()]
            }
            ["step-into"] => {
                if self.line >= PROGRAM_END {
                    return None;
                }
                self.line += 1;
                vec![self.location()]
            }
            ["set-breakpoint", _, line] => match line.parse::<u32>() {
                Ok(line) if line == 0 || line > PROGRAM_END => vec!["no-code".to_string()],
                Ok(line) => {
                    let line = if line % 2 == 0 { line + 1 } else { line };
                    self.breakpoints.insert(line);
                    vec![format!("breakpoint-set {line}")]
                }
                Err(_) => vec!["error bad-line".to_string()],
            },
            ["delete-breakpoint", _, line] => {
                if let Ok(line) = line.parse::<u32>() {
                    self.breakpoints.remove(&line);
                }
                vec!["breakpoint-deleted".to_string()]
            }
            ["read-memory", start, length] => {
                match (start.parse::<u64>(), length.parse::<u64>()) {
                    (Ok(start), Ok(length)) => vec![(start..start + length)
                        .map(|addr| format!("{:02x}", addr & 0xff))
                        .collect::<Vec<_>>()
                        .join(" ")],
                    _ => vec!["error bad-range".to_string()],
                }
            }
            _ => vec![format!("error unknown-command {cmd}")],
        };
        Some(reply)
    }
}

fn main() -> io::Result<()> {
    let image = std::env::args().nth(1).unwrap_or_else(|| "program.hex".to_string());
    let stem = Path::new(&image)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "program".to_string());

    let mut machine = Machine {
        file: format!("{stem}.asm"),
        line: 1,
        running: false,
        breakpoints: BTreeSet::new(),
    };

    let mut out = io::stdout().lock();
    writeln!(out, "* mock emulator, image {image}")?;
    writeln!(out, "!started {}", machine.location())?;
    out.flush()?;

    for cmd in io::stdin().lock().lines() {
        let cmd = cmd?;
        match machine.handle(cmd.trim()) {
            Some(lines) => {
                for line in lines {
                    writeln!(out, "{line}")?;
                }
            }
            None => {
                writeln!(out, "* program finished")?;
                out.flush()?;
                return Ok(());
            }
        }
        out.flush()?;
    }
    Ok(())
}
