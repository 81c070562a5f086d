pub const HELP: &str = r#"
Available debugger commands:

r, resume                                   -- continue program execution
p, suspend                                  -- stop running program (Ctrl-C does the same)
s, step                                     -- execute one source line
n, next                                     -- step over subroutine calls (not supported by emulator)
finish                                      -- execute until current subroutine returns (not supported by emulator)
b, break <file>:<line>                      -- set breakpoint or remove existing one
bl, breakpoints                             -- show all breakpoints
regs [s|v] [int|fp]                         -- show scalar and/or vector registers
reg <name> [int|fp]                         -- show single register, like `s1` or `v3`
mem <address> <length>                      -- read program memory
where                                       -- show current location
h, help <>|<command>                        -- show help
q, quit                                     -- exit the debugger
"#;

pub const HELP_BREAK: &str = "\
\x1b[32;1mbreak\x1b[0m
Set breakpoint at the source line, or remove breakpoint if it already exists.
Emulator may move breakpoint to the nearest line with code, or refuse it if there is no such line.
Breakpoints added without a running program are checked when the program starts.

Examples of usage:
b main.asm:12 - toggle breakpoint at line 12 of main.asm
";

pub const HELP_REGS: &str = "\
\x1b[32;1mregs\x1b[0m
Show register values. There are 32 scalar registers (s0..s31) and 32 vector registers (v0..v31),
each vector register has 16 lanes. Values shown as hex integers by default, use `fp` to show
them as floating point numbers.

Examples of usage:
regs - show all registers
regs v fp - show vector registers as floating point numbers
reg s3 - show scalar register 3
";

pub const HELP_MEM: &str = "\
\x1b[32;1mmem\x1b[0m
Read program memory. Address may be decimal or hex with `0x` prefix. Memory dump is printed
when emulator answers.

Examples of usage:
mem 0x1000 64 - read 64 bytes starting from address 0x1000
";

/// Return help text for the command, or a general help.
pub fn help_for(command: Option<&str>) -> &'static str {
    match command {
        Some("break") | Some("b") => HELP_BREAK,
        Some("regs") | Some("reg") => HELP_REGS,
        Some("mem") => HELP_MEM,
        _ => HELP,
    }
}
