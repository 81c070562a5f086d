pub mod debugger;
pub mod emulator;
pub mod log;
pub mod ui;
