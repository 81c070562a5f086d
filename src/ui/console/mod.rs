use crate::debugger::{
    self, toggle_line_breakpoint, BreakpointRegistry, BreakpointStore, Notifier,
    ProjectResolver, Session, TargetBuilder, Toggle,
};
use crate::ui::command::{Command, CommandError, CommandResult};
use crate::ui::config::Config;
use crate::ui::console::editor::{create_editor, CommandCompleter, RLHelper};
use crate::ui::console::help::help_for;
use crate::ui::console::hook::TerminalHook;
use crate::ui::console::print::style::{ErrorView, FilePathView, KeywordView};
use crate::ui::console::print::ExternalPrinter;
use crate::ui::console::view::{render_register, render_registers};
use crossterm::style::Stylize;
use rustyline::error::ReadlineError;
use rustyline::history::MemHistory;
use rustyline::Editor;
use std::io::BufRead;
use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

mod editor;
mod help;
pub mod hook;
pub mod print;
pub mod view;

const WELCOME_TEXT: &str = r#"
emudbg greets
"#;
const PROMT: &str = "(emudbg) ";

type EmuEditor = Editor<RLHelper, MemHistory>;

/// Alert printed to terminal, user must press Enter to continue.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn alert(&self, title: &str, message: &str) {
        crate::log::disable();
        println!("{}: {}", title.bold(), ErrorView::from(message));
        println!("press Enter to continue");
        let mut line = String::new();
        _ = std::io::stdin().lock().read_line(&mut line);
        crate::log::enable();
    }
}

pub struct AppBuilder {
    config: Config,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Launch debug session for the active project.
    pub fn build(self, resolver: &dyn ProjectResolver) -> anyhow::Result<TerminalApplication> {
        let (control_tx, control_rx) = mpsc::sync_channel::<Control>(0);
        let mut editor = create_editor(PROMT)?;

        let breakpoints = Arc::new(match self.config.breakpoints {
            None => BreakpointRegistry::new(),
            Some(ref path) => BreakpointRegistry::with_file(path)?,
        });

        let builder = TargetBuilder::new()
            .with_hooks(TerminalHook::new(ExternalPrinter::new(&mut editor)?))
            .with_breakpoints(breakpoints.clone());
        let session = debugger::launch(
            resolver,
            &TerminalNotifier,
            &self.config.launch_config(),
            builder,
        )?;

        if let Some(h) = editor.helper_mut() {
            h.completer
                .lock()
                .unwrap()
                .add_file_hints(breakpoints.all().into_iter().map(|b| b.file));
        }

        Ok(TerminalApplication {
            session,
            breakpoints,
            editor,
            control_tx,
            control_rx,
        })
    }
}

enum Control {
    /// New command from user received
    Cmd(String),
    /// Ctrl-C pressed
    Interrupt,
    /// Terminate application
    Terminate,
}

pub struct TerminalApplication {
    session: Session,
    breakpoints: Arc<BreakpointRegistry>,
    editor: EmuEditor,
    control_tx: SyncSender<Control>,
    control_rx: Receiver<Control>,
}

impl TerminalApplication {
    pub fn run(mut self) -> anyhow::Result<()> {
        let app_loop = AppLoop {
            session: self.session,
            breakpoints: self.breakpoints,
            control_rx: self.control_rx,
            completer: Arc::clone(
                &self
                    .editor
                    .helper_mut()
                    .ok_or_else(|| anyhow::anyhow!("editor helper not set"))?
                    .completer,
            ),
            printer: ExternalPrinter::new(&mut self.editor)?,
        };

        let mut editor = self.editor;
        let control_tx = self.control_tx;
        thread::spawn(move || {
            println!("{WELCOME_TEXT}");

            loop {
                let line = editor.readline(PROMT);
                match line {
                    Ok(input) => {
                        if input == "q" || input == "quit" {
                            _ = control_tx.send(Control::Terminate);
                            break;
                        }
                        _ = editor.add_history_entry(&input);
                        if control_tx.send(Control::Cmd(input)).is_err() {
                            break;
                        }
                    }
                    Err(ReadlineError::Interrupted) => {
                        if control_tx.send(Control::Interrupt).is_err() {
                            break;
                        }
                    }
                    Err(ReadlineError::Eof) => {
                        _ = control_tx.send(Control::Terminate);
                        break;
                    }
                    Err(err) => {
                        println!("error: {:#}", err);
                        _ = control_tx.send(Control::Terminate);
                        break;
                    }
                }
            }
        });

        app_loop.run();
        Ok(())
    }
}

struct AppLoop {
    session: Session,
    breakpoints: Arc<BreakpointRegistry>,
    control_rx: Receiver<Control>,
    printer: ExternalPrinter,
    completer: Arc<Mutex<CommandCompleter>>,
}

impl AppLoop {
    fn handle_command(&mut self, cmd: &str) -> CommandResult<()> {
        match Command::parse(cmd)? {
            Command::Resume => self.session.resume()?,
            Command::Suspend => self.session.suspend()?,
            Command::StepInto => self.session.step_into()?,
            Command::StepOver => self.session.step_over()?,
            Command::StepReturn => self.session.step_return()?,
            Command::ToggleBreakpoint { file, line } => {
                self.completer
                    .lock()
                    .unwrap()
                    .add_file_hints([file.clone()]);
                let toggle = toggle_line_breakpoint(
                    self.breakpoints.as_ref(),
                    Some(&*self.session),
                    &file,
                    line,
                )?;
                match toggle {
                    Toggle::Removed(brkpt) => self.printer.println(format!(
                        "Breakpoint {}:{} removed",
                        FilePathView::from(brkpt.file),
                        brkpt.line
                    )),
                    Toggle::Added(brkpt) => self.printer.println(format!(
                        "Breakpoint {}:{} added",
                        FilePathView::from(brkpt.file),
                        brkpt.line
                    )),
                    // emulator answer is reported by hook
                    Toggle::Requested => {}
                }
            }
            Command::ListBreakpoints => {
                let all = self.breakpoints.all();
                if all.is_empty() {
                    self.printer.println("No breakpoints");
                }
                for (num, brkpt) in all.into_iter().enumerate() {
                    let state = if brkpt.enabled { "" } else { " (disabled)" };
                    self.printer.println(format!(
                        "- Breakpoint {} at {}:{}{state}",
                        num + 1,
                        FilePathView::from(brkpt.file),
                        brkpt.line
                    ));
                }
            }
            Command::Registers { kind, format } => {
                let regs = self.session.registers();
                self.printer
                    .println(render_registers(&regs, kind, format));
            }
            Command::Register { register, format } => {
                let regs = self.session.registers();
                self.printer
                    .println(render_register(&regs, register, format));
            }
            Command::Memory { start, length } => {
                self.session.memory_block(start, length)?;
            }
            Command::Where => match self.session.top_frame() {
                Some(frame) => self.printer.println(format!(
                    "Stopped at {}:{}",
                    FilePathView::from(frame.file),
                    frame.line
                )),
                None if !self.session.is_started() => {
                    self.printer.println("Program is not loaded yet")
                }
                None => self
                    .printer
                    .println(format!("Program is {}", KeywordView::from(self.session.state()))),
            },
            Command::Help(command) => self.printer.println(help_for(command.as_deref())),
            Command::Quit | Command::SkipInput => {}
        }

        Ok(())
    }

    fn interrupt(&self) {
        if !self.session.can_suspend() {
            return;
        }
        if let Err(e) = self.session.suspend() {
            self.printer.println(ErrorView::from(e));
        }
    }

    fn run(mut self) {
        loop {
            let Ok(action) = self.control_rx.recv() else {
                break;
            };

            match action {
                Control::Cmd(command) => {
                    if let Err(e) = self.handle_command(&command) {
                        match e {
                            CommandError::Handle(ref err) if err.is_fatal() => {
                                self.printer.println(ErrorView::from("Shutdown debugger"));
                                self.printer
                                    .println(ErrorView::from(format!("Fatal error: {e:#}")));
                                break;
                            }
                            _ => {
                                self.printer
                                    .println(ErrorView::from(format!("Error: {e:#}")));
                            }
                        }
                    }
                }
                Control::Interrupt => self.interrupt(),
                Control::Terminate => {
                    break;
                }
            }
        }
    }
}
