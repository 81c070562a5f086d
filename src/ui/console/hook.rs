use crate::debugger::{
    BreakpointEvent, EventHook, MemoryBlock, ResumeReason, StackFrame, SuspendReason,
};
use crate::ui::console::print::style::{AddressView, FilePathView, KeywordView};
use crate::ui::console::print::ExternalPrinter;
use crate::ui::console::view::render_memory;

fn place(frame: &StackFrame) -> String {
    format!("{}:{}", FilePathView::from(&frame.file), frame.line)
}

/// Print session events over the prompt.
pub struct TerminalHook {
    printer: ExternalPrinter,
}

impl TerminalHook {
    pub fn new(printer: ExternalPrinter) -> Self {
        Self { printer }
    }
}

impl EventHook for TerminalHook {
    fn on_started(&self, frame: &StackFrame) {
        self.printer
            .println(format!("Program loaded, stopped at {}", place(frame)));
    }

    fn on_suspend(&self, reason: SuspendReason, frame: &StackFrame) {
        let msg = match reason {
            SuspendReason::Breakpoint => "Hit breakpoint at",
            SuspendReason::ClientRequest => "Suspended at",
            SuspendReason::StepEnd => "Step finished at",
            SuspendReason::Aborted => "Emulator did not receive the command, still at",
        };
        self.printer.println(format!("{msg} {}", place(frame)));
    }

    fn on_resume(&self, reason: ResumeReason) {
        if reason == ResumeReason::ClientRequest {
            self.printer.println("Running...");
        }
    }

    fn on_terminate(&self) {
        self.printer.println(format!(
            "Emulator terminated, type {} to exit",
            KeywordView::from("q")
        ));
    }

    fn on_memory_changed(&self, block: &MemoryBlock) {
        self.printer.println(format!(
            "Memory at {} ({} bytes):\n{}",
            AddressView::from(format!("{:#x}", block.start())),
            block.length(),
            render_memory(block)
        ));
    }

    fn on_breakpoint(&self, event: BreakpointEvent) {
        let msg = match event {
            BreakpointEvent::Placed(brkpt) => format!(
                "Breakpoint set at {}:{}",
                FilePathView::from(brkpt.file),
                brkpt.line
            ),
            BreakpointEvent::Relocated { brkpt, from } => format!(
                "Breakpoint {}:{from} moved to line {}",
                FilePathView::from(brkpt.file),
                brkpt.line
            ),
            BreakpointEvent::Disabled(brkpt) => format!(
                "Breakpoint {}:{} disabled, no code at this line",
                FilePathView::from(brkpt.file),
                brkpt.line
            ),
            BreakpointEvent::Rejected { file, line } => format!(
                "Can't set breakpoint at {}:{line}, no code at this line",
                FilePathView::from(file)
            ),
        };
        self.printer.println(msg);
    }
}
