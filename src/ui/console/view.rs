use crate::debugger::register::{
    Register, RegisterFile, RegisterKind, RegisterValue, REGISTER_COUNT,
};
use crate::debugger::{MemoryBlock, RegisterFormat};
use crate::ui::console::print::style::{AddressView, KeywordView, ValueView};
use itertools::Itertools;

const BYTES_PER_LINE: usize = 16;
const SCALARS_PER_LINE: usize = 4;

/// Render memory as a classic hex dump: address, bytes, printable characters.
pub fn render_memory(block: &MemoryBlock) -> String {
    let bytes = block.bytes();
    bytes
        .chunks(BYTES_PER_LINE)
        .enumerate()
        .map(|(i, chunk)| {
            let addr = block.start() + (i * BYTES_PER_LINE) as u64;
            let hex = chunk.iter().map(|b| format!("{b:02x}")).join(" ");
            let ascii: String = chunk
                .iter()
                .map(|&b| {
                    if b.is_ascii_graphic() {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            format!(
                "{}    {hex:<width$}    {ascii}",
                AddressView::from(format!("{addr:08x}")),
                width = BYTES_PER_LINE * 3 - 1
            )
        })
        .join("\n")
}

pub fn render_value(value: RegisterValue, format: RegisterFormat) -> String {
    match value {
        RegisterValue::Scalar(word) => format.render(word),
        RegisterValue::Vector(lanes) => lanes.iter().map(|&l| format.render(l)).join(" "),
    }
}

pub fn render_register(regs: &RegisterFile, register: Register, format: RegisterFormat) -> String {
    let value = regs
        .value(register)
        .map(|value| render_value(value, format));
    format!("{} {}", KeywordView::from(register), ValueView::from(value))
}

/// Render registers of selected kinds.
pub fn render_registers(
    regs: &RegisterFile,
    kind: Option<RegisterKind>,
    format: RegisterFormat,
) -> String {
    let mut lines = vec![];
    if kind != Some(RegisterKind::Vector) {
        let scalars = (0..REGISTER_COUNT)
            .map(|i| render_register(regs, Register::scalar(i), format))
            .collect::<Vec<_>>();
        lines.extend(scalars.chunks(SCALARS_PER_LINE).map(|chunk| chunk.join("  ")));
    }
    if kind != Some(RegisterKind::Scalar) {
        lines.extend(
            (0..REGISTER_COUNT).map(|i| render_register(regs, Register::vector(i), format)),
        );
    }
    lines.join("\n")
}
