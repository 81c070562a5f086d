use crate::debugger::error::ProtocolError;
use itertools::Itertools;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// Number of registers of each kind.
pub const REGISTER_COUNT: usize = 32;
/// Number of 32-bit lanes in a vector register.
pub const VECTOR_LANES: usize = 16;
/// Hex digits of a single lane (or a scalar register).
const LANE_DIGITS: usize = 8;

pub type Lanes = [u32; VECTOR_LANES];

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display)]
pub enum RegisterKind {
    #[strum(serialize = "s")]
    Scalar,
    #[strum(serialize = "v")]
    Vector,
}

/// Value interpretation used by register views.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum RegisterFormat {
    #[default]
    #[strum(serialize = "int", serialize = "i")]
    Int,
    #[strum(serialize = "fp", serialize = "f")]
    Float,
}

impl RegisterFormat {
    /// Render a raw 32-bit word, integers are shown as hex, floats as `f32` bit pattern.
    pub fn render(self, word: u32) -> String {
        match self {
            RegisterFormat::Int => format!("{word:x}"),
            RegisterFormat::Float => f32::from_bits(word).to_string(),
        }
    }
}

/// Register reference like `s3` or `v31`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Register {
    pub kind: RegisterKind,
    pub index: usize,
}

impl Register {
    pub fn scalar(index: usize) -> Self {
        Self {
            kind: RegisterKind::Scalar,
            index,
        }
    }

    pub fn vector(index: usize) -> Self {
        Self {
            kind: RegisterKind::Vector,
            index,
        }
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.kind, self.index)
    }
}

impl FromStr for Register {
    type Err = ProtocolError;

    /// Parse register tag: a one-letter kind code followed by a decimal index.
    /// `v` means a vector register, any other letter means a scalar one.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidRegisterTag(tag.to_string());

        let mut chars = tag.chars();
        let kind = match chars.next().ok_or_else(invalid)? {
            'v' => RegisterKind::Vector,
            c if c.is_ascii_alphabetic() => RegisterKind::Scalar,
            _ => return Err(invalid()),
        };
        let index_str = chars.as_str();
        if index_str.is_empty() || !index_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let index: usize = index_str.parse().map_err(|_| invalid())?;
        if index >= REGISTER_COUNT {
            return Err(ProtocolError::RegisterOutOfRange(index));
        }

        Ok(Register { kind, index })
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RegisterValue {
    Scalar(u32),
    Vector(Lanes),
}

impl RegisterValue {
    /// Wire representation: 8 hex digits per word, most significant lane first.
    pub fn to_wire(&self) -> String {
        match self {
            RegisterValue::Scalar(word) => format!("{word:08x}"),
            RegisterValue::Vector(lanes) => lanes.iter().map(|l| format!("{l:08x}")).join(""),
        }
    }
}

fn parse_word(tag: &str, hex: &str) -> Result<u32, ProtocolError> {
    let invalid = || ProtocolError::InvalidRegisterValue {
        tag: tag.to_string(),
        value: hex.to_string(),
    };
    if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    u32::from_str_radix(hex, 16).map_err(|_| invalid())
}

fn parse_lanes(tag: &str, hex: &str) -> Result<Lanes, ProtocolError> {
    if hex.len() != VECTOR_LANES * LANE_DIGITS || !hex.is_ascii() {
        return Err(ProtocolError::InvalidRegisterValue {
            tag: tag.to_string(),
            value: hex.to_string(),
        });
    }

    let mut lanes = [0; VECTOR_LANES];
    for (lane, chunk) in lanes.iter_mut().zip(hex.as_bytes().chunks(LANE_DIGITS)) {
        // chunk is ascii, so it is a valid utf-8
        let chunk = std::str::from_utf8(chunk).unwrap_or_default();
        *lane = parse_word(tag, chunk)?;
    }
    Ok(lanes)
}

/// Single register change reported by emulator.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct RegisterUpdate {
    pub register: Register,
    pub value: RegisterValue,
}

/// Parse a flat sequence of `(tag, value)` pairs.
pub fn parse_updates(tokens: &[String]) -> Result<Vec<RegisterUpdate>, ProtocolError> {
    tokens
        .chunks(2)
        .map(|pair| {
            let tag = pair[0].as_str();
            let register: Register = tag.parse()?;
            let value = pair
                .get(1)
                .ok_or_else(|| ProtocolError::MissingRegisterValue(tag.to_string()))?;

            let value = match register.kind {
                RegisterKind::Scalar => RegisterValue::Scalar(parse_word(tag, value)?),
                RegisterKind::Vector => RegisterValue::Vector(parse_lanes(tag, value)?),
            };
            Ok(RegisterUpdate { register, value })
        })
        .collect()
}

/// Snapshot of all target registers.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RegisterFile {
    scalar: [u32; REGISTER_COUNT],
    vector: [Lanes; REGISTER_COUNT],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self {
            scalar: [0; REGISTER_COUNT],
            vector: [[0; VECTOR_LANES]; REGISTER_COUNT],
        }
    }
}

impl RegisterFile {
    pub fn apply(&mut self, updates: &[RegisterUpdate]) {
        for update in updates {
            match update.value {
                RegisterValue::Scalar(word) => self.scalar[update.register.index] = word,
                RegisterValue::Vector(lanes) => self.vector[update.register.index] = lanes,
            }
        }
    }

    pub fn scalar(&self, index: usize) -> Option<u32> {
        self.scalar.get(index).copied()
    }

    pub fn vector(&self, index: usize) -> Option<Lanes> {
        self.vector.get(index).copied()
    }

    pub fn value(&self, register: Register) -> Option<RegisterValue> {
        match register.kind {
            RegisterKind::Scalar => self.scalar(register.index).map(RegisterValue::Scalar),
            RegisterKind::Vector => self.vector(register.index).map(RegisterValue::Vector),
        }
    }
}
