//! EOF container: header, body and raw bytes, with decoding and validation.
mod body;
mod code_info;
mod decode_helpers;
mod header;
/// Pretty printer for code sections. Enabled by the `std` feature.
pub mod printer;
/// Validation logic for EOF containers.
pub mod verification;

pub use body::EofBody;
pub use code_info::{CodeInfo, NON_RETURNING_FUNCTION};
pub use header::{
    EofHeader, CODE_SECTION_SIZE, CONTAINER_SECTION_SIZE, KIND_CODE, KIND_CODE_INFO,
    KIND_CONTAINER, KIND_DATA, KIND_TERMINAL, TYPES_ENTRY_SIZE,
};
pub use verification::*;

use alloy_primitives::{bytes, Bytes};
use core::{cmp::min, fmt};
use std::{vec, vec::Vec};

/// EOF magic in [u16] form.
pub const EOF_MAGIC: u16 = 0xEF00;

/// EOF magic number in array form.
pub static EOF_MAGIC_BYTES: Bytes = bytes!("ef00");

/// EVM Object Format (EOF) container.
///
/// Consists of a header, a body and the raw original bytes. The body
/// references parts of the raw bytes for code, sub-container and data
/// sections.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Eof {
    /// Header with the section directory.
    pub header: EofHeader,
    /// Body with the decoded section views.
    pub body: EofBody,
    /// Raw bytes the views point into.
    pub raw: Bytes,
}

impl Default for Eof {
    fn default() -> Self {
        let body = EofBody {
            // One non-returning code section holding a single STOP byte.
            code_info: vec![CodeInfo::new(0, code_info::NON_RETURNING_FUNCTION, 0)],
            code_section: vec![1],
            code: Bytes::from_static(&[0x00]),
            container_section: vec![],
            data_section: Bytes::new(),
            is_data_filled: true,
        };
        body.into_eof()
    }
}

impl Eof {
    /// Creates a new EOF container from the given body.
    pub fn new(body: EofBody) -> Self {
        body.into_eof()
    }

    /// Validates the container as initcode. See [`validate_eof`].
    pub fn validate(&self) -> Result<(), EofError> {
        validate_eof(self)
    }

    /// Validates the container in the given mode.
    pub fn validate_kind(&self, kind: ContainerKind) -> Result<(), EofError> {
        validate_eof_kind(self, kind)
    }

    /// Decodes and validates raw initcode bytes.
    pub fn validate_raw(bytes: Bytes) -> Result<Eof, EofError> {
        validate_raw_eof(bytes)
    }

    /// Returns the length of the header and body in bytes.
    pub fn size(&self) -> usize {
        self.header.size() + self.header.body_size()
    }

    /// Returns the raw container bytes.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Returns a slice of the data section.
    ///
    /// Out-of-range offsets yield an empty slice; the length is clamped to
    /// the available data.
    pub fn data_slice(&self, offset: usize, len: usize) -> &[u8] {
        self.body
            .data_section
            .get(offset..)
            .and_then(|bytes| bytes.get(..min(len, bytes.len())))
            .unwrap_or(&[])
    }

    /// Returns the data section.
    pub fn data(&self) -> &[u8] {
        &self.body.data_section
    }

    /// Re-encodes the container from its decoded sections.
    pub fn encode_slow(&self) -> Bytes {
        let mut buffer: Vec<u8> = Vec::with_capacity(self.size());
        self.header.encode(&mut buffer);
        self.body.encode(&mut buffer);
        buffer.into()
    }

    /// Decodes an EOF container whose declared size must match the input
    /// exactly, except that the data section may be truncated (callers
    /// validating runtime code reject unfilled data).
    pub fn decode(raw: Bytes) -> Result<Self, EofDecodeError> {
        let (header, _) = EofHeader::decode(&raw)?;
        let body = EofBody::decode(&raw, &header)?;
        Ok(Self { header, body, raw })
    }

    /// Decodes an EOF container in initcode fashion: bytes past the declared
    /// container size are split off and returned, and the data section may
    /// be shorter than declared.
    pub fn decode_lenient(mut raw: Bytes) -> Result<(Self, Bytes), EofDecodeError> {
        let (header, _) = EofHeader::decode(&raw)?;
        let eof_size = header.size() + header.body_size();
        let mut dangling = Bytes::new();
        if raw.len() > eof_size {
            dangling = raw.slice(eof_size..);
            raw = raw.slice(..eof_size);
        }
        let body = EofBody::decode(&raw, &header)?;
        Ok((Self { header, body, raw }, dangling))
    }
}

/// EOF decode errors: malformed header, directory or section sizes.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EofDecodeError {
    /// Short input while processing EOF.
    MissingInput,
    /// Short body while processing EOF.
    MissingBodyWithoutData,
    /// Body size is more than specified in the header.
    DanglingData,
    /// Data section is shorter than declared in a fully deployed container.
    DataNotFilled,
    /// Invalid types section size.
    InvalidCodeInfoSize,
    /// Invalid types section input value.
    InvalidCodeInfoInputValue {
        /// Number of inputs.
        value: u8,
    },
    /// Invalid types section output value.
    InvalidCodeInfoOutputValue {
        /// Number of outputs.
        value: u8,
    },
    /// Invalid types section max stack height value.
    InvalidCodeInfoMaxStackHeight {
        /// Declared maximum stack height.
        value: u16,
    },
    /// First types section entry must describe a non-returning section with
    /// zero inputs.
    InvalidFirstCodeInfo,
    /// Invalid EOF magic number.
    InvalidEOFMagicNumber,
    /// Invalid EOF version.
    InvalidEOFVersion,
    /// Invalid number for types kind.
    InvalidTypesKind,
    /// Invalid number for code kind.
    InvalidCodeKind,
    /// Invalid terminal byte.
    InvalidTerminalByte,
    /// Invalid data kind.
    InvalidDataKind,
    /// Invalid kind after code.
    InvalidKindAfterCode {
        /// Unexpected kind byte.
        invalid_kind: u8,
    },
    /// Mismatch of code and types section counts.
    MismatchCodeAndInfoSize,
    /// There should be at least one section size.
    NonSizes,
    /// Missing size.
    ShortInputForSizes,
    /// Size cant be zero.
    ZeroSize,
    /// Invalid code section count.
    TooManyCodeSections,
    /// Invalid number of code sections.
    ZeroCodeSections,
    /// Invalid container section count.
    TooManyContainerSections,
    /// Initcode size limit exceeded.
    InvalidEOFSize,
}

impl fmt::Display for EofDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingInput => "Short input while processing EOF",
            Self::MissingBodyWithoutData => "Short body while processing EOF",
            Self::DanglingData => "Body size is more than specified in the header",
            Self::DataNotFilled => "Data section is shorter than declared",
            Self::InvalidCodeInfoSize => "Invalid types section size",
            Self::InvalidCodeInfoInputValue { value } => {
                return write!(f, "Invalid types section input value: {value}");
            }
            Self::InvalidCodeInfoOutputValue { value } => {
                return write!(f, "Invalid types section output value: {value}");
            }
            Self::InvalidCodeInfoMaxStackHeight { value } => {
                return write!(f, "Invalid types section max stack height: {value}");
            }
            Self::InvalidFirstCodeInfo => "Invalid first types section",
            Self::InvalidEOFMagicNumber => "Invalid EOF magic number",
            Self::InvalidEOFVersion => "Invalid EOF version",
            Self::InvalidTypesKind => "Invalid number for types kind",
            Self::InvalidCodeKind => "Invalid number for code kind",
            Self::InvalidTerminalByte => "Invalid terminal byte",
            Self::InvalidDataKind => "Invalid data kind",
            Self::InvalidKindAfterCode { invalid_kind } => {
                return write!(f, "Invalid kind after code: {invalid_kind}");
            }
            Self::MismatchCodeAndInfoSize => "Mismatch of code and types sizes",
            Self::NonSizes => "There should be at least one size",
            Self::ShortInputForSizes => "Missing size",
            Self::ZeroSize => "Size cant be zero",
            Self::TooManyCodeSections => "Invalid code section count",
            Self::ZeroCodeSections => "Invalid number of code sections",
            Self::TooManyContainerSections => "Invalid container section count",
            Self::InvalidEOFSize => "Initcode size limit exceeded",
        };
        f.write_str(s)
    }
}

impl core::error::Error for EofDecodeError {}
