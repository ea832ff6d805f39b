use super::{
    decode_helpers::{consume_u16, consume_u8},
    EofDecodeError,
};
use crate::constants::{MAX_CODE_SECTIONS, MAX_CONTAINER_SECTIONS};
use std::vec::Vec;

/// EOF header with the section directory.
///
/// Holds the declared size of every section; the body decoder turns these
/// into byte ranges.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EofHeader {
    /// Size of the types section in bytes.
    ///
    /// Each entry describes one code section: inputs, outputs and max stack
    /// height.
    pub types_size: u16,
    /// Sizes of the code sections.
    ///
    /// A code size can't be zero.
    pub code_sizes: Vec<u16>,
    /// Sizes of the sub-container sections.
    pub container_sizes: Vec<u32>,
    /// Size of the data section.
    pub data_size: u16,
    /// Sum of code sizes.
    pub sum_code_sizes: usize,
    /// Sum of container sizes.
    pub sum_container_sizes: usize,
}

/// EOF header terminal kind, marking the end of the header.
pub const KIND_TERMINAL: u8 = 0;
/// EOF header types kind, marking the types section.
pub const KIND_CODE_INFO: u8 = 1;
/// EOF header code kind, marking the code section directory.
pub const KIND_CODE: u8 = 2;
/// EOF header container kind, marking the sub-container directory.
pub const KIND_CONTAINER: u8 = 3;
/// EOF header data kind, marking the data section.
pub const KIND_DATA: u8 = 0xFF;
/// Byte length of one code section size entry.
pub const CODE_SECTION_SIZE: usize = 2;
/// Byte length of one container section size entry.
pub const CONTAINER_SECTION_SIZE: usize = 4;
/// Byte length of one types section entry.
pub const TYPES_ENTRY_SIZE: usize = 4;

/// Consumes the code section directory from the header.
///
/// Returns the rest of the input, the list of sizes and their sum.
#[inline]
fn consume_header_code_section(input: &[u8]) -> Result<(&[u8], Vec<u16>, usize), EofDecodeError> {
    // `num_sections` is a 16-bit unsigned big-endian integer.
    let (input, num_sections) = consume_u16(input)?;
    if num_sections == 0 {
        return Err(EofDecodeError::NonSizes);
    }
    let num_sections = num_sections as usize;
    let byte_size = num_sections * CODE_SECTION_SIZE;
    if input.len() < byte_size {
        return Err(EofDecodeError::ShortInputForSizes);
    }
    let mut sizes = Vec::with_capacity(num_sections);
    let mut sum = 0;
    for i in 0..num_sections {
        // `code_size` is a 16-bit unsigned big-endian integer, non-zero.
        let code_size = u16::from_be_bytes([
            input[i * CODE_SECTION_SIZE],
            input[i * CODE_SECTION_SIZE + 1],
        ]);
        if code_size == 0 {
            return Err(EofDecodeError::ZeroSize);
        }
        sum += code_size as usize;
        sizes.push(code_size);
    }

    Ok((&input[byte_size..], sizes, sum))
}

/// Consumes the sub-container directory from the header.
///
/// Like [`consume_header_code_section`] but container sizes are four bytes.
#[inline]
fn consume_header_container_section(
    input: &[u8],
) -> Result<(&[u8], Vec<u32>, usize), EofDecodeError> {
    let (input, num_sections) = consume_u16(input)?;
    if num_sections == 0 {
        return Err(EofDecodeError::NonSizes);
    }
    let num_sections = num_sections as usize;
    let byte_size = num_sections * CONTAINER_SECTION_SIZE;
    if input.len() < byte_size {
        return Err(EofDecodeError::ShortInputForSizes);
    }
    let mut sizes = Vec::with_capacity(num_sections);
    let mut sum = 0;
    for i in 0..num_sections {
        // `container_size` is a 32-bit unsigned big-endian integer, non-zero.
        let container_size = u32::from_be_bytes(
            input[i * CONTAINER_SECTION_SIZE..(i + 1) * CONTAINER_SECTION_SIZE]
                .try_into()
                .unwrap_or_default(),
        );
        if container_size == 0 {
            return Err(EofDecodeError::ZeroSize);
        }
        sum += container_size as usize;
        sizes.push(container_size);
    }

    Ok((&input[byte_size..], sizes, sum))
}

impl EofHeader {
    /// Returns the length of the header in bytes.
    ///
    /// It is minimum 15 bytes, as there is at least one code section.
    pub fn size(&self) -> usize {
        2 + // magic
        1 + // version
        3 + // types directory
        3 + // code directory
        CODE_SECTION_SIZE * self.code_sizes.len() +
        if self.container_sizes.is_empty() { 0 } else { 3 + CONTAINER_SECTION_SIZE * self.container_sizes.len() } +
        3 + // data directory
        1 // terminator
    }

    /// Returns the number of types section entries.
    pub fn types_count(&self) -> usize {
        self.types_size as usize / TYPES_ENTRY_SIZE
    }

    /// Returns the declared body size: types, code, containers and data.
    pub fn body_size(&self) -> usize {
        self.types_size as usize
            + self.sum_code_sizes
            + self.sum_container_sizes
            + self.data_size as usize
    }

    /// Returns the declared size of the whole container.
    pub fn eof_size(&self) -> usize {
        self.size() + self.body_size()
    }

    /// Encodes the header into its binary form.
    pub fn encode(&self, buffer: &mut Vec<u8>) {
        // `magic` 2 bytes, 0xEF00
        buffer.extend_from_slice(&0xEF00u16.to_be_bytes());
        // `version` 1 byte, 0x01
        buffer.push(0x01);
        // `kind_types` 1 byte
        buffer.push(KIND_CODE_INFO);
        // `types_size` 2 bytes
        buffer.extend_from_slice(&self.types_size.to_be_bytes());
        // `kind_code` 1 byte
        buffer.push(KIND_CODE);
        // code section count and sizes
        buffer.extend_from_slice(&(self.code_sizes.len() as u16).to_be_bytes());
        for size in &self.code_sizes {
            buffer.extend_from_slice(&size.to_be_bytes());
        }
        // container directory is only present when there are sub-containers
        if !self.container_sizes.is_empty() {
            buffer.push(KIND_CONTAINER);
            buffer.extend_from_slice(&(self.container_sizes.len() as u16).to_be_bytes());
            for size in &self.container_sizes {
                buffer.extend_from_slice(&size.to_be_bytes());
            }
        }
        // `kind_data` 1 byte and `data_size` 2 bytes
        buffer.push(KIND_DATA);
        buffer.extend_from_slice(&self.data_size.to_be_bytes());
        // `terminator` 1 byte
        buffer.push(KIND_TERMINAL);
    }

    /// Decodes the header from its binary form:
    /// `0xEF000101 | u16 | 0x02 | u16 | u16 * n | [0x03 | u16 | u32 * m] | 0xFF | u16 | 0x00`
    pub fn decode(input: &[u8]) -> Result<(Self, &[u8]), EofDecodeError> {
        let mut header = EofHeader::default();

        // `magic` 2 bytes, 0xEF00
        let (input, magic) = consume_u16(input)?;
        if magic != 0xEF00 {
            return Err(EofDecodeError::InvalidEOFMagicNumber);
        }

        // `version` 1 byte, 0x01
        let (input, version) = consume_u8(input)?;
        if version != 0x01 {
            return Err(EofDecodeError::InvalidEOFVersion);
        }

        // `kind_types` 1 byte
        let (input, kind_types) = consume_u8(input)?;
        if kind_types != KIND_CODE_INFO {
            return Err(EofDecodeError::InvalidTypesKind);
        }

        // `types_size` 2 bytes, must hold whole entries
        let (input, types_size) = consume_u16(input)?;
        header.types_size = types_size;
        if header.types_size as usize % TYPES_ENTRY_SIZE != 0 {
            return Err(EofDecodeError::InvalidCodeInfoSize);
        }

        // `kind_code` 1 byte
        let (input, kind_code) = consume_u8(input)?;
        if kind_code != KIND_CODE {
            return Err(EofDecodeError::InvalidCodeKind);
        }

        // code section directory
        let (input, sizes, sum) = consume_header_code_section(input)?;
        if sizes.len() > MAX_CODE_SECTIONS {
            return Err(EofDecodeError::TooManyCodeSections);
        }
        if sizes.is_empty() {
            return Err(EofDecodeError::ZeroCodeSections);
        }
        if sizes.len() != header.types_count() {
            return Err(EofDecodeError::MismatchCodeAndInfoSize);
        }
        header.code_sizes = sizes;
        header.sum_code_sizes = sum;

        let (input, kind_container_or_data) = consume_u8(input)?;
        let input = match kind_container_or_data {
            KIND_CONTAINER => {
                let (input, sizes, sum) = consume_header_container_section(input)?;
                if sizes.len() > MAX_CONTAINER_SECTIONS {
                    return Err(EofDecodeError::TooManyContainerSections);
                }
                header.container_sizes = sizes;
                header.sum_container_sizes = sum;
                let (input, kind_data) = consume_u8(input)?;
                if kind_data != KIND_DATA {
                    return Err(EofDecodeError::InvalidDataKind);
                }
                input
            }
            KIND_DATA => input,
            invalid_kind => return Err(EofDecodeError::InvalidKindAfterCode { invalid_kind }),
        };

        // `data_size` 2 bytes; may exceed the actual content for containers
        // that are not yet fully deployed
        let (input, data_size) = consume_u16(input)?;
        header.data_size = data_size;

        // `terminator` 1 byte
        let (input, terminator) = consume_u8(input)?;
        if terminator != KIND_TERMINAL {
            return Err(EofDecodeError::InvalidTerminalByte);
        }

        Ok((header, input))
    }
}
