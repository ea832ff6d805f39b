use super::{
    decode_helpers::{consume_u16, consume_u8},
    EofDecodeError,
};
use crate::constants::MAX_STACK_HEIGHT;
use std::vec::Vec;

/// A non-returning code section declares this output sentinel.
pub const NON_RETURNING_FUNCTION: u8 = 0x80;

/// Types section entry describing one code section: stack inputs, stack
/// outputs and the maximum stack height the section reaches.
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq, Copy, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodeInfo {
    /// `inputs` - 1 byte - `0x00-0x7F`
    ///
    /// Number of stack elements the code section consumes.
    pub inputs: u8,
    /// `outputs` - 1 byte - `0x00-0x80`
    ///
    /// Number of stack elements the code section returns, or 0x80 for
    /// non-returning sections.
    pub outputs: u8,
    /// `max_stack_height` - 2 bytes - `0x0000-0x03FF`
    ///
    /// Maximum stack height reached on entry to any instruction of the
    /// section, inputs included.
    pub max_stack_height: u16,
}

impl CodeInfo {
    /// Returns a new `CodeInfo` with the given inputs, outputs and max stack
    /// height.
    pub fn new(inputs: u8, outputs: u8, max_stack_height: u16) -> Self {
        Self {
            inputs,
            outputs,
            max_stack_height,
        }
    }

    /// Returns `true` if the section never returns to its caller.
    pub fn is_non_returning(&self) -> bool {
        self.outputs == NON_RETURNING_FUNCTION
    }

    /// Calculates the difference between the number of output and input
    /// stack elements.
    #[inline]
    pub const fn io_diff(&self) -> i32 {
        self.outputs as i32 - self.inputs as i32
    }

    /// Encodes the entry into the buffer.
    #[inline]
    pub fn encode(&self, buffer: &mut Vec<u8>) {
        buffer.push(self.inputs);
        buffer.push(self.outputs);
        buffer.extend_from_slice(&self.max_stack_height.to_be_bytes());
    }

    /// Decodes one entry from the input.
    #[inline]
    pub fn decode(input: &[u8]) -> Result<(Self, &[u8]), EofDecodeError> {
        let (input, inputs) = consume_u8(input)?;
        let (input, outputs) = consume_u8(input)?;
        let (input, max_stack_height) = consume_u16(input)?;
        let info = Self {
            inputs,
            outputs,
            max_stack_height,
        };
        info.validate()?;
        Ok((info, input))
    }

    /// Checks the value ranges of the entry.
    pub fn validate(&self) -> Result<(), EofDecodeError> {
        if self.inputs > 0x7F {
            return Err(EofDecodeError::InvalidCodeInfoInputValue { value: self.inputs });
        }
        if self.outputs > NON_RETURNING_FUNCTION {
            return Err(EofDecodeError::InvalidCodeInfoOutputValue {
                value: self.outputs,
            });
        }
        if self.max_stack_height > MAX_STACK_HEIGHT {
            return Err(EofDecodeError::InvalidCodeInfoMaxStackHeight {
                value: self.max_stack_height,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let info = CodeInfo::new(2, 3, 5);
        let mut buffer = Vec::new();
        info.encode(&mut buffer);
        assert_eq!(buffer, [0x02, 0x03, 0x00, 0x05]);
        let (decoded, rest) = CodeInfo::decode(&buffer).unwrap();
        assert_eq!(decoded, info);
        assert!(rest.is_empty());
    }

    #[test]
    fn non_returning_sentinel() {
        assert!(CodeInfo::new(0, NON_RETURNING_FUNCTION, 0).is_non_returning());
        assert!(!CodeInfo::new(0, 0x7F, 0x7F).is_non_returning());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert_eq!(
            CodeInfo::new(0x80, 0, 0).validate(),
            Err(EofDecodeError::InvalidCodeInfoInputValue { value: 0x80 })
        );
        assert_eq!(
            CodeInfo::new(0, 0x81, 0).validate(),
            Err(EofDecodeError::InvalidCodeInfoOutputValue { value: 0x81 })
        );
        assert_eq!(
            CodeInfo::new(0, 0, 0x400).validate(),
            Err(EofDecodeError::InvalidCodeInfoMaxStackHeight { value: 0x400 })
        );
    }
}
