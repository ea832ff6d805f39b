use super::EofDecodeError;

/// Consumes a single byte from the input, returning the rest of the input
/// and the byte.
#[inline]
pub(crate) fn consume_u8(input: &[u8]) -> Result<(&[u8], u8), EofDecodeError> {
    let Some((byte, rest)) = input.split_first() else {
        return Err(EofDecodeError::MissingInput);
    };
    Ok((rest, *byte))
}

/// Consumes a big-endian `u16` from the input, returning the rest of the
/// input and the value.
#[inline]
pub(crate) fn consume_u16(input: &[u8]) -> Result<(&[u8], u16), EofDecodeError> {
    let Some((bytes, rest)) = input.split_first_chunk::<2>() else {
        return Err(EofDecodeError::MissingInput);
    };
    Ok((rest, u16::from_be_bytes(*bytes)))
}
