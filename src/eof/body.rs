use super::{CodeInfo, Eof, EofDecodeError, EofHeader};
use alloy_primitives::Bytes;
use std::vec::Vec;

/// EOF container body.
///
/// Holds the types, code, sub-container and data section views. A body can
/// be assembled by hand and turned into a full container with
/// [`into_eof`](EofBody::into_eof).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EofBody {
    /// Types section entry for each code section.
    pub code_info: Vec<CodeInfo>,
    /// End offset of each code section within `code`.
    pub code_section: Vec<usize>,
    /// All code sections concatenated.
    pub code: Bytes,
    /// Sub-container sections.
    pub container_section: Vec<Bytes>,
    /// Data section.
    pub data_section: Bytes,
    /// Whether the data section matches the declared size. Containers that
    /// are not yet fully deployed may carry less.
    pub is_data_filled: bool,
}

impl EofBody {
    /// Returns the code section at the given index.
    pub fn code(&self, index: usize) -> Option<Bytes> {
        if index == 0 {
            // There is always at least one code section.
            return self
                .code_section
                .first()
                .map(|end| self.code.slice(..*end));
        }
        self.code_section
            .get(index)
            .map(|end| self.code.slice(self.code_section[index - 1]..*end))
    }

    /// Returns an iterator over the code sections.
    pub fn codes(&self) -> impl Iterator<Item = Bytes> + '_ {
        (0..self.code_section.len()).map(|index| self.code(index).unwrap_or_default())
    }

    /// Creates an EOF container from this body.
    pub fn into_eof(self) -> Eof {
        let mut prev_end = 0;
        let header = EofHeader {
            types_size: self.code_info.len() as u16 * 4,
            code_sizes: self
                .code_section
                .iter()
                .map(|end| {
                    let size = (end - prev_end) as u16;
                    prev_end = *end;
                    size
                })
                .collect(),
            container_sizes: self
                .container_section
                .iter()
                .map(|container| container.len() as u32)
                .collect(),
            data_size: self.data_section.len() as u16,
            sum_code_sizes: self.code.len(),
            sum_container_sizes: self.container_section.iter().map(|c| c.len()).sum(),
        };
        let mut buffer = Vec::new();
        header.encode(&mut buffer);
        self.encode(&mut buffer);
        Eof {
            header,
            body: self,
            raw: buffer.into(),
        }
    }

    /// Encodes this body into the given buffer.
    pub fn encode(&self, buffer: &mut Vec<u8>) {
        for info in &self.code_info {
            info.encode(buffer);
        }
        buffer.extend_from_slice(&self.code);
        for container in &self.container_section {
            buffer.extend_from_slice(container);
        }
        buffer.extend_from_slice(&self.data_section);
    }

    /// Decodes an EOF container body from the given buffer and header.
    pub fn decode(input: &Bytes, header: &EofHeader) -> Result<Self, EofDecodeError> {
        let header_len = header.size();
        let partial_body_len =
            header.types_size as usize + header.sum_code_sizes + header.sum_container_sizes;
        let full_body_len = partial_body_len + header.data_size as usize;

        if input.len() < header_len + partial_body_len {
            return Err(EofDecodeError::MissingBodyWithoutData);
        }
        if input.len() > header_len + full_body_len {
            return Err(EofDecodeError::DanglingData);
        }

        let mut body = EofBody::default();

        let mut types_input = &input[header_len..];
        for _ in 0..header.types_count() {
            let (info, rest) = CodeInfo::decode(types_input)?;
            types_input = rest;
            body.code_info.push(info);
        }

        // The entry section carries no inputs and never returns.
        let first = &body.code_info[0];
        if first.inputs != 0 || !first.is_non_returning() {
            return Err(EofDecodeError::InvalidFirstCodeInfo);
        }

        // Code sections, stored as end offsets into one buffer.
        let mut start = header_len + header.types_size as usize;
        let mut code_end = 0;
        for size in header.code_sizes.iter().map(|size| *size as usize) {
            code_end += size;
            body.code_section.push(code_end);
        }
        body.code = input.slice(start..start + header.sum_code_sizes);
        start += header.sum_code_sizes;

        for size in header.container_sizes.iter().map(|size| *size as usize) {
            body.container_section.push(input.slice(start..start + size));
            start += size;
        }

        body.data_section = input.slice(start..);
        body.is_data_filled = body.data_section.len() == header.data_size as usize;

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eof::NON_RETURNING_FUNCTION;
    use alloy_primitives::bytes;
    use std::vec;

    #[test]
    fn code_section_access() {
        let body = EofBody {
            code_info: vec![
                CodeInfo::new(0, NON_RETURNING_FUNCTION, 0),
                CodeInfo::new(0, 0, 0),
            ],
            code_section: vec![2, 4],
            code: bytes!("e50001e4"),
            ..Default::default()
        };
        assert_eq!(body.code(0).unwrap(), bytes!("e500"));
        assert_eq!(body.code(1).unwrap(), bytes!("01e4"));
        assert!(body.code(2).is_none());
        assert_eq!(body.codes().count(), 2);
    }

    #[test]
    fn into_eof_roundtrip() {
        let body = EofBody {
            code_info: vec![CodeInfo::new(0, NON_RETURNING_FUNCTION, 1)],
            code_section: vec![3],
            code: bytes!("335000"),
            container_section: vec![],
            data_section: bytes!("beef"),
            is_data_filled: true,
        };
        let eof = body.clone().into_eof();
        assert_eq!(eof.header.code_sizes, vec![3]);
        assert_eq!(eof.header.data_size, 2);
        let decoded = Eof::decode(eof.raw.clone()).unwrap();
        assert_eq!(decoded.body, body);
    }
}
