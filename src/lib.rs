//! Crate that decodes EOF (EVM Object Format) containers and statically
//! validates their code sections.
//!
//! Validation walks every code section once, checks instruction-stream
//! well-formedness and jump-target legality, then runs a single-pass
//! stack-bounds analysis whose observed maximum must match the height
//! declared in the type section. Sub-containers are validated recursively.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc as std;

/// Limits shared by the decoder and the validator.
pub mod constants;
/// EOF container types, decoding and validation.
pub mod eof;
pub mod opcode;
/// Byte-level read helpers.
pub mod utils;

pub use eof::{
    validate_code, validate_eof, validate_eof_codes, validate_eof_kind, validate_raw_eof,
    validate_raw_eof_kind, CodeInfo, ContainerKind, Eof, EofBody, EofDecodeError, EofError,
    EofHeader, EofValidationError, SubContainerTracker,
};
pub use opcode::OpCode;
