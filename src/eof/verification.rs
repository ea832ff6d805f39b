//! Validation logic for EOF containers.
//!
//! A container is validated in two layers. Every code section runs through
//! [`validate_code`]: a structural pass over the instruction stream followed
//! by a single ascending pass of stack-bounds analysis. The container
//! dispatcher then recurses into sub-containers depth-first, assigning each
//! one the mode its parent references it in.

use crate::{
    constants::{MAX_INITCODE_SIZE, MAX_STACK_HEIGHT},
    eof::{CodeInfo, Eof, EofDecodeError},
    opcode::{self, OPCODE_INFO},
    utils::{read_i16, read_u16},
};
use alloy_primitives::Bytes;
use core::fmt;
use std::{vec, vec::Vec};

/// Decodes `raw` as initcode and validates it.
pub fn validate_raw_eof(raw: Bytes) -> Result<Eof, EofError> {
    validate_raw_eof_kind(raw, ContainerKind::Initcode)
}

/// Decodes `raw` in the given mode and validates it.
///
/// Initcode tolerates trailing bytes past the declared container size and a
/// truncated data section; runtime containers must match their declared
/// size exactly.
#[inline]
pub fn validate_raw_eof_kind(raw: Bytes, kind: ContainerKind) -> Result<Eof, EofError> {
    if raw.len() > MAX_INITCODE_SIZE {
        return Err(EofError::Decode(EofDecodeError::InvalidEOFSize));
    }
    let eof = decode_kind(raw, kind)?;
    validate_eof_kind(&eof, kind)?;
    Ok(eof)
}

/// Fully validates a decoded container as initcode.
///
/// Validation only happens on the deployment path, where the top-level
/// container is the initcode of a create transaction.
pub fn validate_eof(eof: &Eof) -> Result<(), EofError> {
    validate_eof_kind(eof, ContainerKind::Initcode)
}

/// Fully validates a decoded container in the given mode, recursing into
/// sub-containers depth-first, lowest index first. The first failure wins.
pub fn validate_eof_kind(eof: &Eof, kind: ContainerKind) -> Result<(), EofError> {
    // Sub-containers pending validation, popped depth-first.
    let mut pending: Vec<(Bytes, ContainerKind)> = Vec::new();
    validate_container(eof, kind, &mut pending)?;
    while let Some((raw, kind)) = pending.pop() {
        let sub = decode_kind(raw, kind)?;
        validate_container(&sub, kind, &mut pending)?;
    }
    Ok(())
}

/// Decodes one container in the given mode.
fn decode_kind(raw: Bytes, kind: ContainerKind) -> Result<Eof, EofDecodeError> {
    match kind {
        ContainerKind::Runtime => Eof::decode(raw),
        ContainerKind::Initcode => Eof::decode_lenient(raw).map(|(eof, _)| eof),
    }
}

/// Validates one container's code sections and queues its sub-containers.
fn validate_container(
    eof: &Eof,
    kind: ContainerKind,
    pending: &mut Vec<(Bytes, ContainerKind)>,
) -> Result<(), EofError> {
    if !kind.is_initcode() && !eof.body.is_data_filled {
        return Err(EofError::Decode(EofDecodeError::DataNotFilled));
    }
    let sub_kinds = validate_eof_codes(eof, kind)?;
    // Queued in reverse so the lowest index pops first.
    for (raw, sub_kind) in eof.body.container_section.iter().zip(sub_kinds).rev() {
        pending.push((raw.clone(), sub_kind));
    }
    Ok(())
}

/// Validates every code section of a decoded container, in index order,
/// without recursing into sub-containers.
///
/// Returns the mode each sub-container must be validated in: initcode when
/// targeted by a reachable `RETURNCONTRACT`, runtime otherwise.
pub fn validate_eof_codes(
    eof: &Eof,
    kind: ContainerKind,
) -> Result<Vec<ContainerKind>, EofValidationError> {
    let types = &eof.body.code_info;
    let containers = eof.body.container_section.len();
    let mut tracker = SubContainerTracker::new(containers);
    for (section, code) in eof.body.codes().enumerate() {
        validate_code(&code, section, types, containers, kind, &mut tracker)?;
    }
    Ok(tracker.into_kinds())
}

/// Mode a container is validated in.
///
/// Initcode containers are still being deployed: they may carry trailing
/// bytes past the declared size, their data section may be incomplete, and
/// `RETURNCONTRACT` is legal inside them. Runtime containers must match
/// their declared size exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
    /// Code that is still being deployed.
    Initcode,
    /// Fully deployed runtime code.
    Runtime,
}

impl ContainerKind {
    /// Returns `true` if the mode is initcode.
    pub const fn is_initcode(&self) -> bool {
        matches!(self, ContainerKind::Initcode)
    }
}

/// Records how code sections reference sub-containers while they are
/// validated.
///
/// A sub-container targeted by a reachable `RETURNCONTRACT` is validated as
/// initcode; every other sub-container is runtime code.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubContainerTracker {
    returncontract_targets: Vec<bool>,
}

impl SubContainerTracker {
    /// Creates a tracker for `containers` sub-containers.
    pub fn new(containers: usize) -> Self {
        Self {
            returncontract_targets: vec![false; containers],
        }
    }

    /// Marks `index` as the target of a `RETURNCONTRACT` instruction.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds; callers check the operand
    /// against the container count first.
    pub fn mark_returncontract(&mut self, index: usize) {
        self.returncontract_targets[index] = true;
    }

    /// Returns the mode each sub-container must be validated in.
    pub fn into_kinds(self) -> Vec<ContainerKind> {
        self.returncontract_targets
            .into_iter()
            .map(|targeted| {
                if targeted {
                    ContainerKind::Initcode
                } else {
                    ContainerKind::Runtime
                }
            })
            .collect()
    }
}

/// EOF error.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum EofError {
    /// Decoding error.
    Decode(EofDecodeError),
    /// Validation error.
    Validation(EofValidationError),
}

impl From<EofDecodeError> for EofError {
    fn from(err: EofDecodeError) -> Self {
        EofError::Decode(err)
    }
}

impl From<EofValidationError> for EofError {
    fn from(err: EofValidationError) -> Self {
        EofError::Validation(err)
    }
}

impl fmt::Display for EofError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EofError::Decode(e) => write!(f, "Container decode error: {e}"),
            EofError::Validation(e) => write!(f, "Container validation error: {e}"),
        }
    }
}

impl core::error::Error for EofError {}

/// EOF validation error.
///
/// Every rejection of a code section maps to exactly one of these kinds.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum EofValidationError {
    /// Opcode byte is undefined, or defined only outside EOF.
    UndefinedInstruction,
    /// An instruction's immediate extends past the section end.
    TruncatedImmediate,
    /// The last instruction of a section does not terminate control flow.
    InvalidCodeTermination,
    /// A branch or call target is out of range or does not name an
    /// instruction start.
    InvalidJumpDest,
    /// An instruction has no incoming control flow.
    UnreachableCode,
    /// Entry stack height is below what the instruction consumes.
    StackUnderflow {
        /// Smallest possible stack height on entry.
        have: i32,
        /// Height the instruction requires.
        required: i32,
    },
    /// An execution path may exceed the stack height limit.
    StackOverflow {
        /// Computed peak height.
        have: i32,
        /// Highest permitted height.
        limit: i32,
    },
    /// RETF height does not equal the section's declared outputs.
    InvalidOutputs {
        /// Stack height at the return.
        have: i32,
        /// Declared outputs.
        want: i32,
    },
    /// Entry bounds at a return point are not a single height, or a tail
    /// call's height does not balance the section interfaces.
    InvalidNumberOfOutputs {
        /// Smallest possible height.
        min: i32,
        /// Biggest possible height.
        max: i32,
    },
    /// A backward jump arrives with bounds that differ from the ones already
    /// established at its target.
    InvalidBackwardJump {
        /// Height arriving over the back-edge.
        want: i32,
        /// Height previously established at the target.
        have: i32,
    },
    /// Observed maximum stack height differs from the declared one.
    InvalidMaxStackHeight {
        /// Observed maximum.
        have: i32,
        /// Declared maximum.
        want: i32,
    },
    /// CALLF targets a non-returning section.
    CallfToNonReturning,
    /// A non-returning section returns, by RETF or by a tail call into a
    /// returning section.
    RetfInNonReturning,
    /// RETURNCONTRACT appears outside initcode.
    ReturncontractNotInInitcode,
}

impl fmt::Display for EofValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedInstruction => f.write_str("undefined instruction"),
            Self::TruncatedImmediate => f.write_str("truncated immediate"),
            Self::InvalidCodeTermination => f.write_str("invalid code termination"),
            Self::InvalidJumpDest => f.write_str("invalid jump destination"),
            Self::UnreachableCode => f.write_str("unreachable code"),
            Self::StackUnderflow { have, required } => {
                write!(f, "stack underflow: have {have}, require {required}")
            }
            Self::StackOverflow { have, limit } => {
                write!(f, "stack overflow: have {have}, limit {limit}")
            }
            Self::InvalidOutputs { have, want } => {
                write!(f, "invalid outputs: have {have}, want {want}")
            }
            Self::InvalidNumberOfOutputs { min, max } => {
                write!(f, "invalid number of outputs: stack bounds [{min}, {max}]")
            }
            Self::InvalidBackwardJump { want, have } => {
                write!(f, "invalid backward jump: want {want}, have {have}")
            }
            Self::InvalidMaxStackHeight { have, want } => {
                write!(f, "invalid max stack height: have {have}, want {want}")
            }
            Self::CallfToNonReturning => f.write_str("CALLF into a non-returning section"),
            Self::RetfInNonReturning => f.write_str("return from a non-returning section"),
            Self::ReturncontractNotInInitcode => f.write_str("RETURNCONTRACT outside initcode"),
        }
    }
}

impl core::error::Error for EofValidationError {}

/// Validates one code section.
///
/// A structural pass checks opcode legality, immediate completeness, branch
/// targets and termination; the stack-bounds pass then walks the same
/// stream in ascending order and reconciles the observed maximum height
/// with the declared one. `section` indexes this section's entry in
/// `types`; `containers` is the number of sub-containers the operands of
/// `EOFCREATE`/`RETURNCONTRACT` may name.
pub fn validate_code(
    code: &[u8],
    section: usize,
    types: &[CodeInfo],
    containers: usize,
    kind: ContainerKind,
    tracker: &mut SubContainerTracker,
) -> Result<(), EofValidationError> {
    scan_instructions(code)?;
    validate_stack_bounds(code, section, types, containers, kind, tracker)
}

/// Single left-to-right structural pass over a code section.
///
/// After it, every byte of the section is either an instruction start or an
/// immediate of one, every branch target names an instruction start, and
/// the last instruction terminates control flow.
fn scan_instructions(code: &[u8]) -> Result<(), EofValidationError> {
    let mut is_start = vec![false; code.len()];
    let mut branch_targets = Vec::new();
    let mut terminating = false;

    let mut i = 0;
    while i < code.len() {
        let op = code[i];
        let Some(info) = OPCODE_INFO[op as usize] else {
            return Err(EofValidationError::UndefinedInstruction);
        };
        if info.is_disabled_in_eof() {
            return Err(EofValidationError::UndefinedInstruction);
        }
        is_start[i] = true;

        let mut imm = info.immediate_size() as usize;
        if op == opcode::RJUMPV {
            // The count byte stores the table length minus one.
            if i + 1 >= code.len() {
                return Err(EofValidationError::TruncatedImmediate);
            }
            imm = 1 + 2 * (code[i + 1] as usize + 1);
        }
        if i + 1 + imm > code.len() {
            return Err(EofValidationError::TruncatedImmediate);
        }

        match op {
            opcode::RJUMP | opcode::RJUMPI => {
                let target = i as isize + 3 + read_i16(code, i + 1) as isize;
                branch_targets.push(target_in_bounds(target, code.len())?);
            }
            opcode::RJUMPV => {
                let count = code[i + 1] as usize + 1;
                let fallthrough = i as isize + 2 + 2 * count as isize;
                for entry in 0..count {
                    let target = fallthrough + read_i16(code, i + 2 + 2 * entry) as isize;
                    branch_targets.push(target_in_bounds(target, code.len())?);
                }
            }
            _ => {}
        }

        terminating = info.is_terminating();
        i += 1 + imm;
    }

    if !terminating {
        return Err(EofValidationError::InvalidCodeTermination);
    }

    // Branch targets may point forward, so alignment is checked once the
    // whole instruction map is known.
    for target in branch_targets {
        if !is_start[target] {
            return Err(EofValidationError::InvalidJumpDest);
        }
    }
    Ok(())
}

#[inline]
fn target_in_bounds(target: isize, len: usize) -> Result<usize, EofValidationError> {
    if target < 0 || target >= len as isize {
        return Err(EofValidationError::InvalidJumpDest);
    }
    Ok(target as usize)
}

/// Closed interval of stack heights possible on entry to an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Bounds {
    min: i32,
    max: i32,
}

/// Propagates exit bounds from the instruction at `from` to a successor.
///
/// Forward edges set the target interval on first arrival and widen it on
/// later ones. A back-edge closes a loop only if the intervals already
/// agree; it never widens.
fn propagate(
    entry: &mut [Option<Bounds>],
    from: usize,
    target: usize,
    exit: Bounds,
) -> Result<(), EofValidationError> {
    if target > from {
        entry[target] = Some(match entry[target] {
            None => exit,
            Some(prev) => Bounds {
                min: core::cmp::min(prev.min, exit.min),
                max: core::cmp::max(prev.max, exit.max),
            },
        });
        return Ok(());
    }
    let Some(prev) = entry[target] else {
        // Every instruction start at or below `from` has been visited, so a
        // backward target without bounds cannot occur for well-formed input.
        return Err(EofValidationError::InvalidBackwardJump {
            want: exit.max,
            have: 0,
        });
    };
    if prev.max != exit.max {
        return Err(EofValidationError::InvalidBackwardJump {
            want: exit.max,
            have: prev.max,
        });
    }
    if prev.min != exit.min {
        return Err(EofValidationError::InvalidBackwardJump {
            want: exit.min,
            have: prev.min,
        });
    }
    Ok(())
}

/// Single ascending pass of stack-bounds analysis over a structurally valid
/// code section.
fn validate_stack_bounds(
    code: &[u8],
    section: usize,
    types: &[CodeInfo],
    containers: usize,
    kind: ContainerKind,
    tracker: &mut SubContainerTracker,
) -> Result<(), EofValidationError> {
    let this_type = &types[section];
    let inputs = this_type.inputs as i32;
    let limit = MAX_STACK_HEIGHT as i32;

    // Entry bounds per byte offset; only instruction starts are ever set.
    let mut entry: Vec<Option<Bounds>> = vec![None; code.len()];
    entry[0] = Some(Bounds {
        min: inputs,
        max: inputs,
    });
    let mut max_seen = inputs;

    let mut i = 0;
    while i < code.len() {
        let op = code[i];
        let Some(info) = OPCODE_INFO[op as usize] else {
            return Err(EofValidationError::UndefinedInstruction);
        };

        let Some(bounds) = entry[i] else {
            return Err(EofValidationError::UnreachableCode);
        };
        max_seen = core::cmp::max(max_seen, bounds.max);

        let mut imm = info.immediate_size() as usize;
        if op == opcode::RJUMPV {
            imm = 1 + 2 * (code[i + 1] as usize + 1);
        }

        // Stack requirement and height change, with the cross-section and
        // depth-operand cases folded in.
        let mut requirement = info.inputs() as i32;
        let mut diff = info.io_diff() as i32;
        match op {
            opcode::CALLF => {
                let target = read_u16(code, i + 1) as usize;
                let Some(target_type) = types.get(target) else {
                    return Err(EofValidationError::InvalidJumpDest);
                };
                requirement = target_type.inputs as i32;
                if bounds.min < requirement {
                    return Err(EofValidationError::StackUnderflow {
                        have: bounds.min,
                        required: requirement,
                    });
                }
                let peak =
                    bounds.max + target_type.max_stack_height as i32 - target_type.inputs as i32;
                if peak > limit {
                    return Err(EofValidationError::StackOverflow { have: peak, limit });
                }
                if target_type.is_non_returning() {
                    return Err(EofValidationError::CallfToNonReturning);
                }
                diff = target_type.io_diff();
            }
            opcode::JUMPF => {
                let target = read_u16(code, i + 1) as usize;
                let Some(target_type) = types.get(target) else {
                    return Err(EofValidationError::InvalidJumpDest);
                };
                let peak =
                    bounds.max + target_type.max_stack_height as i32 - target_type.inputs as i32;
                if peak > limit {
                    return Err(EofValidationError::StackOverflow { have: peak, limit });
                }
                if target_type.is_non_returning() {
                    requirement = target_type.inputs as i32;
                } else {
                    // A tail call into a returning section is itself a return.
                    if this_type.is_non_returning() {
                        return Err(EofValidationError::RetfInNonReturning);
                    }
                    if bounds.min != bounds.max {
                        return Err(EofValidationError::InvalidNumberOfOutputs {
                            min: bounds.min,
                            max: bounds.max,
                        });
                    }
                    let want = this_type.outputs as i32 + target_type.inputs as i32
                        - target_type.outputs as i32;
                    if bounds.max != want {
                        return Err(EofValidationError::InvalidNumberOfOutputs {
                            min: bounds.min,
                            max: bounds.max,
                        });
                    }
                }
            }
            opcode::RETF => {
                if this_type.is_non_returning() {
                    return Err(EofValidationError::RetfInNonReturning);
                }
                if bounds.min != bounds.max {
                    return Err(EofValidationError::InvalidNumberOfOutputs {
                        min: bounds.min,
                        max: bounds.max,
                    });
                }
                let want = this_type.outputs as i32;
                if bounds.max != want {
                    return Err(EofValidationError::InvalidOutputs {
                        have: bounds.max,
                        want,
                    });
                }
            }
            opcode::DUPN | opcode::SWAPN => {
                // Operand is the zero-based depth.
                requirement = code[i + 1] as i32 + 2;
            }
            opcode::EXCHANGE => {
                let operand = code[i + 1];
                let n = (operand >> 4) as i32 + 1;
                let m = (operand & 0x0F) as i32 + 1;
                requirement = n + m + 1;
            }
            opcode::EOFCREATE => {
                if code[i + 1] as usize >= containers {
                    return Err(EofValidationError::InvalidJumpDest);
                }
            }
            opcode::RETURNCONTRACT => {
                let index = code[i + 1] as usize;
                if index >= containers {
                    return Err(EofValidationError::InvalidJumpDest);
                }
                if !kind.is_initcode() {
                    return Err(EofValidationError::ReturncontractNotInInitcode);
                }
                tracker.mark_returncontract(index);
            }
            _ => {}
        }

        if bounds.min < requirement {
            return Err(EofValidationError::StackUnderflow {
                have: bounds.min,
                required: requirement,
            });
        }

        let exit = Bounds {
            min: bounds.min + diff,
            max: bounds.max + diff,
        };
        let fallthrough = i + 1 + imm;

        match op {
            opcode::RJUMP => {
                let target = (i as isize + 3 + read_i16(code, i + 1) as isize) as usize;
                propagate(&mut entry, i, target, exit)?;
            }
            opcode::RJUMPI => {
                propagate(&mut entry, i, fallthrough, exit)?;
                let target = (i as isize + 3 + read_i16(code, i + 1) as isize) as usize;
                propagate(&mut entry, i, target, exit)?;
            }
            opcode::RJUMPV => {
                propagate(&mut entry, i, fallthrough, exit)?;
                let count = code[i + 1] as usize + 1;
                for entry_index in 0..count {
                    let offset = read_i16(code, i + 2 + 2 * entry_index) as isize;
                    let target = (fallthrough as isize + offset) as usize;
                    propagate(&mut entry, i, target, exit)?;
                }
            }
            _ => {
                if !info.is_terminating() {
                    propagate(&mut entry, i, fallthrough, exit)?;
                }
            }
        }

        i = fallthrough;
    }

    if max_seen > limit {
        return Err(EofValidationError::StackOverflow {
            have: max_seen,
            limit,
        });
    }
    if max_seen != this_type.max_stack_height as i32 {
        return Err(EofValidationError::InvalidMaxStackHeight {
            have: max_seen,
            want: this_type.max_stack_height as i32,
        });
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::eof::{EofBody, NON_RETURNING_FUNCTION};
    use crate::opcode::*;
    use alloy_primitives::bytes;

    fn check_section(
        code: &[u8],
        types: &[CodeInfo],
        expect: Result<(), EofValidationError>,
    ) {
        let mut tracker = SubContainerTracker::new(0);
        assert_eq!(
            validate_code(code, 0, types, 0, ContainerKind::Runtime, &mut tracker),
            expect,
            "code: {code:02x?}"
        );
    }

    fn info(inputs: u8, outputs: u8, max_stack_height: u16) -> CodeInfo {
        CodeInfo::new(inputs, outputs, max_stack_height)
    }

    fn build_eof(types: &[CodeInfo], sections: &[&[u8]]) -> Eof {
        build_eof_with(types, sections, Vec::new(), Bytes::new())
    }

    fn build_eof_with(
        types: &[CodeInfo],
        sections: &[&[u8]],
        container_section: Vec<Bytes>,
        data_section: Bytes,
    ) -> Eof {
        let mut code = Vec::new();
        let mut ends = Vec::new();
        for section in sections {
            code.extend_from_slice(section);
            ends.push(code.len());
        }
        EofBody {
            code_info: types.to_vec(),
            code_section: ends,
            code: code.into(),
            container_section,
            data_section,
            is_data_filled: true,
        }
        .into_eof()
    }

    #[test]
    fn simple_program() {
        check_section(&[CALLER, POP, STOP], &[info(0, 0, 1)], Ok(()));
    }

    #[test]
    fn callf_self() {
        check_section(&[CALLF, 0x00, 0x00, STOP], &[info(0, 0, 0)], Ok(()));
    }

    #[test]
    fn callf_after_push() {
        check_section(
            &[ADDRESS, CALLF, 0x00, 0x00, STOP],
            &[info(0, 0, 1)],
            Ok(()),
        );
    }

    #[test]
    fn missing_termination() {
        check_section(
            &[CALLER, POP],
            &[info(0, 0, 1)],
            Err(EofValidationError::InvalidCodeTermination),
        );
    }

    #[test]
    fn unreachable_after_rjump() {
        check_section(
            &[RJUMP, 0x00, 0x01, CALLER, STOP],
            &[info(0, 0, 0)],
            Err(EofValidationError::UnreachableCode),
        );
    }

    #[test]
    fn underflow_on_add() {
        check_section(
            &[PUSH1, 0x42, ADD, STOP],
            &[info(0, 0, 1)],
            Err(EofValidationError::StackUnderflow {
                have: 1,
                required: 2,
            }),
        );
    }

    #[test]
    fn declared_max_height_mismatch() {
        check_section(
            &[PUSH1, 0x42, POP, STOP],
            &[info(0, 0, 2)],
            Err(EofValidationError::InvalidMaxStackHeight { have: 1, want: 2 }),
        );
    }

    #[test]
    fn rjumpi_into_immediate() {
        check_section(
            &[PUSH0, RJUMPI, 0x00, 0x01, PUSH1, 0x42, POP, STOP],
            &[info(0, 0, 1)],
            Err(EofValidationError::InvalidJumpDest),
        );
    }

    #[test]
    fn rjumpv_into_immediate() {
        check_section(
            &[
                PUSH0, RJUMPV, 0x01, 0x00, 0x01, 0x00, 0x02, PUSH1, 0x42, POP, STOP,
            ],
            &[info(0, 0, 1)],
            Err(EofValidationError::InvalidJumpDest),
        );
    }

    #[test]
    fn truncated_rjumpv_table() {
        check_section(
            &[PUSH0, RJUMPV, 0x00, STOP],
            &[info(0, 0, 1)],
            Err(EofValidationError::TruncatedImmediate),
        );
    }

    #[test]
    fn truncated_push_immediate() {
        check_section(
            &[PUSH2, 0x00],
            &[info(0, 0, 1)],
            Err(EofValidationError::TruncatedImmediate),
        );
    }

    #[test]
    fn undefined_and_disabled_instructions() {
        check_section(
            &[0xEF, STOP],
            &[info(0, 0, 0)],
            Err(EofValidationError::UndefinedInstruction),
        );
        // Legacy-only opcodes are undefined inside EOF.
        check_section(
            &[PUSH0, JUMP, STOP],
            &[info(0, 0, 1)],
            Err(EofValidationError::UndefinedInstruction),
        );
    }

    #[test]
    fn unreachable_between_terminator_and_backjump_target() {
        check_section(
            &[
                RJUMP, 0x00, 0x03, JUMPDEST, JUMPDEST, RETURN, PUSH1, 20, PUSH1, 39, PUSH1, 0x00,
                DATACOPY, PUSH1, 20, PUSH1, 0x00, RJUMP, 0xFF, 0xEF,
            ],
            &[info(0, 0, 3)],
            Err(EofValidationError::UnreachableCode),
        );
    }

    #[test]
    fn rjumpi_over_terminator() {
        check_section(
            &[
                PUSH1, 1, RJUMPI, 0x00, 0x03, JUMPDEST, JUMPDEST, STOP, PUSH1, 20, PUSH1, 39,
                PUSH1, 0x00, DATACOPY, PUSH1, 20, PUSH1, 0x00, RETURN,
            ],
            &[info(0, 0, 3)],
            Ok(()),
        );
    }

    #[test]
    fn rjumpv_over_terminator() {
        check_section(
            &[
                PUSH1, 1, RJUMPV, 0x01, 0x00, 0x03, 0xFF, 0xF8, JUMPDEST, JUMPDEST, STOP, PUSH1,
                20, PUSH1, 39, PUSH1, 0x00, DATACOPY, PUSH1, 20, PUSH1, 0x00, RETURN,
            ],
            &[info(0, 0, 3)],
            Ok(()),
        );
    }

    #[test]
    fn stop_stop_invalid() {
        check_section(
            &[STOP, STOP, INVALID],
            &[info(0, 0, 0)],
            Err(EofValidationError::UnreachableCode),
        );
    }

    #[test]
    fn retf_wrong_outputs() {
        check_section(
            &[RETF],
            &[info(0, 1, 0)],
            Err(EofValidationError::InvalidOutputs { have: 0, want: 1 }),
        );
    }

    #[test]
    fn retf_matching_outputs() {
        check_section(&[RETF], &[info(3, 3, 3)], Ok(()));
    }

    #[test]
    fn retf_with_widened_bounds() {
        // One branch pushes before the merge, so the bounds at RETF are not
        // a single height.
        check_section(
            &[PUSH0, RJUMPI, 0x00, 0x01, PUSH0, RETF],
            &[info(1, 1, 2)],
            Err(EofValidationError::InvalidNumberOfOutputs { min: 1, max: 2 }),
        );
    }

    #[test]
    fn retf_in_non_returning_section() {
        check_section(
            &[RETF],
            &[info(0, NON_RETURNING_FUNCTION, 0)],
            Err(EofValidationError::RetfInNonReturning),
        );
    }

    #[test]
    fn callf_into_returning_section() {
        check_section(
            &[CALLF, 0x00, 0x01, POP, STOP],
            &[info(0, 0, 1), info(0, 1, 1)],
            Ok(()),
        );
    }

    #[test]
    fn callf_with_arguments() {
        check_section(
            &[ORIGIN, ORIGIN, CALLF, 0x00, 0x01, POP, RETF],
            &[info(0, 0, 2), info(2, 1, 2)],
            Ok(()),
        );
    }

    #[test]
    fn callf_underflow() {
        check_section(
            &[ORIGIN, CALLF, 0x00, 0x01, POP, STOP],
            &[info(0, 0, 1), info(2, 1, 2)],
            Err(EofValidationError::StackUnderflow {
                have: 1,
                required: 2,
            }),
        );
    }

    #[test]
    fn callf_to_non_returning() {
        check_section(
            &[CALLF, 0x00, 0x01, STOP],
            &[info(0, 0, 0), info(0, NON_RETURNING_FUNCTION, 0)],
            Err(EofValidationError::CallfToNonReturning),
        );
    }

    #[test]
    fn callf_section_out_of_bounds() {
        check_section(
            &[CALLF, 0xFF, 0xFF, STOP],
            &[info(0, 0, 0)],
            Err(EofValidationError::InvalidJumpDest),
        );
    }

    #[test]
    fn callf_stack_overflow() {
        check_section(
            &[PUSH0, PUSH0, CALLF, 0x00, 0x01, STOP],
            &[info(0, 0, 2), info(1, 1, 1023)],
            Err(EofValidationError::StackOverflow {
                have: 1024,
                limit: 1023,
            }),
        );
    }

    #[test]
    fn observed_height_above_limit() {
        let mut code = vec![PUSH0; 1024];
        code.push(STOP);
        check_section(
            &code,
            &[info(0, 0, 1023)],
            Err(EofValidationError::StackOverflow {
                have: 1024,
                limit: 1023,
            }),
        );
    }

    #[test]
    fn jumpf_to_non_returning() {
        check_section(
            &[JUMPF, 0x00, 0x01],
            &[
                info(0, NON_RETURNING_FUNCTION, 0),
                info(0, NON_RETURNING_FUNCTION, 0),
            ],
            Ok(()),
        );
    }

    #[test]
    fn jumpf_non_returning_underflow() {
        check_section(
            &[PUSH0, JUMPF, 0x00, 0x01],
            &[
                info(0, NON_RETURNING_FUNCTION, 1),
                info(2, NON_RETURNING_FUNCTION, 2),
            ],
            Err(EofValidationError::StackUnderflow {
                have: 1,
                required: 2,
            }),
        );
    }

    #[test]
    fn jumpf_returning_tail() {
        check_section(
            &[PUSH0, PUSH0, JUMPF, 0x00, 0x01],
            &[info(0, 2, 2), info(1, 1, 1)],
            Ok(()),
        );
    }

    #[test]
    fn jumpf_returning_tail_wrong_height() {
        check_section(
            &[PUSH0, JUMPF, 0x00, 0x01],
            &[info(0, 2, 1), info(1, 1, 1)],
            Err(EofValidationError::InvalidNumberOfOutputs { min: 1, max: 1 }),
        );
    }

    #[test]
    fn jumpf_returning_tail_in_non_returning_section() {
        check_section(
            &[PUSH0, JUMPF, 0x00, 0x01],
            &[info(0, NON_RETURNING_FUNCTION, 1), info(1, 1, 1)],
            Err(EofValidationError::RetfInNonReturning),
        );
    }

    #[test]
    fn jumpf_section_out_of_bounds() {
        check_section(
            &[JUMPF, 0x00, 0x02],
            &[info(0, NON_RETURNING_FUNCTION, 0)],
            Err(EofValidationError::InvalidJumpDest),
        );
    }

    #[test]
    fn dupn_requirements() {
        check_section(
            &[PUSH0, PUSH0, PUSH0, DUPN, 0x01, STOP],
            &[info(0, 0, 4)],
            Ok(()),
        );
        check_section(
            &[PUSH0, PUSH0, DUPN, 0x01, STOP],
            &[info(0, 0, 3)],
            Err(EofValidationError::StackUnderflow {
                have: 2,
                required: 3,
            }),
        );
    }

    #[test]
    fn swapn_requirements() {
        check_section(
            &[PUSH0, PUSH0, PUSH0, SWAPN, 0x01, STOP],
            &[info(0, 0, 3)],
            Ok(()),
        );
        check_section(
            &[PUSH0, PUSH0, SWAPN, 0x01, STOP],
            &[info(0, 0, 2)],
            Err(EofValidationError::StackUnderflow {
                have: 2,
                required: 3,
            }),
        );
    }

    #[test]
    fn exchange_requirements() {
        check_section(
            &[PUSH0, PUSH0, PUSH0, EXCHANGE, 0x00, STOP],
            &[info(0, 0, 3)],
            Ok(()),
        );
        check_section(
            &[PUSH0, PUSH0, EXCHANGE, 0x00, STOP],
            &[info(0, 0, 2)],
            Err(EofValidationError::StackUnderflow {
                have: 2,
                required: 3,
            }),
        );
    }

    #[test]
    fn backward_jump_balanced_loop() {
        // RJUMPI back to the entry with the same bounds closes the loop.
        check_section(
            &[PUSH1, 1, RJUMPI, 0xFF, 0xFB, STOP],
            &[info(0, 0, 1)],
            Ok(()),
        );
        // RJUMP onto itself is a valid (infinite) loop.
        check_section(&[JUMPDEST, RJUMP, 0xFF, 0xFC], &[info(0, 0, 0)], Ok(()));
    }

    #[test]
    fn backward_jump_bounds_mismatch() {
        // The loop body grows the interval, so the back-edge arrives with
        // different bounds than the ones stored at its target.
        check_section(
            &[
                PUSH0, PUSH1, 0x00, RJUMPI, 0x00, 0x02, PUSH0, PUSH0, PUSH1, 0x00, RJUMPI, 0xFF,
                0xFD, STOP,
            ],
            &[info(0, 0, 4)],
            Err(EofValidationError::InvalidBackwardJump { want: 3, have: 4 }),
        );
    }

    #[test]
    fn jump_out_of_range() {
        check_section(
            &[RJUMP, 0xFF, 0x00],
            &[info(0, 0, 0)],
            Err(EofValidationError::InvalidJumpDest),
        );
        check_section(
            &[RJUMP, 0x00, 0x10],
            &[info(0, 0, 0)],
            Err(EofValidationError::InvalidJumpDest),
        );
    }

    #[test]
    fn linear_programs_accept() {
        // Zero-immediate linear sequences with an exact declared height.
        check_section(
            &[ADDRESS, CALLER, ADD, ISZERO, POP, STOP],
            &[info(0, 0, 2)],
            Ok(()),
        );
        check_section(
            &[CALLVALUE, DUP1, MUL, NOT, POP, STOP],
            &[info(0, 0, 2)],
            Ok(()),
        );
        check_section(
            &[ORIGIN, BALANCE, DUP1, DUP2, ADDMOD, POP, STOP],
            &[info(0, 0, 3)],
            Ok(()),
        );
    }

    #[test]
    fn validation_is_deterministic() {
        let ok = build_eof(&[info(0, NON_RETURNING_FUNCTION, 1)], &[&[CALLER, POP, STOP]]);
        let bad = build_eof(&[info(0, NON_RETURNING_FUNCTION, 2)], &[&[CALLER, POP, STOP]]);
        for _ in 0..3 {
            assert_eq!(validate_eof(&ok), Ok(()));
            assert_eq!(
                validate_eof(&bad),
                Err(EofError::Validation(
                    EofValidationError::InvalidMaxStackHeight { have: 1, want: 2 }
                ))
            );
        }
    }

    #[test]
    fn container_with_returning_call() {
        let eof = build_eof(
            &[info(0, NON_RETURNING_FUNCTION, 1), info(0, 1, 1)],
            &[&[CALLF, 0x00, 0x01, POP, STOP], &[PUSH0, RETF]],
        );
        assert_eq!(validate_eof_kind(&eof, ContainerKind::Runtime), Ok(()));
    }

    #[test]
    fn every_section_is_validated() {
        // The second section has no callers but still fails validation.
        let eof = build_eof(
            &[
                info(0, NON_RETURNING_FUNCTION, 0),
                info(0, NON_RETURNING_FUNCTION, 1),
            ],
            &[&[STOP], &[CALLER, CALLER]],
        );
        assert_eq!(
            validate_eof_kind(&eof, ContainerKind::Runtime),
            Err(EofError::Validation(
                EofValidationError::InvalidCodeTermination
            ))
        );
    }

    #[test]
    fn returncontract_requires_initcode() {
        let eof = build_eof_with(
            &[info(0, NON_RETURNING_FUNCTION, 2)],
            &[&[PUSH0, PUSH0, RETURNCONTRACT, 0x00]],
            vec![Eof::default().raw.clone()],
            Bytes::new(),
        );
        assert_eq!(validate_eof_kind(&eof, ContainerKind::Initcode), Ok(()));
        assert_eq!(
            validate_eof_kind(&eof, ContainerKind::Runtime),
            Err(EofError::Validation(
                EofValidationError::ReturncontractNotInInitcode
            ))
        );
    }

    #[test]
    fn returncontract_index_out_of_bounds() {
        let eof = build_eof_with(
            &[info(0, NON_RETURNING_FUNCTION, 2)],
            &[&[PUSH0, PUSH0, RETURNCONTRACT, 0x01]],
            vec![Eof::default().raw.clone()],
            Bytes::new(),
        );
        assert_eq!(
            validate_eof_kind(&eof, ContainerKind::Initcode),
            Err(EofError::Validation(EofValidationError::InvalidJumpDest))
        );
    }

    #[test]
    fn eofcreate_index_out_of_bounds() {
        let eof = build_eof(
            &[info(0, NON_RETURNING_FUNCTION, 4)],
            &[&[PUSH0, PUSH0, PUSH0, PUSH0, EOFCREATE, 0x00, POP, STOP]],
        );
        assert_eq!(
            validate_eof_kind(&eof, ContainerKind::Runtime),
            Err(EofError::Validation(EofValidationError::InvalidJumpDest))
        );
    }

    #[test]
    fn sub_container_modes() {
        // Sub 0 is a RETURNCONTRACT target, sub 1 an EOFCREATE target.
        let eof = build_eof_with(
            &[info(0, NON_RETURNING_FUNCTION, 4)],
            &[&[
                PUSH0, PUSH0, PUSH0, PUSH0, EOFCREATE, 0x01, POP, PUSH0, PUSH0, RETURNCONTRACT,
                0x00,
            ]],
            vec![Eof::default().raw.clone(), Eof::default().raw.clone()],
            Bytes::new(),
        );
        assert_eq!(
            validate_eof_codes(&eof, ContainerKind::Initcode),
            Ok(vec![ContainerKind::Initcode, ContainerKind::Runtime])
        );
        assert_eq!(validate_eof_kind(&eof, ContainerKind::Initcode), Ok(()));
    }

    #[test]
    fn runtime_sub_container_must_fill_data() {
        // A sub-container that declares two data bytes but carries one.
        let full = build_eof_with(
            &[info(0, NON_RETURNING_FUNCTION, 0)],
            &[&[STOP]],
            Vec::new(),
            bytes!("aabb"),
        );
        let truncated = full.raw.slice(..full.raw.len() - 1);

        // As an EOFCREATE target it is runtime code: rejected.
        let eof = build_eof_with(
            &[info(0, NON_RETURNING_FUNCTION, 4)],
            &[&[PUSH0, PUSH0, PUSH0, PUSH0, EOFCREATE, 0x00, POP, STOP]],
            vec![truncated.clone()],
            Bytes::new(),
        );
        assert_eq!(
            validate_eof_kind(&eof, ContainerKind::Initcode),
            Err(EofError::Decode(EofDecodeError::DataNotFilled))
        );

        // As a RETURNCONTRACT target it is initcode: the missing data is
        // appended at deployment.
        let eof = build_eof_with(
            &[info(0, NON_RETURNING_FUNCTION, 2)],
            &[&[PUSH0, PUSH0, RETURNCONTRACT, 0x00]],
            vec![truncated],
            Bytes::new(),
        );
        assert_eq!(validate_eof_kind(&eof, ContainerKind::Initcode), Ok(()));
    }

    #[test]
    fn nested_initcode_sub_containers() {
        let inner = Eof::default();
        let mid = build_eof_with(
            &[info(0, NON_RETURNING_FUNCTION, 2)],
            &[&[PUSH0, PUSH0, RETURNCONTRACT, 0x00]],
            vec![inner.raw.clone()],
            Bytes::new(),
        );
        let top = build_eof_with(
            &[info(0, NON_RETURNING_FUNCTION, 2)],
            &[&[PUSH0, PUSH0, RETURNCONTRACT, 0x00]],
            vec![mid.raw.clone()],
            Bytes::new(),
        );
        assert_eq!(validate_raw_eof(top.raw.clone()), Ok(top));
    }

    #[test]
    fn raw_initcode_accepts_trailing_bytes() {
        let eof = build_eof(&[info(0, NON_RETURNING_FUNCTION, 1)], &[&[CALLER, POP, STOP]]);
        let mut raw = eof.raw.to_vec();
        raw.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let raw = Bytes::from(raw);

        assert!(validate_raw_eof(raw.clone()).is_ok());
        assert_eq!(
            validate_raw_eof_kind(raw, ContainerKind::Runtime),
            Err(EofError::Decode(EofDecodeError::DanglingData))
        );
    }

    #[test]
    fn raw_size_limit() {
        let raw = Bytes::from(vec![0u8; MAX_INITCODE_SIZE + 1]);
        assert_eq!(
            validate_raw_eof(raw),
            Err(EofError::Decode(EofDecodeError::InvalidEOFSize))
        );
    }

    #[test]
    fn top_level_runtime_data_must_be_filled() {
        // Declares two data bytes, carries one.
        let raw = bytes!("ef00010100040200010001ff00020000800000feaa");
        let eof = Eof::decode(raw).unwrap();
        assert!(!eof.body.is_data_filled);
        assert_eq!(
            validate_eof_kind(&eof, ContainerKind::Runtime),
            Err(EofError::Decode(EofDecodeError::DataNotFilled))
        );
        assert_eq!(validate_eof_kind(&eof, ContainerKind::Initcode), Ok(()));
    }

    #[test]
    fn error_display() {
        assert_eq!(
            EofError::Validation(EofValidationError::StackUnderflow {
                have: 1,
                required: 2
            })
            .to_string(),
            "Container validation error: stack underflow: have 1, require 2"
        );
        assert_eq!(
            EofError::Decode(EofDecodeError::DataNotFilled).to_string(),
            "Container decode error: Data section is shorter than declared"
        );
    }
}
