/// Highest stack height the validator accepts on entry to any instruction.
///
/// Also bounds the `max_stack_height` field of a type section entry.
pub const MAX_STACK_HEIGHT: u16 = 0x3FF;

/// Maximum size of deployed contract code.
pub const MAX_CODE_SIZE: usize = 0x6000;

/// Maximum initcode size accepted by the raw validation entry points,
/// twice the deployed code limit.
pub const MAX_INITCODE_SIZE: usize = 2 * MAX_CODE_SIZE;

/// Maximum number of code sections in one container.
pub const MAX_CODE_SECTIONS: usize = 0x0400;

/// Maximum number of sub-container sections in one container.
pub const MAX_CONTAINER_SECTIONS: usize = 0x0100;
