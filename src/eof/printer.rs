#![cfg(feature = "std")]

/// Prints a disassembly of one code section to stdout.
pub fn print(code: &[u8]) {
    use crate::{opcode::*, utils::read_i16};
    use alloy_primitives::hex;

    let mut i = 0;
    while i < code.len() {
        let op = code[i];
        let Some(opcode) = OPCODE_INFO[op as usize] else {
            println!("Unknown opcode: 0x{op:02X}");
            i += 1;
            continue;
        };

        let mut imm = opcode.immediate_size() as usize;
        if op == RJUMPV {
            if i + 1 >= code.len() {
                println!("Malformed code: missing RJUMPV count byte");
                break;
            }
            imm = 1 + 2 * (code[i + 1] as usize + 1);
        }
        if i + 1 + imm > code.len() {
            println!("Malformed code: immediate out of bounds");
            break;
        }

        print!("{}", opcode.name());
        if imm != 0 {
            let immediate = &code[i + 1..i + 1 + imm];
            print!(" : 0x{}", hex::encode(immediate));
            if imm == 2 {
                print!(" ({})", read_i16(code, i + 1));
            }
        }
        println!();

        if op == RJUMPV {
            let count = code[i + 1] as usize + 1;
            for entry in 0..count {
                let offset = read_i16(code, i + 2 + 2 * entry);
                println!("RJUMPV[{entry}]: {offset}");
            }
        }

        i += 1 + imm;
    }
}
