//! Per-function IR verifier.
//!
//! Checks the structural invariants the printer and any downstream
//! consumer rely on: every block ends in exactly one terminator,
//! branch targets exist, conditions are 1-bit, and returned values
//! match the function's return type.

use super::{FunctionDef, Inst, IrType};

pub fn verify_function(func: &FunctionDef) -> Result<(), String> {
    if func.blocks.is_empty() {
        return Err(format!("function '{}' has no basic blocks", func.name));
    }

    for block in &func.blocks {
        let Some(last) = block.insts.last() else {
            return Err(format!(
                "block '{}' in function '{}' is empty",
                block.label, func.name
            ));
        };

        if !func.insts[last.0].is_terminator() {
            return Err(format!(
                "block '{}' in function '{}' doesn't end in a terminator",
                block.label, func.name
            ));
        }

        for inst in &block.insts[..block.insts.len() - 1] {
            if func.insts[inst.0].is_terminator() {
                return Err(format!(
                    "block '{}' in function '{}' has an instruction after its terminator",
                    block.label, func.name
                ));
            }
        }

        for inst in &block.insts {
            match &func.insts[inst.0] {
                Inst::Br { target } => {
                    if target.0 >= func.blocks.len() {
                        return Err(format!(
                            "branch to missing block in function '{}'",
                            func.name
                        ));
                    }
                }
                Inst::CondBr {
                    cond,
                    then_block,
                    else_block,
                } => {
                    if then_block.0 >= func.blocks.len() || else_block.0 >= func.blocks.len() {
                        return Err(format!(
                            "conditional branch to missing block in function '{}'",
                            func.name
                        ));
                    }
                    if func.value_type(cond) != IrType::I1 {
                        return Err(format!(
                            "conditional branch on a non-i1 value in function '{}'",
                            func.name
                        ));
                    }
                }
                Inst::Ret { ty, value } => {
                    if *ty != func.ret {
                        return Err(format!(
                            "return type mismatch in function '{}': declared {}, returned {}",
                            func.name, func.ret, ty
                        ));
                    }
                    if func.value_type(value) != func.ret {
                        return Err(format!(
                            "returned value has wrong type in function '{}'",
                            func.name
                        ));
                    }
                }
                _ => {}
            }
        }
    }

    Ok(())
}
