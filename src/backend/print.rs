//! Textual IR printer. Emits LLVM-syntax output: typed loads and GEPs,
//! hex-encoded double constants, uniquified register and label names.

use std::collections::HashMap;

use super::{FunctionDef, Inst, InstId, Module, Value};

pub fn print_module(module: &Module) -> String {
    let mut out = String::new();
    out.push_str(&format!("; ModuleID = '{}'\n", module.name));

    if !module.strings.is_empty() {
        out.push('\n');
        for (index, text) in module.strings.iter().enumerate() {
            out.push_str(&format!(
                "@str.{} = private unnamed_addr constant [{} x i8] c\"{}\"\n",
                index,
                text.len() + 1,
                escape_bytes(text)
            ));
        }
    }

    if !module.declares.is_empty() {
        out.push('\n');
        for decl in &module.declares {
            let mut params: Vec<String> = decl.params.iter().map(|t| t.to_string()).collect();
            if decl.variadic {
                params.push("...".to_string());
            }
            out.push_str(&format!(
                "declare {} @{}({})\n",
                decl.ret,
                decl.name,
                params.join(", ")
            ));
        }
    }

    for func in &module.funcs {
        out.push('\n');
        print_function(module, func, &mut out);
    }

    out
}

fn print_function(module: &Module, func: &FunctionDef, out: &mut String) {
    let names = assign_names(func);
    let labels = assign_labels(func);

    let params: Vec<String> = func
        .params
        .iter()
        .map(|(name, ty)| format!("{} %{}", ty, name))
        .collect();
    out.push_str(&format!(
        "define {} @{}({}) {{\n",
        func.ret,
        func.name,
        params.join(", ")
    ));

    for (index, block) in func.blocks.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        out.push_str(&format!("{}:\n", labels[index]));
        for inst in &block.insts {
            out.push_str("  ");
            print_inst(module, func, &names, &labels, *inst, out);
            out.push('\n');
        }
    }

    out.push_str("}\n");
}

fn print_inst(
    module: &Module,
    func: &FunctionDef,
    names: &HashMap<usize, String>,
    labels: &[String],
    id: InstId,
    out: &mut String,
) {
    let value = |v: &Value| render_value(module, func, names, v);
    let reg = |id: InstId| format!("%{}", names[&id.0]);

    match &func.insts[id.0] {
        Inst::Alloca { ty, .. } => {
            out.push_str(&format!("{} = alloca {}", reg(id), ty));
        }
        Inst::Load { ty, ptr, .. } => {
            out.push_str(&format!("{} = load {}, {}* {}", reg(id), ty, ty, value(ptr)));
        }
        Inst::Store { ty, value: v, ptr } => {
            out.push_str(&format!("store {} {}, {}* {}", ty, value(v), ty, value(ptr)));
        }
        Inst::Arith { op, ty, lhs, rhs, .. } => {
            out.push_str(&format!(
                "{} = {} {} {}, {}",
                reg(id),
                op.mnemonic(),
                ty,
                value(lhs),
                value(rhs)
            ));
        }
        Inst::Neg { ty, value: v, .. } => {
            out.push_str(&format!("{} = sub {} 0, {}", reg(id), ty, value(v)));
        }
        Inst::FNeg { value: v, .. } => {
            out.push_str(&format!("{} = fneg double {}", reg(id), value(v)));
        }
        Inst::Icmp { pred, ty, lhs, rhs, .. } => {
            out.push_str(&format!(
                "{} = icmp {} {} {}, {}",
                reg(id),
                pred.mnemonic(),
                ty,
                value(lhs),
                value(rhs)
            ));
        }
        Inst::Fcmp { pred, lhs, rhs, .. } => {
            out.push_str(&format!(
                "{} = fcmp {} double {}, {}",
                reg(id),
                pred.mnemonic(),
                value(lhs),
                value(rhs)
            ));
        }
        Inst::And { ty, lhs, rhs, .. } => {
            out.push_str(&format!("{} = and {} {}, {}", reg(id), ty, value(lhs), value(rhs)));
        }
        Inst::Or { ty, lhs, rhs, .. } => {
            out.push_str(&format!("{} = or {} {}, {}", reg(id), ty, value(lhs), value(rhs)));
        }
        Inst::Xor { ty, lhs, rhs, .. } => {
            out.push_str(&format!("{} = xor {} {}, {}", reg(id), ty, value(lhs), value(rhs)));
        }
        Inst::Sitofp { value: v, .. } => {
            out.push_str(&format!("{} = sitofp i32 {} to double", reg(id), value(v)));
        }
        Inst::Fptosi { value: v, .. } => {
            out.push_str(&format!("{} = fptosi double {} to i32", reg(id), value(v)));
        }
        Inst::Zext { from, to, value: v, .. } => {
            out.push_str(&format!("{} = zext {} {} to {}", reg(id), from, value(v), to));
        }
        Inst::Uitofp { from, value: v, .. } => {
            out.push_str(&format!("{} = uitofp {} {} to double", reg(id), from, value(v)));
        }
        Inst::Call {
            callee,
            ret,
            sig_params,
            variadic,
            args,
            ..
        } => {
            let rendered: Vec<String> = args
                .iter()
                .map(|(ty, v)| format!("{} {}", ty, value(v)))
                .collect();
            let callee_ty = if *variadic {
                let mut params: Vec<String> = sig_params.iter().map(|t| t.to_string()).collect();
                params.push("...".to_string());
                format!("{} ({}) ", ret, params.join(", "))
            } else {
                format!("{} ", ret)
            };
            out.push_str(&format!(
                "{} = call {}@{}({})",
                reg(id),
                callee_ty,
                callee,
                rendered.join(", ")
            ));
        }
        Inst::Br { target } => {
            out.push_str(&format!("br label %{}", labels[target.0]));
        }
        Inst::CondBr {
            cond,
            then_block,
            else_block,
        } => {
            out.push_str(&format!(
                "br i1 {}, label %{}, label %{}",
                value(cond),
                labels[then_block.0],
                labels[else_block.0]
            ));
        }
        Inst::Ret { ty, value: v } => {
            out.push_str(&format!("ret {} {}", ty, value(v)));
        }
        Inst::Unreachable => {
            out.push_str("unreachable");
        }
    }
}

fn render_value(
    module: &Module,
    func: &FunctionDef,
    names: &HashMap<usize, String>,
    value: &Value,
) -> String {
    match value {
        Value::I32(v) => format!("{}", v),
        Value::F64(v) => format!("0x{:016X}", v.to_bits()),
        Value::I1(v) => if *v { "true" } else { "false" }.to_string(),
        Value::Arg(i) => format!("%{}", func.params[*i].0),
        Value::Inst(id) => format!("%{}", names[&id.0]),
        Value::Str(id) => {
            let len = module.strings[id.0].len() + 1;
            format!(
                "getelementptr inbounds ([{} x i8], [{} x i8]* @str.{}, i32 0, i32 0)",
                len, len, id.0
            )
        }
    }
}

/// Assign printed register names in block order, disambiguating
/// repeated base names with a numeric suffix.
fn assign_names(func: &FunctionDef) -> HashMap<usize, String> {
    let mut names: HashMap<usize, String> = HashMap::new();
    let mut used: HashMap<String, usize> = HashMap::new();
    for block in &func.blocks {
        for inst in &block.insts {
            let base = match &func.insts[inst.0] {
                Inst::Alloca { name, .. }
                | Inst::Load { name, .. }
                | Inst::Arith { name, .. }
                | Inst::Neg { name, .. }
                | Inst::FNeg { name, .. }
                | Inst::Icmp { name, .. }
                | Inst::Fcmp { name, .. }
                | Inst::And { name, .. }
                | Inst::Or { name, .. }
                | Inst::Xor { name, .. }
                | Inst::Sitofp { name, .. }
                | Inst::Fptosi { name, .. }
                | Inst::Zext { name, .. }
                | Inst::Uitofp { name, .. }
                | Inst::Call { name, .. } => name.clone(),
                Inst::Store { .. }
                | Inst::Br { .. }
                | Inst::CondBr { .. }
                | Inst::Ret { .. }
                | Inst::Unreachable => continue,
            };
            let count = used.entry(base.clone()).or_insert(0);
            let unique = if *count == 0 {
                base.clone()
            } else {
                format!("{}{}", base, count)
            };
            *count += 1;
            names.insert(inst.0, unique);
        }
    }
    names
}

fn assign_labels(func: &FunctionDef) -> Vec<String> {
    let mut used: HashMap<String, usize> = HashMap::new();
    func.blocks
        .iter()
        .map(|block| {
            let count = used.entry(block.label.clone()).or_insert(0);
            let unique = if *count == 0 {
                block.label.clone()
            } else {
                format!("{}{}", block.label, count)
            };
            *count += 1;
            unique
        })
        .collect()
}

/// Escape a string for an LLVM `c"..."` constant, appending the
/// terminating NUL.
fn escape_bytes(text: &str) -> String {
    let mut out = String::new();
    for byte in text.bytes() {
        if byte.is_ascii_graphic() && byte != b'"' && byte != b'\\' || byte == b' ' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("\\{:02X}", byte));
        }
    }
    out.push_str("\\00");
    out
}
