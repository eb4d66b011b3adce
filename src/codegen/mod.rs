//! Code generation: typed AST → backend IR.
//!
//! Lowering is two-pass. The first pass declares every function's
//! signature, so call sites resolve in either direction regardless of
//! definition order. The second pass lowers bodies, carrying a scope
//! chain of storage slots and the enclosing function's return type.
//!
//! Type checking happens during lowering: coercions are inserted where
//! the conversion lattice allows them, and the first violation aborts
//! the run.

pub mod scope;

use std::collections::BTreeMap;

use crate::ast::{BinOp, Call, Expr, Function, Literal, Program, Stmt, UnOp};
use crate::backend::builder::Builder;
use crate::backend::{ArithOp, BlockId, FloatPred, FuncId, IntPred, IrType, Module, Value};
use crate::diagnostic::Diagnostic;
use crate::types::{self, Primitive, Ty};

use self::scope::{ScopeChain, Slot};

/// Lower a program into a backend module.
pub fn generate(program: &Program) -> Result<Module, Diagnostic> {
    Codegen::new().generate(program)
}

#[derive(Clone)]
struct FnInfo {
    id: FuncId,
    params: Vec<Ty>,
    ret: Ty,
}

pub struct Codegen {
    builder: Builder,
    scopes: ScopeChain,
    functions: BTreeMap<String, FnInfo>,
    /// Merge blocks of conditionals in the current function, in
    /// construction order. Relinked after the body is lowered so
    /// nested conditionals chain their merge points.
    continue_blocks: Vec<BlockId>,
    current_ret: Ty,
}

impl Codegen {
    pub fn new() -> Self {
        let mut builder = Builder::new("Module");
        builder.declare_external("printf", IrType::I32, vec![IrType::i8_ptr()], true);
        builder.declare_external("scanf", IrType::I32, vec![IrType::i8_ptr()], true);
        Self {
            builder,
            scopes: ScopeChain::default(),
            functions: BTreeMap::new(),
            continue_blocks: Vec::new(),
            current_ret: Ty::INT,
        }
    }

    pub fn generate(mut self, program: &Program) -> Result<Module, Diagnostic> {
        for func in &program.functions {
            self.declare_function(func)?;
        }
        for func in &program.functions {
            self.lower_function(func)?;
        }
        Ok(self.builder.finish())
    }

    fn declare_function(&mut self, func: &Function) -> Result<(), Diagnostic> {
        if self.functions.contains_key(&func.name) {
            return Err(Diagnostic::semantic(format!(
                "function '{}' is already defined",
                func.name
            )));
        }

        // Functions without an explicit `-> T` return Int.
        let ret = func.return_ty.unwrap_or(Ty::INT);
        let ret_ir = lower_type(ret)?;

        let mut params = Vec::new();
        let mut params_ir = Vec::new();
        for param in &func.params {
            params.push(param.ty);
            params_ir.push((param.name.clone(), lower_type(param.ty)?));
        }

        let id = self.builder.declare_function(&func.name, ret_ir, params_ir);
        self.functions.insert(
            func.name.clone(),
            FnInfo {
                id,
                params,
                ret,
            },
        );
        Ok(())
    }

    fn lower_function(&mut self, func: &Function) -> Result<(), Diagnostic> {
        let info = self.functions[&func.name].clone();
        self.builder.begin_body(info.id);
        self.continue_blocks.clear();
        self.current_ret = info.ret;

        // Parameters inhabit the function's outermost scope.
        self.scopes.push_scope();
        let result = self.lower_function_body(func, &info);
        self.scopes.pop_scope();
        result
    }

    fn lower_function_body(&mut self, func: &Function, info: &FnInfo) -> Result<(), Diagnostic> {
        for (index, param) in func.params.iter().enumerate() {
            let ty = lower_type(param.ty)?;
            let slot = self
                .builder
                .entry_alloca(&format!("{}Ptr", param.name), ty.clone());
            let arg = self.builder.arg(index);
            self.builder.store(ty, arg, slot);
            self.scopes.define(
                &param.name,
                Slot {
                    ty: param.ty,
                    ptr: slot,
                },
            )?;
        }

        self.lower_stmt(&func.body)?;
        self.link_continue_blocks();
        self.seal_function(&func.name)?;

        if let Err(message) = crate::backend::verify::verify_function(self.builder.current_function())
        {
            self.builder.remove_current_function();
            return Err(Diagnostic::backend(message));
        }
        Ok(())
    }

    /// Chain any still-open merge block to the next one in construction
    /// order, so nested conditionals fall through to their enclosing
    /// merge point instead of orphaning it.
    fn link_continue_blocks(&mut self) {
        for index in 0..self.continue_blocks.len() {
            let block = self.continue_blocks[index];
            if !self.builder.block_terminated(block) && index + 1 < self.continue_blocks.len() {
                let next = self.continue_blocks[index + 1];
                self.builder.set_insert_point(block);
                self.builder.br(next);
            }
        }
    }

    /// Enforce that every reachable path ends in a return. Merge blocks
    /// left behind by branches that all returned are unreachable; those
    /// get an `unreachable` terminator instead of an error.
    fn seal_function(&mut self, name: &str) -> Result<(), Diagnostic> {
        let func = self.builder.current_function();
        let block_count = func.blocks.len();

        let mut has_preds = vec![false; block_count];
        for block in &func.blocks {
            for inst in &block.insts {
                match &func.insts[inst.0] {
                    crate::backend::Inst::Br { target } => has_preds[target.0] = true,
                    crate::backend::Inst::CondBr {
                        then_block,
                        else_block,
                        ..
                    } => {
                        has_preds[then_block.0] = true;
                        has_preds[else_block.0] = true;
                    }
                    _ => {}
                }
            }
        }

        for index in 0..block_count {
            let block = BlockId(index);
            if self.builder.block_terminated(block) {
                continue;
            }
            if index == 0 || has_preds[index] {
                return Err(Diagnostic::semantic(format!(
                    "every path must have return statement in function '{}'",
                    name
                )));
            }
            self.builder.set_insert_point(block);
            self.builder.unreachable();
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), Diagnostic> {
        match stmt {
            Stmt::VarDecl { name, ty, init } => self.lower_var_decl(name, *ty, init.as_ref()),
            Stmt::Assign { name, value } => self.lower_assign(name, value),
            Stmt::ArrayAssign { .. } => Err(Diagnostic::semantic(
                "array element assignment is not supported yet".to_string(),
            )),
            Stmt::Return(expr) => self.lower_return(expr.as_ref()),
            Stmt::If {
                cond,
                then_stmt,
                else_stmt,
            } => self.lower_if(cond, then_stmt, else_stmt.as_deref()),
            Stmt::While { cond, body } => self.lower_while(cond, body),
            Stmt::Block(stmts) => {
                self.scopes.push_scope();
                let result = self.lower_block(stmts);
                self.scopes.pop_scope();
                result
            }
            Stmt::Print(args) => self.lower_print(args),
            Stmt::Scan(args) => self.lower_scan(args),
            Stmt::ExprCall(call) => {
                self.lower_call(call)?;
                Ok(())
            }
        }
    }

    fn lower_block(&mut self, stmts: &[Stmt]) -> Result<(), Diagnostic> {
        for stmt in stmts {
            self.lower_stmt(stmt)?;
            // Everything after a terminator is unreachable.
            if self.builder.is_terminated() {
                break;
            }
        }
        Ok(())
    }

    fn lower_var_decl(
        &mut self,
        name: &str,
        ty: Ty,
        init: Option<&Expr>,
    ) -> Result<(), Diagnostic> {
        if !ty.is_scalar() || ty.primitive == Primitive::String {
            return Err(Diagnostic::semantic(format!(
                "variables of type '{}' are not supported yet",
                ty.display()
            )));
        }

        let ir_ty = lower_type(ty)?;
        let slot = self
            .builder
            .entry_alloca(&format!("{}Ptr", name), ir_ty.clone());

        let zero = match ty.primitive {
            Primitive::Int => Value::I32(0),
            Primitive::Float => Value::F64(0.0),
            Primitive::Bool => Value::I1(false),
            Primitive::String => unreachable!("rejected above"),
        };
        self.builder.store(ir_ty.clone(), zero, slot);

        self.scopes.define(name, Slot { ty, ptr: slot })?;

        let Some(init) = init else {
            return Ok(());
        };

        let (value, value_ty) = self.lower_expr(init)?;
        let value = if value_ty == ty {
            value
        } else {
            self.cast_value(value, value_ty, ty)?.ok_or_else(|| {
                Diagnostic::semantic(format!(
                    "can't set expression of type '{}' to variable '{}' of type '{}'",
                    value_ty.display(),
                    name,
                    ty.display()
                ))
            })?
        };
        self.builder.store(ir_ty, value, slot);
        Ok(())
    }

    fn lower_assign(&mut self, name: &str, value: &Expr) -> Result<(), Diagnostic> {
        let slot = self.scopes.lookup(name).ok_or_else(|| {
            Diagnostic::semantic(format!(
                "can't assign because variable '{}' is not defined",
                name
            ))
        })?;

        let (generated, generated_ty) = self.lower_expr(value)?;
        let generated = if generated_ty == slot.ty {
            generated
        } else {
            self.cast_value(generated, generated_ty, slot.ty)?
                .ok_or_else(|| {
                    Diagnostic::semantic(format!(
                        "can't set expression of type '{}' to variable '{}' of type '{}'",
                        generated_ty.display(),
                        name,
                        slot.ty.display()
                    ))
                })?
        };
        self.builder.store(lower_type(slot.ty)?, generated, slot.ptr);
        Ok(())
    }

    fn lower_return(&mut self, expr: Option<&Expr>) -> Result<(), Diagnostic> {
        let Some(expr) = expr else {
            return Err(Diagnostic::semantic(format!(
                "return statement must have an expression in function returning '{}'",
                self.current_ret.display()
            )));
        };

        let (value, value_ty) = self.lower_expr(expr)?;
        let ret_ty = self.current_ret;
        let value = if value_ty == ret_ty {
            value
        } else {
            self.cast_value(value, value_ty, ret_ty)?.ok_or_else(|| {
                Diagnostic::semantic(
                    "returning expression must be at least convertible to function return type"
                        .to_string(),
                )
            })?
        };
        self.builder.ret(lower_type(ret_ty)?, value);
        Ok(())
    }

    fn lower_if(
        &mut self,
        cond: &Expr,
        then_stmt: &Stmt,
        else_stmt: Option<&Stmt>,
    ) -> Result<(), Diagnostic> {
        let then_block = self.builder.add_block("then");
        let else_block = self.builder.add_block("else");
        let continue_block = self.builder.add_block("continue");

        let flag = self.lower_condition(cond)?;
        self.builder.cond_br(flag, then_block, else_block);

        self.builder.set_insert_point(then_block);
        self.lower_stmt(then_stmt)?;
        if !self.builder.is_terminated() {
            self.builder.br(continue_block);
        }

        self.builder.set_insert_point(else_block);
        if let Some(else_stmt) = else_stmt {
            self.lower_stmt(else_stmt)?;
        }
        if !self.builder.is_terminated() {
            self.builder.br(continue_block);
        }

        self.builder.set_insert_point(continue_block);
        self.continue_blocks.push(continue_block);
        Ok(())
    }

    fn lower_while(&mut self, cond: &Expr, body: &Stmt) -> Result<(), Diagnostic> {
        let cond_block = self.builder.add_block("loop_cond");
        let body_block = self.builder.add_block("loop_body");
        let exit_block = self.builder.add_block("loop_exit");

        self.builder.br(cond_block);

        self.builder.set_insert_point(cond_block);
        let flag = self.lower_condition(cond)?;
        self.builder.cond_br(flag, body_block, exit_block);

        self.builder.set_insert_point(body_block);
        self.lower_stmt(body)?;
        if !self.builder.is_terminated() {
            self.builder.br(cond_block);
        }

        self.builder.set_insert_point(exit_block);
        Ok(())
    }

    fn lower_condition(&mut self, cond: &Expr) -> Result<Value, Diagnostic> {
        let (value, ty) = self.lower_expr(cond)?;
        self.bool_value(value, ty).ok_or_else(|| {
            Diagnostic::semantic(
                "expression in condition statement must be convertible to bool".to_string(),
            )
        })
    }

    fn lower_print(&mut self, args: &[Expr]) -> Result<(), Diagnostic> {
        for arg in args {
            let (value, ty) = self.lower_expr(arg)?;
            let (format_text, value_ty, value) = match (ty.is_scalar(), ty.primitive) {
                (true, Primitive::Int) => ("%d\n", IrType::I32, value),
                (true, Primitive::Float) => ("%f\n", IrType::F64, value),
                (true, Primitive::Bool) => {
                    let widened = self
                        .builder
                        .zext("casttmp", IrType::I1, IrType::I32, value);
                    ("%d\n", IrType::I32, widened)
                }
                _ => {
                    return Err(Diagnostic::semantic(format!(
                        "values of type '{}' can't be printed out yet",
                        ty.display()
                    )))
                }
            };
            let format_ptr = self.builder.string_const(format_text);
            self.builder.call_external(
                "calltmp",
                "printf",
                vec![(IrType::i8_ptr(), format_ptr), (value_ty, value)],
            );
        }
        Ok(())
    }

    fn lower_scan(&mut self, args: &[Expr]) -> Result<(), Diagnostic> {
        for arg in args {
            let Expr::Identifier(name) = arg else {
                return Err(Diagnostic::semantic(
                    "scan expects variable names as arguments".to_string(),
                ));
            };
            let slot = self
                .scopes
                .lookup(name)
                .ok_or_else(|| Diagnostic::semantic(format!("variable '{}' is not defined", name)))?;

            let format_text = match (slot.ty.is_scalar(), slot.ty.primitive) {
                (true, Primitive::Int) => "%d",
                (true, Primitive::Float) => "%lf",
                _ => {
                    return Err(Diagnostic::semantic(format!(
                        "can't scan into variable '{}' of type '{}'",
                        name,
                        slot.ty.display()
                    )))
                }
            };
            let format_ptr = self.builder.string_const(format_text);
            let slot_ty = IrType::ptr(lower_type(slot.ty)?);
            self.builder.call_external(
                "calltmp",
                "scanf",
                vec![(IrType::i8_ptr(), format_ptr), (slot_ty, slot.ptr)],
            );
        }
        Ok(())
    }

    fn lower_expr(&mut self, expr: &Expr) -> Result<(Value, Ty), Diagnostic> {
        match expr {
            Expr::Literal(Literal::Int(v)) => Ok((Value::I32(*v), Ty::INT)),
            Expr::Literal(Literal::Float(v)) => Ok((Value::F64(*v), Ty::FLOAT)),
            Expr::Literal(Literal::Bool(v)) => Ok((Value::I1(*v), Ty::BOOL)),
            Expr::Literal(Literal::Str(v)) => {
                let ptr = self.builder.string_const(v);
                Ok((ptr, Ty::STRING))
            }
            Expr::Identifier(name) => {
                let slot = self.scopes.lookup(name).ok_or_else(|| {
                    Diagnostic::semantic(format!("variable '{}' is not defined", name))
                })?;
                let value = self.builder.load(
                    &format!("{}Value", name),
                    lower_type(slot.ty)?,
                    slot.ptr,
                );
                Ok((value, slot.ty))
            }
            Expr::Unary { op, expr } => self.lower_unary(*op, expr),
            Expr::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs),
            Expr::Call(call) => self.lower_call(call),
            Expr::ArrayIndex { .. } => Err(Diagnostic::semantic(
                "array element access is not supported yet".to_string(),
            )),
        }
    }

    fn lower_unary(&mut self, op: UnOp, inner: &Expr) -> Result<(Value, Ty), Diagnostic> {
        let (value, ty) = self.lower_expr(inner)?;
        match op {
            UnOp::Plus => {
                if ty.is_scalar() && ty.primitive != Primitive::String {
                    Ok((value, ty))
                } else {
                    Err(Diagnostic::semantic(format!(
                        "can't apply unary '+' to '{}'",
                        ty.display()
                    )))
                }
            }
            UnOp::Minus => match (ty.is_scalar(), ty.primitive) {
                (true, Primitive::Int) => {
                    Ok((self.builder.neg("negtmp", IrType::I32, value), Ty::INT))
                }
                (true, Primitive::Float) => Ok((self.builder.fneg("fnegtmp", value), Ty::FLOAT)),
                (true, Primitive::Bool) => {
                    let widened = self
                        .builder
                        .zext("casttmp", IrType::I1, IrType::I32, value);
                    Ok((self.builder.neg("negtmp", IrType::I32, widened), Ty::INT))
                }
                _ => Err(Diagnostic::semantic(format!(
                    "can't apply unary '-' to '{}'",
                    ty.display()
                ))),
            },
            UnOp::Negation => {
                let flag = self.bool_value(value, ty).ok_or_else(|| {
                    Diagnostic::semantic(format!("can't apply unary '!' to '{}'", ty.display()))
                })?;
                let inverted = self
                    .builder
                    .xor("nottmp", IrType::I1, flag, Value::I1(true));
                Ok((inverted, Ty::BOOL))
            }
        }
    }

    fn lower_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<(Value, Ty), Diagnostic> {
        let (left, left_ty) = self.lower_expr(lhs)?;
        let (right, right_ty) = self.lower_expr(rhs)?;

        if op == BinOp::Mod && (left_ty != Ty::INT || right_ty != Ty::INT) {
            return Err(Diagnostic::semantic(
                "modulo operator expects integers on both sides of an expression".to_string(),
            ));
        }

        let operand_error = || {
            Diagnostic::semantic(format!(
                "can't perform operator '{}' on operands with types '{}' and '{}'",
                op.as_str(),
                left_ty.display(),
                right_ty.display()
            ))
        };

        if op.is_logical() {
            let left = self.bool_value(left, left_ty).ok_or_else(operand_error)?;
            let right = self.bool_value(right, right_ty).ok_or_else(operand_error)?;
            let value = match op {
                BinOp::And => self.builder.and("andtmp", IrType::I1, left, right),
                _ => self.builder.or("ortmp", IrType::I1, left, right),
            };
            return Ok((value, Ty::BOOL));
        }

        // Widen both sides toward the preferred operand type.
        let target = if left_ty == right_ty {
            left_ty
        } else {
            types::preferred_binary_type(left_ty, right_ty).ok_or_else(operand_error)?
        };
        if target.primitive == Primitive::String {
            return Err(operand_error());
        }
        let left = if left_ty == target {
            left
        } else {
            self.cast_value(left, left_ty, target)?
                .ok_or_else(operand_error)?
        };
        let right = if right_ty == target {
            right
        } else {
            self.cast_value(right, right_ty, target)?
                .ok_or_else(operand_error)?
        };

        let is_float = target.primitive == Primitive::Float;

        if op.is_comparison() {
            let value = if is_float {
                let pred = match op {
                    BinOp::Equals => FloatPred::Oeq,
                    BinOp::NotEquals => FloatPred::One,
                    BinOp::Less => FloatPred::Olt,
                    BinOp::More => FloatPred::Ogt,
                    BinOp::LessOrEquals => FloatPred::Ole,
                    _ => FloatPred::Oge,
                };
                self.builder.fcmp("fcmptmp", pred, left, right)
            } else {
                let pred = match op {
                    BinOp::Equals => IntPred::Eq,
                    BinOp::NotEquals => IntPred::Ne,
                    BinOp::Less => IntPred::Slt,
                    BinOp::More => IntPred::Sgt,
                    BinOp::LessOrEquals => IntPred::Sle,
                    _ => IntPred::Sge,
                };
                self.builder
                    .icmp("cmptmp", pred, lower_type(target)?, left, right)
            };
            return Ok((value, Ty::BOOL));
        }

        let (arith_op, name) = match (op, is_float) {
            (BinOp::Plus, false) => (ArithOp::Add, "addtmp"),
            (BinOp::Plus, true) => (ArithOp::FAdd, "faddtmp"),
            (BinOp::Minus, false) => (ArithOp::Sub, "subtmp"),
            (BinOp::Minus, true) => (ArithOp::FSub, "fsubtmp"),
            (BinOp::Mul, false) => (ArithOp::Mul, "multmp"),
            (BinOp::Mul, true) => (ArithOp::FMul, "fmultmp"),
            (BinOp::Div, false) => (ArithOp::SDiv, "divtmp"),
            (BinOp::Div, true) => (ArithOp::FDiv, "fdivtmp"),
            (BinOp::Mod, _) => (ArithOp::SRem, "modtmp"),
            _ => unreachable!("comparisons and logicals handled above"),
        };
        let value = self
            .builder
            .arith(name, arith_op, lower_type(target)?, left, right);
        Ok((value, target))
    }

    fn lower_call(&mut self, call: &Call) -> Result<(Value, Ty), Diagnostic> {
        let info = self
            .functions
            .get(&call.name)
            .cloned()
            .ok_or_else(|| {
                Diagnostic::semantic(format!("function '{}' is undefined", call.name))
            })?;

        if info.params.len() != call.args.len() {
            return Err(Diagnostic::semantic(format!(
                "function '{}' expects {} params, {} given",
                call.name,
                info.params.len(),
                call.args.len()
            )));
        }

        let mut args = Vec::new();
        for (index, (arg, param_ty)) in call.args.iter().zip(&info.params).enumerate() {
            let (value, value_ty) = self.lower_expr(arg)?;
            let value = if value_ty == *param_ty {
                value
            } else {
                self.cast_value(value, value_ty, *param_ty)?.ok_or_else(|| {
                    Diagnostic::semantic(format!(
                        "function '{}' expects '{}' as parameter {}, '{}' given (can't cast)",
                        call.name,
                        param_ty.display(),
                        index + 1,
                        value_ty.display()
                    ))
                })?
            };
            args.push((lower_type(*param_ty)?, value));
        }

        let value = self.builder.call("calltmp", info.id, args);
        Ok((value, info.ret))
    }

    /// Insert the conversion from `from` to `to`, or report that the
    /// lattice forbids it. Callers supply the contextual error.
    fn cast_value(&mut self, value: Value, from: Ty, to: Ty) -> Result<Option<Value>, Diagnostic> {
        if !types::convertible(from, to)? {
            return Ok(None);
        }
        let value = match (from.primitive, to.primitive) {
            (Primitive::Int, Primitive::Float) => self.builder.sitofp("casttmp", value),
            (Primitive::Float, Primitive::Int) => self.builder.fptosi("casttmp", value),
            (Primitive::Bool, Primitive::Int) => {
                self.builder.zext("casttmp", IrType::I1, IrType::I32, value)
            }
            (Primitive::Bool, Primitive::Float) => {
                self.builder.uitofp("casttmp", IrType::I1, value)
            }
            (Primitive::Int, Primitive::Bool) => self.builder.icmp(
                "iboolcast",
                IntPred::Ne,
                IrType::I32,
                value,
                Value::I32(0),
            ),
            (Primitive::Float, Primitive::Bool) => {
                self.builder
                    .fcmp("fboolcast", FloatPred::One, value, Value::F64(0.0))
            }
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    /// Lower a value to a 1-bit condition: Int ≠ 0, Float ≠ 0.0, Bool
    /// as-is. None for anything else.
    fn bool_value(&mut self, value: Value, ty: Ty) -> Option<Value> {
        if !ty.is_scalar() {
            return None;
        }
        match ty.primitive {
            Primitive::Bool => Some(value),
            Primitive::Int => Some(self.builder.icmp(
                "iboolcast",
                IntPred::Ne,
                IrType::I32,
                value,
                Value::I32(0),
            )),
            Primitive::Float => {
                Some(
                    self.builder
                        .fcmp("fboolcast", FloatPred::One, value, Value::F64(0.0)),
                )
            }
            Primitive::String => None,
        }
    }
}

impl Default for Codegen {
    fn default() -> Self {
        Self::new()
    }
}

fn lower_type(ty: Ty) -> Result<IrType, Diagnostic> {
    if !ty.is_scalar() {
        return Err(Diagnostic::semantic(format!(
            "type '{}' has no machine representation",
            ty.display()
        )));
    }
    match ty.primitive {
        Primitive::Int => Ok(IrType::I32),
        Primitive::Float => Ok(IrType::F64),
        Primitive::Bool => Ok(IrType::I1),
        Primitive::String => Err(Diagnostic::semantic(
            "type 'String' has no machine representation".to_string(),
        )),
    }
}
