//! Instruction builder with an insertion point, mirroring the usual
//! IR-builder shape: position at a block, append instructions, move on.
//! Allocas always land in the function's entry block ahead of its
//! terminator so they dominate every use.

use super::{
    ArithOp, Block, BlockId, ExternDecl, FloatPred, FuncId, FunctionDef, Inst, InstId, IntPred,
    IrType, Module, StrId, Value,
};

pub struct Builder {
    module: Module,
    cur_func: Option<usize>,
    cur_block: Option<usize>,
}

impl Builder {
    pub fn new(module_name: &str) -> Self {
        Self {
            module: Module::new(module_name),
            cur_func: None,
            cur_block: None,
        }
    }

    pub fn finish(self) -> Module {
        self.module
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn declare_external(&mut self, name: &str, ret: IrType, params: Vec<IrType>, variadic: bool) {
        self.module.declare_external(name, ret, params, variadic);
    }

    pub fn external(&self, name: &str) -> Option<&ExternDecl> {
        self.module.declares.iter().find(|d| d.name == name)
    }

    /// Declare a function signature without a body. Lowering positions
    /// into it later with `begin_body`.
    pub fn declare_function(
        &mut self,
        name: &str,
        ret: IrType,
        params: Vec<(String, IrType)>,
    ) -> FuncId {
        self.module.funcs.push(FunctionDef {
            name: name.to_string(),
            ret,
            params,
            insts: Vec::new(),
            blocks: Vec::new(),
        });
        FuncId(self.module.funcs.len() - 1)
    }

    /// Create the entry block of a declared function and position there.
    pub fn begin_body(&mut self, func: FuncId) -> BlockId {
        let label = format!("{}_entry", self.module.funcs[func.0].name);
        self.cur_func = Some(func.0);
        self.module.funcs[func.0].blocks.push(Block {
            label,
            insts: Vec::new(),
        });
        self.cur_block = Some(0);
        BlockId(0)
    }

    /// Append a new block to the current function without moving the
    /// insertion point.
    pub fn add_block(&mut self, label: &str) -> BlockId {
        let cur = self.cur();
        let func = &mut self.module.funcs[cur];
        func.blocks.push(Block {
            label: label.to_string(),
            insts: Vec::new(),
        });
        BlockId(func.blocks.len() - 1)
    }

    pub fn set_insert_point(&mut self, block: BlockId) {
        self.cur_block = Some(block.0);
    }

    pub fn insert_block(&self) -> BlockId {
        BlockId(self.cur_block.unwrap_or(0))
    }

    pub fn current_function(&self) -> &FunctionDef {
        &self.module.funcs[self.cur()]
    }

    /// Drop the function the builder is positioned in, after its
    /// verification failed.
    pub fn remove_current_function(&mut self) {
        if let Some(index) = self.cur_func.take() {
            self.module.remove_function(FuncId(index));
            self.cur_block = None;
        }
    }

    /// Whether the block the builder points at already ends in a
    /// terminator.
    pub fn is_terminated(&self) -> bool {
        let func = self.current_function();
        func.is_terminated(self.insert_block())
    }

    pub fn block_terminated(&self, block: BlockId) -> bool {
        self.current_function().is_terminated(block)
    }

    pub fn arg(&self, index: usize) -> Value {
        Value::Arg(index)
    }

    pub fn string_const(&mut self, text: &str) -> Value {
        Value::Str(self.module.intern_string(text))
    }

    /// Allocate a stack slot in the entry block, before its terminator
    /// if it already has one.
    pub fn entry_alloca(&mut self, name: &str, ty: IrType) -> Value {
        let cur = self.cur();
        self.module.funcs[cur].insts.push(Inst::Alloca {
            name: name.to_string(),
            ty,
        });
        let id = InstId(self.module.funcs[cur].insts.len() - 1);

        let func = &self.module.funcs[cur];
        let at = func.blocks[0]
            .insts
            .iter()
            .position(|i| func.insts[i.0].is_terminator())
            .unwrap_or(func.blocks[0].insts.len());
        self.module.funcs[cur].blocks[0].insts.insert(at, id);
        Value::Inst(id)
    }

    pub fn store(&mut self, ty: IrType, value: Value, ptr: Value) {
        self.push(Inst::Store { ty, value, ptr });
    }

    pub fn load(&mut self, name: &str, ty: IrType, ptr: Value) -> Value {
        self.push_valued(Inst::Load {
            name: name.to_string(),
            ty,
            ptr,
        })
    }

    pub fn arith(&mut self, name: &str, op: ArithOp, ty: IrType, lhs: Value, rhs: Value) -> Value {
        self.push_valued(Inst::Arith {
            name: name.to_string(),
            op,
            ty,
            lhs,
            rhs,
        })
    }

    pub fn neg(&mut self, name: &str, ty: IrType, value: Value) -> Value {
        self.push_valued(Inst::Neg {
            name: name.to_string(),
            ty,
            value,
        })
    }

    pub fn fneg(&mut self, name: &str, value: Value) -> Value {
        self.push_valued(Inst::FNeg {
            name: name.to_string(),
            value,
        })
    }

    pub fn icmp(&mut self, name: &str, pred: IntPred, ty: IrType, lhs: Value, rhs: Value) -> Value {
        self.push_valued(Inst::Icmp {
            name: name.to_string(),
            pred,
            ty,
            lhs,
            rhs,
        })
    }

    pub fn fcmp(&mut self, name: &str, pred: FloatPred, lhs: Value, rhs: Value) -> Value {
        self.push_valued(Inst::Fcmp {
            name: name.to_string(),
            pred,
            lhs,
            rhs,
        })
    }

    pub fn and(&mut self, name: &str, ty: IrType, lhs: Value, rhs: Value) -> Value {
        self.push_valued(Inst::And {
            name: name.to_string(),
            ty,
            lhs,
            rhs,
        })
    }

    pub fn or(&mut self, name: &str, ty: IrType, lhs: Value, rhs: Value) -> Value {
        self.push_valued(Inst::Or {
            name: name.to_string(),
            ty,
            lhs,
            rhs,
        })
    }

    pub fn xor(&mut self, name: &str, ty: IrType, lhs: Value, rhs: Value) -> Value {
        self.push_valued(Inst::Xor {
            name: name.to_string(),
            ty,
            lhs,
            rhs,
        })
    }

    pub fn sitofp(&mut self, name: &str, value: Value) -> Value {
        self.push_valued(Inst::Sitofp {
            name: name.to_string(),
            value,
        })
    }

    pub fn fptosi(&mut self, name: &str, value: Value) -> Value {
        self.push_valued(Inst::Fptosi {
            name: name.to_string(),
            value,
        })
    }

    pub fn zext(&mut self, name: &str, from: IrType, to: IrType, value: Value) -> Value {
        self.push_valued(Inst::Zext {
            name: name.to_string(),
            from,
            to,
            value,
        })
    }

    pub fn uitofp(&mut self, name: &str, from: IrType, value: Value) -> Value {
        self.push_valued(Inst::Uitofp {
            name: name.to_string(),
            from,
            value,
        })
    }

    /// Call a defined function by id.
    pub fn call(&mut self, name: &str, callee: FuncId, args: Vec<(IrType, Value)>) -> Value {
        let target = &self.module.funcs[callee.0];
        let inst = Inst::Call {
            name: name.to_string(),
            callee: target.name.clone(),
            ret: target.ret.clone(),
            sig_params: target.params.iter().map(|(_, t)| t.clone()).collect(),
            variadic: false,
            args,
        };
        self.push_valued(inst)
    }

    /// Call a pre-declared external (possibly variadic) function.
    pub fn call_external(&mut self, name: &str, callee: &str, args: Vec<(IrType, Value)>) -> Value {
        let decl = self
            .external(callee)
            .cloned()
            .unwrap_or(ExternDecl {
                name: callee.to_string(),
                ret: IrType::I32,
                params: Vec::new(),
                variadic: true,
            });
        self.push_valued(Inst::Call {
            name: name.to_string(),
            callee: decl.name,
            ret: decl.ret,
            sig_params: decl.params,
            variadic: decl.variadic,
            args,
        })
    }

    pub fn br(&mut self, target: BlockId) {
        self.push(Inst::Br { target });
    }

    pub fn cond_br(&mut self, cond: Value, then_block: BlockId, else_block: BlockId) {
        self.push(Inst::CondBr {
            cond,
            then_block,
            else_block,
        });
    }

    pub fn ret(&mut self, ty: IrType, value: Value) {
        self.push(Inst::Ret { ty, value });
    }

    pub fn unreachable(&mut self) {
        self.push(Inst::Unreachable);
    }

    fn cur(&self) -> usize {
        self.cur_func.expect("builder not positioned in a function")
    }

    fn push(&mut self, inst: Inst) {
        let cur = self.cur();
        let block = self.cur_block.expect("builder not positioned at a block");
        let func = &mut self.module.funcs[cur];
        func.insts.push(inst);
        let id = InstId(func.insts.len() - 1);
        func.blocks[block].insts.push(id);
    }

    fn push_valued(&mut self, inst: Inst) -> Value {
        let cur = self.cur();
        let block = self.cur_block.expect("builder not positioned at a block");
        let func = &mut self.module.funcs[cur];
        func.insts.push(inst);
        let id = InstId(func.insts.len() - 1);
        func.blocks[block].insts.push(id);
        Value::Inst(id)
    }
}
