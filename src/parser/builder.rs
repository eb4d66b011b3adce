//! AST builder driven by the parser's semantic actions.
//!
//! The builder holds the intermediate stacks the table-driven parse
//! assembles nodes on. Stack underflow or a wrong node kind on top
//! means the grammar and its action bindings disagree — an internal
//! error, never a user-facing one.

use crate::ast::{Call, Expr, Function, Literal, Param, Program, Stmt};
use crate::diagnostic::Diagnostic;
use crate::parser::actions::Action;
use crate::syntax::token::Token;
use crate::types::Ty;

#[derive(Default)]
pub struct AstBuilder {
    expressions: Vec<Expr>,
    statements: Vec<Stmt>,
    types: Vec<Ty>,
    params: Vec<Param>,
    call_args: Vec<Vec<Expr>>,
    composites: Vec<Vec<Stmt>>,
    functions: Vec<Function>,
    return_expr: Option<Expr>,
    init_expr: Option<Expr>,
    fn_return_ty: Option<Ty>,
}

impl AstBuilder {
    /// Run one semantic action. `token` is the token current at the
    /// action's table entry; literal and identifier actions read its
    /// lexeme.
    pub fn apply(&mut self, action: Action, token: &Token) -> Result<(), Diagnostic> {
        match action {
            Action::ScalarType(primitive) => self.types.push(Ty::scalar(primitive)),
            Action::ArrayType(primitive) => self.types.push(Ty::array(primitive)),

            Action::IntConstant => {
                let text = lexeme(token)?;
                let value: i32 = text.parse().map_err(|_| {
                    Diagnostic::semantic(format!("integer constant '{}' is out of range", text))
                })?;
                self.expressions.push(Expr::Literal(Literal::Int(value)));
            }
            Action::FloatConstant => {
                let text = lexeme(token)?;
                let value: f64 = text.parse().map_err(|_| {
                    Diagnostic::semantic(format!("float constant '{}' is out of range", text))
                })?;
                self.expressions.push(Expr::Literal(Literal::Float(value)));
            }
            Action::StringConstant => {
                let text = lexeme(token)?;
                self.expressions
                    .push(Expr::Literal(Literal::Str(text.to_string())));
            }
            Action::TrueConstant => self.expressions.push(Expr::Literal(Literal::Bool(true))),
            Action::FalseConstant => self.expressions.push(Expr::Literal(Literal::Bool(false))),
            Action::Identifier => {
                let text = lexeme(token)?;
                self.expressions.push(Expr::Identifier(text.to_string()));
            }

            Action::Unary(op) => {
                let expr = self.pop_expr()?;
                self.expressions.push(Expr::Unary {
                    op,
                    expr: Box::new(expr),
                });
            }
            Action::Binary(op) => {
                let rhs = self.pop_expr()?;
                let lhs = self.pop_expr()?;
                self.expressions.push(Expr::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                });
            }

            Action::PrepareCallArgs => self.call_args.push(Vec::new()),
            Action::CallArg => {
                let expr = self.pop_expr()?;
                self.call_args
                    .last_mut()
                    .ok_or_else(|| underflow("call argument list"))?
                    .push(expr);
            }
            Action::CallExpr => {
                let call = self.build_call()?;
                self.expressions.push(Expr::Call(call));
            }
            Action::CallStatement => {
                let call = self.build_call()?;
                self.statements.push(Stmt::ExprCall(call));
            }

            Action::ArrayAccess => {
                let index = self.pop_expr()?;
                let name = self.pop_identifier()?;
                self.expressions.push(Expr::ArrayIndex {
                    name,
                    index: Box::new(index),
                });
            }
            Action::ArrayAssignStatement => {
                let value = self.pop_expr()?;
                let index = self.pop_expr()?;
                let name = self.pop_identifier()?;
                self.statements.push(Stmt::ArrayAssign { name, index, value });
            }

            Action::VariableDeclaration => {
                let ty = self.pop_type()?;
                let name = self.pop_identifier()?;
                let init = self.init_expr.take();
                self.statements.push(Stmt::VarDecl { name, ty, init });
            }
            Action::OptionalInit => {
                let expr = self.pop_expr()?;
                self.init_expr = Some(expr);
            }
            Action::AssignStatement => {
                let value = self.pop_expr()?;
                let name = self.pop_identifier()?;
                self.statements.push(Stmt::Assign { name, value });
            }

            Action::ReturnExpression => {
                let expr = self.pop_expr()?;
                self.return_expr = Some(expr);
            }
            Action::ReturnStatement => {
                let expr = self.return_expr.take();
                self.statements.push(Stmt::Return(expr));
            }

            Action::IfStatement => {
                let then_stmt = self.pop_stmt()?;
                let cond = self.pop_expr()?;
                self.statements.push(Stmt::If {
                    cond,
                    then_stmt: Box::new(then_stmt),
                    else_stmt: None,
                });
            }
            Action::OptionalElse => {
                let else_stmt = self.pop_stmt()?;
                match self.pop_stmt()? {
                    Stmt::If {
                        cond,
                        then_stmt,
                        else_stmt: None,
                    } => self.statements.push(Stmt::If {
                        cond,
                        then_stmt,
                        else_stmt: Some(Box::new(else_stmt)),
                    }),
                    _ => {
                        return Err(Diagnostic::internal(
                            "else clause without a conditional on the statement stack".to_string(),
                        ))
                    }
                }
            }
            Action::WhileLoop => {
                let body = self.pop_stmt()?;
                let cond = self.pop_expr()?;
                self.statements.push(Stmt::While {
                    cond,
                    body: Box::new(body),
                });
            }

            Action::PrepareComposite => self.composites.push(Vec::new()),
            Action::CompositePart => {
                let stmt = self.pop_stmt()?;
                self.composites
                    .last_mut()
                    .ok_or_else(|| underflow("composite statement list"))?
                    .push(stmt);
            }
            Action::CompositeDone => {
                let children = self
                    .composites
                    .pop()
                    .ok_or_else(|| underflow("composite statement list"))?;
                self.statements.push(Stmt::Block(children));
            }

            Action::PrintStatement => {
                let args = self
                    .call_args
                    .pop()
                    .ok_or_else(|| underflow("call argument list"))?;
                self.statements.push(Stmt::Print(args));
            }
            Action::ScanStatement => {
                let args = self
                    .call_args
                    .pop()
                    .ok_or_else(|| underflow("call argument list"))?;
                self.statements.push(Stmt::Scan(args));
            }

            Action::FunctionReturnType => {
                let ty = self.pop_type()?;
                self.fn_return_ty = Some(ty);
            }
            Action::FunctionParam => {
                let ty = self.pop_type()?;
                let name = self.pop_identifier()?;
                self.params.push(Param { name, ty });
            }
            Action::FunctionDone => {
                let body = self.pop_stmt()?;
                let name = self.pop_identifier()?;
                let params = std::mem::take(&mut self.params);
                let return_ty = self.fn_return_ty.take();
                self.functions.push(Function {
                    name,
                    return_ty,
                    params,
                    body,
                });
            }
        }
        Ok(())
    }

    /// Close out the parse. Every stack and latch must be spent; a
    /// leftover means the grammar and action bindings are out of sync.
    pub fn finish(self) -> Result<Program, Diagnostic> {
        if !self.expressions.is_empty()
            || !self.statements.is_empty()
            || !self.types.is_empty()
            || !self.params.is_empty()
            || !self.call_args.is_empty()
            || !self.composites.is_empty()
            || self.return_expr.is_some()
            || self.init_expr.is_some()
            || self.fn_return_ty.is_some()
        {
            return Err(Diagnostic::internal(
                "AST builder finished with leftover intermediate state".to_string(),
            ));
        }
        Ok(Program {
            functions: self.functions,
        })
    }

    fn build_call(&mut self) -> Result<Call, Diagnostic> {
        let name = self.pop_identifier()?;
        let args = self
            .call_args
            .pop()
            .ok_or_else(|| underflow("call argument list"))?;
        Ok(Call { name, args })
    }

    fn pop_expr(&mut self) -> Result<Expr, Diagnostic> {
        self.expressions
            .pop()
            .ok_or_else(|| underflow("expression stack"))
    }

    fn pop_stmt(&mut self) -> Result<Stmt, Diagnostic> {
        self.statements
            .pop()
            .ok_or_else(|| underflow("statement stack"))
    }

    fn pop_type(&mut self) -> Result<Ty, Diagnostic> {
        self.types.pop().ok_or_else(|| underflow("type stack"))
    }

    fn pop_identifier(&mut self) -> Result<String, Diagnostic> {
        match self.pop_expr()? {
            Expr::Identifier(name) => Ok(name),
            other => Err(Diagnostic::internal(format!(
                "expected an identifier on the expression stack, found {:?}",
                other
            ))),
        }
    }
}

fn lexeme(token: &Token) -> Result<&str, Diagnostic> {
    token
        .lexeme
        .as_deref()
        .ok_or_else(|| Diagnostic::internal(format!("token {:?} carries no lexeme", token.kind)))
}

fn underflow(what: &str) -> Diagnostic {
    Diagnostic::internal(format!("{} underflow in AST builder", what))
}
