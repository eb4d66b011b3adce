//! Table-driven LL(1) parser.
//!
//! `language_parser()` builds the parser for the Yolang grammar:
//! it loads the declarative grammar, cross-checks its terminals against
//! the lexer's token names, runs the grammar analyses, and compiles the
//! flat parsing table. `Parser::parse` then drives the table over a
//! token stream and dispatches semantic actions to the AST builder.

pub mod actions;
pub mod builder;
pub mod table;

use crate::ast::Program;
use crate::diagnostic::Diagnostic;
use crate::grammar::analysis::GrammarAnalysis;
use crate::grammar::{Grammar, SymbolKind};
use crate::parser::builder::AstBuilder;
use crate::parser::table::{compile_table, ParserTable};
use crate::syntax::lexer::Lexer;
use crate::syntax::token::TokenKind;

/// The Yolang grammar. `<` and `>` appear both as relational operators
/// and as the `Array<T>` brackets; the parser tells them apart by
/// position alone.
pub fn yolang_grammar() -> Result<Grammar, Diagnostic> {
    Grammar::from_lines(&[
        "<Program>           -> <FunctionList> EndOfFile",
        // Functions
        "<FunctionList>      -> <Function> <FunctionList>",
        "<FunctionList>      -> #Eps#",
        "<Function>          -> Func <Identifier> LeftParenthesis <ParamList> RightParenthesis <OptionalReturnType> Colon <Statement> {OnFunctionParsed}",
        "<OptionalReturnType> -> Arrow <Type> {OnFunctionReturnTypeParsed}",
        "<OptionalReturnType> -> #Eps#",
        "<ParamList>         -> <Param> <ParamListTail>",
        "<ParamList>         -> #Eps#",
        "<ParamListTail>     -> Comma <Param> <ParamListTail>",
        "<ParamListTail>     -> #Eps#",
        "<Param>             -> <Identifier> Colon <Type> {OnFunctionParamParsed}",
        // Types
        "<Type>              -> Int {OnIntegerTypeParsed}",
        "<Type>              -> Float {OnFloatTypeParsed}",
        "<Type>              -> Bool {OnBoolTypeParsed}",
        "<Type>              -> String {OnStringTypeParsed}",
        "<Type>              -> Array LeftAngleBracket <ArrayType>",
        "<ArrayType>         -> Int RightAngleBracket {OnArrayIntTypeParsed}",
        "<ArrayType>         -> Float RightAngleBracket {OnArrayFloatTypeParsed}",
        "<ArrayType>         -> Bool RightAngleBracket {OnArrayBoolTypeParsed}",
        "<ArrayType>         -> String RightAngleBracket {OnArrayStringTypeParsed}",
        // Statements
        "<Statement>         -> <Condition>",
        "<Statement>         -> <Loop>",
        "<Statement>         -> <Decl>",
        "<Statement>         -> <Return>",
        "<Statement>         -> <Composite>",
        "<Statement>         -> <Print>",
        "<Statement>         -> <Scan>",
        "<Statement>         -> <StmtStartsWithId>",
        // Conditional; the Else alternative comes first so the nearest
        // conditional claims a dangling else.
        "<Condition>         -> If LeftParenthesis <Expression> RightParenthesis <Statement> {OnIfStatementParsed} <OptionalElse>",
        "<OptionalElse>      -> Else <Statement> {OnOptionalElseClauseParsed}",
        "<OptionalElse>      -> #Eps#",
        // Loop
        "<Loop>              -> While LeftParenthesis <Expression> RightParenthesis <Statement> {OnWhileLoopParsed}",
        // Variable declaration
        "<Decl>              -> Var <Identifier> Colon <Type> <OptionalAssign> Semicolon {OnVariableDeclarationParsed}",
        "<OptionalAssign>    -> Assign <Expression> {OnOptionalAssignParsed}",
        "<OptionalAssign>    -> #Eps#",
        // Return
        "<Return>            -> Return <ReturnExpression> Semicolon {OnReturnStatementParsed}",
        "<ReturnExpression>  -> <Expression> {OnReturnExpression}",
        "<ReturnExpression>  -> #Eps#",
        // Composite statement
        "<Composite>         -> LeftCurly {PrepareCompositeStatementParsing} <StatementList> RightCurly {OnCompositeStatementParsed}",
        "<StatementList>     -> <Statement> {OnCompositeStatementPartParsed} <StatementList>",
        "<StatementList>     -> #Eps#",
        // Builtin I/O
        "<Print>             -> Print LeftParenthesis {PrepareFnCallParamsParsing} <FunctionCallParamList> RightParenthesis Semicolon {OnPrintStatementParsed}",
        "<Scan>              -> Scan LeftParenthesis {PrepareFnCallParamsParsing} <FunctionCallParamList> RightParenthesis Semicolon {OnScanStatementParsed}",
        // Assignment, array-element assignment, or call statement
        "<StmtStartsWithId>  -> <Identifier> <AfterIdStmt>",
        "<AfterIdStmt>       -> LeftSquareBracket <Expression> RightSquareBracket Assign <Expression> Semicolon {OnArrayElementAssignStatement}",
        "<AfterIdStmt>       -> Assign <Expression> Semicolon {OnAssignStatementParsed}",
        "<AfterIdStmt>       -> LeftParenthesis {PrepareFnCallParamsParsing} <FunctionCallParamList> RightParenthesis Semicolon {OnFunctionCallStatementParsed}",
        // Expressions
        "<Expression>        -> <OrExpr>",
        "<OrExpr>            -> <AndExpr> <OrExprTail>",
        "<OrExprTail>        -> Or <AndExpr> {OnBinaryOrParsed} <OrExprTail>",
        "<OrExprTail>        -> #Eps#",
        "<AndExpr>           -> <EqualsExpr> <AndExprTail>",
        "<AndExprTail>       -> And <EqualsExpr> {OnBinaryAndParsed} <AndExprTail>",
        "<AndExprTail>       -> #Eps#",
        "<EqualsExpr>        -> <RelationExpr> <EqualsExprTail>",
        "<EqualsExprTail>    -> Equals <RelationExpr> {OnBinaryEqualsParsed} <EqualsExprTail>",
        "<EqualsExprTail>    -> NotEquals <RelationExpr> {OnBinaryNotEqualsParsed} <EqualsExprTail>",
        "<EqualsExprTail>    -> #Eps#",
        "<RelationExpr>      -> <AddSubExpr> <RelationExprTail>",
        "<RelationExprTail>  -> LeftAngleBracket <AddSubExpr> {OnBinaryLessParsed} <RelationExprTail>",
        "<RelationExprTail>  -> RightAngleBracket <AddSubExpr> {OnBinaryMoreParsed} <RelationExprTail>",
        "<RelationExprTail>  -> LessOrEquals <AddSubExpr> {OnBinaryLessOrEqualsParsed} <RelationExprTail>",
        "<RelationExprTail>  -> MoreOrEquals <AddSubExpr> {OnBinaryMoreOrEqualsParsed} <RelationExprTail>",
        "<RelationExprTail>  -> #Eps#",
        "<AddSubExpr>        -> <MulDivExpr> <AddSubExprTail>",
        "<AddSubExprTail>    -> Plus <MulDivExpr> {OnBinaryPlusParsed} <AddSubExprTail>",
        "<AddSubExprTail>    -> Minus <MulDivExpr> {OnBinaryMinusParsed} <AddSubExprTail>",
        "<AddSubExprTail>    -> #Eps#",
        "<MulDivExpr>        -> <AtomExpr> <MulDivExprTail>",
        "<MulDivExprTail>    -> Mul <AtomExpr> {OnBinaryMulParsed} <MulDivExprTail>",
        "<MulDivExprTail>    -> Div <AtomExpr> {OnBinaryDivParsed} <MulDivExprTail>",
        "<MulDivExprTail>    -> Mod <AtomExpr> {OnBinaryModuloParsed} <MulDivExprTail>",
        "<MulDivExprTail>    -> #Eps#",
        "<AtomExpr>          -> LeftParenthesis <Expression> RightParenthesis",
        "<AtomExpr>          -> IntegerConstant {OnIntegerConstantParsed}",
        "<AtomExpr>          -> FloatConstant {OnFloatConstantParsed}",
        "<AtomExpr>          -> Minus <AtomExpr> {OnUnaryMinusParsed}",
        "<AtomExpr>          -> Plus <AtomExpr> {OnUnaryPlusParsed}",
        "<AtomExpr>          -> Negation <AtomExpr> {OnUnaryNegationParsed}",
        "<AtomExpr>          -> <Identifier> <AfterIdExpr>",
        "<AtomExpr>          -> True {OnTrueConstantParsed}",
        "<AtomExpr>          -> False {OnFalseConstantParsed}",
        "<AtomExpr>          -> StringConstant {OnStringConstantParsed}",
        "<AfterIdExpr>       -> LeftParenthesis {PrepareFnCallParamsParsing} <FunctionCallParamList> RightParenthesis {OnFunctionCallExprParsed}",
        "<AfterIdExpr>       -> LeftSquareBracket <Expression> RightSquareBracket {ArrayElementAccess}",
        "<AfterIdExpr>       -> #Eps#",
        // Call argument lists
        "<FunctionCallParamList>       -> <FunctionCallParamListMember> <FunctionCallParamListTail>",
        "<FunctionCallParamList>       -> #Eps#",
        "<FunctionCallParamListTail>   -> Comma <FunctionCallParamListMember> <FunctionCallParamListTail>",
        "<FunctionCallParamListTail>   -> #Eps#",
        "<FunctionCallParamListMember> -> <Expression> {OnFunctionCallParamListMemberParsed}",
        // Identifier
        "<Identifier>        -> Identifier {OnIdentifierParsed}",
    ])
}

/// Check that every terminal the grammar names is a token the lexer
/// can produce. A mismatch is a configuration bug, caught before any
/// source is parsed.
pub fn verify_grammar_terminals(grammar: &Grammar) -> Result<(), Diagnostic> {
    for production in &grammar.productions {
        for symbol in &production.rhs {
            if symbol.kind == SymbolKind::Terminal && !TokenKind::exists(&symbol.text) {
                return Err(Diagnostic::internal(format!(
                    "lexer doesn't know about '{}' token, but grammar does",
                    symbol.text
                )));
            }
        }
    }
    Ok(())
}

#[derive(Debug)]
pub struct Parser {
    table: ParserTable,
}

impl Parser {
    /// Build a parser from any grammar. Fails on grammar/lexer terminal
    /// mismatch and on unbound action tags.
    pub fn from_grammar(grammar: &Grammar) -> Result<Parser, Diagnostic> {
        verify_grammar_terminals(grammar)?;
        let analysis = GrammarAnalysis::analyze(grammar);
        let table = compile_table(grammar, &analysis)?;
        Ok(Parser { table })
    }

    pub fn table(&self) -> &ParserTable {
        &self.table
    }

    /// Parse a source string into a program. The first lexical or
    /// syntactic error aborts the parse.
    pub fn parse(&self, source: &str) -> Result<Program, Diagnostic> {
        let mut lexer = Lexer::new(source);
        let mut token = lexer.next_token()?;
        let mut addresses: Vec<usize> = Vec::new();
        let mut index = 0usize;
        let mut builder = AstBuilder::default();

        loop {
            let entry = &self.table.entries[index];

            if let Some(action) = entry.action {
                builder.apply(action, &token)?;
            } else if !entry.predict.contains(token.kind.name()) {
                if !entry.is_error {
                    // A later alternative of this nonterminal may match.
                    index += 1;
                    continue;
                }
                return Err(Diagnostic::syntax(
                    format!("unexpected token: {}", token.kind.name()),
                    token.span(),
                ));
            }

            if entry.is_ending {
                if !addresses.is_empty() {
                    return Err(Diagnostic::internal(
                        "return-address stack not empty at end of parse".to_string(),
                    ));
                }
                return builder.finish();
            }
            if entry.do_push {
                addresses.push(index + 1);
            }
            if entry.do_shift {
                token = lexer.next_token()?;
            }

            index = match entry.next {
                Some(next) => next,
                None => addresses.pop().ok_or_else(|| {
                    Diagnostic::internal("return-address stack underflow".to_string())
                })?,
            };
        }
    }
}

/// The parser for the Yolang language.
pub fn language_parser() -> Result<Parser, Diagnostic> {
    let grammar = yolang_grammar()?;
    Parser::from_grammar(&grammar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, Expr, Literal, Stmt, UnOp};
    use crate::diagnostic::DiagnosticKind;
    use crate::types::Ty;

    fn parse(source: &str) -> Program {
        language_parser().unwrap().parse(source).unwrap()
    }

    fn parse_err(source: &str) -> Diagnostic {
        language_parser().unwrap().parse(source).unwrap_err()
    }

    #[test]
    fn grammar_passes_terminal_check() {
        let grammar = yolang_grammar().unwrap();
        assert!(verify_grammar_terminals(&grammar).is_ok());
    }

    #[test]
    fn unknown_terminal_in_grammar_fails_fast() {
        let grammar = Grammar::from_lines(&["<S> -> Whatever EndOfFile"]).unwrap();
        let err = Parser::from_grammar(&grammar).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::InternalGrammar);
        assert!(err.message.contains("Whatever"));
    }

    #[test]
    fn yolang_grammar_is_ll1_except_dangling_else() {
        let grammar = yolang_grammar().unwrap();
        let analysis = GrammarAnalysis::analyze(&grammar);
        for lhs in grammar.nonterminals() {
            // The dangling else is the one deliberate overlap: the
            // Else alternative is listed first and wins greedily.
            if lhs == "OptionalElse" {
                continue;
            }
            let indices = grammar.productions_for(lhs);
            for (a, &i) in indices.iter().enumerate() {
                for &j in &indices[a + 1..] {
                    let pi = analysis.predict(&grammar, i);
                    let pj = analysis.predict(&grammar, j);
                    assert!(
                        pi.is_disjoint(&pj),
                        "<{}> alternatives {} and {} overlap",
                        lhs,
                        i,
                        j
                    );
                }
            }
        }
    }

    #[test]
    fn empty_program_parses() {
        let program = parse("");
        assert!(program.functions.is_empty());
    }

    #[test]
    fn minimal_function() {
        let program = parse("func main() -> Int: { return 0; }");
        assert_eq!(program.functions.len(), 1);
        let func = &program.functions[0];
        assert_eq!(func.name, "main");
        assert_eq!(func.return_ty, Some(Ty::INT));
        assert!(func.params.is_empty());
        match &func.body {
            Stmt::Block(stmts) => assert_eq!(stmts.len(), 1),
            other => panic!("expected block body, got {:?}", other),
        }
    }

    #[test]
    fn function_without_return_type() {
        let program = parse("func side() : { return 0; }");
        assert_eq!(program.functions[0].return_ty, None);
    }

    #[test]
    fn params_in_order() {
        let program = parse("func f(a: Int, b: Float, c: Bool) -> Int: { return 0; }");
        let params = &program.functions[0].params;
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].name, "a");
        assert_eq!(params[0].ty, Ty::INT);
        assert_eq!(params[1].name, "b");
        assert_eq!(params[1].ty, Ty::FLOAT);
        assert_eq!(params[2].name, "c");
        assert_eq!(params[2].ty, Ty::BOOL);
    }

    #[test]
    fn array_type_parses() {
        let program = parse("func f() -> Int: { var xs: Array<Int>; return 0; }");
        match &program.functions[0].body {
            Stmt::Block(stmts) => match &stmts[0] {
                Stmt::VarDecl { ty, .. } => {
                    assert_eq!(ty.nesting, 1);
                }
                other => panic!("expected declaration, got {:?}", other),
            },
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn precedence_mul_binds_tighter_than_plus() {
        let program = parse("func f() -> Int: { return 1 + 2 * 3; }");
        let Stmt::Block(stmts) = &program.functions[0].body else {
            panic!("expected block")
        };
        let Stmt::Return(Some(Expr::Binary { op, rhs, .. })) = &stmts[0] else {
            panic!("expected return of binary expression")
        };
        assert_eq!(*op, BinOp::Plus);
        let Expr::Binary { op: inner, .. } = rhs.as_ref() else {
            panic!("expected nested binary")
        };
        assert_eq!(*inner, BinOp::Mul);
    }

    #[test]
    fn left_associative_chains() {
        let program = parse("func f() -> Int: { return 1 - 2 - 3; }");
        let Stmt::Block(stmts) = &program.functions[0].body else {
            panic!("expected block")
        };
        let Stmt::Return(Some(Expr::Binary { op, lhs, rhs })) = &stmts[0] else {
            panic!("expected return of binary expression")
        };
        assert_eq!(*op, BinOp::Minus);
        assert!(matches!(lhs.as_ref(), Expr::Binary { op: BinOp::Minus, .. }));
        assert!(matches!(rhs.as_ref(), Expr::Literal(Literal::Int(3))));
    }

    #[test]
    fn relational_and_logical_operators() {
        let program = parse("func f() -> Bool: { return 1 < 2 && 3 >= 4 || !True; }");
        let Stmt::Block(stmts) = &program.functions[0].body else {
            panic!("expected block")
        };
        let Stmt::Return(Some(Expr::Binary { op, .. })) = &stmts[0] else {
            panic!("expected return")
        };
        assert_eq!(*op, BinOp::Or);
    }

    #[test]
    fn unary_operators_nest() {
        let program = parse("func f() -> Int: { return --1; }");
        let Stmt::Block(stmts) = &program.functions[0].body else {
            panic!("expected block")
        };
        let Stmt::Return(Some(Expr::Unary { op, expr })) = &stmts[0] else {
            panic!("expected unary return")
        };
        assert_eq!(*op, UnOp::Minus);
        assert!(matches!(expr.as_ref(), Expr::Unary { op: UnOp::Minus, .. }));
    }

    #[test]
    fn dangling_else_binds_to_nearest_if() {
        let program = parse(
            "func f() -> Int: { if (1) if (2) return 1; else return 2; return 3; }",
        );
        let Stmt::Block(stmts) = &program.functions[0].body else {
            panic!("expected block")
        };
        let Stmt::If {
            then_stmt,
            else_stmt: outer_else,
            ..
        } = &stmts[0]
        else {
            panic!("expected if")
        };
        assert!(outer_else.is_none());
        let Stmt::If { else_stmt, .. } = then_stmt.as_ref() else {
            panic!("expected nested if")
        };
        assert!(else_stmt.is_some());
    }

    #[test]
    fn call_statement_and_expression() {
        let program =
            parse("func f() -> Int: { g(1, 2); var x: Int = g(3); return x; }");
        let Stmt::Block(stmts) = &program.functions[0].body else {
            panic!("expected block")
        };
        let Stmt::ExprCall(call) = &stmts[0] else {
            panic!("expected call statement")
        };
        assert_eq!(call.name, "g");
        assert_eq!(call.args.len(), 2);
        let Stmt::VarDecl {
            init: Some(Expr::Call(inner)),
            ..
        } = &stmts[1]
        else {
            panic!("expected declaration initialized by call")
        };
        assert_eq!(inner.args.len(), 1);
    }

    #[test]
    fn array_access_and_assignment() {
        let program = parse("func f() -> Int: { xs[0] = 1; return xs[1]; }");
        let Stmt::Block(stmts) = &program.functions[0].body else {
            panic!("expected block")
        };
        assert!(matches!(&stmts[0], Stmt::ArrayAssign { name, .. } if name == "xs"));
        let Stmt::Return(Some(Expr::ArrayIndex { name, .. })) = &stmts[1] else {
            panic!("expected array index return")
        };
        assert_eq!(name, "xs");
    }

    #[test]
    fn print_scan_and_while() {
        let program = parse(
            "func f() -> Int: { var x: Int; scan(x); while (x > 0) { print(x); x = x - 1; } return 0; }",
        );
        let Stmt::Block(stmts) = &program.functions[0].body else {
            panic!("expected block")
        };
        assert!(matches!(&stmts[1], Stmt::Scan(args) if args.len() == 1));
        assert!(matches!(&stmts[2], Stmt::While { .. }));
    }

    #[test]
    fn bare_return_latches_nothing() {
        let program = parse("func f() : { return; }");
        let Stmt::Block(stmts) = &program.functions[0].body else {
            panic!("expected block")
        };
        assert!(matches!(&stmts[0], Stmt::Return(None)));
    }

    #[test]
    fn string_literal_expression() {
        let program = parse("func f() -> Int: { print(\"hi\"); return 0; }");
        let Stmt::Block(stmts) = &program.functions[0].body else {
            panic!("expected block")
        };
        let Stmt::Print(args) = &stmts[0] else {
            panic!("expected print")
        };
        assert!(matches!(&args[0], Expr::Literal(Literal::Str(s)) if s == "hi"));
    }

    #[test]
    fn syntax_error_reports_unexpected_token() {
        let err = parse_err("func main( -> Int: { return 0; }");
        assert_eq!(err.kind, DiagnosticKind::Syntax);
        assert!(err.message.contains("unexpected token: Arrow"));
    }

    #[test]
    fn missing_semicolon_is_a_syntax_error() {
        let err = parse_err("func main() -> Int: { return 0 }");
        assert_eq!(err.kind, DiagnosticKind::Syntax);
    }

    #[test]
    fn functions_keep_source_order() {
        let program = parse(
            "func a() -> Int: { return 1; } func b() -> Int: { return 2; } func c() -> Int: { return 3; }",
        );
        let names: Vec<_> = program.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
