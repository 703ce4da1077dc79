//! Type checking of a block's statement list. Synthesizes a type for
//! every expression node, inserts implicit integer-to-real casts, checks
//! call signatures against the symbol table's parameter chains, and
//! enforces the return discipline of functions and procedures.
//!
//! Diagnostics accumulate; one bad expression does not stop the walk.

use ast::{BinOp, Expr, ExprKind, Name, Pos, Stmt, StmtKind};
use std::fmt::{self, Display, Formatter};
use std::mem;
use symtab::{SymIndex, SymTab, SymbolKind, INTEGER_TYPE, REAL_TYPE, VOID_TYPE};
use thiserror::Error;

pub type Diagnostics = Vec<Diagnostic>;

/// A semantic error with the position it was detected at. Positions are
/// absent only for an empty function body, where there is no node to
/// point at.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub pos: Option<Pos>,
    pub kind: DiagKind,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.pos {
            Some(pos) => write!(f, "{pos}: {}", self.kind),
            None => self.kind.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiagKind {
    #[error("A function must return a value.")]
    MissingReturn,
    #[error("Must return a value from a function.")]
    ReturnValueMissing,
    #[error("Procedures may not return a value.")]
    ReturnValueInProcedure,
    #[error("Bad return type from function.")]
    ReturnTypeMismatch,
    #[error("More actual than formal parameters in call to '{0}'.")]
    MoreActualThanFormal(String),
    #[error("More formal than actual parameters in call to '{0}'.")]
    MoreFormalThanActual(String),
    #[error("Type mismatch for parameter '{parameter}' in call to '{routine}'.")]
    ParameterTypeMismatch { routine: String, parameter: String },
    #[error("Predicate must be of integer type.")]
    NonIntegerCondition,
    #[error("'{0}' is not an array.")]
    NonArrayIndexed(String),
    #[error("Array index must be of integer type.")]
    NonIntegerIndex,
    #[error("Operand of '{0}' has no value.")]
    VoidOperand(&'static str),
    #[error("Operand of '{0}' must be of integer type.")]
    IntegerOperandExpected(&'static str),
    #[error("Unary minus has no operand value.")]
    UMinusVoidOperand,
    #[error("Incompatible types in assignment.")]
    AssignTypeMismatch,
    #[error("'{0}' is not a function.")]
    NotAFunction(String),
    #[error("'{0}' is not a procedure.")]
    NotAProcedure(String),
}

/// Type-check one block body against its environment (the procedure,
/// function or program symbol the body belongs to). The AST is annotated
/// and cast nodes are inserted in place; all diagnostics found are
/// returned together.
pub fn check(table: &SymTab, env: SymIndex, body: &mut [Stmt]) -> Result<(), Diagnostics> {
    let mut checker = Checker {
        table,
        env,
        errors: Vec::new(),
        has_return: false,
    };
    for stmt in body.iter_mut() {
        checker.check_stmt(stmt);
    }

    // The one return error that can only be seen after the whole body:
    // a function that never returned.
    let env_is_function = matches!(table.get_symbol(env).kind, SymbolKind::Func { .. });
    if env_is_function && !checker.has_return {
        checker.error(body.first().map(|s| s.pos), DiagKind::MissingReturn);
    }

    tracing::debug!(
        routine = table.symbol_name(env),
        errors = checker.errors.len(),
        "type check finished"
    );

    if checker.errors.is_empty() {
        Ok(())
    } else {
        Err(checker.errors)
    }
}

struct Checker<'a> {
    table: &'a SymTab,
    env: SymIndex,
    errors: Diagnostics,
    has_return: bool,
}

impl Checker<'_> {
    fn error(&mut self, pos: Option<Pos>, kind: DiagKind) {
        self.errors.push(Diagnostic { pos, kind });
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) {
        let pos = stmt.pos;
        match &mut stmt.kind {
            StmtKind::Assign { lhs, rhs } => {
                let lhs_ty = self.check_expr(lhs);
                let rhs_ty = self.check_expr(rhs);
                if lhs_ty == REAL_TYPE && rhs_ty == INTEGER_TYPE {
                    promote_to_real(rhs);
                } else if lhs_ty != rhs_ty {
                    // no real-to-integer shrinking; report and carry on
                    self.error(Some(rhs.pos), DiagKind::AssignTypeMismatch);
                }
            }
            StmtKind::If {
                cond,
                body,
                elsif,
                else_body,
            } => {
                self.check_condition(cond);
                for stmt in body {
                    self.check_stmt(stmt);
                }
                for arm in elsif {
                    self.check_condition(&mut arm.cond);
                    for stmt in &mut arm.body {
                        self.check_stmt(stmt);
                    }
                }
                for stmt in else_body {
                    self.check_stmt(stmt);
                }
            }
            StmtKind::While { cond, body } => {
                self.check_condition(cond);
                for stmt in body {
                    self.check_stmt(stmt);
                }
            }
            StmtKind::Return { value } => self.check_return(pos, value),
            StmtKind::ProcCall { id, args } => {
                let callee = self.table.get_symbol(id.sym);
                if !matches!(callee.kind, SymbolKind::Proc { .. }) {
                    let name = self.table.symbol_name(id.sym).to_owned();
                    self.error(Some(id.pos), DiagKind::NotAProcedure(name));
                }
                self.check_arguments(id, args);
            }
        }
    }

    fn check_condition(&mut self, cond: &mut Expr) {
        if self.check_expr(cond) != INTEGER_TYPE {
            self.error(Some(cond.pos), DiagKind::NonIntegerCondition);
        }
    }

    fn check_return(&mut self, pos: Pos, value: &mut Option<Expr>) {
        self.has_return = true;

        let env = self.table.get_symbol(self.env);
        let Some(value) = value else {
            if !matches!(env.kind, SymbolKind::Proc { .. }) {
                self.error(Some(pos), DiagKind::ReturnValueMissing);
            }
            return;
        };

        let value_ty = self.check_expr(value);
        if !matches!(env.kind, SymbolKind::Func { .. }) {
            self.error(Some(pos), DiagKind::ReturnValueInProcedure);
            return;
        }
        if env.ty != value_ty {
            self.error(Some(value.pos), DiagKind::ReturnTypeMismatch);
        }
    }

    /// Synthesize and record the type of an expression. Children are
    /// always checked before any cast wraps them.
    fn check_expr(&mut self, expr: &mut Expr) -> SymIndex {
        let pos = expr.pos;
        let ty = match &mut expr.kind {
            ExprKind::Integer(_) => INTEGER_TYPE,
            ExprKind::Real(_) => REAL_TYPE,
            ExprKind::Id(sym) => {
                let entry = self.table.get_symbol(*sym);
                // a nametype identifier denotes itself
                if entry.kind == SymbolKind::NameType {
                    *sym
                } else {
                    entry.ty
                }
            }
            ExprKind::Indexed { id, index } => {
                let entry = self.table.get_symbol(id.sym);
                let elem_ty = entry.ty;
                if !matches!(entry.kind, SymbolKind::Array { .. }) {
                    let name = self.table.symbol_name(id.sym).to_owned();
                    let id_pos = id.pos;
                    self.error(Some(id_pos), DiagKind::NonArrayIndexed(name));
                }
                if self.check_expr(index) != INTEGER_TYPE {
                    self.error(Some(index.pos), DiagKind::NonIntegerIndex);
                }
                elem_ty
            }
            ExprKind::Cast(inner) => {
                self.check_expr(inner);
                REAL_TYPE
            }
            ExprKind::UMinus(inner) => {
                let inner_ty = self.check_expr(inner);
                if inner_ty == VOID_TYPE {
                    self.error(Some(pos), DiagKind::UMinusVoidOperand);
                }
                inner_ty
            }
            ExprKind::Not(inner) => {
                if self.check_expr(inner) != INTEGER_TYPE {
                    self.error(Some(pos), DiagKind::IntegerOperandExpected("not"));
                }
                INTEGER_TYPE
            }
            ExprKind::Binop { op, left, right } => {
                let op = *op;
                match op {
                    BinOp::Add | BinOp::Sub | BinOp::Mult => {
                        self.coerce_operands(op.symbol(), left, right)
                    }
                    BinOp::Divide => self.check_divide(left, right),
                    BinOp::IDiv | BinOp::Mod | BinOp::And | BinOp::Or => {
                        self.check_integer_binop(op.symbol(), left, right)
                    }
                }
            }
            ExprKind::Binrel { left, right, .. } => {
                // relations coerce like arithmetic but always yield the
                // 0/1 integer result
                self.coerce_operands("relation", left, right);
                INTEGER_TYPE
            }
            ExprKind::Call { id, args } => {
                let callee = self.table.get_symbol(id.sym);
                let ret_ty = callee.ty;
                if !matches!(callee.kind, SymbolKind::Func { .. }) {
                    let name = self.table.symbol_name(id.sym).to_owned();
                    let id_pos = id.pos;
                    self.error(Some(id_pos), DiagKind::NotAFunction(name));
                }
                let id = id.clone();
                self.check_arguments(&id, args);
                ret_ty
            }
        };
        expr.ty = ty;
        ty
    }

    /// Shared typing of `+ - *` and the relations: a void side is an
    /// error and the other side's type propagates; equal sides keep their
    /// type; otherwise the integer side is promoted and the result is
    /// real.
    fn coerce_operands(
        &mut self,
        op: &'static str,
        left: &mut Expr,
        right: &mut Expr,
    ) -> SymIndex {
        let left_ty = self.check_expr(left);
        let right_ty = self.check_expr(right);
        if left_ty == VOID_TYPE {
            self.error(Some(left.pos), DiagKind::VoidOperand(op));
            return right_ty;
        }
        if right_ty == VOID_TYPE {
            self.error(Some(right.pos), DiagKind::VoidOperand(op));
            return left_ty;
        }
        if left_ty == right_ty {
            return left_ty;
        }
        if left_ty == INTEGER_TYPE {
            promote_to_real(left);
        }
        if right_ty == INTEGER_TYPE {
            promote_to_real(right);
        }
        REAL_TYPE
    }

    /// `/` forces both sides to real and always yields real.
    fn check_divide(&mut self, left: &mut Expr, right: &mut Expr) -> SymIndex {
        for side in [left, right] {
            let ty = self.check_expr(side);
            if ty == INTEGER_TYPE {
                promote_to_real(side);
            } else if ty != REAL_TYPE {
                self.error(Some(side.pos), DiagKind::VoidOperand("/"));
            }
        }
        REAL_TYPE
    }

    /// `and or div mod` take integers only and yield integer.
    fn check_integer_binop(
        &mut self,
        op: &'static str,
        left: &mut Expr,
        right: &mut Expr,
    ) -> SymIndex {
        for side in [left, right] {
            if self.check_expr(side) != INTEGER_TYPE {
                self.error(Some(side.pos), DiagKind::IntegerOperandExpected(op));
            }
        }
        INTEGER_TYPE
    }

    /// Walk the reversed formal chain against the actuals from the tail.
    /// A length mismatch is reported once; type mismatches are reported
    /// per parameter and do not stop the walk. Every actual is checked
    /// even when the counts disagree.
    fn check_arguments(&mut self, id: &Name, args: &mut [Expr]) {
        let checked: Vec<(Pos, SymIndex)> = args
            .iter_mut()
            .map(|arg| (arg.pos, self.check_expr(arg)))
            .collect();

        let Some((_, _, mut formal)) = self.table.get_symbol(id.sym).routine_parts() else {
            // already reported as not-a-function/procedure
            return;
        };
        let routine = self.table.symbol_name(id.sym).to_owned();

        let mut actuals = checked.iter().rev();
        loop {
            match (formal, actuals.next()) {
                (Some(param), Some(&(arg_pos, arg_ty))) => {
                    let entry = self.table.get_symbol(param);
                    if entry.ty != arg_ty {
                        let parameter = self.table.pool_lookup(entry.id).to_owned();
                        self.error(
                            Some(arg_pos),
                            DiagKind::ParameterTypeMismatch {
                                routine: routine.clone(),
                                parameter,
                            },
                        );
                    }
                    formal = match entry.kind {
                        SymbolKind::Param { preceding } => preceding,
                        _ => None,
                    };
                }
                (Some(_), None) => {
                    self.error(Some(id.pos), DiagKind::MoreFormalThanActual(routine));
                    break;
                }
                (None, Some(&(arg_pos, _))) => {
                    self.error(Some(arg_pos), DiagKind::MoreActualThanFormal(routine));
                    break;
                }
                (None, None) => break,
            }
        }
    }
}

/// Wrap an integer-typed node in a cast to real. The cast inherits the
/// child's position; the child keeps its integer annotation.
fn promote_to_real(expr: &mut Expr) {
    let pos = expr.pos;
    let inner = mem::replace(expr, Expr::integer(pos, 0));
    *expr = Expr {
        pos,
        ty: REAL_TYPE,
        kind: ExprKind::Cast(Box::new(inner)),
    };
}
