//! Constant folding over the AST. Binary operations whose operands are
//! literals of the same type collapse into literal nodes; everything else
//! is left alone. Runs before type checking, so mixed integer/real
//! operand pairs are not folded (the cast that would reconcile them does
//! not exist yet).

use ast::{BinOp, Expr, ExprKind, Stmt, StmtKind};

/// Rewrite the statement list in place, bottom-up.
pub fn optimize(body: &mut [Stmt]) {
    for stmt in body {
        optimize_stmt(stmt);
    }
}

fn optimize_stmt(stmt: &mut Stmt) {
    match &mut stmt.kind {
        StmtKind::Assign { lhs, rhs } => {
            optimize_expr(lhs);
            optimize_expr(rhs);
            fold_constants(rhs);
        }
        StmtKind::If {
            cond,
            body,
            elsif,
            else_body,
        } => {
            optimize_expr(cond);
            fold_constants(cond);
            optimize(body);
            for arm in elsif {
                optimize_expr(&mut arm.cond);
                fold_constants(&mut arm.cond);
                optimize(&mut arm.body);
            }
            optimize(else_body);
        }
        StmtKind::While { cond, body } => {
            optimize_expr(cond);
            fold_constants(cond);
            optimize(body);
        }
        StmtKind::Return { value } => {
            if let Some(value) = value {
                optimize_expr(value);
                fold_constants(value);
            }
        }
        // arguments are optimized but the argument edges themselves are
        // not fold sites
        StmtKind::ProcCall { args, .. } => {
            for arg in args {
                optimize_expr(arg);
            }
        }
    }
}

fn optimize_expr(expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::Integer(_) | ExprKind::Real(_) | ExprKind::Id(_) => {}
        ExprKind::Indexed { index, .. } => {
            optimize_expr(index);
            fold_constants(index);
        }
        ExprKind::Cast(inner) | ExprKind::UMinus(inner) | ExprKind::Not(inner) => {
            optimize_expr(inner);
            fold_constants(inner);
        }
        ExprKind::Binop { left, right, .. } | ExprKind::Binrel { left, right, .. } => {
            optimize_expr(left);
            optimize_expr(right);
            fold_constants(left);
            fold_constants(right);
        }
        ExprKind::Call { args, .. } => {
            for arg in args {
                optimize_expr(arg);
            }
        }
    }
}

/// Single-node rewriter: replace a binary operation over two literals of
/// the same type with the evaluated literal. Relations and mixed operand
/// pairs pass through untouched, as do divisions by a zero literal (the
/// runtime gets to trap on those).
fn fold_constants(node: &mut Expr) {
    let ExprKind::Binop { op, left, right } = &node.kind else {
        return;
    };

    let kind = match (op, &left.kind, &right.kind) {
        (BinOp::Add, &ExprKind::Integer(l), &ExprKind::Integer(r)) => {
            ExprKind::Integer(l.wrapping_add(r))
        }
        (BinOp::Sub, &ExprKind::Integer(l), &ExprKind::Integer(r)) => {
            ExprKind::Integer(l.wrapping_sub(r))
        }
        (BinOp::Mult, &ExprKind::Integer(l), &ExprKind::Integer(r)) => {
            ExprKind::Integer(l.wrapping_mul(r))
        }
        (BinOp::Add, &ExprKind::Real(l), &ExprKind::Real(r)) => ExprKind::Real(l + r),
        (BinOp::Sub, &ExprKind::Real(l), &ExprKind::Real(r)) => ExprKind::Real(l - r),
        (BinOp::Mult, &ExprKind::Real(l), &ExprKind::Real(r)) => ExprKind::Real(l * r),
        (BinOp::Divide, &ExprKind::Real(l), &ExprKind::Real(r)) if r != 0.0 => {
            ExprKind::Real(l / r)
        }
        (BinOp::IDiv, &ExprKind::Integer(l), &ExprKind::Integer(r)) if r != 0 => {
            ExprKind::Integer(l.wrapping_div(r))
        }
        (BinOp::Mod, &ExprKind::Integer(l), &ExprKind::Integer(r)) if r != 0 => {
            ExprKind::Integer(l.wrapping_rem(r))
        }
        (BinOp::And, &ExprKind::Integer(l), &ExprKind::Integer(r)) => {
            ExprKind::Integer(i64::from(l != 0 && r != 0))
        }
        (BinOp::Or, &ExprKind::Integer(l), &ExprKind::Integer(r)) => {
            ExprKind::Integer(i64::from(l != 0 || r != 0))
        }
        _ => return,
    };

    *node = Expr::new(left.pos, kind);
}
