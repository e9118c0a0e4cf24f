//! Formula → bytecode compiler
//!
//! Identifiers are resolved against the host table at compile time:
//! - a call must name a host function with matching arity;
//! - a read may name a host variable or a local;
//! - an assignment to a host variable writes through to the host;
//! - any other assignment target declares a local.
//!
//! Locals are collected in a first pass, so a local may be read before its
//! first assignment in source order (it reads as zero).

use std::collections::HashSet;

use tracing::debug;

use super::chunk::{Chunk, ChunkBuilder, JumpLabel};
use super::opcodes::Opcode;
use super::syntax::{self, BinaryOp, Expr, ExprKind, Pos, Stmt, StmtKind, UnaryOp};
use crate::backend::engine::CompileLog;
use crate::backend::host_table::{HostBinding, HostTable};

/// Compile `source`; on any error the log is returned instead of a chunk
pub fn compile(source: &str, host: &HostTable) -> Result<Chunk, CompileLog> {
    let (stmts, syntax_errors) = syntax::parse(source);

    let mut compiler = Compiler::new(host);
    for e in syntax_errors {
        compiler.error(e.pos, e.message);
    }

    let mut targets = Vec::new();
    collect_assignments(&stmts, &mut targets);
    compiler.declare_locals(&targets);

    for stmt in &stmts {
        compiler.stmt(stmt);
    }
    compiler.builder.emit(Opcode::Halt);

    if compiler.log.is_empty() {
        let chunk = compiler.builder.build();
        debug!(
            target: "drawcalc::formula",
            bytes = chunk.len(),
            locals = chunk.local_count(),
            "Formula compiled"
        );
        Ok(chunk)
    } else {
        Err(compiler.log)
    }
}

/// Assignment targets in source order, without duplicates
fn collect_assignments(stmts: &[Stmt], out: &mut Vec<(String, Pos)>) {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::Assign { name, .. } => {
                if !out.iter().any(|(n, _)| n == name) {
                    out.push((name.clone(), stmt.pos));
                }
            }
            StmtKind::If {
                then, otherwise, ..
            } => {
                collect_assignments(then, out);
                if let Some(other) = otherwise {
                    collect_assignments(other, out);
                }
            }
            StmtKind::While { body, .. } | StmtKind::Block(body) => collect_assignments(body, out),
            StmtKind::Expr(_) => {}
        }
    }
}

struct Compiler<'a> {
    host: &'a HostTable,
    builder: ChunkBuilder,
    locals: HashSet<String>,
    log: CompileLog,
}

impl<'a> Compiler<'a> {
    fn new(host: &'a HostTable) -> Self {
        Self {
            host,
            builder: ChunkBuilder::new(),
            locals: HashSet::new(),
            log: CompileLog::new(),
        }
    }

    fn error(&mut self, pos: Pos, message: impl Into<String>) {
        self.log.push(pos.line, pos.column, message);
    }

    fn declare_locals(&mut self, targets: &[(String, Pos)]) {
        let host = self.host;
        for (name, pos) in targets {
            match host.get_id(name).and_then(|id| host.binding(id)) {
                Some(HostBinding::Variable(_)) => {}
                Some(HostBinding::Function { .. }) => {
                    self.error(*pos, format!("cannot assign to function '{}'", name));
                }
                None => {
                    if self.builder.local_slot(name).is_some() {
                        self.locals.insert(name.clone());
                    } else {
                        self.error(*pos, "too many local variables");
                    }
                }
            }
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        self.builder.set_line(stmt.pos.line);
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.expr(expr);
                self.builder.emit(Opcode::Pop);
            }
            StmtKind::Assign { name, value } => {
                self.expr(value);
                self.store(name);
            }
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                self.expr(cond);
                let to_else = self.builder.emit_jump(Opcode::JumpIfFalse);
                self.block(then);
                match otherwise {
                    Some(other) => {
                        let to_end = self.builder.emit_jump(Opcode::Jump);
                        self.patch(to_else, stmt.pos);
                        self.block(other);
                        self.patch(to_end, stmt.pos);
                    }
                    None => self.patch(to_else, stmt.pos),
                }
            }
            StmtKind::While { cond, body } => {
                let start = self.builder.current_offset();
                self.expr(cond);
                let exit = self.builder.emit_jump(Opcode::JumpIfFalse);
                self.block(body);
                self.builder.set_line(stmt.pos.line);
                if !self.builder.emit_loop(start) {
                    self.error(stmt.pos, "loop body too large");
                }
                self.patch(exit, stmt.pos);
            }
            StmtKind::Block(body) => self.block(body),
        }
    }

    fn block(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn patch(&mut self, label: JumpLabel, pos: Pos) {
        if !self.builder.patch_jump(label) {
            self.error(pos, "branch too large");
        }
    }

    /// Invalid targets were already reported by `declare_locals`
    fn store(&mut self, name: &str) {
        if let Some(slot) = self.local(name) {
            self.builder.emit_byte(Opcode::StoreLocal, slot);
            return;
        }
        if let Some(id) = self.host.get_id(name) {
            if matches!(self.host.binding(id), Some(HostBinding::Variable(_))) {
                self.builder.emit_u16(Opcode::StoreHost, id);
            }
        }
    }

    fn local(&self, name: &str) -> Option<u8> {
        if self.locals.contains(name) {
            self.builder.find_local(name)
        } else {
            None
        }
    }

    fn expr(&mut self, expr: &Expr) {
        self.builder.set_line(expr.pos.line);
        match &expr.kind {
            ExprKind::Number(n) => self.number(*n, expr.pos),
            ExprKind::Var(name) => self.load(name, expr.pos),
            ExprKind::Call { name, args } => self.call(name, args, expr.pos),
            ExprKind::Unary { op, operand } => {
                self.expr(operand);
                self.builder.emit(match op {
                    UnaryOp::Neg => Opcode::Neg,
                    UnaryOp::Not => Opcode::Not,
                });
            }
            ExprKind::Binary { op, lhs, rhs } => match binary_opcode(*op) {
                Some(code) => {
                    self.expr(lhs);
                    self.expr(rhs);
                    self.builder.emit(code);
                }
                None => self.short_circuit(*op, lhs, rhs, expr.pos),
            },
        }
    }

    /// `&&` and `||`: the right operand runs only when it decides the result
    fn short_circuit(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, pos: Pos) {
        let (skip_on, skipped) = if op == BinaryOp::And {
            (Opcode::JumpIfFalse, Opcode::PushZero)
        } else {
            (Opcode::JumpIfTrue, Opcode::PushOne)
        };
        self.expr(lhs);
        let short = self.builder.emit_jump(skip_on);
        self.expr(rhs);
        self.builder.emit(Opcode::Truth);
        let end = self.builder.emit_jump(Opcode::Jump);
        self.patch(short, pos);
        self.builder.emit(skipped);
        self.patch(end, pos);
    }

    fn number(&mut self, n: f64, pos: Pos) {
        if n.to_bits() == 0.0f64.to_bits() {
            self.builder.emit(Opcode::PushZero);
        } else if n == 1.0 {
            self.builder.emit(Opcode::PushOne);
        } else {
            match self.builder.add_constant(n) {
                Some(idx) => self.builder.emit_u16(Opcode::PushConst, idx),
                None => self.error(pos, "too many constants"),
            }
        }
    }

    fn load(&mut self, name: &str, pos: Pos) {
        if let Some(slot) = self.local(name) {
            self.builder.emit_byte(Opcode::LoadLocal, slot);
            return;
        }
        let host = self.host;
        match host.get_id(name).map(|id| (id, host.binding(id))) {
            Some((id, Some(HostBinding::Variable(_)))) => {
                self.builder.emit_u16(Opcode::LoadHost, id);
            }
            Some((_, Some(HostBinding::Function { arity, .. }))) => {
                let arity = *arity;
                self.error(
                    pos,
                    format!("'{}' is a function taking {} arguments, not a variable", name, arity),
                );
            }
            _ => self.error(pos, format!("unknown variable '{}'", name)),
        }
    }

    fn call(&mut self, name: &str, args: &[Expr], pos: Pos) {
        let host = self.host;
        let Some(id) = host.get_id(name) else {
            if self.locals.contains(name) {
                self.error(pos, format!("'{}' is a variable, not a function", name));
            } else {
                self.error(pos, format!("unknown function '{}'", name));
            }
            return;
        };

        match host.binding(id) {
            Some(HostBinding::Function { arity, .. }) if *arity == args.len() => {}
            Some(HostBinding::Function { arity, .. }) => {
                let arity = *arity;
                self.error(
                    pos,
                    format!("'{}' expects {} arguments, got {}", name, arity, args.len()),
                );
                return;
            }
            _ => {
                self.error(pos, format!("'{}' is a variable, not a function", name));
                return;
            }
        }

        let Ok(argc) = u8::try_from(args.len()) else {
            self.error(pos, "too many arguments");
            return;
        };
        for arg in args {
            self.expr(arg);
        }
        self.builder.set_line(pos.line);
        self.builder.emit_call(id, argc);
    }
}

fn binary_opcode(op: BinaryOp) -> Option<Opcode> {
    let code = match op {
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Div,
        BinaryOp::Mod => Opcode::Mod,
        BinaryOp::Pow => Opcode::Pow,
        BinaryOp::Lt => Opcode::Lt,
        BinaryOp::Le => Opcode::Le,
        BinaryOp::Gt => Opcode::Gt,
        BinaryOp::Ge => Opcode::Ge,
        BinaryOp::Eq => Opcode::Eq,
        BinaryOp::Ne => Opcode::Ne,
        BinaryOp::And | BinaryOp::Or => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::host_table::VarCell;

    fn host() -> HostTable {
        let mut t = HostTable::new();
        t.register_fn("circle", 3, |_| 0.0);
        t.register_fn("sin", 1, |a| a[0].sin());
        t.register_var("angle", VarCell::default());
        t
    }

    fn errors(src: &str) -> Vec<String> {
        match compile(src, &host()) {
            Ok(_) => Vec::new(),
            Err(log) => log.messages.into_iter().map(|m| m.message).collect(),
        }
    }

    #[test]
    fn test_compiles_valid_formula() {
        let chunk = compile("r = 2; circle(0, 0, r * sin(angle))", &host()).unwrap();
        assert_eq!(chunk.local_count(), 1);
        assert_eq!(chunk.read_opcode(chunk.len() - 1), Some(Opcode::Halt));
    }

    #[test]
    fn test_local_read_before_assignment() {
        assert!(errors("while i < 3 { i = i + 1 }").is_empty());
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(errors("foo(1)"), vec!["unknown function 'foo'"]);
    }

    #[test]
    fn test_arity_mismatch() {
        assert_eq!(errors("circle(1, 2)"), vec!["'circle' expects 3 arguments, got 2"]);
    }

    #[test]
    fn test_unknown_variable() {
        assert_eq!(errors("circle(x, 0, 1)"), vec!["unknown variable 'x'"]);
    }

    #[test]
    fn test_assign_to_function() {
        assert_eq!(errors("sin = 2"), vec!["cannot assign to function 'sin'"]);
    }

    #[test]
    fn test_function_used_as_variable() {
        let errs = errors("x = sin");
        assert_eq!(errs.len(), 1);
        assert!(errs[0].contains("not a variable"));
    }

    #[test]
    fn test_host_variable_write_through() {
        let chunk = compile("angle = 1.5", &host()).unwrap();
        assert_eq!(chunk.local_count(), 0);
        assert!(chunk.disassemble(Some(&host())).contains("store_host angle"));
    }

    #[test]
    fn test_errors_carry_positions() {
        let log = compile("x = 1\ncircle(1)\n", &host()).unwrap_err();
        assert_eq!(log.len(), 1);
        assert_eq!(log.messages[0].line, 2);
        assert_eq!(log.messages[0].column, 1);
    }

    #[test]
    fn test_syntax_and_semantic_errors_together() {
        let errs = errors("x = ;\nfoo()");
        assert_eq!(errs.len(), 2);
    }
}
