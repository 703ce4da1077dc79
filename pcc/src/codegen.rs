//! Expansion of quad lists into 64-bit Intel-syntax assembly text.
//!
//! One routine at a time: a labeled prologue that saves the caller's
//! frame, copies the display and allocates the activation record, the
//! body quad by quad, and a `leave`/`ret` epilogue. Values move through
//! the fixed rax/rcx/rdx register file; reals go through the x87 stack.

use asm::quad::{IntOp, Quad, RealOp};
use asm::x86::{align8, Reg, STACK_WIDTH};
use ast::RelOp;
use std::format_args as f;
use std::fmt;
use std::io::{self, Write};
use symtab::{SymIndex, SymTab, SymbolKind};

use crate::Options;

/// Writes assembly for one or more routines into an injected sink. The
/// sink is flushed after every routine and again when the generator is
/// dropped, so partial output survives a fatal diagnostic.
pub struct Generator<W: Write> {
    out: W,
    trace: bool,
    /// Real constants awaiting their read-only data slots, emitted by
    /// `finish`.
    reals: Vec<(u32, f64)>,
}

impl<W: Write> Generator<W> {
    pub fn new(out: W, options: &Options) -> Self {
        Generator {
            out,
            trace: options.trace,
            reals: Vec::new(),
        }
    }

    /// Emit one routine: prologue, expanded body, epilogue. The label
    /// counter in `table` supplies the fresh labels the short-circuit
    /// patterns and real-constant slots need.
    pub fn generate(
        &mut self,
        table: &mut SymTab,
        env: SymIndex,
        quads: &[Quad],
    ) -> io::Result<()> {
        tracing::debug!(
            routine = table.symbol_name(env),
            quads = quads.len(),
            "expanding quad list"
        );
        self.prologue(table, env)?;
        self.expand(table, quads)?;
        self.epilogue(table, env)
    }

    /// Append the read-only pool for real constants and flush the sink.
    /// Dropping the generator does the same.
    pub fn finish(&mut self) -> io::Result<()> {
        if !self.reals.is_empty() {
            self.ins(f!(".section .rodata"))?;
            for &(label, value) in &self.reals {
                writeln!(self.out, "L{label}:\t.double {value:?}")?;
            }
            self.reals.clear();
        }
        self.out.flush()
    }

    /// One instruction line: two tabs of indent, a tab between mnemonic
    /// and operands (the operand tab comes with `args`).
    fn ins(&mut self, args: fmt::Arguments) -> io::Result<()> {
        writeln!(self.out, "\t\t{args}")
    }

    /// Label definitions sit at column 0.
    fn label(&mut self, label: u32) -> io::Result<()> {
        writeln!(self.out, "L{label}:")
    }

    fn prologue(&mut self, table: &SymTab, env: SymIndex) -> io::Result<()> {
        let sym = table.get_symbol(env);
        let Some((ar_size, label, _)) = sym.routine_parts() else {
            panic!("prologue for non-routine symbol {:?}", sym.kind);
        };
        let ar_size = align8(ar_size);
        let level = sym.level;
        let name = table.symbol_name(env);

        writeln!(self.out, "L{label}:\t\t\t# {name}")?;
        if self.trace {
            writeln!(self.out, "\t# PROLOGUE ({name})")?;
        }

        self.ins(f!("push\trbp"))?;
        // snapshot of the incoming stack pointer becomes the new frame
        self.ins(f!("mov\trcx, rsp"))?;
        // copy the caller's display, one save per enclosing level
        for lvl in 1..=i64::from(level) {
            self.ins(f!("push\t[rbp-{}]", lvl * STACK_WIDTH))?;
        }
        // the new frame's own pointer closes the display
        self.ins(f!("push\trcx"))?;
        self.ins(f!("mov\trbp, rcx"))?;
        self.ins(f!("sub\trsp, {ar_size}"))?;
        self.out.flush()
    }

    fn epilogue(&mut self, table: &SymTab, env: SymIndex) -> io::Result<()> {
        if self.trace {
            writeln!(self.out, "\t# EPILOGUE ({})", table.symbol_name(env))?;
        }
        self.ins(f!("leave"))?;
        self.ins(f!("ret"))?;
        self.out.flush()
    }

    /// Display level and frame-relative byte offset of a variable, array
    /// or parameter.
    fn find(table: &SymTab, sym: SymIndex) -> (u32, i64) {
        let entry = table.get_symbol(sym);
        let level = entry.level;
        let offset = match entry.kind {
            // below the saved pointer and the display, growing down
            SymbolKind::Var | SymbolKind::Array { .. } => {
                -(STACK_WIDTH + i64::from(level) * STACK_WIDTH + entry.offset)
            }
            // above the saved pointer and the return address
            SymbolKind::Param { .. } => STACK_WIDTH + entry.offset + STACK_WIDTH,
            ref other => panic!("find() on symbol without a frame slot: {other:?}"),
        };
        (level, offset)
    }

    /// Load the frame pointer for `level` out of the display.
    fn frame_address(&mut self, level: u32, dst: Reg) -> io::Result<()> {
        self.ins(f!("mov\t{dst}, [rbp-{}]", i64::from(level) * STACK_WIDTH))
    }

    /// Fetch an integer value (or the raw bits of a real constant) into a
    /// register.
    fn fetch(&mut self, table: &SymTab, sym: SymIndex, dst: Reg) -> io::Result<()> {
        match table.get_symbol(sym).kind {
            SymbolKind::Const { value } => {
                let bits = match value {
                    symtab::ConstValue::Int(v) => v,
                    symtab::ConstValue::Real(v) => v.to_bits() as i64,
                };
                self.ins(f!("mov\t{dst}, {bits}"))
            }
            SymbolKind::Var | SymbolKind::Param { .. } => {
                let (level, offset) = Self::find(table, sym);
                // the destination doubles as address scratch
                self.frame_address(level, dst)?;
                self.ins(f!("mov\t{dst}, [{dst}{offset:+}]"))
            }
            ref other => panic!("fetch of unexpected symbol kind: {other:?}"),
        }
    }

    /// Push a real value onto the x87 stack. Constants go through a
    /// read-only data slot filled in by `finish`.
    fn fetch_float(&mut self, table: &mut SymTab, sym: SymIndex) -> io::Result<()> {
        match table.get_symbol(sym).kind {
            SymbolKind::Const {
                value: symtab::ConstValue::Real(value),
            } => {
                let label = table.get_next_label();
                self.reals.push((label, value));
                self.ins(f!("fld\tqword ptr [L{label}]"))
            }
            SymbolKind::Var | SymbolKind::Param { .. } => {
                let (level, offset) = Self::find(table, sym);
                self.frame_address(level, Reg::Rcx)?;
                self.ins(f!("fld\tqword ptr [rcx{offset:+}]"))
            }
            ref other => panic!("fetch_float of unexpected symbol kind: {other:?}"),
        }
    }

    /// Store a register into a variable's frame slot. The address scratch
    /// must not be the source register, or the value would be gone before
    /// the move.
    fn store(&mut self, table: &SymTab, src: Reg, sym: SymIndex) -> io::Result<()> {
        let (level, offset) = Self::find(table, sym);
        let scratch = if src == Reg::Rcx { Reg::Rdx } else { Reg::Rcx };
        self.frame_address(level, scratch)?;
        self.ins(f!("mov\t[{scratch}{offset:+}], {src}"))
    }

    /// Pop the x87 top-of-stack into a variable's frame slot.
    fn store_float(&mut self, table: &SymTab, sym: SymIndex) -> io::Result<()> {
        let (level, offset) = Self::find(table, sym);
        self.frame_address(level, Reg::Rcx)?;
        self.ins(f!("fstp\tqword ptr [rcx{offset:+}]"))
    }

    /// Base address of an array in `dst`.
    fn array_address(&mut self, table: &SymTab, sym: SymIndex, dst: Reg) -> io::Result<()> {
        let (level, offset) = Self::find(table, sym);
        self.frame_address(level, dst)?;
        if offset >= 0 {
            self.ins(f!("add\t{dst}, {offset}"))
        } else {
            self.ins(f!("sub\t{dst}, {}", -offset))
        }
    }

    /// Materialize the flags into 0/1 in rax: jump on `jcc` to the true
    /// branch, fall through to 0.
    fn set01(&mut self, table: &mut SymTab, jcc: &str) -> io::Result<()> {
        let l_true = table.get_next_label();
        let l_done = table.get_next_label();
        self.ins(f!("{jcc}\tL{l_true}"))?;
        self.ins(f!("mov\trax, 0"))?;
        self.ins(f!("jmp\tL{l_done}"))?;
        self.label(l_true)?;
        self.ins(f!("mov\trax, 1"))?;
        self.label(l_done)
    }

    /// The main dispatch: one emission per quad.
    fn expand(&mut self, table: &mut SymTab, quads: &[Quad]) -> io::Result<()> {
        for (number, quad) in quads.iter().enumerate() {
            // label definitions come first, so a branch target is not
            // separated from its trace comment
            if let Quad::Label(label) = *quad {
                self.label(label)?;
            }
            if self.trace {
                writeln!(self.out, "\t# QUAD {}: {}", number + 1, quad.display(table))?;
            }

            match *quad {
                Quad::LoadInt { value, dst } => {
                    self.ins(f!("mov\trax, {value}"))?;
                    self.store(table, Reg::Rax, dst)?;
                }
                Quad::LoadReal { value, dst } => {
                    self.ins(f!("mov\trax, {}", value.to_bits() as i64))?;
                    self.store(table, Reg::Rax, dst)?;
                }
                Quad::NegInt { src, dst } => {
                    self.fetch(table, src, Reg::Rax)?;
                    self.ins(f!("neg\trax"))?;
                    self.store(table, Reg::Rax, dst)?;
                }
                Quad::NegReal { src, dst } => {
                    self.fetch_float(table, src)?;
                    self.ins(f!("fchs"))?;
                    self.store_float(table, dst)?;
                }
                Quad::NotInt { src, dst } => {
                    self.fetch(table, src, Reg::Rax)?;
                    self.ins(f!("cmp\trax, 0"))?;
                    self.set01(table, "je")?;
                    self.store(table, Reg::Rax, dst)?;
                }
                Quad::IntArith {
                    op,
                    left,
                    right,
                    dst,
                } => {
                    self.fetch(table, left, Reg::Rax)?;
                    self.fetch(table, right, Reg::Rcx)?;
                    let result = match op {
                        IntOp::Add => {
                            self.ins(f!("add\trax, rcx"))?;
                            Reg::Rax
                        }
                        IntOp::Sub => {
                            self.ins(f!("sub\trax, rcx"))?;
                            Reg::Rax
                        }
                        IntOp::Mult => {
                            self.ins(f!("imul\trax, rcx"))?;
                            Reg::Rax
                        }
                        IntOp::Div => {
                            self.ins(f!("cqo"))?;
                            self.ins(f!("idiv\trcx"))?;
                            Reg::Rax
                        }
                        IntOp::Mod => {
                            self.ins(f!("cqo"))?;
                            self.ins(f!("idiv\trcx"))?;
                            Reg::Rdx
                        }
                    };
                    self.store(table, result, dst)?;
                }
                Quad::RealArith {
                    op,
                    left,
                    right,
                    dst,
                } => {
                    self.fetch_float(table, left)?;
                    self.fetch_float(table, right)?;
                    self.ins(f!("{}", match op {
                        RealOp::Add => "faddp",
                        RealOp::Sub => "fsubp",
                        RealOp::Mult => "fmulp",
                        RealOp::Div => "fdivp",
                    }))?;
                    self.store_float(table, dst)?;
                }
                Quad::LogicAnd { left, right, dst } => {
                    let l_false = table.get_next_label();
                    let l_done = table.get_next_label();
                    // first zero operand short-circuits to false
                    self.fetch(table, left, Reg::Rax)?;
                    self.ins(f!("cmp\trax, 0"))?;
                    self.ins(f!("je\tL{l_false}"))?;
                    self.fetch(table, right, Reg::Rax)?;
                    self.ins(f!("cmp\trax, 0"))?;
                    self.ins(f!("je\tL{l_false}"))?;
                    self.ins(f!("mov\trax, 1"))?;
                    self.ins(f!("jmp\tL{l_done}"))?;
                    self.label(l_false)?;
                    self.ins(f!("mov\trax, 0"))?;
                    self.label(l_done)?;
                    self.store(table, Reg::Rax, dst)?;
                }
                Quad::LogicOr { left, right, dst } => {
                    let l_true = table.get_next_label();
                    let l_done = table.get_next_label();
                    // first non-zero operand short-circuits to true
                    self.fetch(table, left, Reg::Rax)?;
                    self.ins(f!("cmp\trax, 0"))?;
                    self.ins(f!("jne\tL{l_true}"))?;
                    self.fetch(table, right, Reg::Rax)?;
                    self.ins(f!("cmp\trax, 0"))?;
                    self.ins(f!("jne\tL{l_true}"))?;
                    self.ins(f!("mov\trax, 0"))?;
                    self.ins(f!("jmp\tL{l_done}"))?;
                    self.label(l_true)?;
                    self.ins(f!("mov\trax, 1"))?;
                    self.label(l_done)?;
                    self.store(table, Reg::Rax, dst)?;
                }
                Quad::CmpInt {
                    op,
                    left,
                    right,
                    dst,
                } => {
                    self.fetch(table, left, Reg::Rax)?;
                    self.fetch(table, right, Reg::Rcx)?;
                    self.ins(f!("cmp\trax, rcx"))?;
                    self.set01(table, match op {
                        RelOp::Eq => "je",
                        RelOp::Ne => "jne",
                        RelOp::Lt => "jl",
                        RelOp::Gt => "jg",
                    })?;
                    self.store(table, Reg::Rax, dst)?;
                }
                Quad::CmpReal {
                    op,
                    left,
                    right,
                    dst,
                } => {
                    // ordered compares push in reverse so st(0) holds the
                    // left operand
                    let (first, second, jcc) = match op {
                        RelOp::Eq => (left, right, "je"),
                        RelOp::Ne => (left, right, "jne"),
                        RelOp::Lt => (right, left, "jb"),
                        RelOp::Gt => (right, left, "ja"),
                    };
                    self.fetch_float(table, first)?;
                    self.fetch_float(table, second)?;
                    self.ins(f!("fcomip\tst(0), st(1)"))?;
                    self.ins(f!("fstp\tst(0)"))?;
                    self.set01(table, jcc)?;
                    self.store(table, Reg::Rax, dst)?;
                }
                Quad::Assign { src, dst } => {
                    self.fetch(table, src, Reg::Rax)?;
                    self.store(table, Reg::Rax, dst)?;
                }
                Quad::StoreIndirect { src, addr } => {
                    self.fetch(table, src, Reg::Rax)?;
                    self.fetch(table, addr, Reg::Rcx)?;
                    self.ins(f!("mov\t[rcx], rax"))?;
                }
                Quad::Param { value } => {
                    self.fetch(table, value, Reg::Rax)?;
                    self.ins(f!("push\trax"))?;
                }
                Quad::Call { routine, argc, dst } => {
                    let sym = table.get_symbol(routine);
                    let Some((_, label, _)) = sym.routine_parts() else {
                        panic!("call to non-routine symbol: {:?}", sym.kind);
                    };
                    let name = table.symbol_name(routine).to_owned();
                    self.ins(f!("call\tL{label}\t# {name}"))?;
                    self.ins(f!("add\trsp, {}", STACK_WIDTH * i64::from(argc)))?;
                    if let Some(dst) = dst {
                        self.store(table, Reg::Rax, dst)?;
                    }
                }
                Quad::Return { value, label } => {
                    self.fetch(table, value, Reg::Rax)?;
                    self.ins(f!("jmp\tL{label}"))?;
                }
                Quad::ArrayAddr { arr, index, dst } => {
                    self.array_address(table, arr, Reg::Rax)?;
                    self.fetch(table, index, Reg::Rcx)?;
                    self.ins(f!("imul\trcx, {STACK_WIDTH}"))?;
                    self.ins(f!("sub\trax, rcx"))?;
                    self.store(table, Reg::Rax, dst)?;
                }
                Quad::ArrayFetch { arr, index, dst } => {
                    self.array_address(table, arr, Reg::Rax)?;
                    self.fetch(table, index, Reg::Rcx)?;
                    self.ins(f!("imul\trcx, {STACK_WIDTH}"))?;
                    self.ins(f!("sub\trax, rcx"))?;
                    self.ins(f!("mov\trax, [rax]"))?;
                    self.store(table, Reg::Rax, dst)?;
                }
                Quad::IntToReal { src, dst } => {
                    let (level, offset) = Self::find(table, src);
                    self.frame_address(level, Reg::Rcx)?;
                    self.ins(f!("fild\tqword ptr [rcx{offset:+}]"))?;
                    self.store_float(table, dst)?;
                }
                Quad::Jump { label } => {
                    self.ins(f!("jmp\tL{label}"))?;
                }
                Quad::JumpZero { cond, label } => {
                    self.fetch(table, cond, Reg::Rax)?;
                    self.ins(f!("cmp\trax, 0"))?;
                    self.ins(f!("je\tL{label}"))?;
                }
                Quad::Label(_) => {
                    // already printed above
                }
                Quad::Nop => {
                    panic!("nop quadruple reached the code generator");
                }
            }
        }
        self.out.flush()
    }
}

impl<W: Write> Drop for Generator<W> {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use symtab::{ConstValue, INTEGER_TYPE, REAL_TYPE};

    fn emit(table: &mut SymTab, env: SymIndex, quads: &[Quad]) -> String {
        emit_opts(table, env, quads, &Options::default())
    }

    fn emit_opts(
        table: &mut SymTab,
        env: SymIndex,
        quads: &[Quad],
        options: &Options,
    ) -> String {
        let mut out = Vec::new();
        let mut generator = Generator::new(&mut out, options);
        generator.generate(table, env, quads).unwrap();
        generator.finish().unwrap();
        drop(generator);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn literal_assignment_in_the_program_frame() {
        let mut table = SymTab::new();
        let main = table.enter_procedure("main", 0);
        table.set_ar_size(main, 8);
        let x = table.enter_variable("x", 1, 0, INTEGER_TYPE);
        let exit = table.get_next_label();

        let quads = [
            Quad::LoadInt { value: 20, dst: x },
            Quad::Label(exit),
        ];
        let text = emit(&mut table, main, &quads);

        assert_eq!(
            text,
            "L1:\t\t\t# main\n\
             \t\tpush\trbp\n\
             \t\tmov\trcx, rsp\n\
             \t\tpush\trcx\n\
             \t\tmov\trbp, rcx\n\
             \t\tsub\trsp, 8\n\
             \t\tmov\trax, 20\n\
             \t\tmov\trcx, [rbp-8]\n\
             \t\tmov\t[rcx-16], rax\n\
             L2:\n\
             \t\tleave\n\
             \t\tret\n"
        );
    }

    #[test]
    fn ar_size_is_aligned_to_eight_bytes() {
        let mut table = SymTab::new();
        let main = table.enter_procedure("main", 0);
        table.set_ar_size(main, 12);
        let text = emit(&mut table, main, &[]);
        assert!(text.contains("sub\trsp, 16"), "{text}");
    }

    #[test]
    fn display_copy_pushes_one_save_per_level() {
        let mut table = SymTab::new();
        let inner = table.enter_procedure("inner", 2);
        table.set_ar_size(inner, 0);
        let text = emit(&mut table, inner, &[]);
        let pushes: Vec<&str> = text.lines().filter(|l| l.contains("push")).collect();
        assert_eq!(
            pushes,
            [
                "\t\tpush\trbp",
                "\t\tpush\t[rbp-8]",
                "\t\tpush\t[rbp-16]",
                "\t\tpush\trcx",
            ]
        );
    }

    #[test]
    fn store_keeps_the_value_register_intact() {
        let mut table = SymTab::new();
        let main = table.enter_procedure("main", 0);
        let x = table.enter_variable("x", 1, 0, INTEGER_TYPE);
        let y = table.enter_variable("y", 1, 8, INTEGER_TYPE);
        let text = emit(&mut table, main, &[Quad::Assign { src: x, dst: y }]);
        // the fetched value sits in rax; the address goes through rcx
        assert!(text.contains("mov\trcx, [rbp-8]\n\t\tmov\t[rcx-24], rax"), "{text}");
    }

    #[test]
    fn parameters_are_found_above_the_frame() {
        let mut table = SymTab::new();
        let proc = table.enter_procedure("p", 1);
        let a = table.enter_parameter("a", 2, 0, INTEGER_TYPE, None);
        let x = table.enter_variable("x", 2, 0, INTEGER_TYPE);
        let text = emit(&mut table, proc, &[Quad::Assign { src: a, dst: x }]);
        // parameter: above return address; local: below the display
        assert!(text.contains("mov\trax, [rax+16]"), "{text}");
        assert!(text.contains("mov\t[rcx-24], rax"), "{text}");
    }

    #[test]
    fn integer_division_and_modulus_share_the_idiv_pattern() {
        let mut table = SymTab::new();
        let main = table.enter_procedure("main", 0);
        let a = table.enter_variable("a", 1, 0, INTEGER_TYPE);
        let b = table.enter_variable("b", 1, 8, INTEGER_TYPE);
        let q = table.enter_variable("q", 1, 16, INTEGER_TYPE);

        let text = emit(
            &mut table,
            main,
            &[Quad::IntArith {
                op: IntOp::Div,
                left: a,
                right: b,
                dst: q,
            }],
        );
        assert!(text.contains("cqo\n\t\tidiv\trcx\n"), "{text}");
        assert!(text.contains("mov\t[rcx-32], rax"), "{text}");

        let text = emit(
            &mut table,
            main,
            &[Quad::IntArith {
                op: IntOp::Mod,
                left: a,
                right: b,
                dst: q,
            }],
        );
        // remainder comes back in rdx, stored through the rcx scratch
        assert!(text.contains("mov\t[rcx-32], rdx"), "{text}");
    }

    #[test]
    fn short_circuit_and_tests_each_operand_against_zero() {
        let mut table = SymTab::new();
        let main = table.enter_procedure("main", 0);
        let a = table.enter_variable("a", 1, 0, INTEGER_TYPE);
        let b = table.enter_variable("b", 1, 8, INTEGER_TYPE);
        let t = table.enter_variable("t", 1, 16, INTEGER_TYPE);
        let text = emit(
            &mut table,
            main,
            &[Quad::LogicAnd {
                left: a,
                right: b,
                dst: t,
            }],
        );
        assert_eq!(text.matches("cmp\trax, 0").count(), 2);
        assert_eq!(text.matches("je\tL").count(), 2);
        assert!(text.contains("mov\trax, 1\n\t\tjmp\tL"), "{text}");
    }

    #[test]
    fn integer_comparison_materializes_01_through_two_labels() {
        let mut table = SymTab::new();
        let main = table.enter_procedure("main", 0);
        let a = table.enter_variable("a", 1, 0, INTEGER_TYPE);
        let b = table.enter_variable("b", 1, 8, INTEGER_TYPE);
        let t = table.enter_variable("t", 1, 16, INTEGER_TYPE);
        let text = emit(
            &mut table,
            main,
            &[Quad::CmpInt {
                op: RelOp::Lt,
                left: a,
                right: b,
                dst: t,
            }],
        );
        assert!(text.contains("cmp\trax, rcx\n\t\tjl\tL"), "{text}");
        assert!(text.contains("mov\trax, 0\n\t\tjmp\tL"), "{text}");
        assert!(text.contains("mov\trax, 1\nL"), "{text}");
    }

    #[test]
    fn real_less_than_pushes_operands_in_reverse() {
        let mut table = SymTab::new();
        let main = table.enter_procedure("main", 0);
        let a = table.enter_variable("a", 1, 0, REAL_TYPE);
        let b = table.enter_variable("b", 1, 8, REAL_TYPE);
        let t = table.enter_variable("t", 1, 16, INTEGER_TYPE);
        let text = emit(
            &mut table,
            main,
            &[Quad::CmpReal {
                op: RelOp::Lt,
                left: a,
                right: b,
                dst: t,
            }],
        );
        // right operand ([rcx-24]) is pushed first, left ends on st(0)
        let b_pos = text.find("fld\tqword ptr [rcx-24]").unwrap();
        let a_pos = text.find("fld\tqword ptr [rcx-16]").unwrap();
        assert!(b_pos < a_pos, "{text}");
        assert!(text.contains("fcomip\tst(0), st(1)\n\t\tfstp\tst(0)\n\t\tjb\tL"), "{text}");
    }

    #[test]
    fn array_indexing_scales_by_the_stack_width() {
        let mut table = SymTab::new();
        let main = table.enter_procedure("main", 0);
        let i = table.enter_variable("i", 1, 0, INTEGER_TYPE);
        let a = table.enter_array("a", 1, 8, INTEGER_TYPE, 10);
        let t = table.enter_variable("t", 1, 88, INTEGER_TYPE);
        let text = emit(
            &mut table,
            main,
            &[Quad::ArrayFetch {
                arr: a,
                index: i,
                dst: t,
            }],
        );
        // base = frame - (8 + 8 + 8), then index scaling and the load
        assert!(text.contains("sub\trax, 24"), "{text}");
        assert!(text.contains("imul\trcx, 8\n\t\tsub\trax, rcx\n\t\tmov\trax, [rax]"), "{text}");
    }

    #[test]
    fn calls_pop_arguments_and_store_function_results() {
        let mut table = SymTab::new();
        let main = table.enter_procedure("main", 0);
        let f = table.enter_function("f", 0, INTEGER_TYPE);
        let x = table.enter_variable("x", 1, 0, INTEGER_TYPE);
        let arg = table.enter_variable("t1", 1, 8, INTEGER_TYPE);
        let (_, f_label, _) = table.get_symbol(f).routine_parts().unwrap();
        let text = emit(
            &mut table,
            main,
            &[
                Quad::Param { value: arg },
                Quad::Call {
                    routine: f,
                    argc: 1,
                    dst: Some(x),
                },
            ],
        );
        assert!(text.contains("push\trax"), "{text}");
        assert!(text.contains(&format!("call\tL{f_label}\t# f")), "{text}");
        assert!(text.contains("add\trsp, 8"), "{text}");
        assert!(text.contains("mov\t[rcx-16], rax"), "{text}");
    }

    #[test]
    fn returns_jump_to_the_epilogue_label() {
        let mut table = SymTab::new();
        let func = table.enter_function("f", 0, INTEGER_TYPE);
        let exit = table.get_next_label();
        let t = table.enter_variable("t", 1, 0, INTEGER_TYPE);
        let text = emit(
            &mut table,
            func,
            &[Quad::Return { value: t, label: exit }, Quad::Label(exit)],
        );
        assert!(text.contains(&format!("jmp\tL{exit}")), "{text}");
        assert!(text.contains(&format!("L{exit}:\n\t\tleave\n\t\tret")), "{text}");
    }

    #[test]
    fn real_constants_get_rodata_slots() {
        let mut table = SymTab::new();
        let main = table.enter_procedure("main", 0);
        let pi = table.enter_constant("pi", 1, REAL_TYPE, ConstValue::Real(3.25));
        let x = table.enter_variable("x", 1, 0, REAL_TYPE);
        let t = table.enter_variable("t", 1, 8, REAL_TYPE);
        let text = emit(
            &mut table,
            main,
            &[Quad::RealArith {
                op: RealOp::Add,
                left: pi,
                right: x,
                dst: t,
            }],
        );
        let label_line = text
            .lines()
            .find(|l| l.contains("fld\tqword ptr [L"))
            .unwrap();
        let label: String = label_line
            .chars()
            .skip_while(|c| *c != 'L')
            .skip(1)
            .take_while(char::is_ascii_digit)
            .collect();
        assert!(text.contains(".section .rodata"), "{text}");
        assert!(text.contains(&format!("L{label}:\t.double 3.25")), "{text}");
    }

    #[test]
    fn integer_constants_fetch_as_immediates_with_a_comma() {
        let mut table = SymTab::new();
        let main = table.enter_procedure("main", 0);
        let ten = table.enter_constant("ten", 1, INTEGER_TYPE, ConstValue::Int(10));
        let x = table.enter_variable("x", 1, 0, INTEGER_TYPE);
        let text = emit(&mut table, main, &[Quad::Assign { src: ten, dst: x }]);
        assert!(text.contains("mov\trax, 10"), "{text}");
    }

    #[test]
    fn jumpfalse_compares_the_condition_to_zero() {
        let mut table = SymTab::new();
        let main = table.enter_procedure("main", 0);
        let c = table.enter_variable("c", 1, 0, INTEGER_TYPE);
        let target = table.get_next_label();
        let text = emit(
            &mut table,
            main,
            &[
                Quad::JumpZero {
                    cond: c,
                    label: target,
                },
                Quad::Label(target),
            ],
        );
        assert!(
            text.contains(&format!("cmp\trax, 0\n\t\tje\tL{target}\nL{target}:")),
            "{text}"
        );
    }

    #[test]
    fn trace_annotates_every_quad() {
        let mut table = SymTab::new();
        let main = table.enter_procedure("main", 0);
        let x = table.enter_variable("x", 1, 0, INTEGER_TYPE);
        let text = emit_opts(
            &mut table,
            main,
            &[Quad::LoadInt { value: 1, dst: x }],
            &Options { trace: true },
        );
        assert!(text.contains("\t# PROLOGUE (main)"), "{text}");
        assert!(text.contains("\t# QUAD 1: iload 1, -, x"), "{text}");
        assert!(text.contains("\t# EPILOGUE (main)"), "{text}");
    }

    #[test]
    #[should_panic(expected = "nop quadruple")]
    fn nop_is_a_fatal_generator_error() {
        let mut table = SymTab::new();
        let main = table.enter_procedure("main", 0);
        let mut out = Vec::new();
        let mut generator = Generator::new(&mut out, &Options::default());
        let _ = generator.generate(&mut table, main, &[Quad::Nop]);
    }
}
