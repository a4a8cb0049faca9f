use std::fmt::{self, Formatter};

use crate::pretty::{PrettyCtx, PrettyPrintable};

use super::{
    BasicBlock, BlockId, Bundle, Code, Function, Operand, Statement, StatementKind, VarKind,
};

impl PrettyPrintable for Bundle {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        ctx.writeln(f, "air::Bundle {")?;
        ctx.with_indent(|ctx| {
            if !self.globals.is_empty() {
                ctx.writeln(f, "globals:")?;
                ctx.with_indent(|ctx| {
                    for global in &self.globals {
                        ctx.writeln(f, format!("@{}: {}", global.name, global.ty))?;
                    }
                    Ok(())
                })?;
            }
            for (index, function) in self.functions.iter().enumerate() {
                function.fmt_pretty(f, ctx)?;
                if index + 1 < self.functions.len() {
                    writeln!(f)?;
                }
            }
            Ok(())
        })?;
        ctx.writeln(f, "}")
    }
}

impl PrettyPrintable for Function {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        let code = match &self.code {
            Some(code) => code,
            None => return ctx.writeln(f, format!("declare @{}: {}", self.name, self.ty)),
        };

        let params = code
            .params
            .iter()
            .map(|&id| format!("%{}: {}", id, code.var_ty(id)))
            .collect::<Vec<_>>()
            .join(", ");
        ctx.writeln(
            f,
            format!("fn @{}({}) -> {} {{", self.name, params, self.return_type()),
        )?;
        ctx.with_indent(|ctx| {
            write_roles(code, f, ctx)?;
            for (index, block) in code.blocks.iter().enumerate() {
                write_block(code, index as BlockId, block, f, ctx)?;
            }
            Ok(())
        })?;
        ctx.writeln(f, "}")
    }
}

fn write_roles(code: &Code, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
    let mut roles = Vec::new();
    if let Some(bb) = code.entry {
        roles.push(format!("entry: #{}", bb));
    }
    if let Some(bb) = code.exit {
        roles.push(format!("exit: #{}", bb));
    }
    if let Some(bb) = code.unreachable {
        roles.push(format!("unreachable: #{}", bb));
    }
    if let Some(bb) = code.ehresume {
        roles.push(format!("ehresume: #{}", bb));
    }
    if roles.is_empty() {
        Ok(())
    } else {
        ctx.writeln(f, roles.join(", "))
    }
}

fn write_block(
    code: &Code,
    id: BlockId,
    block: &BasicBlock,
    f: &mut Formatter<'_>,
    ctx: &mut PrettyCtx<'_>,
) -> fmt::Result {
    let mut header = format!("#{}", id);
    if let Some(name) = &block.name {
        header.push_str(&format!(" ({})", name));
    }
    if !block.successors.is_empty() {
        let succs = block
            .successors
            .iter()
            .map(|succ| format!("#{}", succ))
            .collect::<Vec<_>>()
            .join(", ");
        header.push_str(&format!(" -> {}", succs));
    }
    header.push(':');
    ctx.writeln(f, header)?;
    ctx.with_indent(|ctx| {
        for stmt in &block.stmts {
            ctx.writeln(f, format_stmt(code, stmt))?;
        }
        Ok(())
    })
}

fn format_stmt(code: &Code, stmt: &Statement) -> String {
    let var = |id: &u32| format_var(code, *id);
    match &stmt.kind {
        StatementKind::Allocate {
            result,
            allocated_ty,
            count,
        } => format!(
            "{} = allocate {}, {}",
            var(result),
            allocated_ty,
            format_operand(count)
        ),
        StatementKind::Load {
            result,
            ptr,
            align,
            volatile,
        } => format!(
            "{} = load {}{}{}",
            var(result),
            format_operand(ptr),
            format_align(*align),
            format_volatile(*volatile)
        ),
        StatementKind::Store {
            ptr,
            value,
            align,
            volatile,
        } => format!(
            "store {}, {}{}{}",
            format_operand(ptr),
            format_operand(value),
            format_align(*align),
            format_volatile(*volatile)
        ),
        StatementKind::MemoryCopy {
            dest,
            src,
            len,
            dest_align,
            src_align,
            volatile,
        } => format!(
            "memcpy {}, {}, {}, {}, {}{}",
            format_operand(dest),
            format_operand(src),
            format_operand(len),
            dest_align,
            src_align,
            format_volatile(*volatile)
        ),
        StatementKind::MemoryMove {
            dest,
            src,
            len,
            dest_align,
            src_align,
            volatile,
        } => format!(
            "memmove {}, {}, {}, {}, {}{}",
            format_operand(dest),
            format_operand(src),
            format_operand(len),
            dest_align,
            src_align,
            format_volatile(*volatile)
        ),
        StatementKind::MemorySet {
            dest,
            value,
            len,
            align,
            volatile,
        } => format!(
            "memset {}, {}, {}, {}{}",
            format_operand(dest),
            format_operand(value),
            format_operand(len),
            align,
            format_volatile(*volatile)
        ),
        StatementKind::VarArgStart { operand } => {
            format!("va_start {}", format_operand(operand))
        }
        StatementKind::VarArgEnd { operand } => format!("va_end {}", format_operand(operand)),
        StatementKind::VarArgCopy { dest, src } => format!(
            "va_copy {}, {}",
            format_operand(dest),
            format_operand(src)
        ),
        StatementKind::Call {
            result,
            callee,
            args,
        } => format!(
            "{}call {}({})",
            result
                .map(|id| format!("{} = ", var(&id)))
                .unwrap_or_default(),
            format_operand(callee),
            format_operands(args)
        ),
        StatementKind::Invoke {
            result,
            callee,
            args,
            normal_dest,
            exception_dest,
        } => format!(
            "{}invoke {}({}) to #{} unwind #{}",
            result
                .map(|id| format!("{} = ", var(&id)))
                .unwrap_or_default(),
            format_operand(callee),
            format_operands(args),
            normal_dest,
            exception_dest
        ),
        StatementKind::Unary {
            op,
            result,
            operand,
        } => format!(
            "{} = {} {}",
            var(result),
            op.name(),
            format_operand(operand)
        ),
        StatementKind::Binary {
            op,
            result,
            lhs,
            rhs,
            no_wrap,
            exact,
        } => {
            let mut line = format!(
                "{} = {} {}, {}",
                var(result),
                op.name(),
                format_operand(lhs),
                format_operand(rhs)
            );
            if *no_wrap {
                line.push_str(" nw");
            }
            if *exact {
                line.push_str(" exact");
            }
            line
        }
        StatementKind::Comparison { pred, lhs, rhs } => format!(
            "assume {} {}, {}",
            pred.name(),
            format_operand(lhs),
            format_operand(rhs)
        ),
        StatementKind::Assignment { result, operand } => {
            format!("{} = {}", var(result), format_operand(operand))
        }
        StatementKind::PointerShift {
            result,
            base,
            terms,
        } => {
            let terms = terms
                .iter()
                .map(|(stride, index)| format!("{} * {}", stride, format_operand(index)))
                .collect::<Vec<_>>()
                .join(" + ");
            format!("{} = {} + {}", var(result), format_operand(base), terms)
        }
        StatementKind::ExtractElement {
            result,
            aggregate,
            offset,
        } => format!(
            "{} = extract {}, {}",
            var(result),
            format_operand(aggregate),
            format_operand(offset)
        ),
        StatementKind::InsertElement {
            result,
            aggregate,
            offset,
            element,
        } => format!(
            "{} = insert {}, {}, {}",
            var(result),
            format_operand(aggregate),
            format_operand(offset),
            format_operand(element)
        ),
        StatementKind::ReturnValue { operand } => match operand {
            Some(operand) => format!("return {}", format_operand(operand)),
            None => "return".to_string(),
        },
        StatementKind::LandingPad { result } => format!("{} = landingpad", var(result)),
        StatementKind::Resume { operand } => format!("resume {}", format_operand(operand)),
        StatementKind::Unreachable => "unreachable".to_string(),
    }
}

fn format_var(code: &Code, id: u32) -> String {
    let variable = code.var(id);
    match (&variable.kind, &variable.name) {
        (VarKind::Local { .. }, Some(name)) => format!("${}", name),
        (VarKind::Local { .. }, None) => format!("${}", id),
        (_, Some(name)) => format!("%{}", name),
        (_, None) => format!("%{}", id),
    }
}

fn format_operand(operand: &Operand) -> String {
    match operand {
        Operand::Var(id) => format!("%{}", id),
        Operand::Int { value, ty } => format!("{}:{}", value, ty),
        Operand::Float { value, ty } => format!("{}:{}", value, ty),
        Operand::Null { ty } => format!("null:{}", ty),
        Operand::Undef { ty } => format!("undef:{}", ty),
        Operand::Global(id) => format!("@g{}", id),
        Operand::FunctionPtr(id) => format!("@f{}", id),
        Operand::Asm { asm, ty } => format!("asm \"{}\":{}", asm, ty),
    }
}

fn format_operands(operands: &[Operand]) -> String {
    operands
        .iter()
        .map(format_operand)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_align(align: u32) -> String {
    if align == 0 {
        String::new()
    } else {
        format!(", align {}", align)
    }
}

fn format_volatile(volatile: bool) -> &'static str {
    if volatile {
        ", volatile"
    } else {
        ""
    }
}
