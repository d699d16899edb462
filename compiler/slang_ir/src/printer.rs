//! Textual IR printer.
//!
//! Renders a [`Module`] in an LLVM-flavoured text form. Metadata node
//! numbers are assigned sequentially across all named tables in table order.

use std::fmt::{self, Write};

use crate::{Function, GlobalVariable, Linkage, Module};

/// Print `module` as textual IR into `out`.
pub fn print_module(module: &Module, out: &mut impl Write) -> fmt::Result {
    writeln!(out, "; ModuleID = '{}'", module.name)?;
    if !module.data_layout.is_empty() {
        writeln!(out, "target datalayout = \"{}\"", module.data_layout)?;
    }
    if !module.target_triple.is_empty() {
        writeln!(out, "target triple = \"{}\"", module.target_triple)?;
    }

    if !module.globals.is_empty() {
        writeln!(out)?;
        for global in &module.globals {
            print_global(global, out)?;
        }
    }

    for function in &module.functions {
        writeln!(out)?;
        print_function(function, out)?;
    }

    print_metadata(module, out)
}

/// Render `module` into a fresh string.
pub fn module_to_string(module: &Module) -> String {
    let mut text = String::new();
    // Writing into a String cannot fail.
    let _ = print_module(module, &mut text);
    text
}

fn linkage_prefix(linkage: Linkage) -> &'static str {
    match linkage {
        Linkage::External => "",
        Linkage::Internal => "internal ",
    }
}

fn print_global(global: &GlobalVariable, out: &mut impl Write) -> fmt::Result {
    let kind = if global.is_constant {
        "constant"
    } else {
        "global"
    };
    match global.initializer {
        Some(value) => writeln!(
            out,
            "@{} = {}{kind} {} {value}",
            global.name,
            linkage_prefix(global.linkage),
            global.ty
        ),
        None => writeln!(out, "@{} = external {kind} {}", global.name, global.ty),
    }
}

fn print_function(function: &Function, out: &mut impl Write) -> fmt::Result {
    let keyword = if function.is_declaration() {
        "declare"
    } else {
        "define"
    };
    write!(
        out,
        "{keyword} {}{} @{}(",
        linkage_prefix(function.linkage),
        function.return_type,
        function.name
    )?;
    for (i, param) in function.params.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write!(out, "{} %{}", param.ty, param.name)?;
    }
    out.write_char(')')?;

    if function.is_declaration() {
        return writeln!(out);
    }

    writeln!(out, " {{")?;
    for block in &function.blocks {
        writeln!(out, "{}:", block.label)?;
        for inst in &block.instructions {
            writeln!(out, "  {inst}")?;
        }
    }
    writeln!(out, "}}")
}

fn print_metadata(module: &Module, out: &mut impl Write) -> fmt::Result {
    let tables = module.named_metadata_tables();
    if tables.is_empty() {
        return Ok(());
    }

    writeln!(out)?;
    let mut next_id = 0usize;
    for table in tables {
        write!(out, "!{} = !{{", table.name)?;
        for i in 0..table.len() {
            if i > 0 {
                out.write_str(", ")?;
            }
            write!(out, "!{}", next_id + i)?;
        }
        writeln!(out, "}}")?;
        next_id += table.len();
    }

    let nodes = tables.iter().flat_map(|t| t.nodes().iter());
    for (id, node) in nodes.enumerate() {
        write!(out, "!{id} = !{{")?;
        for (i, operand) in node.operands.iter().enumerate() {
            if i > 0 {
                out.write_str(", ")?;
            }
            write!(out, "!\"{}\"", escape(operand))?;
        }
        writeln!(out, "}}")?;
    }
    Ok(())
}

/// Escape quotes, backslashes and non-printable bytes as `\XX`.
fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for byte in s.bytes() {
        if (0x20..=0x7e).contains(&byte) && byte != b'"' && byte != b'\\' {
            escaped.push(char::from(byte));
        } else {
            let _ = write!(escaped, "\\{byte:02X}");
        }
    }
    escaped
}
