//! Disassembler: module or raw body → canonical assembly text.
//!
//! Every instruction is printed on its own line behind an `IL_xxxx:`
//! label, so branch operands can always name their target. Method and
//! field tokens are printed by name when the module defines them and as
//! raw hex otherwise.

use il2c_common::{decode_all, DecodeError, Instruction, Module, Opcode, Operand, Token};

fn target_label(offset: u32) -> String {
    format!("IL_{offset:04x}")
}

fn token_text(opcode: Opcode, token: Token, module: &Module) -> String {
    let name = match opcode {
        Opcode::Ldfld | Opcode::Stfld | Opcode::Ldsfld | Opcode::Stsfld => {
            module.field_by_token(token).map(|f| f.full_name())
        }
        _ => module.method_by_token(token).map(|m| m.name.clone()),
    };
    name.unwrap_or_else(|| format!("{:#010x}", token.0))
}

/// One instruction as assembly text, without its label.
pub fn format_instruction(instr: &Instruction, module: &Module) -> String {
    let mnemonic = instr.opcode.mnemonic();
    match &instr.operand {
        Operand::None => mnemonic.to_string(),
        Operand::Int32(v) => format!("{mnemonic} {v}"),
        Operand::Int64(v) => format!("{mnemonic} {v}"),
        Operand::Float32(v) => format!("{mnemonic} {v:?}"),
        Operand::Float64(v) => format!("{mnemonic} {v:?}"),
        Operand::Var(v) => format!("{mnemonic} {v}"),
        Operand::Target(t) => format!("{mnemonic} {}", target_label(*t)),
        Operand::Switch(targets) => {
            let labels: Vec<String> = targets.iter().map(|t| target_label(*t)).collect();
            format!("{mnemonic} ({})", labels.join(", "))
        }
        Operand::Token(token) => {
            format!("{mnemonic} {}", token_text(instr.opcode, *token, module))
        }
    }
}

/// Disassemble a method body, one labelled instruction per line.
pub fn disassemble_code(code: &[u8], module: &Module) -> Result<String, DecodeError> {
    let mut out = String::new();
    for instr in decode_all(code)? {
        out.push_str(&target_label(instr.offset));
        out.push_str(": ");
        out.push_str(&format_instruction(&instr, module));
        out.push('\n');
    }
    Ok(out)
}

/// Disassemble a whole module into text that reassembles to it.
pub fn disassemble(module: &Module) -> Result<String, crate::AsmError> {
    let mut out = String::new();

    for class in &module.classes {
        match &class.base {
            Some(base) => out.push_str(&format!(".class {} {base}\n", class.name)),
            None => out.push_str(&format!(".class {}\n", class.name)),
        }
    }
    for field in &module.fields {
        let modifier = if field.is_static { "static " } else { "" };
        out.push_str(&format!(
            ".field {modifier}{} {} {}\n",
            field.declaring_type,
            field.name,
            field.ty.keyword()
        ));
    }

    for method in &module.methods {
        let instance = if method.is_instance { " instance" } else { "" };
        out.push_str(&format!(
            ".method {} {}{instance}\n",
            method.name,
            method.return_type.keyword()
        ));
        let skip = usize::from(method.is_instance);
        for param in method.params.iter().skip(skip) {
            out.push_str(&format!(".param {} {}\n", param.name, param.ty.keyword()));
        }
        for local in &method.locals {
            out.push_str(&format!(".local {}\n", local.keyword()));
        }
        if let Some(native) = &method.native {
            match &native.symbol {
                Some(symbol) => out.push_str(&format!(".native {} {symbol}\n", native.include_file)),
                None => out.push_str(&format!(".native {}\n", native.include_file)),
            }
        }
        let body = disassemble_code(&method.code, module).map_err(|source| {
            crate::AsmError::Decode {
                method: method.name.clone(),
                source,
            }
        })?;
        for line in body.lines() {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(".end\n");
    }

    Ok(out)
}
