//! Parser for CIL assembly tokens into a [`Module`].
//!
//! Parsing is two-pass. The first pass reads every line, collecting
//! definitions and laying out each method's instructions at their byte
//! offsets with labels and names still symbolic. The second pass, in
//! [`Parser::finish`], resolves labels to offsets and method/field names to
//! tokens, then encodes the bodies.

use std::collections::HashMap;

use crate::error::AsmError;
use crate::lexer::Token;
use il2c_common::{
    ClassDef, FieldDef, Instruction, MethodBody, Module, NativeBinding, Opcode, Operand,
    OperandKind, Param, Token as MetadataToken, TypeDescriptor,
};

/// An operand as written, before labels and names are resolved.
#[derive(Debug, Clone, PartialEq)]
enum RawOperand {
    Ready(Operand),
    Label(String),
    Switch(Vec<String>),
    /// A method or field name.
    Name(String),
}

#[derive(Debug)]
struct RawInstruction {
    opcode: Opcode,
    operand: RawOperand,
    offset: u32,
    line: usize,
}

#[derive(Debug)]
struct MethodDraft {
    body: MethodBody,
    /// Line of the `.method` directive.
    line: usize,
    labels: HashMap<String, u32>,
    instrs: Vec<RawInstruction>,
    size: u32,
}

/// Line-by-line assembler state.
#[derive(Debug, Default)]
pub(crate) struct Parser {
    module: Module,
    drafts: Vec<MethodDraft>,
    current: Option<MethodDraft>,
}

fn spelling(token: &Token) -> String {
    match token {
        Token::Directive(d) => format!(".{d}"),
        Token::Label(l) => format!("{l}:"),
        Token::Word(w) => w.clone(),
    }
}

fn unexpected(token: &Token, line: usize) -> AsmError {
    AsmError::UnexpectedToken {
        line,
        token: spelling(token),
    }
}

fn expect_end(args: &[Token], line: usize) -> Result<(), AsmError> {
    match args.first() {
        Some(token) => Err(unexpected(token, line)),
        None => Ok(()),
    }
}

fn expect_word<'t>(
    args: &'t [Token],
    index: usize,
    line: usize,
    what: &'static str,
    expected: usize,
) -> Result<&'t str, AsmError> {
    match args.get(index) {
        Some(Token::Word(w)) => Ok(w),
        Some(other) => Err(unexpected(other, line)),
        None => Err(AsmError::MissingArgument {
            line,
            opcode: what,
            expected,
        }),
    }
}

fn expect_type(word: &str, line: usize) -> Result<TypeDescriptor, AsmError> {
    TypeDescriptor::parse(word).ok_or_else(|| AsmError::UnknownType {
        line,
        token: word.to_string(),
    })
}

/// Parse a `bits`-wide signed integer. Hex literals may use the full
/// unsigned range and are reinterpreted as two's complement.
fn parse_signed(word: &str, bits: u32) -> Option<i64> {
    if let Some(hex) = word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
        let value = u64::from_str_radix(hex, 16).ok()?;
        if bits < 64 && value >> bits != 0 {
            return None;
        }
        let shift = 64 - bits;
        Some(((value << shift) as i64) >> shift)
    } else {
        let value: i64 = word.parse().ok()?;
        let max = (1i128 << (bits - 1)) - 1;
        let min = -(1i128 << (bits - 1));
        (min..=max).contains(&(value as i128)).then_some(value)
    }
}

fn parse_unsigned(word: &str, max: u64) -> Option<u64> {
    let value = match word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok()?,
        None => word.parse().ok()?,
    };
    (value <= max).then_some(value)
}

impl Parser {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed one tokenized line.
    pub(crate) fn line(&mut self, tokens: &[Token], line: usize) -> Result<(), AsmError> {
        let mut tokens = tokens;
        while let [Token::Label(name), rest @ ..] = tokens {
            let method = self.current.as_mut().ok_or_else(|| AsmError::OutsideMethod {
                line,
                token: format!("{name}:"),
            })?;
            if method.labels.insert(name.clone(), method.size).is_some() {
                return Err(AsmError::DuplicateLabel {
                    line,
                    label: name.clone(),
                });
            }
            tokens = rest;
        }

        match tokens {
            [] => Ok(()),
            [Token::Directive(d), args @ ..] => self.directive(d, args, line),
            [Token::Word(mnemonic), args @ ..] => self.instruction(mnemonic, args, line),
            [other, ..] => Err(unexpected(other, line)),
        }
    }

    fn method(&mut self, line: usize, token: &str) -> Result<&mut MethodDraft, AsmError> {
        self.current.as_mut().ok_or_else(|| AsmError::OutsideMethod {
            line,
            token: token.to_string(),
        })
    }

    fn directive(&mut self, name: &str, args: &[Token], line: usize) -> Result<(), AsmError> {
        match name {
            "class" => {
                let class = expect_word(args, 0, line, ".class", 1)?;
                let base = match args.get(1) {
                    Some(Token::Word(base)) => Some(base.clone()),
                    Some(other) => return Err(unexpected(other, line)),
                    None => None,
                };
                expect_end(args.get(2..).unwrap_or_default(), line)?;
                self.module.classes.push(ClassDef {
                    name: class.to_string(),
                    base,
                });
            }
            "field" => {
                let is_static = matches!(args.first(), Some(Token::Word(w)) if w == "static");
                let args = if is_static { &args[1..] } else { args };
                let declaring_type = expect_word(args, 0, line, ".field", 3)?;
                let field = expect_word(args, 1, line, ".field", 3)?;
                let ty = expect_type(expect_word(args, 2, line, ".field", 3)?, line)?;
                expect_end(&args[3..], line)?;
                self.module.fields.push(FieldDef {
                    declaring_type: declaring_type.to_string(),
                    name: field.to_string(),
                    ty,
                    is_static,
                });
            }
            "method" => {
                if self.current.is_some() {
                    return Err(AsmError::UnexpectedToken {
                        line,
                        token: ".method".to_string(),
                    });
                }
                let method = expect_word(args, 0, line, ".method", 2)?;
                let ret = expect_type(expect_word(args, 1, line, ".method", 2)?, line)?;
                let mut body = MethodBody::new(method, ret);
                match args.get(2) {
                    Some(Token::Word(w)) if w == "instance" => {
                        let declaring = body
                            .declaring_type()
                            .ok_or_else(|| unexpected(&args[2], line))?
                            .to_string();
                        body.params
                            .push(Param::new("this", TypeDescriptor::Class(declaring)));
                        body.is_instance = true;
                        expect_end(&args[3..], line)?;
                    }
                    Some(other) => return Err(unexpected(other, line)),
                    None => {}
                }
                self.current = Some(MethodDraft {
                    body,
                    line,
                    labels: HashMap::new(),
                    instrs: Vec::new(),
                    size: 0,
                });
            }
            "param" => {
                let param = expect_word(args, 0, line, ".param", 2)?;
                let ty = expect_type(expect_word(args, 1, line, ".param", 2)?, line)?;
                expect_end(&args[2..], line)?;
                self.method(line, ".param")?
                    .body
                    .params
                    .push(Param::new(param, ty));
            }
            "local" => {
                let ty = expect_type(expect_word(args, 0, line, ".local", 1)?, line)?;
                expect_end(&args[1..], line)?;
                self.method(line, ".local")?.body.locals.push(ty);
            }
            "native" => {
                let include_file = expect_word(args, 0, line, ".native", 1)?.to_string();
                let symbol = match args.get(1) {
                    Some(Token::Word(symbol)) => Some(symbol.clone()),
                    Some(other) => return Err(unexpected(other, line)),
                    None => None,
                };
                expect_end(args.get(2..).unwrap_or_default(), line)?;
                self.method(line, ".native")?.body.native = Some(NativeBinding {
                    include_file,
                    symbol,
                });
            }
            "end" => {
                expect_end(args, line)?;
                self.method(line, ".end")?;
                if let Some(draft) = self.current.take() {
                    self.drafts.push(draft);
                }
            }
            other => {
                return Err(AsmError::UnknownDirective {
                    line,
                    token: format!(".{other}"),
                })
            }
        }
        Ok(())
    }

    fn instruction(&mut self, mnemonic: &str, args: &[Token], line: usize) -> Result<(), AsmError> {
        let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| AsmError::UnknownOpcode {
            line,
            token: mnemonic.to_string(),
        })?;
        let method = self.method(line, mnemonic)?;
        let name = opcode.mnemonic();

        let invalid = |word: &str| AsmError::InvalidNumber {
            line,
            token: word.to_string(),
        };
        let (operand, arity) = match opcode.operand_kind() {
            OperandKind::None => (RawOperand::Ready(Operand::None), 0),
            OperandKind::ShortInt => {
                let word = expect_word(args, 0, line, name, 1)?;
                let v = parse_signed(word, 8).ok_or_else(|| invalid(word))?;
                (RawOperand::Ready(Operand::Int32(v as i32)), 1)
            }
            OperandKind::Int32 => {
                let word = expect_word(args, 0, line, name, 1)?;
                let v = parse_signed(word, 32).ok_or_else(|| invalid(word))?;
                (RawOperand::Ready(Operand::Int32(v as i32)), 1)
            }
            OperandKind::Int64 => {
                let word = expect_word(args, 0, line, name, 1)?;
                let v = parse_signed(word, 64).ok_or_else(|| invalid(word))?;
                (RawOperand::Ready(Operand::Int64(v)), 1)
            }
            OperandKind::Float32 => {
                let word = expect_word(args, 0, line, name, 1)?;
                let v: f32 = word.parse().map_err(|_| invalid(word))?;
                (RawOperand::Ready(Operand::Float32(v)), 1)
            }
            OperandKind::Float64 => {
                let word = expect_word(args, 0, line, name, 1)?;
                let v: f64 = word.parse().map_err(|_| invalid(word))?;
                (RawOperand::Ready(Operand::Float64(v)), 1)
            }
            OperandKind::ShortVar => {
                let word = expect_word(args, 0, line, name, 1)?;
                let v = parse_unsigned(word, u8::MAX as u64).ok_or_else(|| invalid(word))?;
                (RawOperand::Ready(Operand::Var(v as u16)), 1)
            }
            OperandKind::ShortBranch | OperandKind::Branch => {
                let label = expect_word(args, 0, line, name, 1)?;
                (RawOperand::Label(label.to_string()), 1)
            }
            OperandKind::Switch => {
                let mut labels = Vec::with_capacity(args.len());
                for token in args {
                    match token {
                        Token::Word(label) => labels.push(label.clone()),
                        other => return Err(unexpected(other, line)),
                    }
                }
                let n = labels.len();
                (RawOperand::Switch(labels), n)
            }
            OperandKind::Token => {
                let word = expect_word(args, 0, line, name, 1)?;
                let raw = word.starts_with("0x") || word.starts_with("0X");
                let operand = if raw {
                    let v = parse_unsigned(word, u32::MAX as u64).ok_or_else(|| invalid(word))?;
                    RawOperand::Ready(Operand::Token(MetadataToken(v as u32)))
                } else {
                    RawOperand::Name(word.to_string())
                };
                (operand, 1)
            }
        };
        expect_end(&args[arity..], line)?;

        let operand_size = opcode
            .operand_kind()
            .fixed_size()
            .unwrap_or(4 + 4 * arity);
        let offset = method.size;
        method.size += (opcode.size() + operand_size) as u32;
        method.instrs.push(RawInstruction {
            opcode,
            operand,
            offset,
            line,
        });
        Ok(())
    }

    /// Resolve labels and names and encode every method.
    pub(crate) fn finish(self) -> Result<Module, AsmError> {
        if let Some(open) = &self.current {
            return Err(AsmError::UnterminatedMethod { line: open.line });
        }
        let Parser {
            mut module, drafts, ..
        } = self;

        module.methods = drafts.iter().map(|d| d.body.clone()).collect();
        let codes = drafts
            .iter()
            .map(|draft| encode_method(draft, &module))
            .collect::<Result<Vec<_>, _>>()?;
        for (method, code) in module.methods.iter_mut().zip(codes) {
            method.code = code;
        }
        Ok(module)
    }
}

fn encode_method(draft: &MethodDraft, module: &Module) -> Result<Vec<u8>, AsmError> {
    let mut code = Vec::with_capacity(draft.size as usize);
    for raw in &draft.instrs {
        let line = raw.line;
        let target = |label: &str| {
            draft
                .labels
                .get(label)
                .copied()
                .ok_or_else(|| AsmError::UndefinedLabel {
                    line,
                    label: label.to_string(),
                })
        };

        let operand = match &raw.operand {
            RawOperand::Ready(operand) => operand.clone(),
            RawOperand::Label(label) => Operand::Target(target(label)?),
            RawOperand::Switch(labels) => Operand::Switch(
                labels
                    .iter()
                    .map(|l| target(l))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            RawOperand::Name(name) => Operand::Token(resolve_name(raw.opcode, name, module, line)?),
        };

        let instr = Instruction::new(raw.opcode, operand, raw.offset);
        if raw.opcode.operand_kind() == OperandKind::ShortBranch {
            if let (Operand::Target(t), RawOperand::Label(label)) = (&instr.operand, &raw.operand) {
                let displacement = *t as i64 - instr.next_offset() as i64;
                if i8::try_from(displacement).is_err() {
                    return Err(AsmError::BranchOutOfRange {
                        line,
                        label: label.clone(),
                        displacement,
                    });
                }
            }
        }
        code.extend(instr.encode());
    }
    Ok(code)
}

fn resolve_name(
    opcode: Opcode,
    name: &str,
    module: &Module,
    line: usize,
) -> Result<MetadataToken, AsmError> {
    match opcode {
        Opcode::Ldfld | Opcode::Stfld | Opcode::Ldsfld | Opcode::Stsfld => module
            .find_field(name)
            .map(|(token, _)| token)
            .ok_or_else(|| AsmError::UnknownField {
                line,
                name: name.to_string(),
            }),
        _ => module
            .find_method(name)
            .map(|(token, _)| token)
            .ok_or_else(|| AsmError::UnknownMethod {
                line,
                name: name.to_string(),
            }),
    }
}
