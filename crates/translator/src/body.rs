//! The translated form of a function: labelled blocks of C statements.

use std::collections::BTreeSet;
use std::fmt;

/// A label for the block starting at `offset`.
pub fn label(offset: u32) -> String {
    format!("IL_{offset:04x}")
}

/// One emitted C statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `target = expr;`
    Assign { target: String, expr: String },
    /// An expression evaluated for its side effects (a void call).
    Eval(String),
    /// `goto IL_xxxx;`
    Goto(u32),
    /// `if (cond) goto IL_xxxx;`
    Branch { cond: String, target: u32 },
    /// Jump table on `selector`; out-of-range values fall through.
    Switch { selector: String, targets: Vec<u32> },
    Return(Option<String>),
    Comment(String),
}

impl Statement {
    /// Offsets this statement may jump to.
    pub fn jump_targets(&self) -> Vec<u32> {
        match self {
            Statement::Goto(target) | Statement::Branch { target, .. } => vec![*target],
            Statement::Switch { targets, .. } => targets.clone(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assign { target, expr } => write!(f, "{target} = {expr};"),
            Statement::Eval(expr) => write!(f, "{expr};"),
            Statement::Goto(target) => write!(f, "goto {};", label(*target)),
            Statement::Branch { cond, target } => {
                write!(f, "if ({cond}) goto {};", label(*target))
            }
            Statement::Switch { selector, targets } => {
                writeln!(f, "switch ({selector}) {{")?;
                for (case, target) in targets.iter().enumerate() {
                    writeln!(f, "    case {case}: goto {};", label(*target))?;
                }
                write!(f, "}}")
            }
            Statement::Return(Some(expr)) => write!(f, "return {expr};"),
            Statement::Return(None) => write!(f, "return;"),
            Statement::Comment(text) => write!(f, "/* {text} */"),
        }
    }
}

/// A straight-line run of statements entered only at the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    pub offset: u32,
    /// Present when some statement jumps here.
    pub label: Option<String>,
    pub statements: Vec<Statement>,
}

/// A declared C variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub c_type: String,
}

impl Variable {
    pub fn new(name: impl Into<String>, c_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            c_type: c_type.into(),
        }
    }

    /// The zero value for this variable's C type.
    fn zero(&self) -> &'static str {
        if self.c_type.ends_with('*') {
            "NULL"
        } else if self.c_type == "bool" {
            "false"
        } else {
            "0"
        }
    }
}

/// A fully translated function. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBody {
    /// Full name of the source method.
    pub method: String,
    /// C function name.
    pub name: String,
    pub return_type: String,
    pub params: Vec<Variable>,
    pub locals: Vec<Variable>,
    /// `__tN` temporaries in allocation order.
    pub temporaries: Vec<Variable>,
    /// `__stackD_*` variables carrying stack entries across blocks.
    pub stack_slots: Vec<Variable>,
    /// Blocks in ascending offset order.
    pub blocks: Vec<BasicBlock>,
    /// Headers the emitted code depends on.
    pub includes: BTreeSet<String>,
}

impl FunctionBody {
    /// Every statement, in block order.
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.blocks.iter().flat_map(|b| b.statements.iter())
    }

    /// The block starting at `offset`.
    pub fn block_at(&self, offset: u32) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.offset == offset)
    }

    /// `ret_type name(params)`, without a trailing semicolon.
    pub fn prototype(&self) -> String {
        let params = if self.params.is_empty() {
            "void".to_string()
        } else {
            self.params
                .iter()
                .map(|p| format!("{} {}", p.c_type, p.name))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!("{} {}({params})", self.return_type, self.name)
    }
}

impl fmt::Display for FunctionBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.prototype())?;
        writeln!(f, "{{")?;

        for local in &self.locals {
            writeln!(f, "    {} {} = {};", local.c_type, local.name, local.zero())?;
        }
        for var in self.stack_slots.iter().chain(&self.temporaries) {
            writeln!(f, "    {} {};", var.c_type, var.name)?;
        }

        for block in &self.blocks {
            if let Some(label) = &block.label {
                writeln!(f)?;
                writeln!(f, "{label}:")?;
            }
            for stmt in &block.statements {
                for line in stmt.to_string().lines() {
                    writeln!(f, "    {line}")?;
                }
            }
        }

        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_rendering() {
        let assign = Statement::Assign {
            target: "__t0".to_string(),
            expr: "1 + 2".to_string(),
        };
        assert_eq!(assign.to_string(), "__t0 = 1 + 2;");
        assert_eq!(Statement::Goto(0x1a).to_string(), "goto IL_001a;");
        assert_eq!(
            Statement::Branch {
                cond: "a < b".to_string(),
                target: 4
            }
            .to_string(),
            "if (a < b) goto IL_0004;"
        );
        assert_eq!(Statement::Return(None).to_string(), "return;");
        assert_eq!(Statement::Comment("IL_0000: nop".to_string()).to_string(), "/* IL_0000: nop */");
    }

    #[test]
    fn switch_rendering() {
        let stmt = Statement::Switch {
            selector: "local0".to_string(),
            targets: vec![0x10, 0x20],
        };
        assert_eq!(
            stmt.to_string(),
            "switch (local0) {\n    case 0: goto IL_0010;\n    case 1: goto IL_0020;\n}"
        );
        assert_eq!(stmt.jump_targets(), vec![0x10, 0x20]);
    }

    #[test]
    fn function_rendering() {
        let body = FunctionBody {
            method: "Demo.Program.Inc".to_string(),
            name: "Demo_Program_Inc".to_string(),
            return_type: "int32_t".to_string(),
            params: vec![Variable::new("x", "int32_t")],
            locals: vec![Variable::new("local0", "bool")],
            temporaries: vec![Variable::new("__t0", "int32_t")],
            stack_slots: vec![],
            blocks: vec![
                BasicBlock {
                    offset: 0,
                    label: None,
                    statements: vec![Statement::Assign {
                        target: "__t0".to_string(),
                        expr: "x + 1".to_string(),
                    }],
                },
                BasicBlock {
                    offset: 3,
                    label: Some(label(3)),
                    statements: vec![Statement::Return(Some("__t0".to_string()))],
                },
            ],
            includes: BTreeSet::new(),
        };
        let expected = "\
int32_t Demo_Program_Inc(int32_t x)
{
    bool local0 = false;
    int32_t __t0;
    __t0 = x + 1;

IL_0003:
    return __t0;
}
";
        assert_eq!(body.to_string(), expected);
        assert_eq!(body.statements().count(), 2);
        assert!(body.block_at(3).is_some());
    }

    #[test]
    fn parameterless_prototype() {
        let body = FunctionBody {
            method: "Main".to_string(),
            name: "Main".to_string(),
            return_type: "void".to_string(),
            params: vec![],
            locals: vec![],
            temporaries: vec![],
            stack_slots: vec![],
            blocks: vec![],
            includes: BTreeSet::new(),
        };
        assert_eq!(body.prototype(), "void Main(void)");
    }
}
