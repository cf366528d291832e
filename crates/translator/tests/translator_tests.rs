//! Integration tests for the translator.
//!
//! Method bodies are written with the assembler, translated against a
//! `MemoryCatalog` built from the same module, and checked statement by
//! statement or against the rendered C.

use il2c_assembler::assemble;
use il2c_common::{decode_all, DecodeError, MethodBody, Module, Opcode, Operand, TypeDescriptor};
use il2c_translator::{
    translate, translate_module, DebugInformation, ErrorKind, FunctionBody, MemoryCatalog,
    Statement, TranslateError, TranslatorConfig, Variable,
};

// ---- Test helpers ----

fn translate_in(module: &Module, name: &str, config: &TranslatorConfig) -> Result<FunctionBody, TranslateError> {
    let (_, method) = module
        .find_method(name)
        .unwrap_or_else(|| panic!("no method {name}"));
    let catalog = MemoryCatalog::from_module(module);
    translate(method, &catalog, config)
}

/// Assemble `text` and translate its method `name` with default settings.
fn translate_text(text: &str, name: &str) -> Result<FunctionBody, TranslateError> {
    let module = assemble(text).unwrap_or_else(|e| panic!("assembly failed: {e}"));
    translate_in(&module, name, &TranslatorConfig::default())
}

fn lines(body: &FunctionBody) -> Vec<String> {
    body.statements().map(|s| s.to_string()).collect()
}

fn assign(target: &str, expr: &str) -> Statement {
    Statement::Assign {
        target: target.to_string(),
        expr: expr.to_string(),
    }
}

fn ret(expr: &str) -> Statement {
    Statement::Return(Some(expr.to_string()))
}

// ---- Core scenarios ----

#[test]
fn one_plus_two() {
    let mut method = MethodBody::new("Demo.Three", TypeDescriptor::Int32);
    method.code = vec![0x17, 0x18, 0x58, 0x2A]; // ldc.i4.1; ldc.i4.2; add; ret
    let catalog = MemoryCatalog::from_module(&Module::new());
    let body = translate(&method, &catalog, &TranslatorConfig::default()).unwrap();

    let statements: Vec<&Statement> = body.statements().collect();
    assert_eq!(statements, vec![&assign("__t0", "1 + 2"), &ret("__t0")]);
    assert_eq!(body.temporaries, vec![Variable::new("__t0", "int32_t")]);
    assert_eq!(body.blocks.len(), 1);
    assert_eq!(body.blocks[0].label, None);
}

#[test]
fn four_byte_immediates_keep_their_sign() {
    let text = "\
.method Demo.Imm int32
  ldc.i4 0x7F
  ldc.i4 -128
  add
  ret
.end
";
    let module = assemble(text).unwrap();
    let instrs = decode_all(&module.methods[0].code).unwrap();
    assert_eq!(instrs[0].operand, Operand::Int32(127));
    assert_eq!(instrs[1].operand, Operand::Int32(-128));
    assert_eq!(instrs[1].offset, 5);

    let body = translate_in(&module, "Demo.Imm", &TranslatorConfig::default()).unwrap();
    assert_eq!(lines(&body), vec!["__t0 = 127 + -128;", "return __t0;"]);
}

const PICK: &str = "\
.method Demo.Pick int32
.param flag bool
  ldarg.0
  brtrue.s yes
  ldc.i4.0
  ret
yes:
  ldc.i4.1
  ret
.end
";

#[test]
fn brtrue_splits_into_two_targets() {
    let body = translate_text(PICK, "Demo.Pick").unwrap();
    let offsets: Vec<u32> = body.blocks.iter().map(|b| b.offset).collect();
    assert_eq!(offsets, vec![0, 3, 5]);

    assert_eq!(
        body.blocks[0].statements,
        vec![Statement::Branch {
            cond: "flag".to_string(),
            target: 5
        }]
    );
    assert_eq!(body.blocks[1].statements, vec![ret("0")]);
    assert_eq!(body.blocks[1].label, None);
    assert_eq!(body.blocks[2].statements, vec![ret("1")]);
    assert_eq!(body.blocks[2].label.as_deref(), Some("IL_0005"));
}

#[test]
fn pick_renders_as_c() {
    let body = translate_text(PICK, "Demo.Pick").unwrap();
    let expected = "\
int32_t Demo_Pick(bool flag)
{
    if (flag) goto IL_0005;
    return 0;

IL_0005:
    return 1;
}
";
    assert_eq!(body.to_string(), expected);
}

#[test]
fn unsupported_opcode_reports_its_offset() {
    let text = "\
.method Demo.Str void
  nop
  nop
  ldstr 0x70000001
  pop
  ret
.end
";
    let err = translate_text(text, "Demo.Str").unwrap_err();
    assert_eq!(
        err,
        TranslateError {
            function: "Demo.Str".to_string(),
            at: 2,
            opcode: Some(Opcode::Ldstr),
            kind: ErrorKind::UnsupportedInstruction { value: 0x72 },
        }
    );
    assert_eq!(
        err.to_string(),
        "Demo.Str: IL_0002 (ldstr): unsupported instruction 0x72"
    );
}

#[test]
fn unknown_byte_reports_its_offset() {
    let mut method = MethodBody::new("Demo.Junk", TypeDescriptor::Void);
    method.code = vec![0x00, 0x24, 0x2A];
    let catalog = MemoryCatalog::from_module(&Module::new());
    let err = translate(&method, &catalog, &TranslatorConfig::default()).unwrap_err();
    assert_eq!(err.at, 1);
    assert_eq!(err.opcode, None);
    assert_eq!(err.kind, ErrorKind::UnsupportedInstruction { value: 0x24 });
}

#[test]
fn mismatched_depths_at_a_join() {
    let text = "\
.method Demo.Merge void
.param flag bool
  ldarg.0
  brfalse.s skip
  ldc.i4.1
skip:
  ret
.end
";
    let err = translate_text(text, "Demo.Merge").unwrap_err();
    assert_eq!(err.at, 3);
    assert_eq!(
        err.kind,
        ErrorKind::StackMergeMismatch {
            target: 4,
            expected: String::new(),
            found: "int32".to_string(),
        }
    );
}

// ---- Return arity ----

#[test]
fn extra_value_at_return() {
    let text = ".method Demo.Two int32\n  ldc.i4.1\n  ldc.i4.2\n  ret\n.end\n";
    let err = translate_text(text, "Demo.Two").unwrap_err();
    assert_eq!(err.at, 2);
    assert_eq!(
        err.kind,
        ErrorKind::NonEmptyStackAtReturn {
            depth: 2,
            expected: 1
        }
    );
}

#[test]
fn void_return_with_value_left() {
    let text = ".method Demo.V void\n  ldc.i4.1\n  ret\n.end\n";
    let err = translate_text(text, "Demo.V").unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::NonEmptyStackAtReturn {
            depth: 1,
            expected: 0
        }
    );
}

#[test]
fn missing_return_value() {
    let text = ".method Demo.R int32\n  ret\n.end\n";
    let err = translate_text(text, "Demo.R").unwrap_err();
    assert_eq!(err.kind, ErrorKind::StackUnderflow);
}

#[test]
fn return_converts_to_declared_type() {
    let text = "\
.method Demo.Wide int64
.param x int32
  ldarg.0
  ret
.end
";
    let body = translate_text(text, "Demo.Wide").unwrap();
    assert_eq!(lines(&body), vec!["return (int64_t)x;"]);
}

// ---- Joins ----

const CHOOSE: &str = "\
.method Demo.Choose int32
.param flag bool
.param a int32
.param b int32
  ldarg.0
  brtrue.s useA
  ldarg.2
  br.s join
useA:
  ldarg.1
join:
  ldc.i4.1
  add
  ret
.end
";

#[test]
fn values_cross_blocks_through_slots() {
    let body = translate_text(CHOOSE, "Demo.Choose").unwrap();
    let blocks: Vec<(u32, Vec<Statement>)> = body
        .blocks
        .iter()
        .map(|b| (b.offset, b.statements.clone()))
        .collect();
    assert_eq!(
        blocks,
        vec![
            (
                0,
                vec![Statement::Branch {
                    cond: "flag".to_string(),
                    target: 6
                }]
            ),
            (3, vec![assign("__stack0_i32", "b"), Statement::Goto(7)]),
            (6, vec![assign("__stack0_i32", "a")]),
            (7, vec![assign("__t0", "__stack0_i32 + 1"), ret("__t0")]),
        ]
    );
    assert_eq!(body.stack_slots, vec![Variable::new("__stack0_i32", "int32_t")]);
}

#[test]
fn choose_renders_as_c() {
    let body = translate_text(CHOOSE, "Demo.Choose").unwrap();
    let expected = "\
int32_t Demo_Choose(bool flag, int32_t a, int32_t b)
{
    int32_t __stack0_i32;
    int32_t __t0;
    if (flag) goto IL_0006;
    __stack0_i32 = b;
    goto IL_0007;

IL_0006:
    __stack0_i32 = a;

IL_0007:
    __t0 = __stack0_i32 + 1;
    return __t0;
}
";
    assert_eq!(body.to_string(), expected);
}

#[test]
fn loop_with_back_edge() {
    let text = "\
.method Demo.Sum int32
.param n int32
.local int32
  ldc.i4.0
  stloc.0
loop:
  ldarg.0
  brfalse.s done
  ldloc.0
  ldarg.0
  add
  stloc.0
  ldarg.0
  ldc.i4.1
  sub
  starg.s 0
  br.s loop
done:
  ldloc.0
  ret
.end
";
    let body = translate_text(text, "Demo.Sum").unwrap();
    assert_eq!(
        lines(&body),
        vec![
            "local0 = 0;",
            "if (n == 0) goto IL_0010;",
            "__t0 = local0 + n;",
            "local0 = __t0;",
            "__t1 = n - 1;",
            "n = __t1;",
            "goto IL_0002;",
            "return local0;",
        ]
    );
    let labelled: Vec<u32> = body
        .blocks
        .iter()
        .filter(|b| b.label.is_some())
        .map(|b| b.offset)
        .collect();
    assert_eq!(labelled, vec![2, 16]);
}

#[test]
fn switch_dispatch() {
    let text = "\
.method Demo.Sel int32
.param k int32
  ldarg.0
  switch (zero, one)
  ldc.i4.m1
  ret
zero: ldc.i4.0
  ret
one: ldc.i4.1
  ret
.end
";
    let body = translate_text(text, "Demo.Sel").unwrap();
    assert_eq!(
        body.blocks[0].statements,
        vec![Statement::Switch {
            selector: "k".to_string(),
            targets: vec![16, 18]
        }]
    );
    assert_eq!(body.block_at(14).unwrap().statements, vec![ret("-1")]);
    assert!(body.block_at(14).unwrap().label.is_none());
    assert!(body.to_string().contains("    switch (k) {\n        case 0: goto IL_0010;\n"));
}

#[test]
fn unreachable_code_is_not_translated() {
    let text = ".method Demo.U void\n  ret\n  nop\n  ret\n.end\n";
    let body = translate_text(text, "Demo.U").unwrap();
    assert_eq!(body.blocks.len(), 1);
    assert_eq!(lines(&body), vec!["return;"]);
}

// ---- Aliasing ----

#[test]
fn pending_load_survives_a_store() {
    let text = "\
.method Demo.Alias int32
.local int32
  ldloc.0
  ldc.i4.5
  stloc.0
  ldloc.0
  add
  ret
.end
";
    let body = translate_text(text, "Demo.Alias").unwrap();
    assert_eq!(
        lines(&body),
        vec![
            "__t0 = local0;",
            "local0 = 5;",
            "__t1 = __t0 + local0;",
            "return __t1;",
        ]
    );
}

#[test]
fn call_with_address_flushes_pending_loads() {
    let text = "\
.method Demo.Bump void
.param p int32&
  ldarg.0
  ldarg.0
  ldind.i4
  ldc.i4.1
  add
  stind.i4
  ret
.end
.method Demo.Caller int32
.local int32
  ldloc.0
  ldloca.s 0
  call Demo.Bump
  ret
.end
";
    let body = translate_text(text, "Demo.Caller").unwrap();
    assert_eq!(
        lines(&body),
        vec!["__t0 = local0;", "Demo_Bump(&local0);", "return __t0;"]
    );

    let bump = translate_text(text, "Demo.Bump").unwrap();
    assert_eq!(
        lines(&bump),
        vec!["__t0 = *p;", "__t1 = __t0 + 1;", "*p = __t1;", "return;"]
    );
}

// ---- Types ----

const SHAPES: &str = "\
.class Demo.Base
.class Demo.Derived Demo.Base
.field Demo.Base x int32
.method Demo.Derived.GetX int32 instance
  ldarg.0
  ldfld Demo.Base.x
  ret
.end
.method Demo.Derived.Up void instance
.local class:Demo.Base
  ldarg.0
  stloc.0
  ret
.end
.method Demo.Down void
.param b class:Demo.Base
.local class:Demo.Derived
  ldarg.0
  stloc.0
  ret
.end
";

#[test]
fn inherited_field_access_casts() {
    let body = translate_text(SHAPES, "Demo.Derived.GetX").unwrap();
    assert_eq!(
        lines(&body),
        vec!["__t0 = ((Demo_Base*)this)->x;", "return __t0;"]
    );
    assert_eq!(body.prototype(), "int32_t Demo_Derived_GetX(Demo_Derived* this)");
}

#[test]
fn upcast_store_gets_explicit_cast() {
    let body = translate_text(SHAPES, "Demo.Derived.Up").unwrap();
    assert_eq!(lines(&body), vec!["local0 = (Demo_Base*)this;", "return;"]);
    assert!(body.to_string().contains("    Demo_Base* local0 = NULL;\n"));
}

#[test]
fn downcast_store_is_rejected() {
    let err = translate_text(SHAPES, "Demo.Down").unwrap_err();
    assert_eq!(err.at, 1);
    assert_eq!(err.opcode, Some(Opcode::Stloc0));
    assert_eq!(
        err.kind,
        ErrorKind::NoViableConversion {
            from: "Demo.Base".to_string(),
            to: "Demo.Derived".to_string(),
        }
    );
}

#[test]
fn mixed_int32_and_native_int() {
    let text = "\
.method Demo.Offset nint
.param p nint
  ldarg.0
  ldc.i4.4
  add
  ret
.end
";
    let body = translate_text(text, "Demo.Offset").unwrap();
    assert_eq!(lines(&body), vec!["__t0 = (intptr_t)p + (intptr_t)4;", "return __t0;"]);
    assert_eq!(body.temporaries, vec![Variable::new("__t0", "intptr_t")]);
}

#[test]
fn int64_arithmetic_has_no_casts() {
    let text = "\
.method Demo.Big int64
.param a int64
  ldarg.0
  ldc.i8 10
  mul
  ret
.end
";
    let body = translate_text(text, "Demo.Big").unwrap();
    assert_eq!(lines(&body), vec!["__t0 = a * 10LL;", "return __t0;"]);
}

#[test]
fn int32_plus_int64_is_rejected() {
    let text = "\
.method Demo.Bad int64
.param a int64
  ldarg.0
  ldc.i4.1
  add
  ret
.end
";
    let err = translate_text(text, "Demo.Bad").unwrap_err();
    assert_eq!(err.opcode, Some(Opcode::Add));
    assert!(matches!(err.kind, ErrorKind::InvalidOperandTypes(_)));
}

#[test]
fn float_remainder_needs_math_header() {
    let text = "\
.method Demo.Mod float64
.param a float64
  ldarg.0
  ldc.r8 2.5
  rem
  ret
.end
";
    let body = translate_text(text, "Demo.Mod").unwrap();
    assert_eq!(lines(&body), vec!["__t0 = fmod(a, 2.5);", "return __t0;"]);
    assert!(body.includes.contains("math.h"));
}

#[test]
fn comparison_result_is_bool() {
    let text = "\
.method Demo.Less bool
.param a int32
.param b int32
  ldarg.0
  ldarg.1
  clt.un
  ret
.end
";
    let body = translate_text(text, "Demo.Less").unwrap();
    assert_eq!(
        lines(&body),
        vec!["__t0 = (uint32_t)a < (uint32_t)b;", "return __t0;"]
    );
    assert_eq!(body.temporaries, vec![Variable::new("__t0", "bool")]);
}

// ---- Calls and natives ----

#[test]
fn native_call_records_include() {
    let text = "\
.method Demo.Native.puts int32
.param text nint
.native stdio.h
.end
.method Demo.Hello void
.param s nint
  ldarg.0
  call Demo.Native.puts
  pop
  ret
.end
";
    let body = translate_text(text, "Demo.Hello").unwrap();
    assert_eq!(lines(&body), vec!["__t0 = puts(s);", "return;"]);
    assert!(body.includes.contains("stdio.h"));
}

#[test]
fn native_symbol_overrides_name() {
    let text = "\
.method Demo.Native.Write void
.param v int32
.native console.h console_write_i32
.end
.method Demo.Go void
  ldc.i4.7
  call Demo.Native.Write
  ret
.end
";
    let body = translate_text(text, "Demo.Go").unwrap();
    assert_eq!(lines(&body), vec!["console_write_i32(7);", "return;"]);
}

// ---- Configuration ----

#[test]
fn comment_debug_information() {
    let module = assemble(".method Demo.D int32\n  ldc.i4.1\n  ret\n.end\n").unwrap();
    let config = TranslatorConfig {
        debug_information: DebugInformation::CommentOnly,
        ..TranslatorConfig::default()
    };
    let body = translate_in(&module, "Demo.D", &config).unwrap();
    assert_eq!(
        lines(&body),
        vec!["/* IL_0000: ldc.i4.1 */", "/* IL_0001: ret */", "return 1;"]
    );

    let config = TranslatorConfig {
        debug_information: DebugInformation::Full,
        ..TranslatorConfig::default()
    };
    let body = translate_in(&module, "Demo.D", &config).unwrap();
    assert_eq!(
        lines(&body),
        vec![
            "/* IL_0000: ldc.i4.1 [depth 0] */",
            "/* IL_0001: ret [depth 1] */",
            "return 1;"
        ]
    );
}

// ---- Reference joins ----

/// `flag ? first : second`, with `first` on the branch target so it
/// reaches the join before `second`.
fn either(return_type: &str, first: &str, second: &str) -> String {
    format!(
        "\
.class Demo.Shape
.class Demo.Circle Demo.Shape
.class Demo.Square Demo.Shape
.field Demo.Shape sides int32
.method Demo.Either {return_type}
.param flag bool
.param a {first}
.param b {second}
  ldarg.0
  brtrue.s l1
  ldarg.2
  br.s l2
l1:
  ldarg.1
l2:
  ret
.end
"
    )
}

fn join_blocks(body: &FunctionBody) -> Vec<(u32, Vec<Statement>)> {
    body.blocks
        .iter()
        .map(|b| (b.offset, b.statements.clone()))
        .collect()
}

#[test]
fn subtype_reaching_the_join_first_is_widened() {
    let body = translate_text(&either("object", "string", "object"), "Demo.Either").unwrap();
    assert_eq!(
        join_blocks(&body),
        vec![
            (
                0,
                vec![Statement::Branch {
                    cond: "flag".to_string(),
                    target: 6
                }]
            ),
            (3, vec![assign("__stack0_obj", "b"), Statement::Goto(7)]),
            (6, vec![assign("__stack0_obj", "(System_Object*)a")]),
            (7, vec![ret("__stack0_obj")]),
        ]
    );
    assert_eq!(body.stack_slots, vec![Variable::new("__stack0_obj", "System_Object*")]);
}

#[test]
fn supertype_reaching_the_join_first_is_kept() {
    let body = translate_text(&either("object", "object", "string"), "Demo.Either").unwrap();
    assert_eq!(
        join_blocks(&body)[1..3],
        [
            (3, vec![assign("__stack0_obj", "(System_Object*)b"), Statement::Goto(7)]),
            (6, vec![assign("__stack0_obj", "a")]),
        ]
    );
    assert_eq!(body.stack_slots, vec![Variable::new("__stack0_obj", "System_Object*")]);
}

#[test]
fn sibling_classes_join_at_their_base() {
    let text = either("int32", "class:Demo.Circle", "class:Demo.Square")
        .replace("l2:\n  ret", "l2:\n  ldfld Demo.Shape.sides\n  ret");
    let forward = translate_text(&text, "Demo.Either").unwrap();
    assert_eq!(
        lines(&forward),
        vec![
            "if (flag) goto IL_0006;",
            "__stack0_obj = (Demo_Shape*)b;",
            "goto IL_0007;",
            "__stack0_obj = (Demo_Shape*)a;",
            "__t0 = __stack0_obj->sides;",
            "return __t0;",
        ]
    );
    assert_eq!(forward.stack_slots, vec![Variable::new("__stack0_obj", "Demo_Shape*")]);

    let swapped = text.replace(
        ".param a class:Demo.Circle\n.param b class:Demo.Square",
        ".param a class:Demo.Square\n.param b class:Demo.Circle",
    );
    let backward = translate_text(&swapped, "Demo.Either").unwrap();
    assert_eq!(lines(&backward), lines(&forward));
    assert_eq!(backward.stack_slots, forward.stack_slots);
}

#[test]
fn null_and_a_class_join_at_the_class() {
    let text = "\
.method Demo.OrNull string
.param flag bool
.param s string
  ldarg.0
  brtrue.s l1
  ldarg.1
  br.s l2
l1:
  ldnull
l2:
  ret
.end
";
    let body = translate_text(text, "Demo.OrNull").unwrap();
    assert_eq!(
        lines(&body),
        vec![
            "if (flag) goto IL_0006;",
            "__stack0_obj = s;",
            "goto IL_0007;",
            "__stack0_obj = NULL;",
            "return __stack0_obj;",
        ]
    );
    assert_eq!(body.stack_slots, vec![Variable::new("__stack0_obj", "System_String*")]);
}

#[test]
fn widened_join_still_rejects_a_narrower_store() {
    let err = translate_text(&either("string", "string", "object"), "Demo.Either").unwrap_err();
    assert_eq!(err.at, 7);
    assert_eq!(err.opcode, Some(Opcode::Ret));
    assert_eq!(
        err.kind,
        ErrorKind::NoViableConversion {
            from: "System.Object".to_string(),
            to: "System.String".to_string(),
        }
    );
}

#[test]
fn widened_translation_is_deterministic() {
    let module = assemble(&either("object", "string", "object")).unwrap();
    let first = translate_in(&module, "Demo.Either", &TranslatorConfig::default()).unwrap();
    let second = translate_in(&module, "Demo.Either", &TranslatorConfig::default()).unwrap();
    assert_eq!(first, second);
}

// ---- Parameter names ----

#[test]
fn parameter_named_like_a_local_keeps_its_own_name() {
    let text = "\
.method Demo.Shadow int32
.param local0 int32
.local int32
  ldarg.0
  stloc.0
  ldloc.0
  ret
.end
";
    let body = translate_text(text, "Demo.Shadow").unwrap();
    assert_eq!(lines(&body), vec!["local0 = _arg_local0;", "return local0;"]);
    assert_eq!(body.prototype(), "int32_t Demo_Shadow(int32_t _arg_local0)");
}

#[test]
fn parameter_named_like_a_slot_is_not_hoisted() {
    let text = "\
.method Demo.Clash int32
.param __stack0_i32 int32
  ldarg.0
  ldarg.0
  brtrue.s l1
  ldc.i4.0
  br.s l2
l1:
  ldc.i4.1
l2:
  add
  ret
.end
";
    let body = translate_text(text, "Demo.Clash").unwrap();
    assert_eq!(
        join_blocks(&body),
        vec![
            (
                0,
                vec![
                    assign("__stack0_i32", "_arg___stack0_i32"),
                    Statement::Branch {
                        cond: "_arg___stack0_i32 != 0".to_string(),
                        target: 7
                    },
                ]
            ),
            (4, vec![assign("__stack1_i32", "0"), Statement::Goto(8)]),
            (7, vec![assign("__stack1_i32", "1")]),
            (8, vec![assign("__t0", "__stack0_i32 + __stack1_i32"), ret("__t0")]),
        ]
    );
    assert_eq!(body.temporaries, vec![Variable::new("__t0", "int32_t")]);
    assert_eq!(body.prototype(), "int32_t Demo_Clash(int32_t _arg___stack0_i32)");
}

// ---- Determinism and parallelism ----

#[test]
fn retranslation_is_identical() {
    let module = assemble(CHOOSE).unwrap();
    let first = translate_in(&module, "Demo.Choose", &TranslatorConfig::default()).unwrap();
    let second = translate_in(&module, "Demo.Choose", &TranslatorConfig::default()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn parallel_module_translation_matches_serial() {
    let text = [PICK, CHOOSE, SHAPES].concat();
    let module = assemble(&text).unwrap();
    let catalog = MemoryCatalog::from_module(&module);

    let serial = translate_module(
        &module,
        &catalog,
        &TranslatorConfig {
            jobs: 1,
            ..TranslatorConfig::default()
        },
    );
    let parallel = translate_module(
        &module,
        &catalog,
        &TranslatorConfig {
            jobs: 8,
            ..TranslatorConfig::default()
        },
    );
    assert_eq!(serial, parallel);
    assert_eq!(serial.len(), module.methods.len());
    // Demo.Down fails on its own; the rest translate.
    assert_eq!(serial.iter().filter(|r| r.is_err()).count(), 1);
}

#[test]
fn falling_off_the_end_is_malformed() {
    let text = ".method Demo.Fall void\n  nop\n.end\n";
    let err = translate_text(text, "Demo.Fall").unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::MalformedInput(DecodeError::FallsThroughEnd { at: 0 })
    );
}

// ---- Properties ----

mod properties {
    use super::*;
    use proptest::prelude::*;

    /// Binary int32 operators: add, sub, mul, and, or, xor.
    const INT32_OPS: [u8; 6] = [0x58, 0x59, 0x5A, 0x5F, 0x60, 0x61];

    fn ldc_i4(value: i32) -> Vec<u8> {
        let mut bytes = vec![0x20];
        bytes.extend_from_slice(&value.to_le_bytes());
        bytes
    }

    /// `ldc.i4 c0`, then `ldc.i4 c; op` per step, then `ret`.
    fn arb_straight_line() -> impl Strategy<Value = (Vec<u8>, usize)> {
        (
            any::<i32>(),
            prop::collection::vec((any::<i32>(), prop::sample::select(INT32_OPS.to_vec())), 0..12),
        )
            .prop_map(|(first, steps)| {
                let mut code = ldc_i4(first);
                for (value, op) in &steps {
                    code.extend(ldc_i4(*value));
                    code.push(*op);
                }
                code.push(0x2A);
                (code, steps.len())
            })
    }

    proptest! {
        /// Arbitrary bytes either translate or fail with an error; the
        /// translator never panics, and a success is reproducible.
        #[test]
        fn arbitrary_bytes_never_panic(code in prop::collection::vec(any::<u8>(), 0..48)) {
            let mut method = MethodBody::new("Demo.Fuzz", TypeDescriptor::Int32);
            method.code = code;
            let catalog = MemoryCatalog::from_module(&Module::new());
            let config = TranslatorConfig::default();
            if let Ok(body) = translate(&method, &catalog, &config) {
                prop_assert_eq!(translate(&method, &catalog, &config), Ok(body));
            }
        }

        /// Straight-line int32 arithmetic binds one temporary per operator
        /// and translates identically every time.
        #[test]
        fn straight_line_int32_bodies((code, ops) in arb_straight_line()) {
            let mut method = MethodBody::new("Demo.Arith", TypeDescriptor::Int32);
            method.code = code;
            let catalog = MemoryCatalog::from_module(&Module::new());
            let config = TranslatorConfig::default();
            let body = translate(&method, &catalog, &config).unwrap();

            prop_assert_eq!(body.blocks.len(), 1);
            prop_assert_eq!(body.temporaries.len(), ops);
            prop_assert!(body.stack_slots.is_empty());
            prop_assert_eq!(body.statements().count(), ops + 1);
            if ops > 0 {
                let result = ret(&format!("__t{}", ops - 1));
                prop_assert_eq!(body.statements().last(), Some(&result));
            }
            prop_assert_eq!(translate(&method, &catalog, &config), Ok(body));
        }
    }
}
