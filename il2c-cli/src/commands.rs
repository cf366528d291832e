//! CLI command implementations.

use std::collections::BTreeSet;
use std::fs;

use il2c_common::Module;
use il2c_translator::{
    translate_module, DebugInformation, FunctionBody, MemoryCatalog, TranslateError,
    TranslatorConfig, TypeCatalog, TypeNameFlags,
};
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Headers every translation unit needs for fixed-width integers, `bool`
/// and `NULL`.
const PRELUDE: [&str; 3] = ["stdbool.h", "stddef.h", "stdint.h"];

/// Options accepted after the input file.
#[derive(Debug, Default)]
struct Options {
    debug: DebugInformation,
    jobs: Option<usize>,
    method: Option<String>,
    verbose: bool,
}

fn parse_options(args: &[String]) -> Result<Options, i32> {
    let mut options = Options::default();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let mut value = |name: &str| {
            iter.next().cloned().ok_or_else(|| {
                eprintln!("error: {name} requires a value");
                1
            })
        };
        match flag.as_str() {
            "--debug" => {
                options.debug = value("--debug")?.parse().map_err(|e| {
                    eprintln!("error: {e}");
                    1
                })?;
            }
            "--jobs" => {
                let text = value("--jobs")?;
                let jobs = text.parse().map_err(|_| {
                    eprintln!("error: invalid job count '{text}'");
                    1
                })?;
                options.jobs = Some(jobs);
            }
            "--method" => options.method = Some(value("--method")?),
            "--verbose" | "-v" => options.verbose = true,
            other => {
                eprintln!("error: unknown option '{other}'");
                return Err(1);
            }
        }
    }
    Ok(options)
}

/// Install the stderr log subscriber. `RUST_LOG` applies unless
/// `--verbose` asks for debug output.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn read_module(input: &str) -> Result<Module, i32> {
    let text = fs::read_to_string(input).map_err(|e| {
        eprintln!("error: cannot read '{input}': {e}");
        1
    })?;
    il2c_assembler::assemble(&text).map_err(|e| {
        eprintln!("error: {input}: {e}");
        1
    })
}

/// Translate the methods of an assembly text file and print a C unit.
pub fn translate(args: &[String]) -> Result<(), i32> {
    if args.is_empty() {
        eprintln!("error: translate requires an input file");
        eprintln!("Usage: il2c translate <input.il> [--debug LEVEL] [--jobs N] [--method NAME]");
        return Err(1);
    }

    let input = &args[0];
    let options = parse_options(&args[1..])?;
    init_logging(options.verbose);

    let mut module = read_module(input)?;
    let catalog = MemoryCatalog::from_module(&module);

    if let Some(name) = &options.method {
        match module.methods.iter().find(|m| &m.name == name) {
            None => {
                eprintln!("error: no method named '{name}'");
                return Err(1);
            }
            Some(method) if method.native.is_some() => {
                eprintln!("error: '{name}' is bound to a native function");
                return Err(1);
            }
            Some(_) => module.methods.retain(|m| &m.name == name),
        }
    }

    let mut config = TranslatorConfig {
        debug_information: options.debug,
        ..TranslatorConfig::default()
    };
    if let Some(jobs) = options.jobs {
        config.jobs = jobs;
    }
    info!(input = %input, methods = module.methods.len(), jobs = config.jobs, "translating");

    let (bodies, errors): (Vec<_>, Vec<_>) = translate_module(&module, &catalog, &config)
        .into_iter()
        .partition(Result::is_ok);
    let bodies: Vec<FunctionBody> = bodies.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<TranslateError> = errors.into_iter().filter_map(Result::err).collect();
    debug!(translated = bodies.len(), failed = errors.len(), "done");

    print!("{}", render_unit(&module, &catalog, &bodies));

    if errors.is_empty() {
        Ok(())
    } else {
        for e in &errors {
            eprintln!("error: {e}");
        }
        Err(2)
    }
}

/// A C translation unit: includes, class and static field declarations,
/// prototypes, then definitions.
fn render_unit(module: &Module, catalog: &MemoryCatalog, bodies: &[FunctionBody]) -> String {
    let mut includes: BTreeSet<&str> = PRELUDE.into_iter().collect();
    for body in bodies {
        includes.extend(body.includes.iter().map(String::as_str));
    }

    let mut out = String::new();
    for header in &includes {
        out.push_str(&format!("#include <{header}>\n"));
    }

    if !module.classes.is_empty() {
        out.push('\n');
        for class in &module.classes {
            let name = catalog.mangled_name(&class.name);
            out.push_str(&format!("typedef struct {name} {name};\n"));
        }
    }

    let statics: Vec<_> = module.fields.iter().filter(|f| f.is_static).collect();
    if !statics.is_empty() {
        out.push('\n');
        for field in statics {
            out.push_str(&format!(
                "extern {} {}_{};\n",
                catalog.target_type_name(&field.ty, TypeNameFlags::default()),
                catalog.mangled_name(&field.declaring_type),
                catalog.mangled_name(&field.name)
            ));
        }
    }

    if !bodies.is_empty() {
        out.push('\n');
        for body in bodies {
            out.push_str(&format!("{};\n", body.prototype()));
        }
    }
    for body in bodies {
        out.push('\n');
        out.push_str(&body.to_string());
    }
    out
}

/// Print the canonical listing of an assembly text file.
pub fn listing(args: &[String]) -> Result<(), i32> {
    if args.is_empty() {
        eprintln!("error: listing requires an input file");
        eprintln!("Usage: il2c listing <input.il>");
        return Err(1);
    }

    let input = &args[0];
    let module = read_module(input)?;
    let text = il2c_assembler::disassemble(&module).map_err(|e| {
        eprintln!("error: {e}");
        1
    })?;
    print!("{text}");
    Ok(())
}

/// Disassemble a file holding one raw method body.
pub fn disassemble(args: &[String]) -> Result<(), i32> {
    if args.is_empty() {
        eprintln!("error: disassemble requires an input file");
        eprintln!("Usage: il2c disassemble <body.bin>");
        return Err(1);
    }

    let input = &args[0];
    let code = fs::read(input).map_err(|e| {
        eprintln!("error: cannot read '{input}': {e}");
        1
    })?;
    let text = il2c_assembler::disassemble_code(&code, &Module::new()).map_err(|e| {
        eprintln!("error: {input}: {e}");
        1
    })?;
    print!("{text}");
    Ok(())
}
