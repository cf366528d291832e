//! il2c translator: CIL method bodies to C.
//!
//! Each method body is translated independently. Instructions run on a
//! symbolic evaluation stack whose entries are C expressions; every
//! computed value lands in a fresh temporary and control flow becomes
//! labelled blocks joined by `goto`.
//!
//! # Usage
//!
//! ```
//! use il2c_common::{MethodBody, Module, TypeDescriptor};
//! use il2c_translator::{translate, MemoryCatalog, TranslatorConfig};
//!
//! let mut method = MethodBody::new("Demo.Three", TypeDescriptor::Int32);
//! method.code = vec![0x17, 0x18, 0x58, 0x2A]; // ldc.i4.1; ldc.i4.2; add; ret
//!
//! let catalog = MemoryCatalog::from_module(&Module::new());
//! let body = translate(&method, &catalog, &TranslatorConfig::default()).unwrap();
//! assert!(body.to_string().contains("__t0 = 1 + 2;"));
//! ```
//!
//! # Modules
//!
//! 1. **frontier**: block leaders and the reachable-block worklist
//! 2. **stack**: symbolic stack, temporaries, join-point slots
//! 3. **promotion**: operand typing and C expression rules
//! 4. **handlers**: one handler per supported opcode
//! 5. **function**: the per-method state machine
//! 6. **body**: the translated function and its C rendering

pub mod body;
pub mod catalog;
pub mod config;
pub mod error;
pub mod frontier;
pub mod function;
pub mod handlers;
pub mod promotion;
pub mod stack;

pub use body::{BasicBlock, FunctionBody, Statement, Variable};
pub use catalog::{MemoryCatalog, MethodSignature, TypeCatalog, TypeNameFlags};
pub use config::{DebugInformation, TranslatorConfig};
pub use error::{ErrorKind, TranslateError};
pub use function::{FunctionTranslator, TranslatorState};

use il2c_common::{MethodBody, Module};
use rayon::prelude::*;
use tracing::{debug, warn};

/// Translate one method body.
pub fn translate(
    method: &MethodBody,
    catalog: &dyn TypeCatalog,
    config: &TranslatorConfig,
) -> Result<FunctionBody, TranslateError> {
    FunctionTranslator::new(catalog, config, method).translate()
}

/// Translate every method of `module` that has a body.
///
/// Natively bound methods are skipped. Work is spread over a pool of at
/// most `config.jobs` threads; results come back in method order, and a
/// failure in one method does not affect the others.
pub fn translate_module(
    module: &Module,
    catalog: &dyn TypeCatalog,
    config: &TranslatorConfig,
) -> Vec<Result<FunctionBody, TranslateError>> {
    let methods: Vec<&MethodBody> = module.methods.iter().filter(|m| m.native.is_none()).collect();
    if methods.is_empty() {
        return Vec::new();
    }

    let jobs = config.jobs.clamp(1, methods.len());
    debug!(methods = methods.len(), jobs, "translating module");
    let run = |method: &&MethodBody| translate(method, catalog, config);

    if jobs == 1 {
        return methods.iter().map(run).collect();
    }
    match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
        Ok(pool) => pool.install(|| methods.par_iter().map(run).collect()),
        Err(err) => {
            warn!(%err, "no thread pool, translating serially");
            methods.iter().map(run).collect()
        }
    }
}
