#![no_main]

use std::sync::{Arc, OnceLock};

use libfuzzer_sys::fuzz_target;
use symtrace::prelude::*;

fn program() -> Arc<Program> {
    static PROGRAM: OnceLock<Arc<Program>> = OnceLock::new();
    PROGRAM
        .get_or_init(|| {
            let mut program = Program::builder();
            program.class(ClassDecl::new("app/Main").static_field("count", SymType::Int));
            let method = program
                .method("app/Main", "f", &["I", "[I"], "I", MethodFlags::STATIC)
                .unwrap();
            let mut body = MethodBody::builder(method);
            let entry = body.block("entry");
            let other = body.block("other");
            body.handler(entry, SymType::class("java/lang/Exception")).unwrap();
            body.value(entry, "%0", InstKind::Binary(BinaryOp::Add), SymType::Int)
                .unwrap()
                .value(entry, "%1", InstKind::Cmp(CmpOp::Lt), SymType::Bool)
                .unwrap()
                .inst(entry, "br", InstKind::Branch)
                .unwrap()
                .value(entry, "%2", InstKind::Call, SymType::Int)
                .unwrap()
                .value(entry, "%3", InstKind::ArrayLoad, SymType::Int)
                .unwrap()
                .value(
                    other,
                    "%4",
                    InstKind::Phi(vec![(entry, Value::Constant(Constant::Int(1)))]),
                    SymType::Int,
                )
                .unwrap()
                .inst(other, "ret", InstKind::Return)
                .unwrap();
            program.body(body.finish());
            Arc::new(program.build())
        })
        .clone()
}

fuzz_target!(|data: &[u8]| {
    if let Ok(events) = serde_json::from_slice::<Vec<TraceEvent>>(data) {
        if let Ok(state) = replay(program(), TranslatorConfig::default(), &events) {
            let _ = SymbolicStateSnapshot::capture(&state).to_json();
        }
    }
});
