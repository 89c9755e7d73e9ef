//! Program fixtures for the translator tests.
//!
//! Every fixture method lives in [`MAIN`]. Instruction names follow the instrumentation's
//! convention: value-producing instructions are named after their result (`%x`), the others
//! get a short label (`br`, `ret`).

use std::sync::Arc;

use crate::{
    descriptor::RuntimeValue,
    program::{
        BinaryOp, BodyBuilder, CmpOp, InstKind, LambdaBase, Method, MethodBody, MethodFlags,
        Program, ProgramBuilder, UnaryOp, Value,
    },
    term::Term,
    types::{ClassDecl, SymType},
};

/// Owner class of all fixture methods.
pub const MAIN: &str = "app/Main";

/// Owner class of the static counter field.
pub const COUNTER: &str = "app/Counter";

pub fn local(name: &str, ty: SymType) -> Value {
    Value::Local {
        name: name.to_string(),
        ty,
    }
}

pub fn argument(index: usize, ty: SymType) -> Value {
    Value::Argument { index, ty }
}

pub fn object(id: u64, class: &str) -> RuntimeValue {
    RuntimeValue::object(id, class, Vec::new())
}

pub fn int_array(id: u64, elements: &[i32]) -> RuntimeValue {
    RuntimeValue::array(
        id,
        SymType::Int,
        elements.iter().map(|value| RuntimeValue::Int(*value)).collect(),
    )
}

fn define(
    program: &mut ProgramBuilder,
    name: &str,
    args: &[&str],
    ret: &str,
    build: impl FnOnce(&mut BodyBuilder),
) -> Arc<Method> {
    let method = program
        .method(MAIN, name, args, ret, MethodFlags::STATIC)
        .unwrap();
    let mut body = MethodBody::builder(method.clone()).with_source("Main.java");
    build(&mut body);
    program.body(body.finish());
    method
}

/// The fixture program.
///
/// | Method                           | Shape                                              |
/// |----------------------------------|----------------------------------------------------|
/// | `abs(I)I`                        | compare, branch, negate, phi                       |
/// | `run(I)I`, `inc(I)I`             | instrumented call with a returned value            |
/// | `lib(Ljava/util/List;)I`         | call into uninstrumented code                      |
/// | `callback(I)I`                   | entered from uninstrumented code                   |
/// | `alloc(I)[I`, `get([II)I`        | array allocation and access                        |
/// | `guarded(I)I`                    | throw caught in the same method                    |
/// | `bump()V`                        | static field load and store                        |
/// | `adder(I)Ljava/lang/Object;`     | lambda creation                                    |
/// | `pick(I)V`                       | lookup and table switches                          |
/// | `sync(Ljava/lang/Object;)V`      | monitors                                           |
/// | `same(Ljava/lang/String;...)V`   | reference comparison of two strings                |
/// | `outer(I)I`                      | calls under an `Exception` handler                 |
/// | `inner(I)I`                      | throw under `IllegalStateException` and `Exception` |
/// | `leaky(I)I`                      | throw without a handler                            |
pub fn program() -> Arc<Program> {
    let mut program = Program::builder();
    program.class(ClassDecl::new(MAIN));
    program.class(ClassDecl::new(COUNTER).static_field("count", SymType::Int));

    define(&mut program, "abs", &["I"], "I", |body| {
        let entry = body.block("entry");
        let negative = body.block("negative");
        let positive = body.block("positive");
        let exit = body.block("exit");
        body.value(entry, "%c", InstKind::Cmp(CmpOp::Lt), SymType::Bool)
            .unwrap()
            .inst(entry, "br", InstKind::Branch)
            .unwrap()
            .value(negative, "%n", InstKind::Unary(UnaryOp::Neg), SymType::Int)
            .unwrap()
            .inst(negative, "j1", InstKind::Jump)
            .unwrap()
            .inst(positive, "j2", InstKind::Jump)
            .unwrap();
        let incomings = vec![
            (negative, local("%n", SymType::Int)),
            (positive, argument(0, SymType::Int)),
        ];
        body.value(exit, "%r", InstKind::Phi(incomings), SymType::Int)
            .unwrap()
            .inst(exit, "ret", InstKind::Return)
            .unwrap();
    });

    define(&mut program, "run", &["I"], "I", |body| {
        let entry = body.block("entry");
        body.value(entry, "%x", InstKind::Binary(BinaryOp::Mul), SymType::Int)
            .unwrap()
            .value(entry, "%v", InstKind::Call, SymType::Int)
            .unwrap()
            .value(entry, "%w", InstKind::Binary(BinaryOp::Add), SymType::Int)
            .unwrap()
            .inst(entry, "ret", InstKind::Return)
            .unwrap();
    });

    define(&mut program, "inc", &["I"], "I", |body| {
        let entry = body.block("entry");
        body.value(entry, "%s", InstKind::Binary(BinaryOp::Add), SymType::Int)
            .unwrap()
            .inst(entry, "ret", InstKind::Return)
            .unwrap();
    });

    define(&mut program, "lib", &["Ljava/util/List;"], "I", |body| {
        let entry = body.block("entry");
        body.value(entry, "%a", InstKind::Call, SymType::Int)
            .unwrap()
            .value(entry, "%b", InstKind::Binary(BinaryOp::Add), SymType::Int)
            .unwrap()
            .inst(entry, "ret", InstKind::Return)
            .unwrap();
    });

    define(&mut program, "callback", &["I"], "I", |body| {
        let entry = body.block("entry");
        body.value(entry, "%q", InstKind::Binary(BinaryOp::Mul), SymType::Int)
            .unwrap()
            .inst(entry, "ret", InstKind::Return)
            .unwrap();
    });

    define(&mut program, "alloc", &["I"], "[I", |body| {
        let entry = body.block("entry");
        body.value(entry, "%arr", InstKind::NewArray, SymType::array(SymType::Int))
            .unwrap()
            .inst(entry, "ret", InstKind::Return)
            .unwrap();
    });

    define(&mut program, "get", &["[I", "I"], "I", |body| {
        let entry = body.block("entry");
        body.value(entry, "%e", InstKind::ArrayLoad, SymType::Int)
            .unwrap()
            .inst(entry, "st", InstKind::ArrayStore)
            .unwrap()
            .inst(entry, "ret", InstKind::Return)
            .unwrap();
    });

    define(&mut program, "guarded", &["I"], "I", |body| {
        let protected = body.block("try");
        let handler = body.block("handler");
        body.handler(protected, SymType::class("java/lang/RuntimeException"))
            .unwrap();
        body.value(protected, "%x", InstKind::Binary(BinaryOp::Add), SymType::Int)
            .unwrap()
            .value(
                protected,
                "%ex",
                InstKind::New,
                SymType::class("java/lang/IllegalStateException"),
            )
            .unwrap()
            .inst(protected, "thr", InstKind::Throw)
            .unwrap()
            .value(
                handler,
                "%caught",
                InstKind::Catch(SymType::class("java/lang/RuntimeException")),
                SymType::class("java/lang/RuntimeException"),
            )
            .unwrap()
            .inst(handler, "ret", InstKind::Return)
            .unwrap();
    });

    define(&mut program, "bump", &[], "V", |body| {
        let entry = body.block("entry");
        body.value(entry, "%c0", InstKind::FieldLoad, SymType::Int)
            .unwrap()
            .value(entry, "%c1", InstKind::Binary(BinaryOp::Add), SymType::Int)
            .unwrap()
            .inst(entry, "st", InstKind::FieldStore)
            .unwrap()
            .inst(entry, "ret", InstKind::Return)
            .unwrap();
    });

    let lambda = program
        .method(MAIN, "lambda$adder$0", &["I", "I"], "I", MethodFlags::STATIC)
        .unwrap();
    let sum = Term::binary_typed(
        SymType::Int,
        BinaryOp::Add,
        Term::argument(SymType::Int, 0),
        Term::argument(SymType::Int, 1),
    )
    .unwrap();
    define(&mut program, "adder", &["I"], "Ljava/lang/Object;", |body| {
        let entry = body.block("entry");
        let base = LambdaBase {
            method: lambda,
            body: Some(sum),
        };
        body.value(entry, "%f", InstKind::InvokeDynamic(base), SymType::object())
            .unwrap()
            .inst(entry, "ret", InstKind::Return)
            .unwrap();
    });

    define(&mut program, "pick", &["I"], "V", |body| {
        let entry = body.block("entry");
        body.inst(entry, "sw", InstKind::Switch(vec![1, 2]))
            .unwrap()
            .inst(entry, "tsw", InstKind::TableSwitch { min: 0, max: 3 })
            .unwrap()
            .inst(entry, "ret", InstKind::Return)
            .unwrap();
    });

    define(&mut program, "sync", &["Ljava/lang/Object;"], "V", |body| {
        let entry = body.block("entry");
        body.inst(entry, "me", InstKind::EnterMonitor)
            .unwrap()
            .inst(entry, "mx", InstKind::ExitMonitor)
            .unwrap()
            .inst(entry, "ret", InstKind::Return)
            .unwrap();
    });

    define(
        &mut program,
        "same",
        &["Ljava/lang/String;", "Ljava/lang/String;"],
        "V",
        |body| {
            let entry = body.block("entry");
            body.value(entry, "%c", InstKind::Cmp(CmpOp::Eq), SymType::Bool)
                .unwrap()
                .inst(entry, "br", InstKind::Branch)
                .unwrap()
                .inst(entry, "ret", InstKind::Return)
                .unwrap();
        },
    );

    let exception = SymType::class("java/lang/Exception");
    let illegal_state = SymType::class("java/lang/IllegalStateException");

    define(&mut program, "outer", &["I"], "I", |body| {
        let protected = body.block("try");
        let handler = body.block("handler");
        body.handler(protected, exception.clone()).unwrap();
        body.value(protected, "%v", InstKind::Call, SymType::Int)
            .unwrap()
            .inst(protected, "ret", InstKind::Return)
            .unwrap()
            .value(handler, "%oc", InstKind::Catch(exception.clone()), exception.clone())
            .unwrap()
            .inst(handler, "oret", InstKind::Return)
            .unwrap();
    });

    define(&mut program, "inner", &["I"], "I", |body| {
        let protected = body.block("try");
        let specific = body.block("specific");
        let general = body.block("general");
        body.handler(protected, exception.clone())
            .unwrap()
            .handler(protected, illegal_state.clone())
            .unwrap();
        body.value(protected, "%y", InstKind::Binary(BinaryOp::Add), SymType::Int)
            .unwrap()
            .value(protected, "%ex", InstKind::New, illegal_state.clone())
            .unwrap()
            .inst(protected, "thr", InstKind::Throw)
            .unwrap()
            .value(
                specific,
                "%ic",
                InstKind::Catch(illegal_state.clone()),
                illegal_state.clone(),
            )
            .unwrap()
            .inst(specific, "ret", InstKind::Return)
            .unwrap()
            .value(general, "%ec", InstKind::Catch(exception.clone()), exception.clone())
            .unwrap()
            .inst(general, "eret", InstKind::Return)
            .unwrap();
    });

    define(&mut program, "leaky", &["I"], "I", |body| {
        let entry = body.block("entry");
        body.value(entry, "%ex", InstKind::New, illegal_state.clone())
            .unwrap()
            .inst(entry, "thr", InstKind::Throw)
            .unwrap();
    });

    Arc::new(program.build())
}
