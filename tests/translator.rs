//! End-to-end translation of a small banking program: virtual dispatch, field access,
//! exceptions unwinding across frames, replay of recorded events and state snapshots.

use std::sync::Arc;

use symtrace::prelude::*;

const BANK: &str = "app/Bank";
const ACCOUNT: &str = "app/Account";
const SAVINGS: &str = "app/Savings";
const ISE: &str = "java/lang/IllegalStateException";

fn program() -> Arc<Program> {
    let mut program = Program::builder();
    program.class(ClassDecl::new(ACCOUNT).field("balance", SymType::Int));
    program.class(ClassDecl::new(SAVINGS).extends(ACCOUNT));
    program.class(ClassDecl::new(BANK));
    program
        .method(ACCOUNT, "withdraw", &["I"], "I", MethodFlags::empty())
        .unwrap();

    let transfer = program
        .method(BANK, "transfer", &["Lapp/Account;", "I"], "I", MethodFlags::STATIC)
        .unwrap();
    let mut body = MethodBody::builder(transfer).with_source("Bank.java");
    let protected = body.block("try");
    let handler = body.block("handler");
    body.handler(protected, SymType::class(ISE)).unwrap();
    body.value(protected, "%r", InstKind::Call, SymType::Int)
        .unwrap()
        .inst(protected, "ret", InstKind::Return)
        .unwrap()
        .value(handler, "%ex", InstKind::Catch(SymType::class(ISE)), SymType::class(ISE))
        .unwrap()
        .inst(handler, "ret2", InstKind::Return)
        .unwrap();
    program.body(body.finish());

    let withdraw = program
        .method(SAVINGS, "withdraw", &["I"], "I", MethodFlags::empty())
        .unwrap();
    let mut body = MethodBody::builder(withdraw).with_source("Savings.java");
    let entry = body.block("entry");
    let deny = body.block("deny");
    let allow = body.block("allow");
    body.at_line(12);
    body.value(entry, "%bal", InstKind::FieldLoad, SymType::Int)
        .unwrap()
        .value(entry, "%ok", InstKind::Cmp(CmpOp::Ge), SymType::Bool)
        .unwrap()
        .inst(entry, "br", InstKind::Branch)
        .unwrap()
        .value(deny, "%e", InstKind::New, SymType::class(ISE))
        .unwrap()
        .inst(deny, "thr", InstKind::Throw)
        .unwrap()
        .value(allow, "%nb", InstKind::Binary(BinaryOp::Sub), SymType::Int)
        .unwrap()
        .inst(allow, "st", InstKind::FieldStore)
        .unwrap()
        .inst(allow, "ret", InstKind::Return)
        .unwrap();
    program.body(body.finish());

    Arc::new(program.build())
}

fn savings(balance: i32) -> RuntimeValue {
    RuntimeValue::object(
        1,
        SAVINGS,
        vec![("balance".to_string(), RuntimeValue::Int(balance))],
    )
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

/// Events of `transfer(account, 30)` on an account holding `balance`, up to the point where
/// the withdrawal either returned or threw.
fn transfer_events(balance: i32) -> Vec<TraceEvent> {
    let account = savings(balance);
    let mut events = vec![
        TraceEvent::MethodEnter {
            class: BANK.to_string(),
            method: "transfer".to_string(),
            arg_types: strings(&["Lapp/Account;", "I"]),
            ret_type: "I".to_string(),
            instance: None,
            args: vec![account.clone(), RuntimeValue::Int(30)],
        },
        TraceEvent::Call {
            inst: "%r".to_string(),
            class: ACCOUNT.to_string(),
            method: "withdraw".to_string(),
            arg_types: strings(&["I"]),
            ret_type: "I".to_string(),
            return_value: Some("%r".to_string()),
            callee: Some("arg$0".to_string()),
            arguments: strings(&["arg$1"]),
            concrete_arguments: vec![RuntimeValue::Int(30)],
        },
        TraceEvent::MethodEnter {
            class: SAVINGS.to_string(),
            method: "withdraw".to_string(),
            arg_types: strings(&["I"]),
            ret_type: "I".to_string(),
            instance: Some(account.clone()),
            args: vec![RuntimeValue::Int(30)],
        },
        TraceEvent::FieldLoad {
            value: "%bal".to_string(),
            owner: Some("this".to_string()),
            class: SAVINGS.to_string(),
            field: "balance".to_string(),
            ty: "I".to_string(),
            concrete_value: RuntimeValue::Int(balance),
            concrete_owner: account.clone(),
        },
        TraceEvent::Cmp {
            value: "%ok".to_string(),
            lhv: "%bal".to_string(),
            rhv: "arg$0".to_string(),
            concrete_lhv: RuntimeValue::Int(balance),
            concrete_rhv: RuntimeValue::Int(30),
        },
        TraceEvent::Branch {
            inst: "br".to_string(),
            condition: "%ok".to_string(),
        },
    ];

    if balance >= 30 {
        let remaining = RuntimeValue::Int(balance - 30);
        events.extend([
            TraceEvent::Binary {
                value: "%nb".to_string(),
                lhv: "%bal".to_string(),
                rhv: "arg$0".to_string(),
                concrete_value: remaining.clone(),
                concrete_lhv: RuntimeValue::Int(balance),
                concrete_rhv: RuntimeValue::Int(30),
            },
            TraceEvent::FieldStore {
                inst: "st".to_string(),
                owner: Some("this".to_string()),
                class: SAVINGS.to_string(),
                field: "balance".to_string(),
                ty: "I".to_string(),
                value: "%nb".to_string(),
                concrete_value: remaining.clone(),
                concrete_owner: account,
            },
            TraceEvent::Ret {
                inst: "ret".to_string(),
                return_value: Some("%nb".to_string()),
                concrete_value: remaining.clone(),
            },
            TraceEvent::Ret {
                inst: "ret".to_string(),
                return_value: Some("%r".to_string()),
                concrete_value: remaining,
            },
        ]);
    } else {
        let exception = RuntimeValue::object(2, ISE, Vec::new());
        events.extend([
            TraceEvent::New {
                value: "%e".to_string(),
            },
            TraceEvent::Throwing {
                inst: "thr".to_string(),
                exception: "%e".to_string(),
                concrete_exception: exception.clone(),
            },
            TraceEvent::Catch {
                exception: "%ex".to_string(),
                concrete_exception: exception,
            },
        ]);
    }
    events
}

/// The allowed withdrawal, driven through the collector interface directly.
fn translate_allowed(collector: &mut dyn InstructionTraceCollector) {
    let account = savings(100);
    let thirty = RuntimeValue::Int(30);
    let seventy = RuntimeValue::Int(70);
    collector
        .method_enter(BANK, "transfer", &["Lapp/Account;", "I"], "I", None, &[account.clone(), thirty.clone()])
        .unwrap();
    collector
        .call("%r", ACCOUNT, "withdraw", &["I"], "I", Some("%r"), Some("arg$0"), &["arg$1"], &[thirty.clone()])
        .unwrap();
    collector
        .method_enter(SAVINGS, "withdraw", &["I"], "I", Some(&account), &[thirty.clone()])
        .unwrap();
    collector
        .field_load("%bal", Some("this"), SAVINGS, "balance", "I", &RuntimeValue::Int(100), &account)
        .unwrap();
    collector
        .cmp("%ok", "%bal", "arg$0", &RuntimeValue::Int(100), &thirty)
        .unwrap();
    collector.branch("br", "%ok").unwrap();
    collector
        .binary("%nb", "%bal", "arg$0", &seventy, &RuntimeValue::Int(100), &thirty)
        .unwrap();
    collector
        .field_store("st", Some("this"), SAVINGS, "balance", "I", "%nb", &seventy, &account)
        .unwrap();
    collector.ret("ret", Some("%nb"), &seventy).unwrap();
    collector.ret("ret", Some("%r"), &seventy).unwrap();
}

fn predicates(state: &SymbolicState) -> Vec<String> {
    state
        .clauses
        .iter()
        .map(|clause| clause.predicate().to_string())
        .collect()
}

#[test]
fn virtual_call_is_inlined() {
    let mut translator = SymbolicTraceBuilder::new(program());
    translate_allowed(&mut translator);
    assert_eq!(translator.depth(), 0);
    assert_eq!(translator.phase(), TranslatorPhase::Idle);

    let state = translator.symbolic_state();
    assert_eq!(
        predicates(&state),
        vec![
            "@S %bal_0 = *(arg$0.balance)",
            "@S %ok_0 = (%bal_0 >= arg$1)",
            "@P %ok_0 = true",
            "@S %nb_0 = (%bal_0 - arg$1)",
            "@S *(arg$0.balance) = %nb_0",
            "@S %r_0 = %nb_0",
        ]
    );
    assert_eq!(state.path.len(), 1);
    assert_eq!(state.path.get(0).unwrap().ty, PathClauseType::ConditionCheck);

    let branch = state.clauses.get(2).unwrap();
    assert!(branch.is_path());
    assert_eq!(branch.instruction().method().class, SAVINGS);
    assert_eq!(branch.predicate().location().to_string(), "Savings.java:14");

    let result = Term::value(SymType::Int, "%r_0");
    assert_eq!(state.concrete_values.get(&result), Some(&Descriptor::Int(70)));
    assert_eq!(state.term_map.get(&result).unwrap().method.name, "transfer");
}

#[test]
fn exception_unwinds_to_caller_handler() {
    let program = program();
    let state = replay(program.clone(), TranslatorConfig::default(), &transfer_events(10)).unwrap();

    let last = state.clauses.get(state.clauses.len() - 1).unwrap();
    assert_eq!(last.predicate().kind(), PredicateKind::Catch);
    assert_eq!(last.predicate().operands()[0].name(), "%e_0");
    assert_eq!(last.instruction().method().name, "transfer");
    assert_eq!(
        state.path.get(0).unwrap().predicate.to_string(),
        "@P %ok_0 = false"
    );
    assert!(state
        .predicates()
        .iter()
        .any(|predicate| predicate.kind() == PredicateKind::Throw));
}

#[test]
fn replay_matches_direct_translation() {
    let program = program();
    let mut translator = SymbolicTraceBuilder::new(program.clone());
    translate_allowed(&mut translator);

    let replayed = replay(program, TranslatorConfig::default(), &transfer_events(100)).unwrap();
    assert_eq!(replayed, translator.symbolic_state());
}

#[test]
fn recorded_events_survive_json() {
    let events = transfer_events(100);
    let json = serde_json::to_string(&events).unwrap();
    let decoded: Vec<TraceEvent> = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, events);

    let program = program();
    assert_eq!(
        replay(program.clone(), TranslatorConfig::default(), &decoded).unwrap(),
        replay(program, TranslatorConfig::default(), &events).unwrap()
    );
}

#[test]
fn snapshot_restores_the_state() {
    let program = program();
    let state = replay(program.clone(), TranslatorConfig::default(), &transfer_events(10)).unwrap();

    let snapshot = SymbolicStateSnapshot::capture(&state);
    assert_eq!(snapshot.len(), state.clauses.len());
    let json = snapshot.to_json().unwrap();
    assert_eq!(SymbolicStateSnapshot::from(&state).to_json().unwrap(), json);

    let restored = SymbolicStateSnapshot::from_json(&json)
        .unwrap()
        .restore(&program)
        .unwrap();
    assert_eq!(restored, state);

    let empty = Arc::new(Program::builder().build());
    assert!(SymbolicStateSnapshot::from_json(&json)
        .unwrap()
        .restore(&empty)
        .is_err());
}

#[test]
fn traces_replay_in_parallel() {
    let program = program();
    let uncaught = vec![
        TraceEvent::MethodEnter {
            class: BANK.to_string(),
            method: "transfer".to_string(),
            arg_types: strings(&["Lapp/Account;", "I"]),
            ret_type: "I".to_string(),
            instance: None,
            args: vec![savings(0), RuntimeValue::Int(30)],
        },
        TraceEvent::Catch {
            exception: "%ex".to_string(),
            concrete_exception: RuntimeValue::object(3, "java/lang/NullPointerException", Vec::new()),
        },
    ];
    let traces = vec![transfer_events(100), transfer_events(10), uncaught];

    let results = replay_all(&program, TranslatorConfig::default(), &traces);
    assert_eq!(results.len(), 3);
    assert_eq!(
        results[0].as_ref().unwrap(),
        &replay(program.clone(), TranslatorConfig::default(), &traces[0]).unwrap()
    );
    assert!(results[1].is_ok());
    assert!(results[2].as_ref().unwrap_err().is_fatal());
}

#[test]
fn registry_drives_the_thread_translator() {
    let registry = CollectorRegistry::new();
    registry.register(Box::new(SymbolicTraceBuilder::new(program())));

    registry
        .with_current(|collector| translate_allowed(collector))
        .unwrap();
    assert_eq!(registry.current_state().unwrap().clauses.len(), 6);

    let detached = registry.detach_current().unwrap();
    assert_eq!(detached.lock().unwrap().symbolic_state().path.len(), 1);
    assert!(registry.current_state().unwrap().is_empty());
}
