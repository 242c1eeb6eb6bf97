use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use cx_core::{CodexError, CxValue, SourceLocation, StateMap};
use rhai::{Dynamic, Engine, EvalAltResult, ParseError, Scope, AST};

use super::builtins::register_builtins;
use super::rng::seed_from_clock;
use super::ScriptEngine;
use crate::helpers::rhai_bridge::{cxvalue_to_dynamic, dynamic_to_cxvalue};

const SCRIPT_LOG_TARGET: &str = "codex::script";

/// Host-defined callable: a compiled body run directly against the global
/// scope with its parameters pushed as locals. Rhai `fn` definitions cannot
/// see the scope, so events and hooks are stored this way instead.
struct Procedure {
    params: Vec<String>,
    body: AST,
}

/// [`ScriptEngine`] backed by a persistent Rhai scope.
///
/// Top-level `let` bindings and assignments land in the scope and survive
/// between calls. Script `fn` definitions accumulate in `library` and are
/// visible to every later call.
pub struct RhaiScriptEngine {
    engine: Engine,
    scope: Scope<'static>,
    library: AST,
    procedures: BTreeMap<String, Procedure>,
    rng_state: Rc<RefCell<u32>>,
    builtins_installed: bool,
}

impl Default for RhaiScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RhaiScriptEngine {
    pub fn new() -> Self {
        Self::with_seed(seed_from_clock())
    }

    pub fn with_seed(seed: u32) -> Self {
        let mut engine = Engine::new();
        engine.on_print(|text| log::info!(target: SCRIPT_LOG_TARGET, "{}", text));
        engine.on_debug(|text, source, position| match source {
            Some(source) => {
                log::debug!(target: SCRIPT_LOG_TARGET, "{} @ {}:{}", text, source, position)
            }
            None => log::debug!(target: SCRIPT_LOG_TARGET, "{} @ {}", text, position),
        });

        Self {
            engine,
            scope: Scope::new(),
            library: AST::default(),
            procedures: BTreeMap::new(),
            rng_state: Rc::new(RefCell::new(seed)),
            builtins_installed: false,
        }
    }

    fn compile(&self, code: &str) -> Result<AST, CodexError> {
        self.engine.compile(code).map_err(compile_error)
    }

    fn eval_in_scope(&mut self, ast: &AST) -> Result<CxValue, CodexError> {
        let script = self.library.merge(ast);
        let value = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut self.scope, &script)
            .map_err(runtime_error)?;
        dynamic_to_cxvalue(value)
    }

    fn call_procedure(&mut self, name: &str, args: &[CxValue]) -> Result<CxValue, CodexError> {
        let Some(procedure) = self.procedures.get(name) else {
            return Err(function_not_found(name));
        };
        let script = self.library.merge(&procedure.body);

        let mark = self.scope.len();
        for (index, param) in procedure.params.iter().enumerate() {
            let value = args.get(index).map(cxvalue_to_dynamic).unwrap_or(Dynamic::UNIT);
            self.scope.push_dynamic(param.clone(), value);
        }
        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut self.scope, &script);
        self.scope.rewind(mark);

        dynamic_to_cxvalue(result.map_err(runtime_error)?)
    }

    fn has_script_function(&self, name: &str) -> bool {
        self.library
            .iter_functions()
            .any(|function| function.name == name)
    }
}

impl ScriptEngine for RhaiScriptEngine {
    fn execute(&mut self, code: &str) -> Result<CxValue, CodexError> {
        log::debug!("execute: {}", code.trim());
        let ast = self.compile(code)?;
        self.library = self.library.merge(&ast.clone_functions_only());
        let result = self.eval_in_scope(&ast);
        compact_scope(&mut self.scope);
        result
    }

    fn evaluate(&mut self, expr: &str) -> Result<CxValue, CodexError> {
        log::debug!("evaluate: {}", expr.trim());
        let ast = self
            .engine
            .compile_expression(expr)
            .map_err(compile_error)?;
        self.eval_in_scope(&ast)
    }

    fn get_global(&self, name: &str) -> Result<CxValue, CodexError> {
        match self.scope.get_value::<Dynamic>(name) {
            Some(value) => dynamic_to_cxvalue(value),
            None => Ok(CxValue::Nil),
        }
    }

    fn set_global(&mut self, name: &str, value: CxValue) -> Result<(), CodexError> {
        if self.scope.is_constant(name) == Some(true) {
            return Err(CodexError::new(
                "SCRIPT_CONSTANT",
                format!("Global \"{}\" is a constant and cannot be assigned.", name),
            ));
        }
        self.scope
            .set_value(name.to_string(), cxvalue_to_dynamic(&value));
        Ok(())
    }

    fn get_all_globals(&self) -> StateMap {
        let mut globals = StateMap::new();
        for (name, _, value) in self.scope.iter_raw() {
            match dynamic_to_cxvalue(value.clone()) {
                Ok(value) => {
                    globals.insert(name.to_string(), value);
                }
                Err(error) => log::debug!("skipping global \"{}\": {}", name, error),
            }
        }
        globals
    }

    fn has_function(&self, name: &str) -> bool {
        self.procedures.contains_key(name) || self.has_script_function(name)
    }

    fn define_function(
        &mut self,
        name: &str,
        params: &[String],
        body: &str,
    ) -> Result<(), CodexError> {
        log::debug!("define: {}({})", name, params.join(", "));
        let body = self.compile(body)?;
        self.procedures.insert(
            name.to_string(),
            Procedure {
                params: params.to_vec(),
                body,
            },
        );
        Ok(())
    }

    fn call_function(&mut self, name: &str, args: &[CxValue]) -> Result<CxValue, CodexError> {
        log::debug!("call: {} with {} argument(s)", name, args.len());
        if self.procedures.contains_key(name) {
            return self.call_procedure(name, args);
        }
        if !self.has_script_function(name) {
            return Err(function_not_found(name));
        }
        let args = args.iter().map(cxvalue_to_dynamic).collect::<Vec<_>>();
        let value = self
            .engine
            .call_fn::<Dynamic>(&mut self.scope, &self.library, name, args)
            .map_err(runtime_error)?;
        dynamic_to_cxvalue(value)
    }

    fn install_builtins(&mut self) -> Result<(), CodexError> {
        if !self.builtins_installed {
            register_builtins(&mut self.engine, &self.rng_state);
            self.builtins_installed = true;
        }
        Ok(())
    }

    fn rng_state(&self) -> Option<u32> {
        Some(*self.rng_state.borrow())
    }

    fn set_rng_state(&mut self, state: u32) {
        *self.rng_state.borrow_mut() = state;
    }
}

/// Drops shadowed entries left behind by repeated top-level `let`s so the
/// scope holds one binding per name.
fn compact_scope(scope: &mut Scope<'static>) {
    // `iter_raw` walks newest first.
    let mut bindings = scope.iter_raw().collect::<Vec<_>>();
    bindings.reverse();

    let mut last_index = HashMap::new();
    for (index, (name, _, _)) in bindings.iter().enumerate() {
        last_index.insert(*name, index);
    }
    if last_index.len() == bindings.len() {
        return;
    }

    let mut compacted = Scope::new();
    for (index, (name, constant, value)) in bindings.iter().enumerate() {
        if last_index.get(name) != Some(&index) {
            continue;
        }
        if *constant {
            compacted.push_constant_dynamic(name.to_string(), (*value).clone());
        } else {
            compacted.push_dynamic(name.to_string(), (*value).clone());
        }
    }
    *scope = compacted;
}

fn compile_error(error: ParseError) -> CodexError {
    let position = error.position();
    let message = format!("Script compile failed: {}", error);
    match (position.line(), position.position()) {
        (Some(line), Some(column)) => {
            CodexError::with_location("SCRIPT_COMPILE", message, SourceLocation { line, column })
        }
        _ => CodexError::new("SCRIPT_COMPILE", message),
    }
}

fn runtime_error(error: Box<EvalAltResult>) -> CodexError {
    CodexError::new("SCRIPT_RUNTIME", format!("Script eval failed: {}", error))
}

fn function_not_found(name: &str) -> CodexError {
    CodexError::new(
        "SCRIPT_FUNCTION_NOT_FOUND",
        format!("Function \"{}\" is not defined.", name),
    )
}

#[cfg(test)]
mod rhai_engine_tests {
    use super::*;

    fn engine() -> RhaiScriptEngine {
        let mut engine = RhaiScriptEngine::with_seed(1);
        engine.install_builtins().expect("builtins");
        engine
    }

    #[test]
    fn globals_persist_between_calls() {
        let mut engine = engine();
        engine
            .set_global("gold", CxValue::Int(10))
            .expect("set gold");
        engine.execute("gold += 5; let found = true;").expect("run");
        assert_eq!(
            engine.get_global("gold").expect("gold"),
            CxValue::Int(15)
        );
        assert_eq!(
            engine.get_global("found").expect("found"),
            CxValue::Bool(true)
        );
        assert_eq!(engine.get_global("nobody").expect("unbound"), CxValue::Nil);
    }

    #[test]
    fn evaluate_returns_expression_value_and_reports_errors() {
        let mut engine = engine();
        assert_eq!(engine.evaluate("1 + 1").expect("sum"), CxValue::Int(2));
        let error = engine.evaluate("no_such_var").expect_err("unbound var");
        assert_eq!(error.code, "SCRIPT_RUNTIME");
        let error = engine.evaluate("1 +").expect_err("bad syntax");
        assert_eq!(error.code, "SCRIPT_COMPILE");
    }

    #[test]
    fn execute_returns_explicit_return_value() {
        let mut engine = engine();
        assert_eq!(
            engine.execute("let x = 3; return x * 2;").expect("return"),
            CxValue::Int(6)
        );
    }

    #[test]
    fn repeated_lets_do_not_grow_the_scope() {
        let mut engine = engine();
        engine.execute("let first = \"a\";").expect("first");
        for round in 1..=5 {
            engine
                .execute(&format!("let seen = {};", round))
                .expect("let");
        }
        engine.execute("let first = \"b\";").expect("shadow");
        assert_eq!(engine.scope.len(), 2);
        assert_eq!(engine.get_global("seen").expect("seen"), CxValue::Int(5));
        assert_eq!(engine.get_global("first").expect("first"), CxValue::from("b"));
        let names = engine
            .scope
            .iter()
            .map(|(name, _, _)| name.to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["seen".to_string(), "first".to_string()]);
    }

    #[test]
    fn procedures_see_globals_and_keep_params_local() {
        let mut engine = engine();
        engine
            .set_global("gold", CxValue::Int(1))
            .expect("set gold");
        engine
            .define_function(
                "event_pay",
                &["amount".to_string()],
                "gold += amount; let note = \"paid\"; return note + \" \" + amount;",
            )
            .expect("define");
        assert!(engine.has_function("event_pay"));
        let result = engine
            .call_function("event_pay", &[CxValue::Int(4)])
            .expect("call");
        assert_eq!(result, CxValue::from("paid 4"));
        assert_eq!(engine.get_global("gold").expect("gold"), CxValue::Int(5));
        assert_eq!(engine.get_global("amount").expect("param"), CxValue::Nil);
        assert_eq!(engine.get_global("note").expect("local"), CxValue::Nil);
    }

    #[test]
    fn missing_arguments_bind_as_unit() {
        let mut engine = engine();
        engine
            .define_function("event_greet", &["who".to_string()], "type_of(who)")
            .expect("define");
        assert_eq!(
            engine.call_function("event_greet", &[]).expect("call"),
            CxValue::from("()")
        );
    }

    #[test]
    fn script_functions_from_execute_are_callable() {
        let mut engine = engine();
        engine
            .execute("fn double(x) { x * 2 }")
            .expect("define fn");
        assert!(engine.has_function("double"));
        assert_eq!(engine.evaluate("double(21)").expect("eval"), CxValue::Int(42));
        assert_eq!(
            engine
                .call_function("double", &[CxValue::Int(5)])
                .expect("call"),
            CxValue::Int(10)
        );
        let error = engine.call_function("triple", &[]).expect_err("missing");
        assert_eq!(error.code, "SCRIPT_FUNCTION_NOT_FOUND");
    }

    #[test]
    fn constants_cannot_be_overwritten_from_the_host() {
        let mut engine = engine();
        engine.execute("const LIMIT = 3;").expect("const");
        let error = engine
            .set_global("LIMIT", CxValue::Int(4))
            .expect_err("constant");
        assert_eq!(error.code, "SCRIPT_CONSTANT");
    }

    #[test]
    fn get_all_globals_lists_bridgeable_bindings() {
        let mut engine = engine();
        engine
            .execute(r#"fn helper() {} let bag = ["torch"]; let hp = 3; let f = Fn("helper");"#)
            .expect("run");
        let globals = engine.get_all_globals();
        assert_eq!(globals.get("bag"), Some(&CxValue::from(vec!["torch"])));
        assert_eq!(globals.get("hp"), Some(&CxValue::Int(3)));
        assert!(!globals.contains_key("f"));
    }

    #[test]
    fn builtins_are_available_after_install() {
        let mut engine = engine();
        let roll = engine.evaluate("d(6)").expect("d");
        let roll = roll.as_number().expect("number");
        assert!((1.0..=6.0).contains(&roll));
        let advanced = engine.rng_state().expect("rng state");
        assert_ne!(advanced, 1);

        let next = engine.evaluate("d(1000)").expect("next roll");
        engine.set_rng_state(advanced);
        assert_eq!(engine.evaluate("d(1000)").expect("replayed roll"), next);
    }
}
