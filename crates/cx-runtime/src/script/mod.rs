mod builtins;
mod rhai_engine;
mod rng;

pub use rhai_engine::RhaiScriptEngine;

use cx_core::{CodexError, CxValue, StateMap};

/// The embedded interpreter as seen by the story engine.
///
/// The interpreter owns every piece of mutable story state. Failures come back
/// as `Err` with a `SCRIPT_*` code; callers decide whether they are fatal.
pub trait ScriptEngine {
    /// Runs statements against the global namespace and returns the value of
    /// the last expression (or an explicit `return`).
    fn execute(&mut self, code: &str) -> Result<CxValue, CodexError>;

    /// Evaluates a single expression, as if it were `return <expr>`.
    fn evaluate(&mut self, expr: &str) -> Result<CxValue, CodexError>;

    /// Reads a global binding. Unbound names read as nil.
    fn get_global(&self, name: &str) -> Result<CxValue, CodexError>;

    fn set_global(&mut self, name: &str, value: CxValue) -> Result<(), CodexError>;

    /// Every global binding whose value can cross the boundary.
    fn get_all_globals(&self) -> StateMap;

    fn has_function(&self, name: &str) -> bool;

    /// Defines a callable whose body runs with full access to the globals and
    /// sees `params` as locals.
    fn define_function(
        &mut self,
        name: &str,
        params: &[String],
        body: &str,
    ) -> Result<(), CodexError>;

    fn call_function(&mut self, name: &str, args: &[CxValue]) -> Result<CxValue, CodexError>;

    /// Installs the story helper routines (dice and container helpers).
    fn install_builtins(&mut self) -> Result<(), CodexError>;

    fn is_ready(&self) -> bool {
        true
    }

    /// Dice generator state, for engines that have one.
    fn rng_state(&self) -> Option<u32> {
        None
    }

    fn set_rng_state(&mut self, _state: u32) {}
}
