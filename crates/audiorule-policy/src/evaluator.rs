//! Condition and function evaluation
//!
//! [`FunctionEvaluator`] resolves calls against the configuration store and
//! the live runtime, compares results, and expands action parameter
//! expressions. Evaluation failures never propagate: a condition that cannot
//! be evaluated is false, an expression that cannot be resolved stays as
//! written. Both are logged and counted.

use audiorule_core::symbols::to_number;
use audiorule_core::{Result, Runtime};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ConfigStore;
use crate::expression::{is_call_expression, Argument, Condition, FunctionCall, Operand, Operator};
use crate::function::{
    self, CallScope, Category, EvalFailure, EvalResult, Function, ResolvedCall, Selector, ValueType,
};
use crate::macros::MacroExpander;
use crate::trigger::Trigger;

/// Deepest nesting of calls inside call arguments
pub const MAX_CALL_DEPTH: usize = 8;

/// Evaluates conditions and parameter expressions for one engine
pub struct FunctionEvaluator {
    store: Arc<ConfigStore>,
    runtime: Arc<dyn Runtime>,
    macros: MacroExpander,
}

impl FunctionEvaluator {
    pub fn new(store: Arc<ConfigStore>, runtime: Arc<dyn Runtime>) -> Result<Self> {
        Ok(Self {
            store,
            runtime,
            macros: MacroExpander::new()?,
        })
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn runtime(&self) -> &dyn Runtime {
        self.runtime.as_ref()
    }

    /// True iff every condition holds; stops at the first false one
    pub fn evaluate_condition_set(&self, conditions: &[Condition], trigger: &Trigger) -> bool {
        conditions
            .iter()
            .all(|condition| self.evaluate_condition(condition, trigger))
    }

    /// Evaluate a single condition; any failure makes it false
    pub fn evaluate_condition(&self, condition: &Condition, trigger: &Trigger) -> bool {
        let left = match self.evaluate_call(&condition.left, trigger) {
            Ok(values) => values,
            Err(failure) => {
                record_failure(&failure, condition);
                return false;
            }
        };

        let right = match &condition.right {
            Operand::Literal(arg) if arg.quoted => arg.text.clone(),
            Operand::Literal(arg) => self.macros.expand(&arg.text, trigger),
            Operand::Call(call) => match self.evaluate_call(call, trigger) {
                Ok(values) => match values.into_iter().next() {
                    Some(value) => value,
                    None => {
                        debug!(%condition, "right-hand call produced no values");
                        return false;
                    }
                },
                Err(failure) => {
                    record_failure(&failure, condition);
                    return false;
                }
            },
        };

        let value_type = Function::from_name(&condition.left.function)
            .map(Function::value_type)
            .unwrap_or(ValueType::Text);

        match compare(condition.operator, value_type, &left, &right) {
            Ok(result) => {
                debug!(%condition, ?left, %right, result, "condition evaluated");
                result
            }
            Err(failure) => {
                record_failure(&failure, condition);
                false
            }
        }
    }

    /// Resolve arguments and run a call
    pub fn evaluate_call(&self, call: &FunctionCall, trigger: &Trigger) -> EvalResult {
        self.evaluate_nested(call, trigger, 0)
    }

    fn evaluate_nested(&self, call: &FunctionCall, trigger: &Trigger, depth: usize) -> EvalResult {
        if depth > MAX_CALL_DEPTH {
            return Err(EvalFailure::NotPossible(format!(
                "calls nested deeper than {} in '{}'",
                MAX_CALL_DEPTH, call
            )));
        }
        let function = Function::from_name(&call.function).ok_or_else(|| {
            EvalFailure::NotPossible(format!("unknown function '{}'", call.function))
        })?;
        let category = Category::from_name(&call.category).ok_or_else(|| {
            EvalFailure::NotPossible(format!("unknown category '{}'", call.category))
        })?;

        let mandatory = self.resolve_argument(&call.mandatory, trigger, depth)?;
        let optional = call
            .optional
            .iter()
            .map(|arg| self.resolve_argument(arg, trigger, depth))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let resolved = ResolvedCall {
            function,
            category,
            selector: Selector::parse(&mandatory, call.mandatory.quoted),
            optional,
        };
        let scope = CallScope {
            store: &self.store,
            runtime: self.runtime.as_ref(),
            trigger,
        };
        function::invoke(&scope, &resolved)
    }

    /// Resolve a string found in an action parameter.
    ///
    /// Text written as a call is evaluated and its values joined with spaces;
    /// on failure the original text is returned unchanged. Any other text
    /// only has its macros substituted.
    pub fn evaluate_parameter_expression(&self, text: &str, trigger: &Trigger) -> String {
        if !is_call_expression(text) {
            return self.macros.expand(text, trigger);
        }

        let result = FunctionCall::parse(text)
            .map_err(EvalFailure::from)
            .and_then(|call| self.evaluate_call(&call, trigger));
        match result {
            Ok(values) => values.join(" "),
            Err(failure) => {
                warn!(expression = %text, error = %failure, "parameter expression left unresolved");
                metrics::counter!("audiorule_condition_failures_total", "reason" => failure.reason())
                    .increment(1);
                text.to_string()
            }
        }
    }

    /// Quoted arguments are literal. A nested call is recognised from the
    /// written argument; macro values are substituted into leaves only and
    /// never parsed again.
    fn resolve_argument(
        &self,
        arg: &Argument,
        trigger: &Trigger,
        depth: usize,
    ) -> std::result::Result<String, EvalFailure> {
        if arg.quoted {
            return Ok(arg.text.clone());
        }
        if is_call_expression(&arg.text) {
            let call = FunctionCall::parse(&arg.text)?;
            Ok(self.evaluate_nested(&call, trigger, depth + 1)?.join(" "))
        } else {
            Ok(self.macros.expand(&arg.text, trigger))
        }
    }
}

fn record_failure(failure: &EvalFailure, condition: &Condition) {
    match failure {
        EvalFailure::NotFound(_) => debug!(%condition, error = %failure, "condition is false"),
        _ => warn!(%condition, error = %failure, "condition could not be evaluated"),
    }
    metrics::counter!("audiorule_condition_failures_total", "reason" => failure.reason()).increment(1);
}

/// Compare a left result set with a right value.
///
/// Membership operators test the set; numeric functions first translate a
/// symbolic right value. Ordering operators use the first left value,
/// lexically for textual functions and numerically otherwise.
pub fn compare(
    operator: Operator,
    value_type: ValueType,
    left: &[String],
    right: &str,
) -> std::result::Result<bool, EvalFailure> {
    if operator.is_membership() {
        let needle = match value_type {
            ValueType::Numeric => to_number(right)
                .map(|n| n.to_string())
                .unwrap_or_else(|| right.to_string()),
            ValueType::Text => right.to_string(),
        };
        let present = left.iter().any(|value| *value == needle);
        return Ok(match operator {
            Operator::Include => present,
            _ => !present,
        });
    }

    let Some(first) = left.first() else {
        return Ok(false);
    };
    match value_type {
        ValueType::Text => Ok(operator.accepts(first.as_str().cmp(right))),
        ValueType::Numeric => {
            let l = to_number(first)
                .ok_or_else(|| EvalFailure::TypeMismatch(format!("left value '{}' is not numeric", first)))?;
            let r = to_number(right)
                .ok_or_else(|| EvalFailure::TypeMismatch(format!("right value '{}' is not numeric", right)))?;
            Ok(operator.accepts(l.cmp(&r)))
        }
    }
}
