//! Entry points: programs bound to positional parameters

use crate::error::{Result, RuntimeError};
use crate::executor::Executor;
use formula_core::ir::{Program, SlotInfo};
use formula_core::types::{Type, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A program specialised into a callable taking one value per name
///
/// Every input slot the program reads must be named. Names the program
/// does not read are accepted and their values ignored.
#[derive(Debug, Clone)]
pub struct EntryPoint {
    program: Arc<Program>,
    names: Vec<String>,
    /// Position in `names` of each slot, in slot order
    positions: Vec<usize>,
    executor: Executor,
}

impl EntryPoint {
    /// Bind `program` with the default executor
    pub fn bind<S: AsRef<str>>(program: Program, names: &[S]) -> Result<Self> {
        Self::bind_with(Arc::new(program), names, Executor::default())
    }

    pub fn bind_with<S: AsRef<str>>(program: Arc<Program>, names: &[S], executor: Executor) -> Result<Self> {
        let names: Vec<String> = names.iter().map(|name| name.as_ref().to_string()).collect();
        let positions = program
            .slots
            .iter()
            .map(|slot| {
                names
                    .iter()
                    .position(|name| name == &slot.name)
                    .ok_or_else(|| RuntimeError::UnboundSlot(slot.name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Bound entry point ({}) reading {} slot(s)",
            names.join(", "),
            positions.len()
        );

        Ok(Self {
            program,
            names,
            positions,
            executor,
        })
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Parameter names, in call order
    pub fn parameters(&self) -> &[String] {
        &self.names
    }

    pub fn return_type(&self) -> &Type {
        &self.program.return_type
    }

    /// Evaluate with one value per parameter, in parameter order
    pub fn invoke(&self, args: &[Value]) -> Result<Value> {
        if args.len() != self.names.len() {
            return Err(RuntimeError::ArgumentCount {
                expected: self.names.len(),
                actual: args.len(),
            });
        }

        let slots = self
            .program
            .slots
            .iter()
            .zip(&self.positions)
            .map(|(slot, position)| Self::check(slot, &args[*position]))
            .collect::<Result<Vec<_>>>()?;

        self.executor.evaluate(&self.program, &slots)
    }

    /// Evaluate with values looked up by slot name
    pub fn invoke_named(&self, inputs: &HashMap<String, Value>) -> Result<Value> {
        let slots = self
            .program
            .slots
            .iter()
            .map(|slot| {
                let value = inputs
                    .get(&slot.name)
                    .ok_or_else(|| RuntimeError::UnboundSlot(slot.name.clone()))?;
                Self::check(slot, value)
            })
            .collect::<Result<Vec<_>>>()?;

        self.executor.evaluate(&self.program, &slots)
    }

    fn check(slot: &SlotInfo, value: &Value) -> Result<Value> {
        if value.ty() != slot.ty {
            return Err(RuntimeError::InputType {
                name: slot.name.clone(),
                expected: slot.ty.clone(),
                actual: value.ty(),
            });
        }
        Ok(value.clone())
    }
}
