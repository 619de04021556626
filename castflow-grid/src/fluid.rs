use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespaced fluid identity, e.g. `tfc:metal/copper`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FluidId(String);

impl FluidId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FluidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FluidId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluidStack {
    pub fluid: FluidId,
    pub amount: u32,
}

impl FluidStack {
    pub fn new(fluid: FluidId, amount: u32) -> Self {
        Self { fluid, amount }
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }
}

/// Whether a fill or drain only reports what would happen or actually moves fluid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluidAction {
    Simulate,
    Execute,
}
