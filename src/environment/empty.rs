use std::collections::BTreeMap;

use super::Environment;

/// A static rectangular arena with no goal.
#[derive(Debug, Clone)]
pub struct EmptyEnvironment {
    dimensions: (f64, f64),
}

impl EmptyEnvironment {
    pub fn new(dimensions: (f64, f64)) -> Self {
        Self { dimensions }
    }
}

impl Default for EmptyEnvironment {
    fn default() -> Self {
        Self::new(super::default_dimensions())
    }
}

impl Environment for EmptyEnvironment {
    fn name(&self) -> &str {
        "EmptyEnvironment"
    }

    fn dimensions(&self) -> (f64, f64) {
        self.dimensions
    }

    fn update(&mut self) {}

    fn info(&self) -> BTreeMap<String, f64> {
        BTreeMap::new()
    }
}
