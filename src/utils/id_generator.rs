//! Run identifier generation.

use uuid::Uuid;

/// Generates identifiers for workflow runs.
#[derive(Clone, Debug, Default)]
pub struct IdGenerator;

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// A fresh run id, e.g. `run_1f6e…`.
    #[must_use]
    pub fn generate_run_id(&self) -> String {
        format!("run_{}", Uuid::new_v4().simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_unique() {
        let generator = IdGenerator::new();
        assert_ne!(generator.generate_run_id(), generator.generate_run_id());
    }
}
