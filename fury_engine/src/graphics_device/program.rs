/// Shader programs and the registry passes resolve them from.
///
/// Programs are owned by an external registry queried by name; a pass
/// whose program cannot be found is skipped for the frame.

use std::sync::Arc;
use rustc_hash::FxHashMap;

/// Compiled shader program
pub trait Program: Send + Sync {
    fn name(&self) -> &str;
}

/// Name-based program lookup
pub trait ProgramRegistry {
    fn program(&self, name: &str) -> Option<Arc<dyn Program>>;
}

/// Simple in-memory registry
#[derive(Default)]
pub struct ProgramTable {
    programs: FxHashMap<String, Arc<dyn Program>>,
}

impl ProgramTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a program under its own name, replacing any previous entry
    pub fn register(&mut self, program: Arc<dyn Program>) {
        self.programs.insert(program.name().to_string(), program);
    }

    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Program>> {
        self.programs.remove(name)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

impl ProgramRegistry for ProgramTable {
    fn program(&self, name: &str) -> Option<Arc<dyn Program>> {
        self.programs.get(name).cloned()
    }
}
