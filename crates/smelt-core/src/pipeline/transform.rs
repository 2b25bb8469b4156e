use crate::error::CoreError;
use crate::ir::Module;

/// Outcome of applying a transform: the (possibly rewritten) module and
/// whether anything actually changed.
pub struct TransformResult {
    pub module: Module,
    pub changed: bool,
}

/// Transform trait — a pass that rewrites IR modules.
///
/// Examples: scalar promotion (mem2reg), dead code elimination.
pub trait Transform {
    /// Name of this transform pass.
    fn name(&self) -> &str;

    /// Apply this transform to a module.
    fn apply(&self, module: Module) -> Result<TransformResult, CoreError>;
}

/// An ordered sequence of transforms to apply.
pub struct TransformPipeline {
    transforms: Vec<Box<dyn Transform>>,
    fixpoint: bool,
}

/// Upper bound on fixpoint rounds, in case a pass keeps reporting changes.
const MAX_FIXPOINT_ROUNDS: usize = 32;

impl TransformPipeline {
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
            fixpoint: false,
        }
    }

    pub fn add(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    /// When enabled, the whole sequence repeats until no pass reports a
    /// change.
    pub fn set_fixpoint(&mut self, fixpoint: bool) {
        self.fixpoint = fixpoint;
    }

    /// Run all transforms in order on the given module.
    pub fn run(&self, mut module: Module) -> Result<Module, CoreError> {
        for _ in 0..MAX_FIXPOINT_ROUNDS {
            let mut changed = false;
            for transform in &self.transforms {
                let result = transform.apply(module)?;
                module = result.module;
                changed |= result.changed;
            }
            if !self.fixpoint || !changed {
                break;
            }
        }
        Ok(module)
    }
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::new()
    }
}
