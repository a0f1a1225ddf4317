//! The recursion guard bounding expansion of self-referential structures.
//!
//! A [`NestingContext`] tracks, per structure path (for example
//! `Questionnaire.item`), how many times that structure is currently being
//! entered on the compilation call stack. The compiler consults
//! [`NestingContext::current_nesting_level`] before expanding a
//! content-referenced child and stops at the configured maximum, emitting
//! an absent value instead of recursing forever.
//!
//! The context is an explicit value threaded through the parser context —
//! no thread-locals. Scope discipline is enforced with drop guards, so
//! levels unwind correctly on every exit path, including panics.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Call-stack-scoped nesting tracker. One per top-level compilation;
/// never shared across concurrent compilations.
#[derive(Debug, Default)]
pub struct NestingContext {
    levels: RefCell<HashMap<String, usize>>,
    scope_active: Cell<bool>,
}

impl NestingContext {
    pub fn new() -> Self {
        NestingContext::default()
    }

    /// Opens the top-level compilation scope. Panics if a scope is already
    /// active on this context: compilations never nest, and attempting to
    /// open a second one is a programming error, not user input.
    pub fn enter_compilation(&self) -> CompilationScope<'_> {
        if self.scope_active.get() {
            panic!("a compilation scope is already active on this nesting context");
        }
        self.scope_active.set(true);
        CompilationScope { context: self }
    }

    /// How many times the given structure is currently open on the stack;
    /// zero when it is not being traversed at all.
    pub fn current_nesting_level(&self, structure: &str) -> usize {
        self.levels.borrow().get(structure).copied().unwrap_or(0)
    }

    /// Runs `body` with the structure's nesting level incremented,
    /// decrementing again on every exit path.
    pub fn with_definition<R>(&self, structure: &str, body: impl FnOnce() -> R) -> R {
        *self
            .levels
            .borrow_mut()
            .entry(structure.to_string())
            .or_insert(0) += 1;
        let _guard = NestingGuard { context: self, structure: structure.to_string() };
        body()
    }
}

/// Marks the top-level compilation as active; dropping it releases the
/// context for the next compilation.
pub struct CompilationScope<'a> {
    context: &'a NestingContext,
}

impl Drop for CompilationScope<'_> {
    fn drop(&mut self) {
        self.context.scope_active.set(false);
    }
}

struct NestingGuard<'a> {
    context: &'a NestingContext,
    structure: String,
}

impl Drop for NestingGuard<'_> {
    fn drop(&mut self) {
        let mut levels = self.context.levels.borrow_mut();
        if let Some(level) = levels.get_mut(&self.structure) {
            *level = level.saturating_sub(1);
            if *level == 0 {
                levels.remove(&self.structure);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_entries_report_exact_levels() {
        let context = NestingContext::new();
        assert_eq!(context.current_nesting_level("Questionnaire.item"), 0);
        context.with_definition("Questionnaire.item", || {
            assert_eq!(context.current_nesting_level("Questionnaire.item"), 1);
            context.with_definition("Questionnaire.item", || {
                assert_eq!(context.current_nesting_level("Questionnaire.item"), 2);
                // A different structure has its own counter.
                assert_eq!(context.current_nesting_level("Extension.extension"), 0);
            });
            assert_eq!(context.current_nesting_level("Questionnaire.item"), 1);
        });
        assert_eq!(context.current_nesting_level("Questionnaire.item"), 0);
    }

    #[test]
    fn level_unwinds_on_panic() {
        let context = NestingContext::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            context.with_definition("Questionnaire.item", || panic!("boom"))
        }));
        assert!(result.is_err());
        assert_eq!(context.current_nesting_level("Questionnaire.item"), 0);
    }

    #[test]
    #[should_panic(expected = "already active")]
    fn second_top_level_scope_fails() {
        let context = NestingContext::new();
        let _outer = context.enter_compilation();
        let _inner = context.enter_compilation();
    }

    #[test]
    fn scope_can_reopen_after_drop() {
        let context = NestingContext::new();
        drop(context.enter_compilation());
        drop(context.enter_compilation());
    }
}
