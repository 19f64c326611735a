#![warn(missing_docs)]

//! Courier guard subsystem: bulkhead admission control, the constraint-rule model
//! with its validator boundary, and the per-method guarded-call policy that
//! composes both around an invocation.

pub mod bulkhead;
pub mod policy;
pub mod validation;

pub use bulkhead::{Bulkhead, BulkheadPermit, BulkheadStats};
pub use policy::CallPolicy;
pub use validation::{ConstraintValidator, ParamRule, Rule, RuleValidator};
