//! Constraint rules and the validator boundary.
//!
//! The dispatcher hands the validator the raw argument list, the rules declared
//! for the method, and the active wire format; it gets back a violation set, or
//! nothing. Constraint evaluation stays behind the [`ConstraintValidator`] trait
//! so an embedding application can swap in its own engine; [`RuleValidator`] is
//! the built-in one.

use courier_proto::{Violation, WireFormat};

/// A constraint attached to one declared parameter.
#[derive(Debug, Clone)]
pub enum Rule {
    /// The argument must not be null.
    Required,
    /// The argument must decode to a non-blank string.
    NotBlank,
    /// The argument must decode to a well-formed email address.
    Email,
    /// Application-supplied check over the encoded argument. Returned
    /// violations carry paths relative to the argument (e.g. `email`).
    Custom {
        /// Constraint name used in logs.
        name: &'static str,
        /// Check over the encoded argument bytes in the active format.
        check: fn(&[u8], WireFormat) -> Vec<Violation>,
    },
}

/// Binding of a [`Rule`] to a parameter index.
#[derive(Debug, Clone)]
pub struct ParamRule {
    /// Zero-based parameter index the rule applies to.
    pub param: usize,
    /// The constraint to evaluate.
    pub rule: Rule,
}

impl ParamRule {
    /// Binds `rule` to parameter `param`.
    pub fn new(param: usize, rule: Rule) -> Self {
        Self { param, rule }
    }
}

/// Boundary to the constraint engine: argument values + declared rules in,
/// violations (or nothing) out.
pub trait ConstraintValidator: Send + Sync {
    /// Evaluates `rules` against `args` encoded in `format`.
    fn validate(
        &self,
        args: &[Option<Vec<u8>>],
        rules: &[ParamRule],
        format: WireFormat,
    ) -> Vec<Violation>;
}

/// Built-in rule engine.
#[derive(Debug, Default)]
pub struct RuleValidator;

impl RuleValidator {
    /// Creates the default rule engine.
    pub fn new() -> Self {
        Self
    }
}

impl ConstraintValidator for RuleValidator {
    fn validate(
        &self,
        args: &[Option<Vec<u8>>],
        rules: &[ParamRule],
        format: WireFormat,
    ) -> Vec<Violation> {
        let mut violations = Vec::new();
        for bound in rules {
            let path = format!("arg{}", bound.param);
            let slot = args.get(bound.param).and_then(|a| a.as_deref());
            match &bound.rule {
                Rule::Required => {
                    if slot.is_none() {
                        violations.push(Violation::new(path, "must not be null"));
                    }
                }
                Rule::NotBlank => match slot {
                    None => violations.push(Violation::new(path, "must not be null")),
                    Some(bytes) => match format.decode::<String>(bytes) {
                        Ok(value) if value.trim().is_empty() => {
                            violations.push(Violation::new(path, "must not be blank"));
                        }
                        Ok(_) => {}
                        Err(e) => violations.push(Violation::new(path, e.to_string())),
                    },
                },
                // Null is acceptable here; pair with Required to also forbid it.
                Rule::Email => {
                    if let Some(bytes) = slot {
                        match format.decode::<String>(bytes) {
                            Ok(value) if !is_well_formed_email(&value) => {
                                violations.push(Violation::new(
                                    path,
                                    "must be a well-formed email address",
                                ));
                            }
                            Ok(_) => {}
                            Err(e) => violations.push(Violation::new(path, e.to_string())),
                        }
                    }
                }
                Rule::Custom { check, .. } => {
                    if let Some(bytes) = slot {
                        for violation in check(bytes, format) {
                            let nested = if violation.path.is_empty() {
                                path.clone()
                            } else {
                                format!("{}.{}", path, violation.path)
                            };
                            violations.push(Violation::new(nested, violation.message));
                        }
                    }
                }
            }
        }
        violations
    }
}

/// Minimal syntactic email check: one `@`, non-empty local part, dotted domain,
/// no whitespace.
fn is_well_formed_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = value.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = match parts.next() {
        Some(d) => d,
        None => return false,
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
