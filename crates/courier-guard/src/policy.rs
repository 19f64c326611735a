//! Per-method guarded-call policy.
//!
//! A [`CallPolicy`] is composed explicitly for each registered method: the
//! constraint rules run first, then the bulkhead admission check. The returned
//! permit is held by the caller for the duration of the invocation so the slot
//! frees on every exit path. No interception framework is involved; the
//! dispatcher simply runs `enforce` before the handler.

use courier_proto::{Fault, InvocationRequest, WireFormat};
use tracing::debug;

use crate::bulkhead::{Bulkhead, BulkheadPermit};
use crate::validation::{ConstraintValidator, ParamRule, Rule};

/// Validation rules plus optional admission control for one registered method.
#[derive(Debug, Default)]
pub struct CallPolicy {
    rules: Vec<ParamRule>,
    bulkhead: Option<Bulkhead>,
}

impl CallPolicy {
    /// Creates an empty policy (no rules, no limiter).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constraint rule for a parameter.
    pub fn rule(mut self, param: usize, rule: Rule) -> Self {
        self.rules.push(ParamRule::new(param, rule));
        self
    }

    /// Guards the method with a bulkhead of `max_concurrent_calls` permits.
    pub fn bulkhead(mut self, max_concurrent_calls: u32) -> Self {
        self.bulkhead = Some(Bulkhead::new(max_concurrent_calls));
        self
    }

    /// Declared constraint rules.
    pub fn rules(&self) -> &[ParamRule] {
        &self.rules
    }

    /// The method's bulkhead, if guarded.
    pub fn limiter(&self) -> Option<&Bulkhead> {
        self.bulkhead.as_ref()
    }

    /// Runs the pre-invocation steps: constraint validation, then admission.
    ///
    /// Returns the permit to hold for the call (or `None` when the method is
    /// unguarded), or the fault that terminates the call. Validation failures
    /// short-circuit before the admission check so a rejected-invalid call
    /// never consumes a permit.
    pub fn enforce<'a>(
        &'a self,
        validator: &dyn ConstraintValidator,
        request: &InvocationRequest,
        format: WireFormat,
    ) -> Result<Option<BulkheadPermit<'a>>, Fault> {
        let violations = validator.validate(&request.args, &self.rules, format);
        if !violations.is_empty() {
            debug!(
                call = %request.qualified_name(),
                count = violations.len(),
                "constraint validation failed"
            );
            return Err(Fault::Validation { violations });
        }

        match &self.bulkhead {
            None => Ok(None),
            Some(bulkhead) => match bulkhead.try_acquire() {
                Some(permit) => Ok(Some(permit)),
                None => {
                    debug!(call = %request.qualified_name(), "bulkhead full");
                    Err(Fault::AdmissionRejected {
                        service: request.service.clone(),
                        method: request.method.clone(),
                        max_concurrent_calls: bulkhead.max_concurrent_calls(),
                    })
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::RuleValidator;

    fn request_with_args(args: Vec<Option<Vec<u8>>>) -> InvocationRequest {
        let signature: Vec<String> = args.iter().map(|_| "String".to_string()).collect();
        let refs: Vec<&str> = signature.iter().map(|s| s.as_str()).collect();
        InvocationRequest::new("TestService", "guarded", &refs, args)
    }

    #[test]
    fn test_empty_policy_admits() {
        let policy = CallPolicy::new();
        let request = request_with_args(vec![None]);
        let permit = policy
            .enforce(&RuleValidator, &request, WireFormat::Binary)
            .unwrap();
        assert!(permit.is_none());
    }

    #[test]
    fn test_validation_short_circuits_admission() {
        let policy = CallPolicy::new().rule(0, Rule::Required).bulkhead(1);
        let request = request_with_args(vec![None]);

        let fault = policy
            .enforce(&RuleValidator, &request, WireFormat::Binary)
            .unwrap_err();
        assert!(matches!(fault, Fault::Validation { .. }));
        // The rejected call must not have consumed a permit.
        assert_eq!(policy.limiter().unwrap().inflight(), 0);
    }

    #[test]
    fn test_admission_fault_names_the_method() {
        let format = WireFormat::Binary;
        let policy = CallPolicy::new().bulkhead(1);
        let request = request_with_args(vec![Some(format.encode(&"x".to_string()).unwrap())]);

        let permit = policy.enforce(&RuleValidator, &request, format).unwrap();
        assert!(permit.is_some());

        let fault = policy.enforce(&RuleValidator, &request, format).unwrap_err();
        match fault {
            Fault::AdmissionRejected {
                service,
                method,
                max_concurrent_calls,
            } => {
                assert_eq!(service, "TestService");
                assert_eq!(method, "guarded");
                assert_eq!(max_concurrent_calls, 1);
            }
            other => panic!("expected admission fault, got {other:?}"),
        }

        drop(permit);
        assert!(policy.enforce(&RuleValidator, &request, format).is_ok());
    }

    #[test]
    fn test_permit_released_on_drop() {
        let policy = CallPolicy::new().bulkhead(2);
        let request = request_with_args(vec![]);
        {
            let _p1 = policy.enforce(&RuleValidator, &request, WireFormat::Json).unwrap();
            let _p2 = policy.enforce(&RuleValidator, &request, WireFormat::Json).unwrap();
            assert_eq!(policy.limiter().unwrap().inflight(), 2);
        }
        assert_eq!(policy.limiter().unwrap().inflight(), 0);
    }
}
