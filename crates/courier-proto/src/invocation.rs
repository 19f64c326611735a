//! Invocation request and result wire types.
//!
//! A request names the target service, method, and declared parameter-type
//! signature (the signature disambiguates overloads), and carries each argument
//! as codec-encoded bytes. `None` in the argument list encodes a null argument,
//! kept distinct from every encoded value. A result is either a success carrying
//! the encoded return value (`None` for void/null returns) or a fault.

use serde::{Deserialize, Serialize};

use crate::fault::Fault;

/// A single remote method call, built per invocation and consumed by one
/// request/response round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Target service identifier.
    pub service: String,
    /// Method name on the target service.
    pub method: String,
    /// Declared parameter type names, in order.
    pub signature: Vec<String>,
    /// Encoded arguments, in order. `None` is a null argument.
    pub args: Vec<Option<Vec<u8>>>,
}

impl InvocationRequest {
    /// Creates a request for `service.method` with the given signature and arguments.
    pub fn new(
        service: impl Into<String>,
        method: impl Into<String>,
        signature: &[&str],
        args: Vec<Option<Vec<u8>>>,
    ) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            signature: signature.iter().map(|s| s.to_string()).collect(),
            args,
        }
    }

    /// Number of declared parameters.
    pub fn arity(&self) -> usize {
        self.signature.len()
    }

    /// Registry key of the method within its service: `method(type1,type2)`.
    pub fn method_key(&self) -> String {
        method_key(&self.method, &self.signature)
    }

    /// Fully qualified name used in logs and fault messages.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.service, self.method_key())
    }
}

/// Builds the registry key for a method name and parameter-type signature.
pub fn method_key<S: AsRef<str>>(method: &str, signature: &[S]) -> String {
    let mut key = String::with_capacity(method.len() + 2 + signature.len() * 8);
    key.push_str(method);
    key.push('(');
    for (i, ty) in signature.iter().enumerate() {
        if i > 0 {
            key.push(',');
        }
        key.push_str(ty.as_ref());
    }
    key.push(')');
    key
}

/// Outcome of one remote invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InvocationResult {
    /// The target method completed; `value` holds the encoded return value,
    /// or `None` for void and null returns.
    Success {
        /// Encoded return value.
        value: Option<Vec<u8>>,
    },
    /// The call failed; the fault classifies how.
    Fault {
        /// The failure, classified.
        fault: Fault,
    },
}

impl InvocationResult {
    /// Creates a success result carrying an encoded value.
    pub fn success(value: Vec<u8>) -> Self {
        InvocationResult::Success { value: Some(value) }
    }

    /// Creates a success result with no value (void or null return).
    pub fn null() -> Self {
        InvocationResult::Success { value: None }
    }

    /// Creates a fault result.
    pub fn fault(fault: Fault) -> Self {
        InvocationResult::Fault { fault }
    }

    /// Returns true if the invocation completed without a fault.
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationResult::Success { .. })
    }

    /// Converts into the encoded return value or the fault.
    pub fn into_value(self) -> Result<Option<Vec<u8>>, Fault> {
        match self {
            InvocationResult::Success { value } => Ok(value),
            InvocationResult::Fault { fault } => Err(fault),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_key_formats_signature() {
        let req = InvocationRequest::new(
            "TestService",
            "countAndAdd",
            &["List<String>", "i32"],
            vec![None, None],
        );
        assert_eq!(req.method_key(), "countAndAdd(List<String>,i32)");
        assert_eq!(req.qualified_name(), "TestService.countAndAdd(List<String>,i32)");
        assert_eq!(req.arity(), 2);
    }

    #[test]
    fn test_method_key_zero_arity() {
        assert_eq!(method_key::<&str>("ping", &[]), "ping()");
    }

    #[test]
    fn test_null_arguments_distinct_from_empty() {
        let req = InvocationRequest::new("S", "m", &["String"], vec![Some(Vec::new())]);
        let null_req = InvocationRequest::new("S", "m", &["String"], vec![None]);
        assert_ne!(req, null_req);
    }

    #[test]
    fn test_result_into_value() {
        assert_eq!(
            InvocationResult::success(vec![1, 2]).into_value().unwrap(),
            Some(vec![1, 2])
        );
        assert_eq!(InvocationResult::null().into_value().unwrap(), None);

        let fault = Fault::remote("IllegalArgument", "boom");
        let err = InvocationResult::fault(fault.clone()).into_value().unwrap_err();
        assert_eq!(err, fault);
    }
}
