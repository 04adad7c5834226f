//! Method matching.
//!
//! # Responsibilities
//! - Compare request methods against declared ones, ignoring ASCII case
//! - Hold the precomputed set of methods an endpoint answers
//! - Render that set for the `Allow` header and the info endpoint

use axum::http::{HeaderValue, Method};

/// Returns true if the declared method answers the inbound one.
pub fn method_matches(declared: &Method, inbound: &Method) -> bool {
    declared.as_str().eq_ignore_ascii_case(inbound.as_str())
}

/// Methods an endpoint responds to, uppercased and in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportedMethods(Vec<Method>);

impl SupportedMethods {
    /// Collect the distinct methods, keeping the first occurrence of each.
    pub fn collect<'a>(methods: impl IntoIterator<Item = &'a Method>) -> Self {
        let mut set: Vec<Method> = Vec::new();
        for method in methods {
            if !set.iter().any(|m| method_matches(m, method)) {
                set.push(method.clone());
            }
        }
        Self(set)
    }

    pub fn contains(&self, method: &Method) -> bool {
        self.0.iter().any(|m| method_matches(m, method))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|m| m.as_str().to_string()).collect()
    }

    /// Value for the `Allow` header of a 405 response.
    pub fn allow_header(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.names().join(", ")).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_matching_ignores_case() {
        let get = Method::GET;
        let lower = Method::from_bytes(b"get").unwrap();
        assert!(method_matches(&get, &lower));
        assert!(!method_matches(&get, &Method::POST));
    }

    #[test]
    fn test_supported_methods_dedupe_in_order() {
        let lower_post = Method::from_bytes(b"post").unwrap();
        let methods = vec![Method::POST, Method::GET, lower_post];
        let set = SupportedMethods::collect(&methods);

        assert_eq!(set.names(), vec!["POST", "GET"]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.allow_header().unwrap(), "POST, GET");
    }
}
