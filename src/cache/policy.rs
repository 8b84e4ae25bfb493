//! TTL Policy Module
//!
//! Per-type default lifetimes and the tables that drive invalidation.

use std::collections::HashMap;

use crate::cache::ResourceType;
use crate::error::{CacheError, Result};

impl ResourceType {
    /// Default time-to-live in seconds.
    pub fn default_ttl(self) -> u64 {
        match self {
            ResourceType::Course => 300,
            ResourceType::Courses => 600,
            ResourceType::Module => 300,
            ResourceType::Lesson => 300,
            ResourceType::User => 900,
            ResourceType::Enrollment => 600,
            ResourceType::Analytics => 1800,
            ResourceType::Search => 300,
            ResourceType::Forum => 180,
            ResourceType::Version => 3600,
            ResourceType::Categories => 3600,
            ResourceType::Settings => 7200,
        }
    }

    /// List types whose cached collections may embed a resource of this type.
    ///
    /// Replaces suffix-based pluralization, which cannot express irregular
    /// plurals and would pair `categories` with nothing.
    pub fn list_types(self) -> &'static [ResourceType] {
        match self {
            ResourceType::Course => &[ResourceType::Courses],
            _ => &[],
        }
    }

    /// Page to re-render when every entry of this type is dropped.
    pub fn default_path(self) -> Option<&'static str> {
        match self {
            ResourceType::Course | ResourceType::Courses | ResourceType::Categories => {
                Some("/courses")
            }
            ResourceType::Forum => Some("/forum"),
            ResourceType::Analytics => Some("/analytics"),
            ResourceType::Settings => Some("/settings"),
            _ => None,
        }
    }
}

// == TTL Policy ==
/// Effective lifetime per resource type.
///
/// Starts from [`ResourceType::default_ttl`]; overrides are checked once, at
/// construction, so bad configuration stops startup instead of a request.
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    ttls: HashMap<ResourceType, u64>,
}

impl TtlPolicy {
    /// Applies `(type name, seconds)` overrides on top of the defaults.
    ///
    /// Fails on an unknown type name or a zero lifetime.
    pub fn with_overrides<I, S>(overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: AsRef<str>,
    {
        let mut policy = Self::default();
        for (name, secs) in overrides {
            let name = name.as_ref();
            let rtype: ResourceType = name.parse().map_err(|_| {
                CacheError::Configuration(format!("No TTL policy for resource type `{}`", name))
            })?;
            if secs == 0 {
                return Err(CacheError::Configuration(format!(
                    "TTL for `{}` must be greater than zero",
                    rtype
                )));
            }
            policy.ttls.insert(rtype, secs);
        }
        Ok(policy)
    }

    /// Lifetime in seconds for the given type.
    pub fn ttl_for(&self, resource: ResourceType) -> u64 {
        self.ttls
            .get(&resource)
            .copied()
            .unwrap_or_else(|| resource.default_ttl())
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            ttls: ResourceType::ALL
                .into_iter()
                .map(|rtype| (rtype, rtype.default_ttl()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_defaults() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl_for(ResourceType::Course), 300);
        assert_eq!(policy.ttl_for(ResourceType::Courses), 600);
        assert_eq!(policy.ttl_for(ResourceType::Forum), 180);
        assert_eq!(policy.ttl_for(ResourceType::Settings), 7200);
    }

    #[test]
    fn test_every_type_has_a_positive_ttl() {
        let policy = TtlPolicy::default();
        for rtype in ResourceType::ALL {
            assert!(policy.ttl_for(rtype) > 0, "{} has no TTL", rtype);
        }
    }

    #[test]
    fn test_overrides_apply() {
        let policy = TtlPolicy::with_overrides([("course", 30), ("USER", 60)]).unwrap();
        assert_eq!(policy.ttl_for(ResourceType::Course), 30);
        assert_eq!(policy.ttl_for(ResourceType::User), 60);
        assert_eq!(policy.ttl_for(ResourceType::Lesson), 300);
    }

    #[test]
    fn test_unknown_type_is_configuration_error() {
        let result = TtlPolicy::with_overrides([("lecture", 30)]);
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }

    #[test]
    fn test_zero_ttl_is_configuration_error() {
        let result = TtlPolicy::with_overrides([("course", 0)]);
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }

    #[test]
    fn test_course_lists_depend_on_course() {
        assert_eq!(ResourceType::Course.list_types(), &[ResourceType::Courses]);
        assert!(ResourceType::User.list_types().is_empty());
    }

    #[test]
    fn test_default_paths() {
        assert_eq!(ResourceType::Course.default_path(), Some("/courses"));
        assert_eq!(ResourceType::User.default_path(), None);
    }
}
