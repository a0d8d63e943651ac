//! Virtual scheme → concrete scheme mapping table

use indexmap::IndexMap;

use crate::error::{AuthSchemeError, Result};

/// One virtual scheme and the two concrete schemes implementing it.
///
/// Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemeMapping {
    pub virtual_scheme: String,
    pub open_id_connect_scheme: String,
    pub cookie_scheme: String,
}

impl SchemeMapping {
    pub fn new(
        virtual_scheme: impl Into<String>,
        open_id_connect_scheme: impl Into<String>,
        cookie_scheme: impl Into<String>,
    ) -> Self {
        Self {
            virtual_scheme: virtual_scheme.into(),
            open_id_connect_scheme: open_id_connect_scheme.into(),
            cookie_scheme: cookie_scheme.into(),
        }
    }

    /// Both concrete schemes, cookie first.
    pub fn concrete_schemes(&self) -> [&str; 2] {
        [&self.cookie_scheme, &self.open_id_connect_scheme]
    }

    fn claims(&self, scheme: &str) -> bool {
        self.virtual_scheme == scheme
            || self.open_id_connect_scheme == scheme
            || self.cookie_scheme == scheme
    }
}

/// Registry of scheme mappings, keyed by virtual scheme.
///
/// Populated during startup, then shared read-only.
#[derive(Debug, Clone, Default)]
pub struct SchemeMappingRegistry {
    mappings: IndexMap<String, SchemeMapping>,
}

impl SchemeMappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping.
    ///
    /// Fails with `DuplicateScheme` when the virtual scheme is already
    /// registered or when any of the three names is already claimed by
    /// another mapping. The registry is left untouched on failure.
    pub fn add(&mut self, mapping: SchemeMapping) -> Result<()> {
        self.check_available(&mapping)?;
        self.mappings.insert(mapping.virtual_scheme.clone(), mapping);
        Ok(())
    }

    /// Fail with `DuplicateScheme` if `mapping` could not be added.
    pub fn check_available(&self, mapping: &SchemeMapping) -> Result<()> {
        if self.mappings.contains_key(&mapping.virtual_scheme) {
            return Err(AuthSchemeError::duplicate(&mapping.virtual_scheme));
        }

        for name in [
            &mapping.virtual_scheme,
            &mapping.open_id_connect_scheme,
            &mapping.cookie_scheme,
        ] {
            if self.mappings.values().any(|existing| existing.claims(name)) {
                return Err(AuthSchemeError::duplicate(name));
            }
        }
        Ok(())
    }

    /// Look up the mapping registered for `virtual_scheme`.
    pub fn resolve(&self, virtual_scheme: &str) -> Result<&SchemeMapping> {
        self.mappings
            .get(virtual_scheme)
            .ok_or_else(|| AuthSchemeError::not_found(virtual_scheme))
    }

    pub fn find_by_open_id_connect_scheme(&self, scheme: &str) -> Option<&SchemeMapping> {
        self.mappings
            .values()
            .find(|m| m.open_id_connect_scheme == scheme)
    }

    pub fn find_by_cookie_scheme(&self, scheme: &str) -> Option<&SchemeMapping> {
        self.mappings.values().find(|m| m.cookie_scheme == scheme)
    }

    pub fn contains(&self, virtual_scheme: &str) -> bool {
        self.mappings.contains_key(virtual_scheme)
    }

    /// Mappings in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &SchemeMapping> {
        self.mappings.values()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
