/*!
Primitive sets.

A [`PrimitiveSet`] holds one primitive per enabled key of a keyset,
together with the key id, output prefix and type URL it was built from.
Wrappers consume a set and turn it into a single primitive that picks
the primary entry for new outputs and searches entries by prefix when
checking existing ones.
*/

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{
    error::{Error, Result},
    keyset::{KeyStatus, KeysetKey, OutputPrefixType},
    registry::monitoring::MonitoringClientFactory,
};

/// One primitive together with the key metadata it was created from
pub struct Entry<P: ?Sized> {
    primitive: Box<P>,
    key_id: u32,
    status: KeyStatus,
    output_prefix_type: OutputPrefixType,
    identifier: Vec<u8>,
    key_type_url: String,
}

impl<P: ?Sized> Entry<P> {
    pub fn primitive(&self) -> &P {
        &self.primitive
    }

    pub fn key_id(&self) -> u32 {
        self.key_id
    }

    pub fn status(&self) -> KeyStatus {
        self.status
    }

    pub fn output_prefix_type(&self) -> OutputPrefixType {
        self.output_prefix_type
    }

    /// Output prefix of the key, empty for RAW keys
    pub fn identifier(&self) -> &[u8] {
        &self.identifier
    }

    pub fn key_type_url(&self) -> &str {
        &self.key_type_url
    }
}

/// Primitives of one keyset, in keyset order
pub struct PrimitiveSet<P: ?Sized> {
    entries: Vec<Entry<P>>,
    primary: Option<usize>,
    annotations: HashMap<String, String>,
    monitoring_factory: Option<Arc<dyn MonitoringClientFactory>>,
}

impl<P: ?Sized> Default for PrimitiveSet<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ?Sized> PrimitiveSet<P> {
    /// Create an empty set without annotations
    pub fn new() -> Self {
        Self::with_annotations(HashMap::new())
    }

    /// Create an empty set carrying monitoring annotations
    pub fn with_annotations(annotations: HashMap<String, String>) -> Self {
        Self {
            entries: Vec::new(),
            primary: None,
            annotations,
            monitoring_factory: None,
        }
    }

    /// Add the primitive built from `key`. Returns a handle usable with
    /// [`set_primary`](Self::set_primary).
    pub fn add_primitive(&mut self, primitive: Box<P>, key: &KeysetKey) -> Result<usize> {
        if key.status != KeyStatus::Enabled {
            return Err(Error::invalid_argument("The key must be ENABLED."));
        }
        self.entries.push(Entry {
            primitive,
            key_id: key.key_id,
            status: key.status,
            output_prefix_type: key.output_prefix_type,
            identifier: key.output_prefix(),
            key_type_url: key.key_data.type_url().to_string(),
        });
        Ok(self.entries.len() - 1)
    }

    /// Mark the entry behind `handle` as primary
    pub fn set_primary(&mut self, handle: usize) -> Result<()> {
        match self.entries.get(handle) {
            None => Err(Error::invalid_argument("The primary entry is not part of this set.")),
            Some(entry) if entry.status != KeyStatus::Enabled => {
                Err(Error::invalid_argument("Primary has to be enabled."))
            }
            Some(_) => {
                self.primary = Some(handle);
                Ok(())
            }
        }
    }

    pub fn primary(&self) -> Option<&Entry<P>> {
        self.primary.and_then(|index| self.entries.get(index))
    }

    /// Entries whose output prefix equals `identifier`
    pub fn entries_with_prefix<'a>(&'a self, identifier: &'a [u8]) -> impl Iterator<Item = &'a Entry<P>> + 'a {
        self.entries.iter().filter(move |entry| entry.identifier == identifier)
    }

    /// Entries of RAW keys
    pub fn raw_entries(&self) -> impl Iterator<Item = &Entry<P>> {
        self.entries_with_prefix(&[])
    }

    pub fn entries(&self) -> &[Entry<P>] {
        &self.entries
    }

    pub fn annotations(&self) -> &HashMap<String, String> {
        &self.annotations
    }

    pub fn monitoring_factory(&self) -> Option<&Arc<dyn MonitoringClientFactory>> {
        self.monitoring_factory.as_ref()
    }

    /// Factory wrappers use to create monitoring clients for this set
    pub fn set_monitoring_factory(&mut self, factory: Option<Arc<dyn MonitoringClientFactory>>) {
        self.monitoring_factory = factory;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::keyset::{KeyData, KeyMaterialType};

    fn key(id: u32, status: KeyStatus, prefix: OutputPrefixType) -> KeysetKey {
        KeysetKey::new(
            KeyData::new("type.A", vec![0; 4], KeyMaterialType::Symmetric),
            id,
            status,
            prefix,
        )
    }

    #[test]
    fn test_add_and_select_primary() {
        let mut set: PrimitiveSet<str> = PrimitiveSet::new();
        let first = set
            .add_primitive(Box::from("first"), &key(1, KeyStatus::Enabled, OutputPrefixType::Tink))
            .unwrap();
        let second = set
            .add_primitive(Box::from("second"), &key(2, KeyStatus::Enabled, OutputPrefixType::Raw))
            .unwrap();

        assert!(set.primary().is_none());
        set.set_primary(second).unwrap();
        assert_eq!(set.primary().unwrap().primitive(), "second");
        set.set_primary(first).unwrap();
        assert_eq!(set.primary().unwrap().key_id(), 1);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_disabled_keys_are_rejected() {
        let mut set: PrimitiveSet<str> = PrimitiveSet::new();
        let result = set.add_primitive(Box::from("x"), &key(1, KeyStatus::Disabled, OutputPrefixType::Tink));
        assert!(result.is_err());
        assert!(set.is_empty());
        assert!(set.set_primary(0).is_err());
    }

    #[test]
    fn test_prefix_lookup() {
        let mut set: PrimitiveSet<str> = PrimitiveSet::new();
        set.add_primitive(Box::from("tink"), &key(7, KeyStatus::Enabled, OutputPrefixType::Tink))
            .unwrap();
        set.add_primitive(Box::from("raw"), &key(8, KeyStatus::Enabled, OutputPrefixType::Raw))
            .unwrap();

        let tink_prefix = [0x01, 0, 0, 0, 7];
        let found: Vec<&str> = set.entries_with_prefix(&tink_prefix).map(|e| e.primitive()).collect();
        assert_eq!(found, vec!["tink"]);

        let raw: Vec<u32> = set.raw_entries().map(|e| e.key_id()).collect();
        assert_eq!(raw, vec![8]);
    }
}
