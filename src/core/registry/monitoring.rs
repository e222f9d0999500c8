/*!
Monitoring hooks.

The registry holds at most one [`MonitoringClientFactory`]. Wrappers ask
it for a [`MonitoringClient`] per API when the keyset they wrap carries
annotations, and report every primitive call through that client.
*/

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{
    error::Result,
    keyset::KeyStatus,
    primitive_set::PrimitiveSet,
};

/// Receives one event per primitive call
pub trait MonitoringClient: Send + Sync {
    /// Successful call with the key `key_id` over `num_bytes` of input
    fn log(&self, key_id: u32, num_bytes: usize);

    /// Failed call
    fn log_failure(&self);
}

/// Creates monitoring clients
pub trait MonitoringClientFactory: Send + Sync {
    fn new_client(&self, context: &MonitoringContext) -> Result<Box<dyn MonitoringClient>>;
}

/// Key metadata exposed to monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoringKeyInfo {
    pub key_id: u32,
    pub status: KeyStatus,
    pub key_type_url: String,
}

/// Keyset metadata exposed to monitoring, never key material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoringKeysetInfo {
    pub annotations: HashMap<String, String>,
    pub keys: Vec<MonitoringKeyInfo>,
    pub primary_key_id: Option<u32>,
}

impl MonitoringKeysetInfo {
    pub fn from_primitive_set<P: ?Sized>(primitive_set: &PrimitiveSet<P>) -> Self {
        Self {
            annotations: primitive_set.annotations().clone(),
            keys: primitive_set
                .entries()
                .iter()
                .map(|entry| MonitoringKeyInfo {
                    key_id: entry.key_id(),
                    status: entry.status(),
                    key_type_url: entry.key_type_url().to_string(),
                })
                .collect(),
            primary_key_id: primitive_set.primary().map(|entry| entry.key_id()),
        }
    }
}

/// Which primitive and API a client reports on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoringContext {
    pub primitive: String,
    pub api_function: String,
    pub keyset_info: MonitoringKeysetInfo,
}

/// Client for `api_function` of a wrapped primitive set, if the set is
/// annotated and carries a factory
pub fn client_for<P: ?Sized>(
    primitive_set: &PrimitiveSet<P>,
    primitive: &str,
    api_function: &str,
) -> Result<Option<Box<dyn MonitoringClient>>> {
    let factory: &Arc<dyn MonitoringClientFactory> = match primitive_set.monitoring_factory() {
        Some(factory) if !primitive_set.annotations().is_empty() => factory,
        _ => return Ok(None),
    };
    let context = MonitoringContext {
        primitive: primitive.to_string(),
        api_function: api_function.to_string(),
        keyset_info: MonitoringKeysetInfo::from_primitive_set(primitive_set),
    };
    factory.new_client(&context).map(Some)
}

/// Monitoring for one API of a wrapped primitive. Inactive unless the
/// primitive set was annotated and carried a factory.
#[derive(Default)]
pub struct ApiMonitor {
    client: Option<Box<dyn MonitoringClient>>,
}

impl ApiMonitor {
    pub fn for_api<P: ?Sized>(primitive_set: &PrimitiveSet<P>, primitive: &str, api_function: &str) -> Result<Self> {
        Ok(Self {
            client: client_for(primitive_set, primitive, api_function)?,
        })
    }

    pub fn is_active(&self) -> bool {
        self.client.is_some()
    }

    pub fn log(&self, key_id: u32, num_bytes: usize) {
        if let Some(client) = &self.client {
            client.log(key_id, num_bytes);
        }
    }

    pub fn log_failure(&self) {
        if let Some(client) = &self.client {
            client.log_failure();
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Factory recording every context and event, shared across clients
    #[derive(Default, Clone)]
    pub(crate) struct RecordingFactory {
        pub(crate) contexts: Arc<Mutex<Vec<MonitoringContext>>>,
        pub(crate) events: Arc<Mutex<Vec<(String, Option<u32>)>>>,
    }

    struct RecordingClient {
        api: String,
        events: Arc<Mutex<Vec<(String, Option<u32>)>>>,
    }

    impl MonitoringClient for RecordingClient {
        fn log(&self, key_id: u32, _num_bytes: usize) {
            self.events.lock().unwrap().push((self.api.clone(), Some(key_id)));
        }

        fn log_failure(&self) {
            self.events.lock().unwrap().push((self.api.clone(), None));
        }
    }

    impl MonitoringClientFactory for RecordingFactory {
        fn new_client(&self, context: &MonitoringContext) -> Result<Box<dyn MonitoringClient>> {
            self.contexts.lock().unwrap().push(context.clone());
            Ok(Box::new(RecordingClient {
                api: context.api_function.clone(),
                events: self.events.clone(),
            }))
        }
    }
}
