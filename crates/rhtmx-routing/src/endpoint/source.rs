/// Versioned endpoint collections
///
/// Readers take lock-free snapshots; `replace` publishes a whole new
/// collection atomically. A reader never observes a half-updated set.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::debug;

use super::Endpoint;

/// One published generation of endpoints
#[derive(Debug, Clone)]
pub struct EndpointCollection {
    pub version: u64,
    pub endpoints: Vec<Arc<Endpoint>>,
}

/// Holder of the current endpoint generation
///
/// # Examples
///
/// ```
/// use rhtmx_routing::constraint::ParameterPolicyResolver;
/// use rhtmx_routing::endpoint::{EndpointBuilder, EndpointDataSource};
///
/// let resolver = ParameterPolicyResolver::default();
/// let home = EndpointBuilder::from_template("").build(&resolver).unwrap();
///
/// let source = EndpointDataSource::new(vec![home]);
/// assert_eq!(source.snapshot().version, 1);
///
/// let next = source.replace(Vec::new());
/// assert_eq!(next, 2);
/// assert!(source.snapshot().endpoints.is_empty());
/// ```
#[derive(Debug)]
pub struct EndpointDataSource {
    current: ArcSwap<EndpointCollection>,
    writer: Mutex<()>,
}

impl EndpointDataSource {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self {
            current: ArcSwap::from_pointee(EndpointCollection {
                version: 1,
                endpoints: endpoints.into_iter().map(Arc::new).collect(),
            }),
            writer: Mutex::new(()),
        }
    }

    /// Current generation
    pub fn snapshot(&self) -> Arc<EndpointCollection> {
        self.current.load_full()
    }

    pub fn version(&self) -> u64 {
        self.current.load().version
    }

    /// Publishes a new generation and returns its version
    pub fn replace(&self, endpoints: Vec<Endpoint>) -> u64 {
        self.replace_shared(endpoints.into_iter().map(Arc::new).collect())
    }

    /// Like `replace`, reusing already shared endpoints
    pub fn replace_shared(&self, endpoints: Vec<Arc<Endpoint>>) -> u64 {
        let _guard = self.writer.lock();
        let version = self.current.load().version + 1;
        let count = endpoints.len();
        self.current
            .store(Arc::new(EndpointCollection { version, endpoints }));
        debug!(version, endpoints = count, "Published endpoint generation");
        version
    }
}

impl Default for EndpointDataSource {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
