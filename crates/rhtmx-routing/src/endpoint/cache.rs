/// Per-generation compiled structures
///
/// A `GenerationCache` holds one structure derived from an endpoint
/// generation (a matcher, a link index) and rebuilds it when the source
/// publishes a newer version.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tracing::debug;

use super::source::{EndpointCollection, EndpointDataSource};

#[derive(Debug)]
struct Generation<T> {
    version: u64,
    value: Arc<T>,
}

/// Lazily rebuilt value keyed by endpoint generation
///
/// A reader that finds a stale value tries to take the rebuild lock without
/// blocking. While another rebuild is in flight it keeps using the previous
/// complete value; with nothing cached yet it builds a private copy.
#[derive(Debug)]
pub struct GenerationCache<T> {
    current: ArcSwapOption<Generation<T>>,
    rebuild: Mutex<()>,
}

impl<T> GenerationCache<T> {
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
            rebuild: Mutex::new(()),
        }
    }

    /// Value for the source's current generation
    ///
    /// A value compiled from a newer generation than the snapshot taken here
    /// is returned as is; the cache never moves back to an older version.
    pub fn get<F>(&self, source: &EndpointDataSource, build: F) -> Arc<T>
    where
        F: FnOnce(&EndpointCollection) -> T,
    {
        let snapshot = source.snapshot();
        let cached = self.current.load_full();

        if let Some(generation) = &cached {
            if generation.version >= snapshot.version {
                return Arc::clone(&generation.value);
            }
        }

        match self.rebuild.try_lock() {
            Some(_guard) => self.refresh(&snapshot, build),
            None => match cached {
                Some(generation) => Arc::clone(&generation.value),
                None => Arc::new(build(&snapshot)),
            },
        }
    }

    /// Rebuilds from `snapshot` unless the stored value is at least as new;
    /// callers hold the rebuild lock
    fn refresh<F>(&self, snapshot: &EndpointCollection, build: F) -> Arc<T>
    where
        F: FnOnce(&EndpointCollection) -> T,
    {
        if let Some(generation) = self.current.load_full() {
            if generation.version >= snapshot.version {
                return Arc::clone(&generation.value);
            }
        }

        let value = Arc::new(build(snapshot));
        self.current.store(Some(Arc::new(Generation {
            version: snapshot.version,
            value: Arc::clone(&value),
        })));
        debug!(
            version = snapshot.version,
            endpoints = snapshot.endpoints.len(),
            "Compiled routing structure for endpoint generation"
        );
        value
    }

    /// Version of the cached value, if any
    pub fn cached_version(&self) -> Option<u64> {
        self.current.load_full().map(|generation| generation.version)
    }
}

impl<T> Default for GenerationCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_rebuilds_only_on_new_version() {
        let source = EndpointDataSource::default();
        let cache: GenerationCache<usize> = GenerationCache::new();
        let builds = Cell::new(0);

        let build = |collection: &EndpointCollection| {
            builds.set(builds.get() + 1);
            collection.endpoints.len()
        };

        assert_eq!(*cache.get(&source, build), 0);
        assert_eq!(*cache.get(&source, build), 0);
        assert_eq!(builds.get(), 1);

        source.replace(Vec::new());
        cache.get(&source, build);
        assert_eq!(builds.get(), 2);
        assert_eq!(cache.cached_version(), Some(2));
    }

    #[test]
    fn test_stale_snapshot_keeps_newer_value() {
        let source = EndpointDataSource::default();
        let cache: GenerationCache<u64> = GenerationCache::new();
        let builds = Cell::new(0);

        let build = |collection: &EndpointCollection| {
            builds.set(builds.get() + 1);
            collection.version
        };

        let stale = source.snapshot();
        source.replace(Vec::new());
        assert_eq!(*cache.get(&source, build), 2);

        let _guard = cache.rebuild.lock();
        assert_eq!(*cache.refresh(&stale, build), 2);
        assert_eq!(cache.cached_version(), Some(2));
        assert_eq!(builds.get(), 1);
    }
}
