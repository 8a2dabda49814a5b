//! Configuration and statistics for garbage collection.

/// Configuration for a garbage-collected heap
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Maximum number of live objects; allocation beyond this fails and
    /// callers must check
    pub max_objects: usize,
    /// Initial slot capacity reserved at construction
    pub initial_capacity: usize,
}

impl Default for Configuration {
    /// Creates a default configuration for a heap.
    /// This sets:
    /// - `max_objects` to 1,048,576 objects
    /// - `initial_capacity` to 256 slots
    fn default() -> Self {
        Self {
            max_objects: 1 << 20,
            initial_capacity: 256,
        }
    }
}

/// Statistics about garbage collection activity
#[derive(Clone, Debug, Default)]
pub struct Statistics {
    pub collections: usize,
    pub objects_marked: usize,
    pub objects_swept: usize,
    pub live_objects: usize,
    pub last_collection_duration: Option<std::time::Duration>,
    pub total_collection_time: std::time::Duration,
}

/// The outcome of a single collection cycle
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SweepReport {
    /// Objects found reachable from the roots
    pub marked: usize,
    /// Objects finalized and reclaimed
    pub swept: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration() {
        let config = Configuration::default();
        assert_eq!(config.max_objects, 1 << 20);
        assert_eq!(config.initial_capacity, 256);
    }

    #[test]
    fn default_statistics() {
        let stats = Statistics::default();
        assert_eq!(stats.collections, 0);
        assert_eq!(stats.objects_marked, 0);
        assert_eq!(stats.objects_swept, 0);
        assert_eq!(stats.live_objects, 0);
        assert!(stats.last_collection_duration.is_none());
        assert_eq!(stats.total_collection_time, std::time::Duration::new(0, 0));
    }
}
