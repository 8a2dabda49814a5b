use crate::Finalize;
use crate::config::{Configuration, Statistics, SweepReport};
use crate::handle::Handle;
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, trace};

/// Trait for objects that can be traced by the garbage collector.
///
/// Objects that contain [`Handle`]s must implement this trait so the
/// collector can traverse object references during the marking phase.
pub trait Trace {
    /// Trace all [`Handle`]s contained within this object.
    ///
    /// The implementation should call [`Tracer::mark`] for every child
    /// handle and must not perform any allocation during tracing.
    fn trace(&self, tracer: &mut Tracer<'_>);
}

/// Tricolour mark state of a heap slot.
///
/// - **White**: not yet reached; a candidate for reclamation.
/// - **Gray**: reached, children not yet scanned; queued in the worklist.
/// - **Black**: reached and fully scanned.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// The marking context handed to [`Trace::trace`] implementations.
///
/// Marking is worklist-driven: `mark` grays a white object and enqueues it
/// instead of recursing, so arbitrarily deep object graphs cannot exhaust
/// the host stack.
#[derive(Debug)]
pub struct Tracer<'a> {
    colors: &'a mut [Option<Color>],
    queue: &'a mut VecDeque<Handle>,
    marked: &'a mut usize,
}

impl Tracer<'_> {
    /// Mark the object named by `handle` as reachable.
    ///
    /// # Panics
    ///
    /// Panics if `handle` names a freed slot; a trace implementation
    /// holding a dead handle is heap corruption and must abort.
    pub fn mark(&mut self, handle: Handle) {
        let index = handle.index();
        match self.colors.get(index) {
            Some(Some(Color::White)) => {
                self.colors[index] = Some(Color::Gray);
                self.queue.push_back(handle);
                *self.marked += 1;
            }
            Some(Some(_)) => {}
            _ => panic!("marked dead handle {handle}"),
        }
    }

    /// Mark an optional child; `None` is a no-op.
    pub fn mark_optional(&mut self, handle: Option<Handle>) {
        if let Some(handle) = handle {
            self.mark(handle);
        }
    }
}

/// A garbage-collected heap of uniform objects.
///
/// The heap is the single authoritative allocator endpoint: every object
/// is threaded into its slot table at allocation and leaves it only
/// through the sweep. Handles index slots directly; freed slots are kept
/// on a free list and reused by later allocations.
///
/// Collection is stop-the-world tricolour mark-and-sweep and runs only
/// when the caller invokes [`collect`](Heap::collect) — in the VM that is
/// between fiber slices, never while a fiber is mid-bytecode.
#[derive(Debug)]
pub struct Heap<T: Trace + Finalize> {
    entries: Vec<Option<T>>,
    colors: Vec<Option<Color>>,
    free: Vec<usize>,
    live: usize,
    config: Configuration,
    statistics: Statistics,
}

impl<T: Trace + Finalize> Heap<T> {
    /// Creates a heap with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Configuration::default())
    }

    /// Creates a heap with a custom configuration.
    #[must_use]
    pub fn with_config(config: Configuration) -> Self {
        Self {
            entries: Vec::with_capacity(config.initial_capacity),
            colors: Vec::with_capacity(config.initial_capacity),
            free: Vec::new(),
            live: 0,
            config,
            statistics: Statistics::default(),
        }
    }

    /// Allocates a new object and returns its handle, or `None` when the
    /// heap is exhausted. New objects start white; callers must check the
    /// result.
    pub fn alloc(&mut self, value: T) -> Option<Handle> {
        if self.live >= self.config.max_objects {
            return None;
        }
        let index = if let Some(index) = self.free.pop() {
            self.entries[index] = Some(value);
            self.colors[index] = Some(Color::White);
            index
        } else {
            self.entries.push(Some(value));
            self.colors.push(Some(Color::White));
            self.entries.len() - 1
        };
        self.live += 1;
        Handle::from_index(index)
    }

    /// Returns a reference to a live object, or `None` for a freed slot.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.entries.get(handle.index()).and_then(Option::as_ref)
    }

    /// Returns a mutable reference to a live object.
    #[must_use]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.entries
            .get_mut(handle.index())
            .and_then(Option::as_mut)
    }

    /// Returns `true` when the handle names a live object.
    #[must_use]
    pub fn is_live(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` when no objects are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterates over every live object with its handle.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let value = entry.as_ref()?;
                let handle = Handle::from_index(index)?;
                Some((handle, value))
            })
    }

    /// Gets current garbage collection statistics.
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        let mut statistics = self.statistics.clone();
        statistics.live_objects = self.live;
        statistics
    }

    /// Performs a complete stop-the-world collection cycle.
    ///
    /// 1. **Reset**: every live slot is recoloured white.
    /// 2. **Root marking**: the given roots are grayed and enqueued on the
    ///    explicit worklist.
    /// 3. **Trace**: worklist entries have their children traced and are
    ///    coloured black until the worklist drains.
    /// 4. **Sweep**: white slots are finalized and dropped; black slots
    ///    are recoloured white for the next cycle.
    ///
    /// Collection is infallible and always makes progress; marking a dead
    /// handle panics (see [`Tracer::mark`]).
    pub fn collect<R>(&mut self, roots: R) -> SweepReport
    where
        R: IntoIterator<Item = Handle>,
    {
        let start_time = Instant::now();
        debug!("starting garbage collection cycle, {} live", self.live);

        // Reset phase
        for color in self.colors.iter_mut().flatten() {
            *color = Color::White;
        }

        // Root marking and trace phases share the worklist
        let mut queue = VecDeque::new();
        let mut marked = 0;
        {
            let mut tracer = Tracer {
                colors: &mut self.colors,
                queue: &mut queue,
                marked: &mut marked,
            };
            for root in roots {
                tracer.mark(root);
            }
        }
        while let Some(handle) = queue.pop_front() {
            let index = handle.index();
            {
                let mut tracer = Tracer {
                    colors: &mut self.colors,
                    queue: &mut queue,
                    marked: &mut marked,
                };
                if let Some(value) = self.entries[index].as_ref() {
                    value.trace(&mut tracer);
                }
            }
            self.colors[index] = Some(Color::Black);
        }

        // Sweep phase
        let mut swept = 0;
        for index in 0..self.entries.len() {
            match self.colors[index] {
                Some(Color::White) => {
                    if let Some(value) = self.entries[index].take() {
                        trace!("sweeping {index}");
                        value.finalize();
                    }
                    self.colors[index] = None;
                    self.free.push(index);
                    self.live -= 1;
                    swept += 1;
                }
                Some(_) => self.colors[index] = Some(Color::White),
                None => {}
            }
        }

        let duration = start_time.elapsed();
        self.statistics.collections += 1;
        self.statistics.objects_marked += marked;
        self.statistics.objects_swept += swept;
        self.statistics.last_collection_duration = Some(duration);
        self.statistics.total_collection_time += duration;
        debug!("garbage collection cycle completed in {duration:?}, marked {marked}, swept {swept}");

        SweepReport { marked, swept }
    }
}

impl<T: Trace + Finalize> Default for Heap<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// A test object holding child handles and a shared finalize counter.
    #[derive(Debug)]
    struct Node {
        children: Vec<Handle>,
        finalized: Rc<Cell<usize>>,
    }

    impl Node {
        fn new(finalized: &Rc<Cell<usize>>) -> Self {
            Self {
                children: Vec::new(),
                finalized: Rc::clone(finalized),
            }
        }
    }

    impl Trace for Node {
        fn trace(&self, tracer: &mut Tracer<'_>) {
            for child in &self.children {
                tracer.mark(*child);
            }
        }
    }

    impl Finalize for Node {
        fn finalize(&self) {
            self.finalized.set(self.finalized.get() + 1);
        }
    }

    #[test]
    fn test_alloc_and_get() {
        let finalized = Rc::new(Cell::new(0));
        let mut heap: Heap<Node> = Heap::new();
        let handle = heap.alloc(Node::new(&finalized)).expect("alloc");
        assert!(heap.is_live(handle));
        assert_eq!(1, heap.len());
        assert!(heap.get(handle).is_some());
    }

    #[test]
    fn test_alloc_exhaustion() {
        let finalized = Rc::new(Cell::new(0));
        let config = Configuration {
            max_objects: 2,
            ..Configuration::default()
        };
        let mut heap: Heap<Node> = Heap::with_config(config);
        assert!(heap.alloc(Node::new(&finalized)).is_some());
        assert!(heap.alloc(Node::new(&finalized)).is_some());
        assert!(heap.alloc(Node::new(&finalized)).is_none());
    }

    #[test]
    fn test_collect_sweeps_unreachable() {
        let finalized = Rc::new(Cell::new(0));
        let mut heap: Heap<Node> = Heap::new();
        let root = heap.alloc(Node::new(&finalized)).expect("alloc");
        let kept = heap.alloc(Node::new(&finalized)).expect("alloc");
        let _dropped = heap.alloc(Node::new(&finalized)).expect("alloc");
        heap.get_mut(root).expect("root").children.push(kept);

        let report = heap.collect([root]);
        assert_eq!(2, report.marked);
        assert_eq!(1, report.swept);
        assert_eq!(1, finalized.get());
        assert!(heap.is_live(root));
        assert!(heap.is_live(kept));
        assert_eq!(2, heap.len());
    }

    #[test]
    fn test_collect_handles_cycles() {
        let finalized = Rc::new(Cell::new(0));
        let mut heap: Heap<Node> = Heap::new();
        let a = heap.alloc(Node::new(&finalized)).expect("alloc");
        let b = heap.alloc(Node::new(&finalized)).expect("alloc");
        heap.get_mut(a).expect("a").children.push(b);
        heap.get_mut(b).expect("b").children.push(a);

        // Reachable cycle survives.
        let report = heap.collect([a]);
        assert_eq!(2, report.marked);
        assert_eq!(0, report.swept);

        // Unreachable cycle is reclaimed.
        let report = heap.collect([]);
        assert_eq!(2, report.swept);
        assert_eq!(2, finalized.get());
        assert!(heap.is_empty());
    }

    #[test]
    fn test_slot_reuse_after_sweep() {
        let finalized = Rc::new(Cell::new(0));
        let mut heap: Heap<Node> = Heap::new();
        let first = heap.alloc(Node::new(&finalized)).expect("alloc");
        heap.collect([]);
        assert!(!heap.is_live(first));

        let second = heap.alloc(Node::new(&finalized)).expect("alloc");
        assert_eq!(first.index(), second.index());
        assert!(heap.is_live(second));
    }

    #[test]
    fn test_collect_retains_exactly_the_rooted() {
        let finalized = Rc::new(Cell::new(0));
        let mut heap: Heap<Node> = Heap::new();
        let handles: Vec<Handle> = (0..1000)
            .map(|_| heap.alloc(Node::new(&finalized)).expect("alloc"))
            .collect();
        let survivor = handles[500];

        let report = heap.collect([survivor]);
        assert_eq!(999, report.swept);
        assert_eq!(999, finalized.get());
        assert!(heap.is_live(survivor));
        assert_eq!(1, heap.len());
    }

    #[test]
    fn test_statistics_accumulate() {
        let finalized = Rc::new(Cell::new(0));
        let mut heap: Heap<Node> = Heap::new();
        let root = heap.alloc(Node::new(&finalized)).expect("alloc");
        heap.alloc(Node::new(&finalized)).expect("alloc");
        heap.collect([root]);
        heap.collect([root]);

        let statistics = heap.statistics();
        assert_eq!(2, statistics.collections);
        assert_eq!(2, statistics.objects_marked);
        assert_eq!(1, statistics.objects_swept);
        assert_eq!(1, statistics.live_objects);
        assert!(statistics.last_collection_duration.is_some());
    }

    #[test]
    #[should_panic(expected = "marked dead handle")]
    fn test_marking_dead_handle_panics() {
        let finalized = Rc::new(Cell::new(0));
        let mut heap: Heap<Node> = Heap::new();
        let stale = heap.alloc(Node::new(&finalized)).expect("alloc");
        heap.collect([]);

        // The slot behind `stale` was freed; a trace implementation still
        // holding it is heap corruption.
        let mut queue = VecDeque::new();
        let mut marked = 0;
        let mut tracer = Tracer {
            colors: &mut heap.colors,
            queue: &mut queue,
            marked: &mut marked,
        };
        tracer.mark(stale);
    }
}
