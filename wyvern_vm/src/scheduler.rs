use crate::configuration::Configuration;
use crate::error::Result;
use crate::fiber::{CrashRecord, Fiber, FiberId, FiberState};
use crate::instruction::invoke_funcref;
use crate::interpreter;
use crate::server::{Server, ServerEvent};
use crate::value::Value;
use crate::world::World;
use std::collections::VecDeque;
use tracing::{debug, trace, warn};
use wyvern_gc::Handle;

/// The cooperative scheduler: owns every fiber and multiplexes them
/// against server I/O.
///
/// One pass advances each Running fiber by one bounded slice in
/// round-robin insertion order; Paused, WaitingForInput, Stopped and
/// Crashed fibers are skipped. Between passes a server tick accepts
/// connections, buffers input, completes lines into waiting fibers,
/// dispatches heart-beats and flushes pending output. Collection cycles
/// run only here, between slices, when no fiber is mid-bytecode.
#[derive(Debug)]
pub struct Scheduler {
    fibers: Vec<Option<Fiber>>,
    free: Vec<usize>,
    order: VecDeque<FiberId>,
    configuration: Configuration,
    ticks: u64,
}

impl Scheduler {
    /// Create a scheduler.
    #[must_use]
    pub fn new(configuration: Configuration) -> Self {
        Self {
            fibers: Vec::new(),
            free: Vec::new(),
            order: VecDeque::new(),
            configuration,
            ticks: 0,
        }
    }

    /// The configuration the scheduler runs under.
    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Ticks advanced so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Adopt a fiber, appending it to the round-robin order.
    pub fn spawn(&mut self, fiber: Fiber) -> FiberId {
        let index = if let Some(index) = self.free.pop() {
            self.fibers[index] = Some(fiber);
            index
        } else {
            self.fibers.push(Some(fiber));
            self.fibers.len() - 1
        };
        let id = FiberId(index);
        self.order.push_back(id);
        trace!("spawned {id}");
        id
    }

    /// The fiber behind an id.
    #[must_use]
    pub fn get(&self, id: FiberId) -> Option<&Fiber> {
        self.fibers.get(id.0).and_then(Option::as_ref)
    }

    /// Mutable access to the fiber behind an id.
    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber> {
        self.fibers.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Stop a fiber; its stack is reclaimed on the next collection cycle.
    pub fn stop(&mut self, id: FiberId) {
        if let Some(fiber) = self.get_mut(id) {
            fiber.stop();
        }
    }

    /// Number of fibers still owned by the scheduler.
    #[must_use]
    pub fn fiber_count(&self) -> usize {
        self.fibers.iter().filter(|entry| entry.is_some()).count()
    }

    /// Append every handle reachable from the scheduler's fibers.
    pub fn roots(&self, roots: &mut Vec<Handle>) {
        for fiber in self.fibers.iter().flatten() {
            fiber.roots(roots);
        }
    }

    /// Advance every Running fiber by one slice, in round-robin order.
    /// Fibers that end the pass Stopped or Crashed are retired.
    pub fn run_pass(&mut self, world: &mut World) {
        let pass: Vec<FiberId> = self.order.iter().copied().collect();
        for id in pass {
            let Some(slot) = self.fibers.get_mut(id.0) else {
                continue;
            };
            let Some(mut fiber) = slot.take() else {
                continue;
            };
            if fiber.state() == FiberState::Running {
                interpreter::run(world, &mut fiber, self.configuration.slice_budget);
            }
            match fiber.state() {
                FiberState::Stopped | FiberState::Crashed => self.retire(world, id, fiber),
                _ => self.fibers[id.0] = Some(fiber),
            }
        }
    }

    fn retire(&mut self, world: &mut World, id: FiberId, fiber: Fiber) {
        if let Some(record) = fiber.crash_record() {
            warn!("{id} retired after crash: {record}");
        } else {
            trace!("{id} retired");
        }
        if let Some(connection) = fiber.connection()
            && let Ok(connection) = world.connection_mut(connection)
            && connection.fiber() == Some(id)
        {
            connection.unbind_fiber();
        }
        self.order.retain(|entry| *entry != id);
        self.free.push(id.0);
    }

    /// One server tick: surface I/O readiness, complete input lines into
    /// waiting fibers, dispatch heart-beats, flush output, and run a
    /// collection cycle when one is due. Runs only between passes, when
    /// every fiber is at a bytecode boundary.
    pub fn tick(&mut self, world: &mut World, server: &mut dyn Server) {
        // A pause lasts until the next tick boundary.
        for fiber in self.fibers.iter_mut().flatten() {
            fiber.resume();
        }

        let events = server.tick(self.configuration.tick_timeout);
        for event in events {
            match event {
                ServerEvent::Accepted(token) => {
                    if let Err(error) = self.handle_accept(world, token) {
                        warn!("failed to set up connection {token}: {error}");
                        server.close(token);
                    }
                }
                ServerEvent::Input(token, bytes) => {
                    if let Some(connection) = world.connection_by_token(token)
                        && let Ok(connection) = world.connection_mut(connection)
                    {
                        connection.ring_mut().push_bytes(&bytes);
                    }
                }
                ServerEvent::Closed(token) => self.handle_closed(world, token),
            }
        }

        self.deliver_lines(world);
        self.dispatch_heartbeats(world);

        for (token, bytes) in world.take_output() {
            server.write(token, &bytes);
        }

        self.ticks += 1;
        if self.ticks % self.configuration.gc_interval_ticks == 0 || world.take_gc_request() {
            let report = world.collect(self);
            debug!(
                "tick {} collection: marked {}, swept {}",
                self.ticks, report.marked, report.swept
            );
        }
    }

    /// Drive the world until shutdown is requested.
    pub fn run(&mut self, world: &mut World, server: &mut dyn Server) {
        debug!("scheduler loop starting");
        while !world.shutdown_requested() {
            self.run_pass(world);
            self.tick(world, server);
        }
        debug!("scheduler loop stopped after {} ticks", self.ticks);
    }

    /// Run passes (without server ticks) until no fiber is Running or the
    /// pass limit is hit. Drives fiber-only workloads and tests.
    pub fn run_until_idle(&mut self, world: &mut World, max_passes: usize) {
        for _ in 0..max_passes {
            let runnable = self
                .fibers
                .iter()
                .flatten()
                .any(|fiber| fiber.state() == FiberState::Running);
            if !runnable {
                break;
            }
            self.run_pass(world);
        }
    }

    fn handle_accept(&mut self, world: &mut World, token: usize) -> Result<()> {
        let connection = world.create_connection(token)?;
        let mut fiber = Fiber::new();
        fiber.bind_connection(connection);

        let handler = world.vars().connect_handler;
        if handler.is_nil() {
            // No connect handler installed: the connection idles until a
            // player object adopts it.
            fiber.wait_for_input();
        } else if let Err(error) = invoke_funcref(world, &mut fiber, handler, &[Value::Ref(connection)]) {
            world.objects_mut().remove_connection(connection);
            return Err(error);
        }

        let id = self.spawn(fiber);
        world.connection_mut(connection)?.bind_fiber(id);
        debug!("connection {token} bound to {id}");
        Ok(())
    }

    fn handle_closed(&mut self, world: &mut World, token: usize) {
        let Some(handle) = world.connection_by_token(token) else {
            return;
        };
        debug!("connection {token} closed");
        if let Ok(connection) = world.connection_mut(handle) {
            connection.mark_closed();
            if let Some(id) = connection.fiber()
                && let Some(fiber) = self.get_mut(id)
            {
                // End-of-input: a waiting fiber resumes with nil.
                fiber.reactivate_with_value(Value::Nil);
            }
        }
        world.objects_mut().remove_connection(handle);
    }

    /// Complete at most one buffered line per waiting fiber, invoking the
    /// armed `input_to` funcref or resuming with the line value.
    fn deliver_lines(&mut self, world: &mut World) {
        let connections: Vec<Handle> = world.objects().connections().to_vec();
        for handle in connections {
            let Ok(connection) = world.connection(handle) else {
                continue;
            };
            let Some(id) = connection.fiber() else {
                continue;
            };
            let waiting = self
                .get(id)
                .is_some_and(|fiber| fiber.state() == FiberState::WaitingForInput);
            if !waiting {
                continue;
            }
            let line = match world.connection_mut(handle) {
                Ok(connection) => connection.ring_mut().pop_line(),
                Err(..) => None,
            };
            let Some(line) = line else {
                continue;
            };

            let line_value = match world.alloc_string(line) {
                Ok(value) => value,
                Err(error) => {
                    warn!("dropping input line: {error}");
                    continue;
                }
            };
            let Some(mut fiber) = self.fibers.get_mut(id.0).and_then(Option::take) else {
                continue;
            };
            fiber.reactivate_with_value(line_value);
            if let Some(input_to) = fiber.take_input_to()
                && let Err(error) = invoke_funcref(world, &mut fiber, input_to, &[line_value])
            {
                fiber.crash(CrashRecord {
                    message: error.to_string(),
                    function: "<input_to>".to_string(),
                    ip: 0,
                });
            }
            self.fibers[id.0] = Some(fiber);
        }
    }

    /// Notify every heart-beat object whose chain has a `heartbeat`
    /// method, each on a fresh one-shot fiber.
    fn dispatch_heartbeats(&mut self, world: &mut World) {
        if world.objects().heartbeat_list().is_empty() {
            return;
        }
        let Ok(message) = world.intern("heartbeat") else {
            return;
        };
        let beats: Vec<Handle> = world.objects().heartbeat_list().to_vec();
        for object in beats {
            let master = world
                .instance(object)
                .ok()
                .and_then(crate::object::Instance::master);
            let Some(master) = master else {
                continue;
            };
            let method = match world.resolve_method(master, message) {
                Ok(Some(method)) => method,
                _ => continue,
            };
            let mut fiber = Fiber::new();
            fiber.push(Value::Ref(object));
            if let Err(error) = fiber.push_frame(world, method, 0) {
                warn!("heart-beat setup failed for {object}: {error}");
                continue;
            }
            self.spawn(fiber);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::FunctionBuilder;
    use wyvern_bytecode::Instruction;

    fn spawn_function(world: &mut World, instructions: &[Instruction]) -> Handle {
        let name = world.intern("test").expect("intern");
        let function = FunctionBuilder::new(name)
            .instructions(instructions)
            .expect("assemble")
            .build();
        world.alloc_function(function).expect("alloc")
    }

    #[test]
    fn test_round_robin_retires_finished_fibers() {
        let mut world = World::new();
        let mut scheduler = Scheduler::new(Configuration::default());
        let function = spawn_function(&mut world, &[Instruction::Return]);

        let mut fiber = Fiber::new();
        fiber.push(Value::Nil);
        fiber.push_frame(&mut world, function, 0).expect("frame");
        let id = scheduler.spawn(fiber);
        assert_eq!(1, scheduler.fiber_count());

        scheduler.run_pass(&mut world);
        assert_eq!(0, scheduler.fiber_count());
        assert!(scheduler.get(id).is_none());
    }

    #[test]
    fn test_paused_fibers_are_skipped() {
        let mut world = World::new();
        let mut scheduler = Scheduler::new(Configuration::default());
        let function = spawn_function(&mut world, &[Instruction::Return]);

        let mut fiber = Fiber::new();
        fiber.push(Value::Nil);
        fiber.push_frame(&mut world, function, 0).expect("frame");
        fiber.pause();
        let id = scheduler.spawn(fiber);

        scheduler.run_pass(&mut world);
        let fiber = scheduler.get(id).expect("paused fiber kept");
        assert_eq!(FiberState::Paused, fiber.state());
        assert_eq!(0, fiber.current_frame().expect("frame").ip());
    }

    #[test]
    fn test_slice_budget_yields_between_fibers() {
        let configuration = crate::configuration::ConfigurationBuilder::new()
            .slice_budget(2)
            .build();
        let mut world = World::new();
        let mut scheduler = Scheduler::new(configuration);
        // An infinite loop: jump back to offset 0 forever.
        let function = spawn_function(&mut world, &[Instruction::Jump(0)]);

        let mut fiber = Fiber::new();
        fiber.push(Value::Nil);
        fiber.push_frame(&mut world, function, 0).expect("frame");
        let id = scheduler.spawn(fiber);

        scheduler.run_pass(&mut world);
        let fiber = scheduler.get(id).expect("looping fiber kept");
        assert_eq!(FiberState::Running, fiber.state());
    }
}
