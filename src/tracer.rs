//! The allocation tracer: the one collaborator that folds events into the sample stream.
//!
//! This module is deliberately thin. It owns no sampling logic of its own — it calls
//! [`AdaptiveSampler::should_sample`] (or doesn't, depending on [`TracerPolicy`]) and folds
//! thread-local skip bookkeeping into whatever it emits.

use std::cell::Cell;
use std::sync::Arc;

use crate::AdaptiveSampler;

/// Opaque identifier for the allocating thread, as supplied by the embedding runtime.
pub type ThreadHandle = u64;

thread_local! {
    static SKIPPED_EVENTS: Cell<u64> = const { Cell::new(0) };
    static SKIPPED_ALLOCATIONS: Cell<u64> = const { Cell::new(0) };
}

fn take_skip_counters() -> (u64, u64) {
    let events = SKIPPED_EVENTS.with(|c| c.replace(0));
    let allocations = SKIPPED_ALLOCATIONS.with(|c| c.replace(0));
    (events, allocations)
}

fn bump_skip_counters(memory_size: u64) {
    SKIPPED_EVENTS.with(|c| c.set(c.get() + 1));
    SKIPPED_ALLOCATIONS.with(|c| c.set(c.get() + memory_size));
}

/// A large allocation that bypassed the thread's TLAB entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectAllocationOutsideTlab {
    pub class: String,
    pub addr: u64,
    pub alloc_size: u64,
    pub thread: ThreadHandle,
}

/// An allocation that triggered handing the thread a new TLAB.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectAllocationInNewTlab {
    pub class: String,
    pub addr: u64,
    pub tlab_size: u64,
    pub alloc_size: u64,
    pub thread: ThreadHandle,
}

/// An allocation that triggered a garbage collection. Unrelated to sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationRequiringGc {
    pub size: u64,
    pub gc_id: u64,
}

/// The record emitted when an allocation survives both gates (sampler and event sink, or just
/// the event sink, depending on [`TracerPolicy`]).
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectAllocationSample {
    pub class: String,
    pub obj_size: u64,
    /// Bytes allocated since the last emitted sample on this thread, including this one.
    pub allocated_since_last: u64,
    /// Events skipped on this thread since the last emitted sample.
    pub skipped_events: u64,
    pub thread: ThreadHandle,
}

/// Every record the tracer can hand to an [`EventSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum AllocationEvent {
    OutsideTlab(ObjectAllocationOutsideTlab),
    InNewTlab(ObjectAllocationInNewTlab),
    RequiringGc(AllocationRequiringGc),
    Sample(ObjectAllocationSample),
}

/// The runtime's event-recording subsystem, modeled as the tracer's collaborator.
///
/// `should_commit` models the event system's own internal gate (e.g. a per-event-type rate
/// limiter or an "is this event type enabled at all" check); `commit` models handing a filled-in
/// record to the runtime's record builder.
pub trait EventSink: Send + Sync {
    /// Whether the event system is currently willing to accept a new record.
    fn should_commit(&self) -> bool;

    /// Hands a record to the event system. Only called when `should_commit` (for that record's
    /// call site) returned `true`.
    fn commit(&self, event: AllocationEvent);
}

/// Which of the two documented tracer fold variants governs `send_allocation_sample`.
///
/// See the crate's design notes for why `SamplerGated` is the default for a standalone library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracerPolicy {
    /// Consult [`AdaptiveSampler::should_sample`] as a second gate; emit only when both the
    /// sampler and the event sink accept.
    SamplerGated,

    /// Rely entirely on the event sink's own internal gate; never consult the sampler.
    EventSinkOnly,
}

/// The one call site that uses [`AdaptiveSampler`]: folds allocation slow-path events into the
/// sample stream and into whatever the embedding runtime's event system records.
pub struct AllocationTracer {
    sampler: Arc<AdaptiveSampler>,
    sink: Box<dyn EventSink>,
    policy: TracerPolicy,
}

impl AllocationTracer {
    /// Builds a tracer over `sampler` and `sink`, using `policy` to decide whether
    /// `send_allocation_sample` consults the sampler.
    pub fn new(sampler: Arc<AdaptiveSampler>, sink: Box<dyn EventSink>, policy: TracerPolicy) -> Self {
        Self {
            sampler,
            sink,
            policy,
        }
    }

    /// A large allocation that bypassed the TLAB. Emits an "outside-TLAB" event if the sink
    /// accepts, then folds the allocation into the sample stream with `memory_size = alloc_size`.
    pub fn send_allocation_outside_tlab(
        &self,
        class: &str,
        addr: u64,
        alloc_size: u64,
        thread: ThreadHandle,
    ) {
        if self.sink.should_commit() {
            self.sink.commit(AllocationEvent::OutsideTlab(ObjectAllocationOutsideTlab {
                class: class.to_string(),
                addr,
                alloc_size,
                thread,
            }));
        }
        self.send_allocation_sample(class, addr, alloc_size, alloc_size, thread);
    }

    /// An allocation that required handing the thread a new TLAB. Emits an "in-new-TLAB" event
    /// if the sink accepts, then folds the allocation with `memory_size = tlab_size` — the whole
    /// TLAB is charged as the footprint since the last sample.
    pub fn send_allocation_in_new_tlab(
        &self,
        class: &str,
        addr: u64,
        tlab_size: u64,
        alloc_size: u64,
        thread: ThreadHandle,
    ) {
        if self.sink.should_commit() {
            self.sink.commit(AllocationEvent::InNewTlab(ObjectAllocationInNewTlab {
                class: class.to_string(),
                addr,
                tlab_size,
                alloc_size,
                thread,
            }));
        }
        self.send_allocation_sample(class, addr, alloc_size, tlab_size, thread);
    }

    /// An allocation that triggered a GC. Never consults the sampler, but still gated by the
    /// sink's own `should_commit`, same as every other event type.
    pub fn send_allocation_requiring_gc_event(&self, size: u64, gc_id: u64) {
        if self.sink.should_commit() {
            self.sink
                .commit(AllocationEvent::RequiringGc(AllocationRequiringGc { size, gc_id }));
        }
    }

    /// Folds one allocation into the sample stream.
    ///
    /// Under [`TracerPolicy::SamplerGated`], both the sampler and the sink must accept; the
    /// sampler is always consulted (even if the sink would reject) so its EWMAs keep tracking
    /// the true event rate. Under [`TracerPolicy::EventSinkOnly`] the sampler is never called.
    ///
    /// On acceptance, emits an `ObjectAllocationSample` carrying the thread's accumulated skip
    /// counters and resets them; on rejection, folds this allocation into those counters instead.
    fn send_allocation_sample(
        &self,
        class: &str,
        _addr: u64,
        obj_size: u64,
        memory_size: u64,
        thread: ThreadHandle,
    ) {
        let accept = match self.policy {
            TracerPolicy::SamplerGated => self.sampler.should_sample() && self.sink.should_commit(),
            TracerPolicy::EventSinkOnly => self.sink.should_commit(),
        };

        if accept {
            let (skipped_events, skipped_allocations) = take_skip_counters();
            self.sink.commit(AllocationEvent::Sample(ObjectAllocationSample {
                class: class.to_string(),
                obj_size,
                allocated_since_last: skipped_allocations + memory_size,
                skipped_events,
                thread,
            }));
        } else {
            bump_skip_counters(memory_size);
        }
    }
}

/// An [`EventSink`] that always accepts and logs each record via `tracing`, for demos and
/// smoke-testing a [`AllocationTracer`] wiring without a real runtime behind it.
#[derive(Debug, Default)]
pub struct LoggingSink;

impl EventSink for LoggingSink {
    fn should_commit(&self) -> bool {
        true
    }

    fn commit(&self, event: AllocationEvent) {
        tracing::info!(?event, "committed allocation event");
    }
}
