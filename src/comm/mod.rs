//! Hierarchical thread communicator.
//!
//! A team of worker threads cooperating on one contraction, SPMD style. The
//! communicator is an explicit object handed to every collective; there is no
//! process-wide state. [`Communicator::gang_split`] carves a team into
//! sub-teams, each with its own communicator, and sub-communicators nest.
//!
//! Every collective must be invoked by every thread of the communicator it is
//! called on; violating that is a programming error and deadlocks or panics.
//! Completion of a collective establishes happens-before on all prior memory
//! accesses of the participating threads (the barrier mutex is the fence).

use std::any::Any;
use std::ops::Add;
use std::sync::{Arc, Condvar, Mutex};

struct BarrierState {
    count: usize,
    generation: u64,
}

/// Shared state of one team.
struct CommContext {
    nthreads: usize,
    barrier: Mutex<BarrierState>,
    released: Condvar,
    // Broadcast value, written by the root between the two barrier phases.
    slot: Mutex<Option<Box<dyn Any + Send>>>,
    // Per-thread reduction contributions, indexed by thread id.
    contributions: Mutex<Vec<Option<Box<dyn Any + Send>>>>,
}

impl CommContext {
    fn new(nthreads: usize) -> Self {
        Self {
            nthreads,
            barrier: Mutex::new(BarrierState {
                count: 0,
                generation: 0,
            }),
            released: Condvar::new(),
            slot: Mutex::new(None),
            contributions: Mutex::new((0..nthreads).map(|_| None).collect()),
        }
    }
}

/// One thread's handle on its team.
#[derive(Clone)]
pub struct Communicator {
    ctx: Arc<CommContext>,
    tid: usize,
    nthreads: usize,
}

impl Communicator {
    /// This thread's id within the team, in `[0, nthreads)`.
    #[inline]
    pub fn thread_id(&self) -> usize {
        self.tid
    }

    /// Team size.
    #[inline]
    pub fn num_threads(&self) -> usize {
        self.nthreads
    }

    /// True for thread 0 of this team.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.tid == 0
    }

    /// Blocks until every thread of the team has arrived.
    pub fn barrier(&self) {
        let mut state = self.ctx.barrier.lock().unwrap();
        let generation = state.generation;
        state.count += 1;
        if state.count == self.ctx.nthreads {
            state.count = 0;
            state.generation = state.generation.wrapping_add(1);
            self.ctx.released.notify_all();
        } else {
            while state.generation == generation {
                state = self.ctx.released.wait(state).unwrap();
            }
        }
    }

    /// Makes `value` from the root thread the return value on every thread.
    ///
    /// The root need not be thread 0. Non-root values are ignored.
    pub fn broadcast<T>(&self, value: T, root: usize) -> T
    where
        T: Clone + Send + 'static,
    {
        assert!(root < self.nthreads, "broadcast root {root} out of range");
        if self.nthreads == 1 {
            return value;
        }
        if self.tid == root {
            *self.ctx.slot.lock().unwrap() = Some(Box::new(value.clone()));
            self.barrier();
            self.barrier();
            value
        } else {
            self.barrier();
            let out = {
                let slot = self.ctx.slot.lock().unwrap();
                slot.as_ref()
                    .and_then(|b| b.downcast_ref::<T>())
                    .expect("broadcast type mismatch across team")
                    .clone()
            };
            self.barrier();
            out
        }
    }

    /// Sums every thread's contribution; all threads see the total.
    ///
    /// The fold runs in thread-id order on each thread, so all threads
    /// observe bitwise-identical results.
    pub fn reduce<T>(&self, contribution: T) -> T
    where
        T: Copy + Send + Add<Output = T> + 'static,
    {
        if self.nthreads == 1 {
            return contribution;
        }
        {
            let mut slots = self.ctx.contributions.lock().unwrap();
            slots[self.tid] = Some(Box::new(contribution));
        }
        self.barrier();
        let total = {
            let slots = self.ctx.contributions.lock().unwrap();
            let mut acc: Option<T> = None;
            for slot in slots.iter() {
                let v = *slot
                    .as_ref()
                    .and_then(|b| b.downcast_ref::<T>())
                    .expect("reduce type mismatch across team");
                acc = Some(match acc {
                    Some(a) => a + v,
                    None => v,
                });
            }
            acc.expect("reduce on empty team")
        };
        self.barrier();
        total
    }

    /// This thread's contiguous share `[lo, hi)` of a loop over `[0, n)`,
    /// plus its thread id.
    ///
    /// The shares partition the range disjointly and differ in size by at
    /// most one.
    pub fn distribute_over_threads(&self, n: usize) -> (usize, usize, usize) {
        let (lo, hi) = split_range(n, self.nthreads, self.tid);
        (lo, hi, self.tid)
    }

    /// Partitions the team into `gangs` sub-teams and returns this thread's
    /// sub-communicator.
    ///
    /// Sub-team sizes differ by at most one; sub-team ids follow thread-id
    /// blocks. Must be called by every thread of the team with the same
    /// `gangs` value. The returned communicator nests: it supports every
    /// collective, including further splits.
    pub fn gang_split(&self, gangs: usize) -> Communicator {
        assert!(
            gangs >= 1 && gangs <= self.nthreads,
            "cannot split {} threads into {gangs} gangs",
            self.nthreads
        );
        if gangs == 1 {
            return self.clone();
        }

        // Thread 0 allocates one context per gang; everyone else receives
        // them through the broadcast.
        let contexts = if self.is_root() {
            Arc::new(
                (0..gangs)
                    .map(|g| {
                        let (lo, hi) = split_range(self.nthreads, gangs, g);
                        Arc::new(CommContext::new(hi - lo))
                    })
                    .collect::<Vec<_>>(),
            )
        } else {
            Arc::new(Vec::new())
        };
        let contexts = self.broadcast(contexts, 0);

        let gang = gang_of(self.nthreads, gangs, self.tid);
        let (lo, hi) = split_range(self.nthreads, gangs, gang);
        Communicator {
            ctx: contexts[gang].clone(),
            tid: self.tid - lo,
            nthreads: hi - lo,
        }
    }

    /// The sub-team id this thread lands in under `gang_split(gangs)`.
    pub fn gang_id(&self, gangs: usize) -> usize {
        gang_of(self.nthreads, gangs, self.tid)
    }
}

/// Part `part` of `[0, n)` split into `parts` near-even contiguous blocks.
pub fn split_range(n: usize, parts: usize, part: usize) -> (usize, usize) {
    debug_assert!(part < parts);
    let base = n / parts;
    let rem = n % parts;
    let lo = part * base + part.min(rem);
    let hi = lo + base + usize::from(part < rem);
    (lo, hi)
}

fn gang_of(nthreads: usize, gangs: usize, tid: usize) -> usize {
    let base = nthreads / gangs;
    let rem = nthreads % gangs;
    let big = (base + 1) * rem;
    if tid < big {
        tid / (base + 1)
    } else {
        rem + (tid - big) / base
    }
}

/// Runs `body` on a team of `nthreads` scoped worker threads and returns
/// thread 0's result.
///
/// A panic in any worker propagates once the team joins; a contraction is
/// never silently truncated.
pub fn parallelize<F, R>(nthreads: usize, body: F) -> R
where
    F: Fn(&Communicator) -> R + Sync,
    R: Send,
{
    let nthreads = nthreads.max(1);
    let ctx = Arc::new(CommContext::new(nthreads));
    if nthreads == 1 {
        return body(&Communicator {
            ctx,
            tid: 0,
            nthreads: 1,
        });
    }
    std::thread::scope(|scope| {
        for tid in 1..nthreads {
            let ctx = ctx.clone();
            let body = &body;
            scope.spawn(move || {
                body(&Communicator {
                    ctx,
                    tid,
                    nthreads,
                });
            });
        }
        body(&Communicator {
            ctx,
            tid: 0,
            nthreads,
        })
    })
}
