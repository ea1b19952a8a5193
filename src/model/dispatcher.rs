use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Priority tiers for deferred work, highest first.
///
/// `ApplicationIdle` jobs run only after all higher-priority work drains, which
/// is what lets a binding-failure capture finalize after the (possibly
/// deferred) binding evaluation has actually run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    ApplicationIdle,
    Background,
    DataBind,
    Normal,
}

impl Priority {
    fn index(self) -> usize {
        match self {
            Priority::Normal => 0,
            Priority::DataBind => 1,
            Priority::Background => 2,
            Priority::ApplicationIdle => 3,
        }
    }
}

type Job = Box<dyn FnOnce()>;

/// Single-threaded cooperative work queue owned by one UI context.
///
/// There is no preemption and no locking; jobs are run one at a time on the
/// thread that owns the inspected tree, and a job may post further jobs.
pub struct Dispatcher {
    context_id: usize,
    queues: [RefCell<VecDeque<Job>>; 4],
}

impl Dispatcher {
    pub fn new(context_id: usize) -> Rc<Self> {
        Rc::new(Self {
            context_id,
            queues: Default::default(),
        })
    }

    /// Identifier of the UI context (thread) this dispatcher belongs to.
    pub fn context_id(&self) -> usize {
        self.context_id
    }

    /// Queue a job at the given priority tier.
    pub fn post(&self, priority: Priority, job: impl FnOnce() + 'static) {
        self.queues[priority.index()]
            .borrow_mut()
            .push_back(Box::new(job));
    }

    /// Whether any job is still queued at any tier.
    pub fn has_pending(&self) -> bool {
        self.queues.iter().any(|q| !q.borrow().is_empty())
    }

    /// Run queued jobs in priority order until every tier is empty.
    ///
    /// The queue borrow is released before each job runs, so jobs may post
    /// follow-up work (including at a higher tier) without re-entrancy issues.
    pub fn run_until_idle(&self) {
        while let Some(job) = self.take_next() {
            job();
        }
    }

    fn take_next(&self) -> Option<Job> {
        for queue in &self.queues {
            let job = queue.borrow_mut().pop_front();
            if job.is_some() {
                return job;
            }
        }
        None
    }
}
