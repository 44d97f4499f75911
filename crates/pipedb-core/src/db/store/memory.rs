use crate::db::{
    capability::Capabilities,
    plan::{FragmentShape, StoreFragment},
    store::{RowSource, StoreError, StoreExecutor},
};
use std::{
    iter,
    sync::atomic::{AtomicU64, Ordering},
};

///
/// StoreStats
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StoreStats {
    pub fetches: u64,
    pub counts: u64,
    pub exists_checks: u64,
    pub rejections: u64,
    pub rows_yielded: u64,
}

#[derive(Debug, Default)]
struct AtomicStats {
    fetches: AtomicU64,
    counts: AtomicU64,
    exists_checks: AtomicU64,
    rejections: AtomicU64,
    rows_yielded: AtomicU64,
}

impl AtomicStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StoreStats {
        StoreStats {
            fetches: self.fetches.load(Ordering::Relaxed),
            counts: self.counts.load(Ordering::Relaxed),
            exists_checks: self.exists_checks.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            rows_yielded: self.rows_yielded.load(Ordering::Relaxed),
        }
    }
}

///
/// MemoryStore
///
/// In-memory reference store over a fixed row set, kept in insertion order
/// (its default order). It enforces its own capability set, which may be
/// narrower than what the planner was told, so rejection paths can be
/// exercised. Without a capability set it accepts every fragment.
///

#[derive(Debug)]
pub struct MemoryStore<E> {
    rows: Vec<E>,
    capabilities: Option<Capabilities>,
    reject_all: bool,
    fault: Option<String>,
    fault_after: Option<(usize, String)>,
    stats: AtomicStats,
}

impl<E> MemoryStore<E> {
    #[must_use]
    pub fn new(rows: Vec<E>) -> Self {
        Self {
            rows,
            capabilities: None,
            reject_all: false,
            fault: None,
            fault_after: None,
            stats: AtomicStats::default(),
        }
    }

    /// Only accept fragments these capabilities allow.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Reject every fragment except an unrestricted row scan.
    #[must_use]
    pub const fn rejecting(mut self) -> Self {
        self.reject_all = true;
        self
    }

    /// Fail every call with a fault.
    #[must_use]
    pub fn with_fault(mut self, message: impl Into<String>) -> Self {
        self.fault = Some(message.into());
        self
    }

    /// Yield `rows` rows from each fetch, then fault.
    #[must_use]
    pub fn with_fault_after(mut self, rows: usize, message: impl Into<String>) -> Self {
        self.fault_after = Some((rows, message.into()));
        self
    }

    #[must_use]
    pub fn rows(&self) -> &[E] {
        &self.rows
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.stats.snapshot()
    }

    fn admit(&self, fragment: &StoreFragment<E>, shape: FragmentShape) -> Result<(), StoreError> {
        if let Some(message) = &self.fault {
            return Err(StoreError::fault(message.clone()));
        }

        let verdict = self.verdict(fragment, shape);
        if verdict.is_err() {
            AtomicStats::bump(&self.stats.rejections);
        }

        verdict
    }

    fn verdict(&self, fragment: &StoreFragment<E>, shape: FragmentShape) -> Result<(), StoreError> {
        if fragment.shape() != shape {
            return Err(StoreError::rejected(format!(
                "{:?} fragment sent to the {shape:?} entrypoint",
                fragment.shape()
            )));
        }
        if self.reject_all && !fragment.is_unrestricted() {
            return Err(StoreError::rejected("store accepts only full scans"));
        }

        let Some(caps) = &self.capabilities else {
            return Ok(());
        };

        if caps.entity() != fragment.entity() {
            return Err(StoreError::rejected(format!(
                "unknown entity '{}'",
                fragment.entity()
            )));
        }
        if let Some(predicate) = fragment
            .predicates()
            .iter()
            .find(|p| !caps.supports_filter(p))
        {
            return Err(StoreError::rejected(format!(
                "unsupported predicate {predicate}"
            )));
        }
        if let Some(comparator) = fragment.order().iter().find(|c| !caps.supports_order(c)) {
            return Err(StoreError::rejected(format!(
                "unsupported ordering {comparator}"
            )));
        }
        if let Some(window) = fragment.window()
            && !caps.supports_window(&window)
        {
            return Err(StoreError::rejected(format!("unsupported window {window}")));
        }

        let shape_ok = match shape {
            FragmentShape::Rows => true,
            FragmentShape::Count => caps.supports_count(),
            FragmentShape::Exists | FragmentShape::NotExists => caps.supports_exists(),
        };
        if shape_ok {
            Ok(())
        } else {
            Err(StoreError::rejected(format!("unsupported shape {shape:?}")))
        }
    }

    fn select(&self, fragment: &StoreFragment<E>) -> Result<Vec<&E>, StoreError> {
        fragment
            .select(&self.rows)
            .map_err(|err| StoreError::fault(err.to_string()))
    }
}

impl<E: Clone> StoreExecutor<E> for MemoryStore<E> {
    fn fetch<'a>(&'a self, fragment: &StoreFragment<E>) -> Result<RowSource<'a, E>, StoreError> {
        AtomicStats::bump(&self.stats.fetches);
        self.admit(fragment, FragmentShape::Rows)?;

        let selected = self.select(fragment)?;
        let rows = selected.into_iter().map(move |row| {
            AtomicStats::bump(&self.stats.rows_yielded);
            Ok(row.clone())
        });

        Ok(match &self.fault_after {
            Some((n, message)) => Box::new(
                rows.take(*n)
                    .chain(iter::once(Err(StoreError::fault(message.clone())))),
            ),
            None => Box::new(rows),
        })
    }

    fn count(&self, fragment: &StoreFragment<E>) -> Result<u64, StoreError> {
        AtomicStats::bump(&self.stats.counts);
        self.admit(fragment, FragmentShape::Count)?;

        let rows = self.select(fragment)?;

        Ok(u64::try_from(rows.len()).unwrap_or(u64::MAX))
    }

    fn exists(&self, fragment: &StoreFragment<E>) -> Result<bool, StoreError> {
        AtomicStats::bump(&self.stats.exists_checks);
        let negated = matches!(fragment.shape(), FragmentShape::NotExists);
        let shape = if negated {
            FragmentShape::NotExists
        } else {
            FragmentShape::Exists
        };
        self.admit(fragment, shape)?;

        let found = !self.select(fragment)?.is_empty();

        Ok(found != negated)
    }
}
