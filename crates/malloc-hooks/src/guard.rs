use std::time::Instant;

use crate::config::{self, Format};
use crate::counters::Snapshot;
use crate::hooks::{MallocHooks, MALLOC_HOOKS};
use crate::output::{self, Report, Reporter};
use crate::reentrancy::ReentrancyGuard;

/// Builder for a [`HooksGuard`]: installs the hooks for the lifetime of the
/// guard and reports the outstanding allocations when it is dropped.
///
/// # Examples
///
/// ```rust,no_run
/// use malloc_hooks::{Format, GuardBuilder};
///
/// let _guard = GuardBuilder::new("my_program")
///     .format(Format::JsonPretty)
///     .build();
/// // Allocations made here are tracked, the report is printed on drop.
/// ```
///
/// `MALLOC_HOOKS_DISABLED=1` makes [`GuardBuilder::build`] return an inert
/// guard, and `MALLOC_HOOKS_FORMAT` overrides the format (not a custom
/// reporter).
///
/// The guard tears the hooks down when dropped, even if they were already
/// installed before it was built.
pub struct GuardBuilder {
    caller_name: &'static str,
    reporter: ReporterConfig,
    reset_on_start: bool,
    hooks: &'static MallocHooks,
}

enum ReporterConfig {
    Format(Format),
    Custom(Box<dyn Reporter>),
    None, // Will default to Format::Table
}

impl GuardBuilder {
    pub fn new(caller_name: &'static str) -> Self {
        Self {
            caller_name,
            reporter: ReporterConfig::None,
            reset_on_start: true,
            hooks: &MALLOC_HOOKS,
        }
    }

    /// Sets the output format of the built-in reporters.
    ///
    /// Default: [`Format::Table`]
    pub fn format(mut self, format: Format) -> Self {
        self.reporter = ReporterConfig::Format(format);
        self
    }

    /// Replaces the built-in reporters.
    pub fn reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporter = ReporterConfig::Custom(reporter);
        self
    }

    /// Whether to zero the statistics when the guard is built, so that blocks
    /// left from an earlier session are not reported.
    ///
    /// Default: `true`
    pub fn reset_on_start(mut self, reset: bool) -> Self {
        self.reset_on_start = reset;
        self
    }

    /// Uses a different context than the process-wide [`MALLOC_HOOKS`].
    pub fn hooks(mut self, hooks: &'static MallocHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build(self) -> HooksGuard {
        if config::is_disabled() {
            let _scope = ReentrancyGuard::enter();
            tracing::debug!(caller = self.caller_name, "malloc hooks disabled by env");
            return HooksGuard { session: None };
        }

        let reporter = match self.reporter {
            ReporterConfig::Custom(reporter) => reporter,
            ReporterConfig::Format(format) => {
                output::reporter_for(config::format_override().unwrap_or(format))
            }
            ReporterConfig::None => {
                output::reporter_for(config::format_override().unwrap_or_default())
            }
        };

        self.hooks.init_once();
        if self.reset_on_start {
            self.hooks.reset_stats();
        }

        HooksGuard {
            session: Some(Session {
                hooks: self.hooks,
                caller_name: self.caller_name,
                reporter,
                start_time: Instant::now(),
            }),
        }
    }
}

struct Session {
    hooks: &'static MallocHooks,
    caller_name: &'static str,
    reporter: Box<dyn Reporter>,
    start_time: Instant,
}

/// Keeps the hooks installed while alive. Built with [`GuardBuilder`] or the
/// `#[malloc_hooks::main]` attribute.
pub struct HooksGuard {
    session: Option<Session>,
}

impl HooksGuard {
    /// `false` for a guard disabled through `MALLOC_HOOKS_DISABLED`.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Current statistics of the guarded context.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.session.as_ref().map(|session| session.hooks.snapshot())
    }
}

impl Drop for HooksGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        let snapshot = session.hooks.snapshot();
        let total_elapsed = session.start_time.elapsed().as_nanos() as u64;

        // Reporting runs uninstrumented.
        session.hooks.tear_down();

        let report = Report {
            caller_name: session.caller_name.to_string(),
            total_elapsed,
            snapshot,
        };

        if let Err(err) = session.reporter.report(&report) {
            tracing::warn!(caller = session.caller_name, "failed to report malloc hooks stats: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct CollectingReporter(Arc<Mutex<Vec<Report>>>);

    impl Reporter for CollectingReporter {
        fn report(&self, report: &Report) -> Result<(), Box<dyn std::error::Error>> {
            self.0.lock().unwrap().push(report.clone());
            Ok(())
        }
    }

    struct FailingReporter;

    impl Reporter for FailingReporter {
        fn report(&self, _report: &Report) -> Result<(), Box<dyn std::error::Error>> {
            Err("sink closed".into())
        }
    }

    #[test]
    fn test_guard_reports_and_tears_down() {
        static HOOKS: MallocHooks = MallocHooks::new();
        let reports = Arc::new(Mutex::new(Vec::new()));

        let guard = GuardBuilder::new("guard::test")
            .hooks(&HOOKS)
            .reporter(Box::new(CollectingReporter(Arc::clone(&reports))))
            .build();
        assert!(guard.is_active());
        assert!(HOOKS.is_installed());

        HOOKS.record_alloc(0x1000 as *mut u8, 64);
        HOOKS.record_alloc(0x2000 as *mut u8, 128);
        assert_eq!(guard.snapshot().map(|s| s.allocation_count), Some(2));
        drop(guard);

        assert!(!HOOKS.is_installed());
        assert!(HOOKS.snapshot().is_empty());

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].caller_name, "guard::test");
        assert_eq!(reports[0].snapshot.allocation_count, 2);
        assert_eq!(reports[0].snapshot.heap_allocated_memory_in_bytes, 192);
    }

    #[test]
    fn test_guard_resets_leftovers_on_start() {
        static HOOKS: MallocHooks = MallocHooks::new();
        HOOKS.init_once();
        HOOKS.record_alloc(0x1000 as *mut u8, 64);

        let guard = GuardBuilder::new("guard::reset")
            .hooks(&HOOKS)
            .reporter(Box::new(FailingReporter))
            .build();
        assert_eq!(guard.snapshot(), Some(Snapshot::ZERO));

        // A failing reporter must not panic in drop.
        drop(guard);
        assert!(!HOOKS.is_installed());
    }

    #[test]
    fn test_guard_keeps_leftovers_when_asked() {
        static HOOKS: MallocHooks = MallocHooks::new();
        HOOKS.init_once();
        HOOKS.record_alloc(0x1000 as *mut u8, 64);

        let guard = GuardBuilder::new("guard::keep")
            .hooks(&HOOKS)
            .reset_on_start(false)
            .reporter(Box::new(FailingReporter))
            .build();
        assert_eq!(guard.snapshot().map(|s| s.allocation_count), Some(1));
    }
}
