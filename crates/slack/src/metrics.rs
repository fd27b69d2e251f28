use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UsageLabels {
    pub group: Option<String>,
    pub command: Option<String>,
    pub text: Option<String>,
    pub user_id: String,
}

impl UsageLabels {
    pub fn new(group: &str, command: &str, text: &str, user_id: &str) -> Self {
        let label = |value: &str| (!value.is_empty()).then(|| value.to_owned());
        Self {
            group: label(group),
            command: label(command),
            text: label(text),
            user_id: user_id.to_owned(),
        }
    }
}

pub const DEFAULT_LABEL_LIMIT: usize = 10_000;

/// `user_id` of the series that absorbs label sets past the limit.
pub const OVERFLOW_USER: &str = "overflow";

/// Process-wide `requests` counter shared by all concurrent dispatches.
///
/// Free-form request text and user ids make the label space unbounded, so
/// the number of distinct series is capped. Once `label_limit` series exist,
/// unseen label sets are counted under their group and command alone with
/// [`OVERFLOW_USER`]. `total` is never capped. Concurrent first inserts can
/// push the map a few entries past the limit.
#[derive(Debug)]
pub struct UsageMeter {
    requests: DashMap<UsageLabels, u64>,
    total: AtomicU64,
    label_limit: usize,
}

impl Default for UsageMeter {
    fn default() -> Self {
        Self::with_label_limit(DEFAULT_LABEL_LIMIT)
    }
}

impl UsageMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label_limit(label_limit: usize) -> Self {
        Self { requests: DashMap::new(), total: AtomicU64::new(0), label_limit }
    }

    pub fn record(&self, group: &str, command: &str, text: &str, user_id: &str) {
        let mut labels = UsageLabels::new(group, command, text, user_id);
        if self.requests.len() >= self.label_limit && !self.requests.contains_key(&labels) {
            labels = UsageLabels { text: None, user_id: OVERFLOW_USER.to_owned(), ..labels };
        }
        *self.requests.entry(labels).or_insert(0) += 1;
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Counter values sorted by labels.
    pub fn snapshot(&self) -> Vec<(UsageLabels, u64)> {
        let mut entries: Vec<(UsageLabels, u64)> =
            self.requests.iter().map(|entry| (entry.key().clone(), *entry.value())).collect();
        entries.sort();
        entries
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{UsageLabels, UsageMeter, OVERFLOW_USER};

    #[test]
    fn empty_labels_are_omitted() {
        let labels = UsageLabels::new("", "help", "", "U1");
        assert_eq!(labels.group, None);
        assert_eq!(labels.command.as_deref(), Some("help"));
        assert_eq!(labels.text, None);
    }

    #[test]
    fn record_counts_per_label_set() {
        let meter = UsageMeter::new();
        meter.record("k8s", "pods", "k8s pods", "U1");
        meter.record("k8s", "pods", "k8s pods", "U1");
        meter.record("", "help", "help", "U2");

        assert_eq!(meter.total(), 3);
        let snapshot = meter.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains(&(UsageLabels::new("k8s", "pods", "k8s pods", "U1"), 2)));
    }

    #[test]
    fn label_sets_past_the_limit_fold_into_overflow_series() {
        let meter = UsageMeter::with_label_limit(2);
        meter.record("k8s", "pods", "k8s pods", "U1");
        meter.record("", "echo", "echo one", "U1");
        meter.record("", "echo", "echo two", "U2");
        meter.record("", "echo", "echo three", "U3");
        meter.record("k8s", "pods", "k8s pods", "U1");

        assert_eq!(meter.total(), 5);
        let snapshot = meter.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.contains(&(UsageLabels::new("k8s", "pods", "k8s pods", "U1"), 2)));
        assert!(snapshot.contains(&(UsageLabels::new("", "echo", "", OVERFLOW_USER), 2)));
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let meter = Arc::new(UsageMeter::new());
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let meter = Arc::clone(&meter);
            tasks.push(tokio::spawn(async move {
                for _ in 0..100 {
                    meter.record("", "uptime", "uptime", "U1");
                }
            }));
        }
        for task in tasks {
            task.await.expect("task");
        }

        assert_eq!(meter.total(), 800);
        assert_eq!(meter.snapshot()[0].1, 800);
    }
}
