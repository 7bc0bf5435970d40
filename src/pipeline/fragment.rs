use crate::labels::{LabelResolver, LabelSet};
use crate::syslog::message::LogRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One log line: unix timestamp in nanoseconds (as a decimal string) and text.
///
/// Serialises as the two element array Loki expects in `values`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry(pub String, pub String);

impl Entry {
    pub fn new(timestamp: DateTime<Utc>, line: impl Into<String>) -> Self {
        let nanos = timestamp
            .timestamp_nanos_opt()
            .or_else(|| Utc::now().timestamp_nanos_opt())
            .unwrap_or_default();
        Self(nanos.to_string(), line.into())
    }

    pub fn timestamp_nanos(&self) -> &str {
        &self.0
    }

    pub fn line(&self) -> &str {
        &self.1
    }
}

/// A labelled group of entries, the unit that travels through the pipeline
/// and, after merging, one element of a push request's `streams`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFragment {
    #[serde(rename = "stream")]
    pub labels: LabelSet,
    #[serde(rename = "values")]
    pub entries: Vec<Entry>,
}

impl StreamFragment {
    pub fn new(labels: LabelSet, entry: Entry) -> Self {
        Self {
            labels,
            entries: vec![entry],
        }
    }
}

/// Turns decoded records into single-entry fragments.
#[derive(Debug, Clone)]
pub struct FragmentBuilder {
    resolver: LabelResolver,
}

impl FragmentBuilder {
    pub fn new(resolver: LabelResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &LabelResolver {
        &self.resolver
    }

    /// Build the fragment for a record.
    ///
    /// Labels are the matched rule's labels plus `tag` and whichever of
    /// `severity`, `facility`, `hostname` and `priority` the record carries.
    /// Records without a timestamp are stamped with `now`.
    pub fn build(&self, record: &LogRecord, now: DateTime<Utc>) -> StreamFragment {
        let resolution = self
            .resolver
            .resolve(record.tag.as_deref(), record.client.as_deref());

        if !resolution.matched {
            tracing::trace!(
                component = "syslog",
                tag = %resolution.tag,
                "No scrape rule matched record"
            );
        }

        let mut labels = resolution.labels;
        labels.insert("tag", resolution.tag);
        if let Some(severity) = record.severity {
            labels.insert("severity", severity.to_string());
        }
        if let Some(facility) = record.facility {
            labels.insert("facility", facility.to_string());
        }
        if let Some(hostname) = &record.hostname {
            labels.insert("hostname", hostname.as_str());
        }
        if let Some(priority) = record.priority {
            labels.insert("priority", priority.to_string());
        }

        let timestamp = record.timestamp.unwrap_or(now);
        StreamFragment::new(labels, Entry::new(timestamp, record.content.as_str()))
    }
}
