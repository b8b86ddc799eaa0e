//! Creation time resolution

use chrono::{DateTime, Utc};
use futures::{Stream, TryStreamExt};
use rgsweep_api::{CREATED_TIME_TAG, ChildResource, ResourceGroupView};
use rgsweep_util::{format_timestamp, parse_timestamp};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Where a resolved creation time came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeSource {
    /// Platform system metadata on the group
    SystemMetadata,
    /// `CreatedTime` tag
    Tag,
    /// Earliest contained resource
    ChildResources { scanned: usize },
    /// No signal anywhere; the caller persists `now` as a tag
    Backfill,
}

impl fmt::Display for AgeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgeSource::SystemMetadata => f.write_str("system metadata"),
            AgeSource::Tag => f.write_str("tag"),
            AgeSource::ChildResources { scanned } => write!(f, "child resources ({} scanned)", scanned),
            AgeSource::Backfill => f.write_str("backfill"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAge {
    pub created_on: DateTime<Utc>,
    pub source: AgeSource,
}

impl ResolvedAge {
    pub fn requires_backfill(&self) -> bool {
        self.source == AgeSource::Backfill
    }

    /// The group's tags with `CreatedTime` set to this creation time.
    ///
    /// Any existing spelling of the tag key is replaced.
    pub fn backfill_tags(&self, existing: Option<&HashMap<String, String>>) -> HashMap<String, String> {
        let mut tags: HashMap<String, String> = existing
            .into_iter()
            .flatten()
            .filter(|(key, _)| !key.eq_ignore_ascii_case(CREATED_TIME_TAG))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        tags.insert(CREATED_TIME_TAG.to_string(), format_timestamp(&self.created_on));
        tags
    }
}

/// Determines a group's creation time from the best available signal
#[derive(Debug, Clone)]
pub struct AgeResolver {
    ttl: chrono::Duration,
}

impl AgeResolver {
    pub fn new(ttl: chrono::Duration) -> Self {
        Self { ttl }
    }

    /// Resolve the creation time of `group`.
    ///
    /// `children` is only called when neither system metadata nor the tag
    /// gives a timestamp. The child scan stops as soon as the running minimum
    /// proves the group expired.
    pub async fn resolve<F, S, E>(
        &self,
        group: &ResourceGroupView,
        children: F,
        now: DateTime<Utc>,
    ) -> Result<ResolvedAge, E>
    where
        F: FnOnce() -> S,
        S: Stream<Item = Result<ChildResource, E>>,
    {
        if let Some(created_on) = group.system_created_on {
            return Ok(ResolvedAge {
                created_on,
                source: AgeSource::SystemMetadata,
            });
        }

        if let Some(value) = group.tag(CREATED_TIME_TAG) {
            match parse_timestamp(value) {
                Some(created_on) => {
                    return Ok(ResolvedAge {
                        created_on,
                        source: AgeSource::Tag,
                    });
                }
                None => debug!(group = %group.name, value, "Ignoring unparseable CreatedTime tag"),
            }
        }

        let mut stream = std::pin::pin!(children());
        let mut earliest: Option<DateTime<Utc>> = None;
        let mut scanned = 0;

        while let Some(child) = stream.try_next().await? {
            scanned += 1;
            let Some(created_on) = child.created_on else {
                continue;
            };
            let min = earliest.map_or(created_on, |current| current.min(created_on));
            earliest = Some(min);

            if min.checked_add_signed(self.ttl).is_some_and(|expiry| expiry <= now) {
                debug!(group = %group.name, scanned, "Child scan short-circuited, group already expired");
                break;
            }
        }

        Ok(match earliest {
            Some(created_on) => ResolvedAge {
                created_on,
                source: AgeSource::ChildResources { scanned },
            },
            None => ResolvedAge {
                created_on: now,
                source: AgeSource::Backfill,
            },
        })
    }
}
