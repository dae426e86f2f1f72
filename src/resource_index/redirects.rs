//! Post-ingestion redirect resolution.
//!
//! After ingestion, a canonical key whose selected snapshot is a redirect is
//! re-pointed at the snapshot selected for the redirect's target. Lookups
//! through that key then land on the target directly.

use std::collections::HashSet;

use url::Url;

use super::{ResourceIndex, Snapshot, SnapshotId};
use crate::utils::DEFAULT_MAX_REDIRECT_HOPS;

/// How far a redirect entry is followed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectResolution {
    /// Substitute each redirect with its target's entry once. Targets are
    /// read from the index as it was before the pass, so chains of three or
    /// more are only shortened by one hop.
    #[default]
    SingleHop,
    /// Follow chains until a non-redirect, a missing target, a cycle, or
    /// `max_hops` substitutions.
    FixedPoint { max_hops: usize },
}

impl RedirectResolution {
    #[must_use]
    pub fn fixed_point() -> Self {
        Self::FixedPoint {
            max_hops: DEFAULT_MAX_REDIRECT_HOPS,
        }
    }

    fn max_hops(self) -> usize {
        match self {
            Self::SingleHop => 1,
            Self::FixedPoint { max_hops } => max_hops,
        }
    }
}

/// Counters reported by a resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Redirect entries examined
    pub redirects: usize,
    /// Entries re-pointed at another snapshot
    pub resolved: usize,
    /// Entries whose target was not archived
    pub unresolved: usize,
    /// Chains cut short by a cycle
    pub cycles: usize,
}

impl ResourceIndex {
    /// Re-point redirect entries at their targets.
    ///
    /// Run once after ingestion and before rewriting. Every hop reads the
    /// key map as it was before the pass, so the result does not depend on
    /// map iteration order.
    pub fn resolve_redirects(&mut self, mode: RedirectResolution) -> ResolutionStats {
        let before = self.by_url_key.clone();
        let max_hops = mode.max_hops();
        let mut stats = ResolutionStats::default();

        for (key, start) in &before {
            if !self.snapshot(*start).is_redirect() {
                continue;
            }
            stats.redirects += 1;

            let mut current = *start;
            let mut visited: HashSet<SnapshotId> = HashSet::from([current]);
            let mut hops = 0;

            while hops < max_hops && self.snapshot(current).is_redirect() {
                let Some(next) = self
                    .redirect_key(self.snapshot(current))
                    .and_then(|target_key| before.get(&target_key).copied())
                else {
                    break;
                };

                if !visited.insert(next) {
                    if next != current {
                        log::warn!(
                            "Redirect cycle reached from {}, keeping {}",
                            self.snapshot(*start).url(),
                            self.snapshot(current).url()
                        );
                        stats.cycles += 1;
                    }
                    break;
                }
                current = next;
                hops += 1;
            }

            if current == *start {
                log::debug!(
                    "Redirect target not archived: {} -> {}",
                    self.snapshot(*start).url(),
                    self.snapshot(*start).redirect_target().unwrap_or_default()
                );
                stats.unresolved += 1;
            } else {
                log::debug!(
                    "Resolved redirect {} -> {}",
                    self.snapshot(*start).url(),
                    self.snapshot(current).url()
                );
                stats.resolved += 1;
                self.by_url_key.insert(key.clone(), current);
            }
        }

        log::info!(
            "Redirects: {} examined, {} resolved, {} unresolved",
            stats.redirects,
            stats.resolved,
            stats.unresolved
        );
        stats
    }

    /// Canonical key of a redirect's target, resolving a relative
    /// `Location` against the redirect's own URL
    pub(crate) fn redirect_key(&self, snapshot: &Snapshot) -> Option<String> {
        let location = snapshot.redirect_target()?;
        let target = Url::parse(snapshot.url()).ok()?.join(location).ok()?;
        self.url_key(target.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::test_support::{record, redirect};
    use super::*;
    use crate::config::ForcedExtensions;

    fn index() -> ResourceIndex {
        ResourceIndex::new(Arc::new(ForcedExtensions::builtin().unwrap()))
    }

    fn selected(index: &ResourceIndex, url: &str) -> String {
        index.lookup(url).unwrap().1.url().to_string()
    }

    #[test]
    fn test_redirect_to_content_is_replaced() {
        let mut index = index();
        index.add(redirect("http://ex.org/old", "http://ex.org/new", 1)).unwrap();
        index.add(record("http://ex.org/new", "text/html", 200, 1)).unwrap();

        let stats = index.resolve_redirects(RedirectResolution::SingleHop);
        assert_eq!(stats.resolved, 1);
        assert_eq!(selected(&index, "http://ex.org/old"), "http://ex.org/new");
    }

    #[test]
    fn test_relative_location_resolves_against_source() {
        let mut index = index();
        index.add(redirect("http://ex.org/dir/old", "new", 1)).unwrap();
        index.add(record("http://ex.org/dir/new", "text/html", 200, 1)).unwrap();

        index.resolve_redirects(RedirectResolution::SingleHop);
        assert_eq!(selected(&index, "http://ex.org/dir/old"), "http://ex.org/dir/new");
    }

    #[test]
    fn test_missing_target_left_unchanged() {
        let mut index = index();
        index.add(redirect("http://ex.org/old", "http://elsewhere.org/", 1)).unwrap();

        let stats = index.resolve_redirects(RedirectResolution::SingleHop);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(selected(&index, "http://ex.org/old"), "http://ex.org/old");
    }

    #[test]
    fn test_single_hop_shortens_chain_by_one() {
        let mut index = index();
        index.add(redirect("http://ex.org/a", "/b", 1)).unwrap();
        index.add(redirect("http://ex.org/b", "/c", 1)).unwrap();
        index.add(record("http://ex.org/c", "text/html", 200, 1)).unwrap();

        index.resolve_redirects(RedirectResolution::SingleHop);
        assert_eq!(selected(&index, "http://ex.org/a"), "http://ex.org/b");
        assert_eq!(selected(&index, "http://ex.org/b"), "http://ex.org/c");
    }

    #[test]
    fn test_fixed_point_collapses_chain() {
        let mut index = index();
        index.add(redirect("http://ex.org/a", "/b", 1)).unwrap();
        index.add(redirect("http://ex.org/b", "/c", 1)).unwrap();
        index.add(record("http://ex.org/c", "text/html", 200, 1)).unwrap();

        index.resolve_redirects(RedirectResolution::fixed_point());
        assert_eq!(selected(&index, "http://ex.org/a"), "http://ex.org/c");
    }

    #[test]
    fn test_fixed_point_stops_on_cycle() {
        let mut index = index();
        index.add(redirect("http://ex.org/a", "/b", 1)).unwrap();
        index.add(redirect("http://ex.org/b", "/a", 1)).unwrap();

        let stats = index.resolve_redirects(RedirectResolution::fixed_point());
        assert_eq!(stats.cycles, 2);
        assert_eq!(selected(&index, "http://ex.org/a"), "http://ex.org/b");
        assert_eq!(selected(&index, "http://ex.org/b"), "http://ex.org/a");
    }

    #[test]
    fn test_scheme_upgrade_redirect_points_at_itself() {
        let mut index = index();
        index.add(redirect("http://ex.org/", "https://ex.org/", 1)).unwrap();

        let stats = index.resolve_redirects(RedirectResolution::fixed_point());
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.cycles, 0);
    }
}
