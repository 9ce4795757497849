/*!
 * Subtitle resolution cascade.
 *
 * Probes run one at a time in the order of [`PROBES`] and the first hit
 * wins. The catalog is fetched at most once per resolution and filtered
 * locally for every catalog probe.
 */

use log::{debug, info, warn};
use std::sync::Arc;

use crate::language_utils::LanguageCode;
use crate::media::{MediaRef, SubtitleCandidate};
use crate::sources::{CatalogSource, SourceCredentials, SubtitleSource};

/// Which adapter a probe queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapter {
    Episodic,
    Catalog,
    BestEffort,
}

/// Which language a probe asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageFilter {
    Target,
    Pivot,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub adapter: Adapter,
    pub filter: LanguageFilter,
}

const fn probe(adapter: Adapter, filter: LanguageFilter) -> Probe {
    Probe { adapter, filter }
}

/// Probe order: target pass, pivot pass, then any-language fallbacks
pub const PROBES: [Probe; 8] = [
    probe(Adapter::Episodic, LanguageFilter::Target),
    probe(Adapter::Catalog, LanguageFilter::Target),
    probe(Adapter::BestEffort, LanguageFilter::Target),
    probe(Adapter::Episodic, LanguageFilter::Pivot),
    probe(Adapter::Catalog, LanguageFilter::Pivot),
    probe(Adapter::BestEffort, LanguageFilter::Pivot),
    probe(Adapter::Catalog, LanguageFilter::Any),
    probe(Adapter::BestEffort, LanguageFilter::Any),
];

/// A candidate together with the probe that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub candidate: SubtitleCandidate,
    /// 1-based position in [`PROBES`]
    pub step: usize,
    pub probe: Probe,
}

#[derive(Clone)]
pub struct Cascade {
    episodic: Arc<dyn SubtitleSource>,
    catalog: Arc<dyn CatalogSource>,
    best_effort: Arc<dyn SubtitleSource>,
    pivot: LanguageCode,
}

impl Cascade {
    pub fn new(
        episodic: Arc<dyn SubtitleSource>,
        catalog: Arc<dyn CatalogSource>,
        best_effort: Arc<dyn SubtitleSource>,
        pivot: LanguageCode,
    ) -> Self {
        Self {
            episodic,
            catalog,
            best_effort,
            pivot,
        }
    }

    pub fn pivot(&self) -> &LanguageCode {
        &self.pivot
    }

    /// Find the best candidate for `media` in `target`
    ///
    /// Source failures count as misses. `None` only when every probe missed.
    pub async fn resolve(
        &self,
        media: &MediaRef,
        target: &LanguageCode,
        credentials: &SourceCredentials,
    ) -> Option<Resolution> {
        let mut catalog: Option<Vec<SubtitleCandidate>> = None;

        for (index, probe) in PROBES.iter().enumerate() {
            let step = index + 1;

            let language = match probe.filter {
                LanguageFilter::Target => Some(target),
                // Same language twice would only repeat the target pass
                LanguageFilter::Pivot if &self.pivot == target => continue,
                LanguageFilter::Pivot => Some(&self.pivot),
                LanguageFilter::Any => None,
            };

            let found = match probe.adapter {
                Adapter::Episodic if !media.is_series() => continue,
                Adapter::Episodic => self.query(self.episodic.as_ref(), media, language, credentials).await,
                Adapter::BestEffort => self.query(self.best_effort.as_ref(), media, language, credentials).await,
                Adapter::Catalog => {
                    if catalog.is_none() {
                        catalog = Some(self.fetch_catalog(media).await);
                    }
                    catalog
                        .as_deref()
                        .and_then(|entries| Self::pick(entries, language))
                }
            };

            if let Some(candidate) = found {
                info!(
                    "Resolved {} for {} at step {} via {} ({})",
                    candidate.lang, media, step, candidate.source_name, candidate.raw_lang
                );
                return Some(Resolution {
                    candidate,
                    step,
                    probe: *probe,
                });
            }
        }

        info!("No subtitle found for {} in any language", media);
        None
    }

    async fn query(
        &self,
        source: &dyn SubtitleSource,
        media: &MediaRef,
        language: Option<&LanguageCode>,
        credentials: &SourceCredentials,
    ) -> Option<SubtitleCandidate> {
        match source.find(media, language, credentials).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Source {} failed for {}: {}", source.name(), media, e);
                None
            }
        }
    }

    async fn fetch_catalog(&self, media: &MediaRef) -> Vec<SubtitleCandidate> {
        match self.catalog.list(media).await {
            Ok(entries) => {
                debug!("Catalog {} returned {} entries", self.catalog.name(), entries.len());
                entries
            }
            Err(e) => {
                warn!("Catalog {} failed for {}: {}", self.catalog.name(), media, e);
                Vec::new()
            }
        }
    }

    fn pick(entries: &[SubtitleCandidate], language: Option<&LanguageCode>) -> Option<SubtitleCandidate> {
        match language {
            Some(wanted) => entries.iter().find(|entry| &entry.lang == wanted).cloned(),
            None => entries.first().cloned(),
        }
    }
}
