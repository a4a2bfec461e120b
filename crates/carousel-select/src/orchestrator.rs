//! Slot-by-slot product selection.
//!
//! Each slot tries its search attempts in order (exact, then relaxed), then
//! a random pick from the fallback folder. Slots run sequentially because
//! every pick is excluded from the slots after it.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use carousel_core::{Error, Result, SelectionSettings};
use carousel_llm::TextGenerator;
use carousel_storage::{list_images, object_path, ObjectStorage};
use carousel_store::{Catalog, TaggedItem};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::criteria::{plan_attempts, CriteriaBundle, SearchCriteria};
use crate::extractor::CriteriaExtractor;
use crate::resolver::UrlResolver;
use crate::search::TagSearchEngine;
use crate::shuffle::Shuffler;
use crate::smart::SmartMatcher;
use crate::types::{SelectionResult, SmartImage};

pub struct ProductSelector {
    extractor: CriteriaExtractor,
    search: TagSearchEngine,
    smart: SmartMatcher,
    resolver: UrlResolver,
    storage: Arc<dyn ObjectStorage>,
    shuffler: Arc<Shuffler>,
    settings: SelectionSettings,
}

impl ProductSelector {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        storage: Arc<dyn ObjectStorage>,
        generator: Option<Arc<dyn TextGenerator>>,
        settings: SelectionSettings,
    ) -> Self {
        let shuffler = Arc::new(Shuffler::from_entropy());
        let search = TagSearchEngine::new(catalog.clone(), shuffler.clone(), settings.search_limit)
            .in_folder(settings.catalog_folder.clone());
        let smart = SmartMatcher::new(
            catalog,
            generator.clone(),
            shuffler.clone(),
            settings.search_limit,
        );
        let resolver = UrlResolver::new(
            storage.clone(),
            Duration::from_secs(settings.signed_url_ttl_secs),
        );

        Self {
            extractor: CriteriaExtractor::new(generator),
            search,
            smart,
            resolver,
            storage,
            shuffler,
            settings,
        }
    }

    /// Make shuffling repeatable.
    pub fn with_seed(self, seed: u64) -> Self {
        self.shuffler.reseed(seed);
        self
    }

    pub fn extractor(&self) -> &CriteriaExtractor {
        &self.extractor
    }

    /// Topic in, one result per slot out.
    pub async fn select_products(&self, topic: &str) -> Result<Vec<SelectionResult>> {
        let request_id = Uuid::new_v4();
        async {
            info!("Selecting products for topic \"{}\"", topic);
            let bundle = self.extractor.extract(topic).await;
            self.fill_slots(&bundle).await
        }
        .instrument(info_span!("select", %request_id))
        .await
    }

    /// Select for an already-built bundle (explicit structure or count).
    pub async fn select(&self, bundle: &CriteriaBundle) -> Result<Vec<SelectionResult>> {
        let request_id = Uuid::new_v4();
        self.fill_slots(bundle)
            .instrument(info_span!("select", %request_id))
            .await
    }

    async fn fill_slots(&self, bundle: &CriteriaBundle) -> Result<Vec<SelectionResult>> {
        let slots = bundle.slot_count(self.settings.default_count, self.settings.max_count);
        info!("Filling {} slots", slots);

        let mut used: HashSet<String> = HashSet::new();
        let mut results = Vec::with_capacity(slots);

        for slot in 0..slots {
            let criteria = bundle.criteria_for_slot(slot);
            let item = self.pick_for_slot(slot, &criteria, &used).await?;
            let url = self.resolver.resolve(&item.image_path).await?;

            debug!("Slot {}: {}", slot + 1, item.image_path);
            used.insert(item.image_path.clone());
            results.push(SelectionResult::product(
                url,
                item.image_name,
                item.image_path,
                criteria.sentiment,
            ));
        }

        info!("Selected {} product images", results.len());
        Ok(results)
    }

    async fn pick_for_slot(
        &self,
        slot: usize,
        criteria: &SearchCriteria,
        used: &HashSet<String>,
    ) -> Result<TaggedItem> {
        for (attempt, relaxed) in plan_attempts(criteria).iter().enumerate() {
            if let Some(item) = self.search.search(relaxed, used).await.into_iter().next() {
                if attempt > 0 {
                    info!(
                        "Slot {}: matched after relaxing to [{}]",
                        slot + 1,
                        relaxed.tags().join(", ")
                    );
                }
                return Ok(item);
            }
        }

        info!(
            "Slot {}: no catalog match for [{}], using fallback folder",
            slot + 1,
            criteria.tags().join(", ")
        );
        self.fallback_pick(&self.settings.fallback_folder, used).await
    }

    /// One image per prompt from `folder`: the best tag overlap for the
    /// prompt's keywords, else a random unused image from the folder.
    pub async fn select_smart(&self, prompts: &[String], folder: &str) -> Result<Vec<SmartImage>> {
        let request_id = Uuid::new_v4();
        async {
            let available = self.smart.available_tags(folder).await;
            info!(
                "Matching {} prompts against {} tags in {}",
                prompts.len(),
                available.len(),
                folder
            );

            let mut used: HashSet<String> = HashSet::new();
            let mut images = Vec::with_capacity(prompts.len());
            for (slot, prompt) in prompts.iter().enumerate() {
                let keywords = self.smart.keywords_for(prompt, &available).await;
                let (item, match_score) =
                    match self.smart.best_match(&keywords, folder, &used).await {
                        Some(scored) => (scored.item, scored.match_score),
                        None => {
                            info!(
                                "Slot {}: no tagged match for [{}], picking at random",
                                slot + 1,
                                keywords.join(", ")
                            );
                            (self.fallback_pick(folder, &used).await?, 0)
                        }
                    };
                let url = self.resolver.resolve(&item.image_path).await?;

                debug!("Slot {}: {} (score {})", slot + 1, item.image_path, match_score);
                used.insert(item.image_path.clone());
                images.push(SmartImage {
                    url,
                    name: item.image_name,
                    image_path: item.image_path,
                    keywords,
                    match_score,
                });
            }
            Ok::<_, Error>(images)
        }
        .instrument(info_span!("select_smart", %request_id))
        .await
    }

    /// Random unused image from `folder`.
    async fn fallback_pick(&self, folder: &str, used: &HashSet<String>) -> Result<TaggedItem> {
        let objects = match list_images(
            self.storage.as_ref(),
            folder,
            self.settings.fallback_list_limit,
        )
        .await
        {
            Ok(objects) => objects,
            Err(e) => {
                warn!("Listing folder {} failed: {}", folder, e);
                Vec::new()
            }
        };

        let candidates: Vec<TaggedItem> = objects
            .into_iter()
            .map(|o| TaggedItem {
                image_path: object_path(folder, &o.name),
                image_name: o.name,
                folder: folder.to_string(),
                tags: Vec::new(),
            })
            .filter(|item| !used.contains(&item.image_path))
            .collect();

        self.shuffler
            .diversify(candidates, |item| item.image_name.as_str())
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::NoProductsAvailable(format!(
                    "no unused product images left in '{}'",
                    folder
                ))
            })
    }

    /// Up to `count` random images from `folder` as signed URLs.
    pub async fn random_images(&self, folder: &str, count: usize) -> Result<Vec<String>> {
        let objects = list_images(
            self.storage.as_ref(),
            folder,
            self.settings.fallback_list_limit,
        )
        .await?;
        if objects.is_empty() {
            return Err(Error::NotFound(format!("No images found in '{}'", folder)));
        }

        let picked = self.shuffler.diversify(objects, |o| o.name.as_str());
        let mut urls = Vec::with_capacity(count.min(picked.len()));
        for object in picked.into_iter().take(count) {
            urls.push(self.resolver.resolve(&object_path(folder, &object.name)).await?);
        }
        Ok(urls)
    }
}
