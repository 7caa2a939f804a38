use careers_core::{
    CategoryScope, FilterSpec, PageRequest, PositionView, SearchResult, SortKey, Visibility,
};
use careers_storage::StorageError;
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

use crate::{log_degraded, CareerService, ServiceError};

pub const MIN_RELATED_LIMIT: u32 = 1;
pub const MAX_RELATED_LIMIT: u32 = 12;

impl CareerService {
    /// Page request using the configured default page size.
    pub fn page_request(&self, page: Option<u32>, limit: Option<u32>) -> PageRequest {
        PageRequest::new(page, limit, self.config.page_limit)
    }

    /// Public catalog listing. Only open, active positions are returned; a
    /// storage failure yields an empty page.
    pub async fn search(
        &self,
        filter: FilterSpec,
        sort: SortKey,
        page: PageRequest,
    ) -> SearchResult {
        let filter = FilterSpec {
            visibility: Visibility::Listed,
            ..filter
        };
        let span = info_span!(
            "catalog.search",
            sort = sort.as_str(),
            page = page.page,
            limit = page.limit
        );
        match self
            .store
            .search_positions(&filter, sort, page)
            .instrument(span)
            .await
        {
            Ok((positions, total)) => SearchResult::new(positions, total, page),
            Err(err) => {
                log_degraded("search", &err);
                SearchResult::empty(page)
            }
        }
    }

    /// Staff listing: every lifecycle, optional status filter, errors surfaced.
    pub async fn search_staff(
        &self,
        filter: FilterSpec,
        sort: SortKey,
        page: PageRequest,
    ) -> Result<SearchResult, ServiceError> {
        let visibility = match filter.visibility {
            Visibility::Listed => Visibility::Staff { status: None },
            staff => staff,
        };
        let filter = FilterSpec { visibility, ..filter };
        let (positions, total) = self
            .store
            .search_positions(&filter, sort, page)
            .instrument(info_span!("catalog.search_staff", sort = sort.as_str()))
            .await?;
        Ok(SearchResult::new(positions, total, page))
    }

    /// Listed position by slug, with skills. Counts the view.
    pub async fn get_by_slug(&self, slug: &str) -> Option<PositionView> {
        let slug = slug.trim();
        if slug.is_empty() {
            return None;
        }
        let mut view = match self
            .store
            .find_position_by_slug(slug, Visibility::Listed)
            .await
        {
            Ok(view) => view?,
            Err(err) => {
                log_degraded("get_by_slug", &err);
                return None;
            }
        };

        // read-then-write; concurrent views may overwrite each other
        let views = view.position.views_count.saturating_add(1);
        match self.store.set_views_count(view.position.id, views).await {
            Ok(()) => view.position.views_count = views,
            Err(err) => warn!(
                position_id = %view.position.id,
                error = %err,
                "view counter update failed"
            ),
        }
        Some(view)
    }

    /// Any position by slug regardless of status or lifecycle. Views are not counted.
    pub async fn position_for_staff(&self, slug: &str) -> Result<PositionView, ServiceError> {
        self.store
            .find_position_by_slug(slug.trim(), Visibility::Staff { status: None })
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                entity: "position",
                key: slug.to_string(),
            })
    }

    /// Up to `limit` listed positions near `position_id`: same category first,
    /// then newest from elsewhere.
    pub async fn get_related(
        &self,
        position_id: Uuid,
        category_id: Option<Uuid>,
        limit: Option<u32>,
    ) -> Vec<PositionView> {
        let limit = limit
            .unwrap_or(self.config.related_limit)
            .clamp(MIN_RELATED_LIMIT, MAX_RELATED_LIMIT);
        match self
            .related(position_id, category_id, limit)
            .instrument(info_span!("catalog.related", %position_id, limit))
            .await
        {
            Ok(related) => related,
            Err(err) => {
                log_degraded("get_related", &err);
                Vec::new()
            }
        }
    }

    async fn related(
        &self,
        position_id: Uuid,
        category_id: Option<Uuid>,
        limit: u32,
    ) -> Result<Vec<PositionView>, StorageError> {
        let Some(category_id) = category_id else {
            return self
                .store
                .list_related(CategoryScope::Any, &[position_id], limit)
                .await;
        };

        let mut related = self
            .store
            .list_related(CategoryScope::Within(category_id), &[position_id], limit)
            .await?;
        let missing = (limit as usize).saturating_sub(related.len());
        if missing > 0 {
            let exclude = std::iter::once(position_id)
                .chain(related.iter().map(|view| view.position.id))
                .collect::<Vec<_>>();
            let backfill = self
                .store
                .list_related(CategoryScope::Outside(category_id), &exclude, missing as u32)
                .await?;
            related.extend(backfill);
        }
        Ok(related)
    }
}
