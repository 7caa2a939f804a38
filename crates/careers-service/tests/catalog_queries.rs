mod common;

use std::collections::HashSet;

use careers_core::{FilterSpec, PageRequest, PositionStatus, ReferenceKind, SortKey};
use careers_service::ServiceError;
use common::{position_id, reference_id, seeded_service, unavailable_service, LogBuffer};

const LISTED: u64 = 9;

fn slugs(result: &careers_core::SearchResult) -> Vec<&str> {
    result
        .positions
        .iter()
        .map(|view| view.position.slug.as_str())
        .collect()
}

#[tokio::test]
async fn public_search_only_returns_listed_positions() {
    let service = seeded_service().await;
    let filters = [
        FilterSpec::listed(),
        FilterSpec {
            category: Some("engineering".into()),
            ..FilterSpec::listed()
        },
        FilterSpec {
            search: Some("engineer".into()),
            ..FilterSpec::listed()
        },
        // a staff visibility in the request is ignored by the public search
        FilterSpec::staff(Some(PositionStatus::Draft)),
    ];
    for filter in filters {
        let result = service
            .search(filter, SortKey::Newest, PageRequest::new(None, Some(100), 12))
            .await;
        assert!(!result.positions.is_empty());
        for view in &result.positions {
            assert!(view.position.is_listed(), "{} leaked", view.position.slug);
        }
    }
}

#[tokio::test]
async fn pages_cover_every_match_once() {
    let service = seeded_service().await;
    let mut seen = HashSet::new();
    let first = service
        .search(FilterSpec::listed(), SortKey::Newest, PageRequest::new(Some(1), Some(4), 12))
        .await;
    assert_eq!(first.total, LISTED);
    assert_eq!(first.total_pages, 3);

    for page in 1..=first.total_pages as u32 {
        let result = service
            .search(
                FilterSpec::listed(),
                SortKey::Newest,
                PageRequest::new(Some(page), Some(4), 12),
            )
            .await;
        for view in result.positions {
            assert!(seen.insert(view.position.id), "duplicate across pages");
        }
    }
    assert_eq!(seen.len() as u64, LISTED);

    let beyond = service
        .search(FilterSpec::listed(), SortKey::Newest, PageRequest::new(Some(9), Some(4), 12))
        .await;
    assert!(beyond.positions.is_empty());
    assert_eq!(beyond.total, LISTED);
}

#[tokio::test]
async fn sort_orders_hold_across_results() {
    let service = seeded_service().await;
    let all = PageRequest::new(None, Some(100), 12);

    let newest = service.search(FilterSpec::listed(), SortKey::Newest, all).await;
    assert!(newest
        .positions
        .windows(2)
        .all(|w| w[0].position.created_at >= w[1].position.created_at));
    assert_eq!(newest.positions[0].position.slug, "staff-rust-engineer");

    let salary = service.search(FilterSpec::listed(), SortKey::SalaryHigh, all).await;
    let maxima: Vec<_> = salary.positions.iter().map(|v| v.position.salary_max).collect();
    let priced: Vec<_> = maxima.iter().flatten().collect();
    assert!(priced.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(maxima.last().copied().flatten(), None, "unpriced rows sort last");

    let titles = service.search(FilterSpec::listed(), SortKey::Title, all).await;
    assert_eq!(titles.positions[0].position.slug, "backend-engineer-payments");

    let deadline = service.search(FilterSpec::listed(), SortKey::Deadline, all).await;
    assert_eq!(slugs(&deadline)[..2], ["data-engineer", "site-reliability-engineer"]);
}

#[tokio::test]
async fn facet_and_range_filters_combine() {
    let service = seeded_service().await;
    let page = PageRequest::default();

    let design = service
        .search(
            FilterSpec {
                category: Some("Design".into()),
                ..FilterSpec::listed()
            },
            SortKey::Newest,
            page,
        )
        .await;
    assert_eq!(slugs(&design), ["ux-researcher", "product-designer"]);

    let remote_engineering = service
        .search(
            FilterSpec {
                category: Some("engineering".into()),
                remote: Some(true),
                ..FilterSpec::listed()
            },
            SortKey::Newest,
            page,
        )
        .await;
    assert_eq!(remote_engineering.total, 4);

    let well_paid = service
        .search(
            FilterSpec {
                salary_min: Some(100_000),
                ..FilterSpec::listed()
            },
            SortKey::Newest,
            page,
        )
        .await;
    assert_eq!(
        slugs(&well_paid),
        ["staff-rust-engineer", "site-reliability-engineer", "backend-engineer-payments"]
    );

    let capped = service
        .search(
            FilterSpec {
                salary_max: Some(90_000),
                ..FilterSpec::listed()
            },
            SortKey::Newest,
            page,
        )
        .await;
    assert_eq!(slugs(&capped), ["frontend-engineer", "product-designer"]);

    let nowhere = service
        .search(
            FilterSpec {
                location: Some("atlantis".into()),
                ..FilterSpec::listed()
            },
            SortKey::Newest,
            page,
        )
        .await;
    assert_eq!(nowhere.total, 0);
    assert_eq!(nowhere.total_pages, 0);
}

#[tokio::test]
async fn search_text_is_literal_and_case_insensitive() {
    let service = seeded_service().await;
    let run = |needle: &'static str| {
        let service = service.clone();
        async move {
            service
                .search(
                    FilterSpec {
                        search: Some(needle.into()),
                        ..FilterSpec::listed()
                    },
                    SortKey::Newest,
                    PageRequest::default(),
                )
                .await
        }
    };

    assert_eq!(slugs(&run("RUST").await), ["staff-rust-engineer", "backend-engineer-payments"]);
    assert_eq!(slugs(&run("100%").await), ["technical-writer"]);
    assert_eq!(run("_").await.total, 0);
    assert_eq!(run("   ").await.total, LISTED);
}

#[tokio::test]
async fn detail_lookup_counts_views_and_hides_unlisted() {
    let service = seeded_service().await;
    let first = service.get_by_slug("platform-engineer").await.expect("listed");
    assert_eq!(first.position.views_count, 41);
    assert_eq!(first.category.as_ref().map(|c| c.slug.as_str()), Some("engineering"));
    let skills: Vec<_> = first.skills.iter().map(|s| s.skill.slug.as_str()).collect();
    assert_eq!(skills, ["kubernetes", "rust", "postgresql"]);

    let second = service.get_by_slug("platform-engineer").await.expect("listed");
    assert_eq!(second.position.views_count, 42);

    assert!(service.get_by_slug("ml-engineer").await.is_none());
    assert!(service.get_by_slug("legacy-integrations-engineer").await.is_none());
    assert!(service.get_by_slug("qa-engineer").await.is_none());
    assert!(service.get_by_slug("").await.is_none());

    let staff = service.position_for_staff("ml-engineer").await.unwrap();
    assert_eq!(staff.position.status, PositionStatus::Draft);
}

#[tokio::test]
async fn related_prefers_same_category_newest_first() {
    let service = seeded_service().await;
    let source = position_id("platform-engineer");
    let engineering = reference_id(ReferenceKind::Category, "engineering");

    let related = service.get_related(source, Some(engineering), Some(3)).await;
    let slugs: Vec<_> = related.iter().map(|v| v.position.slug.as_str()).collect();
    assert_eq!(slugs, ["staff-rust-engineer", "frontend-engineer", "data-engineer"]);
    assert!(related.iter().all(|v| v.position.id != source));
}

#[tokio::test]
async fn related_backfills_from_other_categories() {
    let service = seeded_service().await;
    let source = position_id("product-designer");
    let design = reference_id(ReferenceKind::Category, "design");

    let related = service.get_related(source, Some(design), Some(5)).await;
    let slugs: Vec<_> = related.iter().map(|v| v.position.slug.as_str()).collect();
    assert_eq!(
        slugs,
        [
            "ux-researcher",
            "staff-rust-engineer",
            "frontend-engineer",
            "data-engineer",
            "technical-writer",
        ]
    );
}

#[tokio::test]
async fn related_without_category_and_limit_clamping() {
    let service = seeded_service().await;
    let source = position_id("staff-rust-engineer");

    let related = service.get_related(source, None, None).await;
    let slugs: Vec<_> = related.iter().map(|v| v.position.slug.as_str()).collect();
    assert_eq!(slugs, ["frontend-engineer", "ux-researcher", "data-engineer"]);

    assert_eq!(service.get_related(source, None, Some(0)).await.len(), 1);
    assert_eq!(service.get_related(source, None, Some(50)).await.len(), 8);
}

#[tokio::test]
async fn staff_search_sees_every_lifecycle() {
    let service = seeded_service().await;
    let all = service
        .search_staff(
            FilterSpec::staff(None),
            SortKey::Oldest,
            PageRequest::new(None, Some(100), 12),
        )
        .await
        .unwrap();
    assert_eq!(all.total, 12);
    assert_eq!(all.positions[0].position.slug, "qa-engineer");

    let drafts = service
        .search_staff(
            FilterSpec::staff(Some(PositionStatus::Draft)),
            SortKey::Newest,
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(slugs(&drafts), ["ml-engineer"]);

    let defaulted = service
        .search_staff(FilterSpec::listed(), SortKey::Newest, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(defaulted.total, 12);
}

#[tokio::test]
async fn public_reads_degrade_when_storage_is_down() {
    let service = unavailable_service();
    let result = service
        .search(FilterSpec::listed(), SortKey::Newest, PageRequest::default())
        .await;
    assert!(result.positions.is_empty());
    assert_eq!((result.total, result.total_pages, result.page), (0, 0, 1));

    assert!(service.get_by_slug("platform-engineer").await.is_none());
    assert!(service
        .get_related(position_id("platform-engineer"), None, None)
        .await
        .is_empty());
    assert!(service
        .list_references(ReferenceKind::Category, false)
        .await
        .is_empty());

    let err = service
        .search_staff(FilterSpec::staff(None), SortKey::Newest, PageRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Storage(_)));
    let diagnostic = err.diagnostic().expect("storage diagnostic");
    assert_eq!(diagnostic.code, "08006");
    assert!(diagnostic.hint.is_some());
}

#[tokio::test]
async fn degraded_reads_log_the_storage_diagnostic() {
    let logs = LogBuffer::default();
    let _guard = tracing::subscriber::set_default(logs.subscriber());
    let service = unavailable_service();

    let result = service
        .search(FilterSpec::listed(), SortKey::Newest, PageRequest::default())
        .await;
    assert!(result.positions.is_empty());

    let output = logs.contents();
    assert!(output.contains("ERROR"), "{output}");
    assert!(output.contains("catalog read failed"), "{output}");
    assert!(output.contains("search"), "{output}");
    assert!(output.contains("08006"), "{output}");
    assert!(
        output.contains("check DATABASE_URL and that PostgreSQL is reachable"),
        "{output}"
    );
    assert!(output.contains("connection to server was lost"), "{output}");
}
