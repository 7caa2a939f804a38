mod common;

use careers_core::{
    Lifecycle, PositionDraft, PositionSkillLink, PositionStatus, ReferenceDraft, ReferenceKind,
    RequirementLevel,
};
use careers_service::ServiceError;
use common::{position_id, reference_id, seeded_service};

fn draft(name: &str) -> ReferenceDraft {
    ReferenceDraft {
        name: name.to_string(),
        slug: None,
        description: None,
        sort_order: 10,
        lifecycle: None,
    }
}

#[tokio::test]
async fn reference_counts_and_delete_guard() {
    let service = seeded_service().await;
    let rows = service
        .list_references_with_counts(ReferenceKind::Category)
        .await
        .unwrap();
    let counts: Vec<_> = rows
        .iter()
        .map(|row| (row.entity.slug.as_str(), row.positions_count))
        .collect();
    assert_eq!(counts, [("engineering", 9), ("design", 2), ("operations", 0)]);

    let engineering = reference_id(ReferenceKind::Category, "engineering");
    let err = service.delete_reference(engineering).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::StillReferenced { count: 9, .. }
    ));

    let rust = reference_id(ReferenceKind::Skill, "rust");
    let err = service.delete_reference(rust).await.unwrap_err();
    assert_eq!(err.code(), "still_referenced");

    service
        .delete_reference(reference_id(ReferenceKind::Category, "operations"))
        .await
        .unwrap();
    assert_eq!(
        service
            .list_references_with_counts(ReferenceKind::Category)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn reference_slugs_are_unique_per_kind() {
    let service = seeded_service().await;
    let err = service
        .create_reference(ReferenceKind::Location, draft("Berlin"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ServiceError::SlugConflict {
            entity: "reference",
            slug: "berlin".into()
        }
    );

    let lisbon = service
        .create_reference(ReferenceKind::Location, draft("Lisbon"))
        .await
        .unwrap();
    assert_eq!(lisbon.slug, "lisbon");

    let err = service
        .update_reference(
            lisbon.id,
            ReferenceDraft {
                slug: Some("Remote".into()),
                ..draft("Lisbon")
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "slug_conflict");

    let err = service
        .create_reference(ReferenceKind::Skill, draft("!!!"))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("slug"));
}

#[tokio::test]
async fn retired_references_leave_public_facets() {
    let service = seeded_service().await;
    let public: Vec<_> = service
        .list_references(ReferenceKind::Category, false)
        .await
        .into_iter()
        .map(|entity| entity.slug)
        .collect();
    assert_eq!(public, ["engineering", "design"]);

    let design = reference_id(ReferenceKind::Category, "design");
    let retired = service.retire_reference(design).await.unwrap();
    assert_eq!(retired.lifecycle, Lifecycle::Retired);

    let public = service.list_references(ReferenceKind::Category, false).await;
    assert_eq!(public.len(), 1);
    assert_eq!(service.list_references(ReferenceKind::Category, true).await.len(), 3);
}

#[tokio::test]
async fn position_authoring_flow() {
    let service = seeded_service().await;
    let engineering = reference_id(ReferenceKind::Category, "engineering");
    let created = service
        .create_position(PositionDraft {
            title: "Compiler Engineer".into(),
            category_id: Some(engineering),
            salary_min: Some(140_000),
            salary_max: Some(190_000),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(created.status, PositionStatus::Draft);
    assert_eq!(created.slug, "compiler-engineer");
    assert!(service.get_by_slug("compiler-engineer").await.is_none());

    let err = service
        .set_position_status(created.id, PositionStatus::Closed)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ServiceError::PositionTransition {
            from: PositionStatus::Draft,
            to: PositionStatus::Closed
        }
    );

    let open = service
        .set_position_status(created.id, PositionStatus::Open)
        .await
        .unwrap();
    assert!(open.published_at.is_some());
    assert!(service.get_by_slug("compiler-engineer").await.is_some());

    let links = vec![PositionSkillLink {
        skill_id: reference_id(ReferenceKind::Skill, "rust"),
        requirement: RequirementLevel::Required,
        proficiency: None,
    }];
    service.set_position_skills(created.id, links).await.unwrap();
    let view = service.get_by_slug("compiler-engineer").await.unwrap();
    assert_eq!(view.skills.len(), 1);

    service.retire_position(created.id).await.unwrap();
    assert!(service.get_by_slug("compiler-engineer").await.is_none());
    let staff = service.position_for_staff("compiler-engineer").await.unwrap();
    assert_eq!(staff.position.lifecycle, Lifecycle::Retired);

    service.restore_position(created.id).await.unwrap();
    assert!(service.get_by_slug("compiler-engineer").await.is_some());

    let filled = service
        .set_position_status(created.id, PositionStatus::Filled)
        .await
        .unwrap();
    assert_eq!(filled.published_at, open.published_at);
    assert!(service
        .set_position_status(created.id, PositionStatus::Open)
        .await
        .is_err());
}

#[tokio::test]
async fn position_drafts_are_checked() {
    let service = seeded_service().await;

    let err = service
        .create_position(PositionDraft {
            title: "Platform Engineer".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "slug_conflict");

    let skill_as_category = reference_id(ReferenceKind::Skill, "rust");
    let err = service
        .create_position(PositionDraft {
            title: "Rust Advocate".into(),
            category_id: Some(skill_as_category),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("category_id"));

    let err = service
        .create_position(PositionDraft {
            title: "Inverted Pay".into(),
            salary_min: Some(100),
            salary_max: Some(10),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("salary_min"));

    let updated = service
        .update_position(
            position_id("data-engineer"),
            PositionDraft {
                title: "Senior Data Engineer".into(),
                slug: Some("data-engineer".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Senior Data Engineer");
    assert_eq!(updated.status, PositionStatus::Open);

    let figma = reference_id(ReferenceKind::Skill, "figma");
    let err = service
        .set_position_skills(
            position_id("product-designer"),
            vec![
                PositionSkillLink {
                    skill_id: figma,
                    requirement: RequirementLevel::Required,
                    proficiency: None,
                },
                PositionSkillLink {
                    skill_id: figma,
                    requirement: RequirementLevel::Preferred,
                    proficiency: None,
                },
            ],
        )
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("skills"));
}

#[tokio::test]
async fn editing_a_retired_reference_keeps_it_retired() {
    let service = seeded_service().await;
    let operations = reference_id(ReferenceKind::Category, "operations");
    let edited = service
        .update_reference(
            operations,
            ReferenceDraft {
                description: Some("Facilities and support".into()),
                ..draft("Operations & Support")
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.lifecycle, Lifecycle::Retired);
    assert_eq!(edited.slug, "operations");
    assert_eq!(edited.description.as_deref(), Some("Facilities and support"));

    let public: Vec<_> = service
        .list_references(ReferenceKind::Category, false)
        .await
        .into_iter()
        .map(|entity| entity.slug)
        .collect();
    assert_eq!(public, ["engineering", "design"]);

    let restored = service.restore_reference(operations).await.unwrap();
    assert_eq!(restored.lifecycle, Lifecycle::Active);
    assert_eq!(service.list_references(ReferenceKind::Category, false).await.len(), 3);

    let retired = service
        .update_reference(
            operations,
            ReferenceDraft {
                lifecycle: Some(Lifecycle::Retired),
                ..draft("Operations")
            },
        )
        .await
        .unwrap();
    assert_eq!(retired.lifecycle, Lifecycle::Retired);
}

#[tokio::test]
async fn renaming_a_position_keeps_its_public_url() {
    let service = seeded_service().await;
    let updated = service
        .update_position(
            position_id("data-engineer"),
            PositionDraft {
                title: "Staff Data Engineer".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.slug, "data-engineer");

    let view = service.get_by_slug("data-engineer").await.unwrap();
    assert_eq!(view.position.title, "Staff Data Engineer");
    assert!(service.get_by_slug("staff-data-engineer").await.is_none());
}
