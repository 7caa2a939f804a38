//! PostgreSQL store. Queries are plain `sqlx::query` / `QueryBuilder` calls
//! decoded with `Row::try_get`; the schema lives in `migrations/`.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use careers_core::{
    Application, ApplicationActivity, CategoryScope, FilterSpec, PageRequest, ParseEnumError,
    Position, PositionSkill, PositionSkillLink, PositionView, ReferenceEntity, ReferenceKind,
    SortKey, StatusChange, Visibility,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::debug;
use uuid::Uuid;

use crate::{CareerStore, StorageError};

const REFERENCE_COLUMNS: &str =
    "r.id, r.kind, r.name, r.slug, r.description, r.sort_order, r.lifecycle, \
     r.created_at, r.updated_at";

const POSITION_COLUMNS: &str = "p.id, p.title, p.slug, p.summary, p.description, p.requirements, \
     p.benefits, p.category_id, p.location_id, p.type_id, p.level_id, p.salary_min, p.salary_max, \
     p.salary_currency, p.remote_allowed, p.status, p.lifecycle, p.is_featured, p.is_urgent, \
     p.views_count, p.applications_count, p.application_deadline, p.published_at, p.created_at, \
     p.updated_at";

const POSITION_JOINS: &str = " FROM positions p \
     LEFT JOIN reference_entities cat ON cat.id = p.category_id \
     LEFT JOIN reference_entities loc ON loc.id = p.location_id \
     LEFT JOIN reference_entities typ ON typ.id = p.type_id \
     LEFT JOIN reference_entities lvl ON lvl.id = p.level_id";

const APPLICATION_COLUMNS: &str = "id, position_id, first_name, last_name, email, phone, \
     linkedin_url, portfolio_url, resume_url, cover_letter, documents, source, status, applied_at, \
     last_activity_at";

const ACTIVITY_COLUMNS: &str =
    "id, application_id, activity_type, old_status, new_status, description, notes, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|err| {
                StorageError::backend("migrate", err.to_string())
                    .with_hint("check _sqlx_migrations for a failed or edited migration")
            })
    }

    async fn hydrate(&self, positions: Vec<Position>) -> Result<Vec<PositionView>, StorageError> {
        let ids = positions
            .iter()
            .flat_map(|position| {
                [
                    position.category_id,
                    position.location_id,
                    position.type_id,
                    position.level_id,
                ]
            })
            .flatten()
            .collect::<Vec<_>>();
        let references = if ids.is_empty() {
            HashMap::new()
        } else {
            let rows = sqlx::query(&format!(
                "SELECT {REFERENCE_COLUMNS} FROM reference_entities r WHERE r.id = ANY($1)"
            ))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
            rows.iter()
                .map(|row| reference_from_row(row).map(|entity| (entity.id, entity)))
                .collect::<Result<HashMap<_, _>, _>>()?
        };

        Ok(positions
            .into_iter()
            .map(|position| {
                let mut view = PositionView::bare(position);
                for kind in ReferenceKind::ALL {
                    if let Some(entity) = view
                        .position
                        .reference_id(kind)
                        .and_then(|id| references.get(&id))
                    {
                        view.attach(entity.clone());
                    }
                }
                view
            })
            .collect())
    }

    async fn skills_for(&self, position_id: Uuid) -> Result<Vec<PositionSkill>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {REFERENCE_COLUMNS}, ps.requirement, ps.proficiency \
               FROM position_skills ps \
               JOIN reference_entities r ON r.id = ps.skill_id \
              WHERE ps.position_id = $1"
        ))
        .bind(position_id)
        .fetch_all(&self.pool)
        .await?;

        let mut skills = Vec::with_capacity(rows.len());
        for row in &rows {
            let proficiency: Option<String> = row.try_get("proficiency")?;
            skills.push(PositionSkill {
                skill: reference_from_row(row)?,
                requirement: parse_column(row, "requirement")?,
                proficiency: proficiency
                    .map(|value| value.parse().map_err(|err| decode_error("proficiency", err)))
                    .transpose()?,
            });
        }
        skills.sort_by(|a, b| a.display_cmp(b));
        Ok(skills)
    }
}

/// Appends every predicate in `filter` to a query over the `p` alias and the
/// `cat`/`loc`/`typ`/`lvl` joins. Public and staff listings both go through here.
pub fn push_position_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &FilterSpec) {
    builder.push(" WHERE TRUE");
    push_visibility(builder, filter.visibility);

    for (kind, slug) in filter.facet_slugs() {
        builder
            .push(format!(" AND LOWER({}.slug) = ", facet_alias(kind)))
            .push_bind(slug);
    }
    if let Some(remote) = filter.remote {
        builder.push(" AND p.remote_allowed = ").push_bind(remote);
    }
    if let Some(min) = filter.salary_min {
        builder.push(" AND p.salary_min >= ").push_bind(min);
    }
    if let Some(max) = filter.salary_max {
        builder.push(" AND p.salary_max <= ").push_bind(max);
    }
    if let Some(needle) = filter.search_term() {
        let pattern = format!("%{}%", escape_like(&needle));
        builder.push(" AND (");
        for (index, column) in ["p.title", "p.description", "p.summary"].into_iter().enumerate() {
            if index > 0 {
                builder.push(" OR ");
            }
            builder
                .push(format!("{column} ILIKE "))
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\'");
        }
        builder.push(")");
    }
}

fn push_visibility(builder: &mut QueryBuilder<'_, Postgres>, visibility: Visibility) {
    match visibility {
        Visibility::Listed => {
            builder.push(" AND p.status = 'open' AND p.lifecycle = 'active'");
        }
        Visibility::Staff { status: Some(status) } => {
            builder.push(" AND p.status = ").push_bind(status.as_str());
        }
        Visibility::Staff { status: None } => {}
    }
}

fn facet_alias(kind: ReferenceKind) -> &'static str {
    match kind {
        ReferenceKind::Category => "cat",
        ReferenceKind::Location => "loc",
        ReferenceKind::EmploymentType => "typ",
        ReferenceKind::Level | ReferenceKind::Skill => "lvl",
    }
}

/// Escapes LIKE metacharacters so the needle matches literally.
pub fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn decode_error(column: &str, err: ParseEnumError) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(err),
    }
}

fn parse_column<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|err| decode_error(column, err))
}

fn parse_optional_column<T>(row: &PgRow, column: &str) -> Result<Option<T>, sqlx::Error>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|value| value.parse().map_err(|err| decode_error(column, err)))
        .transpose()
}

fn reference_from_row(row: &PgRow) -> Result<ReferenceEntity, sqlx::Error> {
    Ok(ReferenceEntity {
        id: row.try_get("id")?,
        kind: parse_column(row, "kind")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        sort_order: row.try_get("sort_order")?,
        lifecycle: parse_column(row, "lifecycle")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn position_from_row(row: &PgRow) -> Result<Position, sqlx::Error> {
    Ok(Position {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        summary: row.try_get("summary")?,
        description: row.try_get("description")?,
        requirements: row.try_get("requirements")?,
        benefits: row.try_get("benefits")?,
        category_id: row.try_get("category_id")?,
        location_id: row.try_get("location_id")?,
        type_id: row.try_get("type_id")?,
        level_id: row.try_get("level_id")?,
        salary_min: row.try_get("salary_min")?,
        salary_max: row.try_get("salary_max")?,
        salary_currency: row.try_get("salary_currency")?,
        remote_allowed: row.try_get("remote_allowed")?,
        status: parse_column(row, "status")?,
        lifecycle: parse_column(row, "lifecycle")?,
        is_featured: row.try_get("is_featured")?,
        is_urgent: row.try_get("is_urgent")?,
        views_count: row.try_get("views_count")?,
        applications_count: row.try_get("applications_count")?,
        application_deadline: row.try_get("application_deadline")?,
        published_at: row.try_get("published_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn application_from_row(row: &PgRow) -> Result<Application, sqlx::Error> {
    let documents: Json<Vec<careers_core::ApplicationDocument>> = row.try_get("documents")?;
    Ok(Application {
        id: row.try_get("id")?,
        position_id: row.try_get("position_id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        linkedin_url: row.try_get("linkedin_url")?,
        portfolio_url: row.try_get("portfolio_url")?,
        resume_url: row.try_get("resume_url")?,
        cover_letter: row.try_get("cover_letter")?,
        documents: documents.0,
        source: row.try_get("source")?,
        status: parse_column(row, "status")?,
        applied_at: row.try_get("applied_at")?,
        last_activity_at: row.try_get("last_activity_at")?,
    })
}

fn activity_from_row(row: &PgRow) -> Result<ApplicationActivity, sqlx::Error> {
    Ok(ApplicationActivity {
        id: row.try_get("id")?,
        application_id: row.try_get("application_id")?,
        activity_type: parse_column(row, "activity_type")?,
        old_status: parse_optional_column(row, "old_status")?,
        new_status: parse_column(row, "new_status")?,
        description: row.try_get("description")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
    })
}

async fn append_activity(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    activity: &ApplicationActivity,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "INSERT INTO application_activities ({ACTIVITY_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
    ))
    .bind(activity.id)
    .bind(activity.application_id)
    .bind(activity.activity_type.as_str())
    .bind(activity.old_status.map(|status| status.as_str()))
    .bind(activity.new_status.as_str())
    .bind(&activity.description)
    .bind(&activity.notes)
    .bind(activity.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn not_found(entity: &'static str, id: Uuid, rows_affected: u64) -> Result<(), StorageError> {
    if rows_affected == 0 {
        Err(StorageError::NotFound { entity, id })
    } else {
        Ok(())
    }
}

#[async_trait]
impl CareerStore for PgStore {
    async fn list_references(
        &self,
        kind: ReferenceKind,
        include_retired: bool,
    ) -> Result<Vec<ReferenceEntity>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {REFERENCE_COLUMNS} FROM reference_entities r \
              WHERE r.kind = $1 AND ($2 OR r.lifecycle = 'active') \
              ORDER BY r.sort_order, r.name, r.id"
        ))
        .bind(kind.as_str())
        .bind(include_retired)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(reference_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn get_reference(&self, id: Uuid) -> Result<Option<ReferenceEntity>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {REFERENCE_COLUMNS} FROM reference_entities r WHERE r.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(reference_from_row).transpose()?)
    }

    async fn find_reference_by_slug(
        &self,
        kind: ReferenceKind,
        slug: &str,
    ) -> Result<Option<ReferenceEntity>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {REFERENCE_COLUMNS} FROM reference_entities r WHERE r.kind = $1 AND r.slug = $2"
        ))
        .bind(kind.as_str())
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(reference_from_row).transpose()?)
    }

    async fn insert_reference(&self, entity: &ReferenceEntity) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO reference_entities
                (id, kind, name, slug, description, sort_order, lifecycle, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entity.id)
        .bind(entity.kind.as_str())
        .bind(&entity.name)
        .bind(&entity.slug)
        .bind(&entity.description)
        .bind(entity.sort_order)
        .bind(entity.lifecycle.as_str())
        .bind(entity.created_at)
        .bind(entity.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_reference(&self, entity: &ReferenceEntity) -> Result<(), StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE reference_entities
               SET name = $2,
                   slug = $3,
                   description = $4,
                   sort_order = $5,
                   lifecycle = $6,
                   updated_at = $7
             WHERE id = $1
            "#,
        )
        .bind(entity.id)
        .bind(&entity.name)
        .bind(&entity.slug)
        .bind(&entity.description)
        .bind(entity.sort_order)
        .bind(entity.lifecycle.as_str())
        .bind(entity.updated_at)
        .execute(&self.pool)
        .await?;
        not_found("reference", entity.id, result.rows_affected())
    }

    async fn delete_reference(&self, id: Uuid) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM reference_entities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        not_found("reference", id, result.rows_affected())
    }

    async fn count_reference_usage(
        &self,
        kind: ReferenceKind,
        id: Uuid,
    ) -> Result<u64, StorageError> {
        let sql = match kind.position_column() {
            Some(column) => format!("SELECT COUNT(*) FROM positions WHERE {column} = $1"),
            None => "SELECT COUNT(*) FROM position_skills WHERE skill_id = $1".to_string(),
        };
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn search_positions(
        &self,
        filter: &FilterSpec,
        sort: SortKey,
        page: PageRequest,
    ) -> Result<(Vec<PositionView>, u64), StorageError> {
        let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*){POSITION_JOINS}"));
        push_position_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {POSITION_COLUMNS}{POSITION_JOINS}"));
        push_position_filters(&mut select, filter);
        select
            .push(format!(" ORDER BY {}", sort.order_by_sql()))
            .push(" LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
        let rows = select.build().fetch_all(&self.pool).await?;
        let positions = rows
            .iter()
            .map(position_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(total, returned = positions.len(), sort = sort.as_str(), "position search");
        Ok((
            self.hydrate(positions).await?,
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    async fn find_position_by_slug(
        &self,
        slug: &str,
        visibility: Visibility,
    ) -> Result<Option<PositionView>, StorageError> {
        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {POSITION_COLUMNS}{POSITION_JOINS}"));
        select.push(" WHERE p.slug = ").push_bind(slug.to_string());
        push_visibility(&mut select, visibility);
        let Some(row) = select.build().fetch_optional(&self.pool).await? else {
            return Ok(None);
        };

        let position = position_from_row(&row)?;
        let id = position.id;
        let mut view = self.hydrate(vec![position]).await?.pop();
        if let Some(view) = view.as_mut() {
            view.skills = self.skills_for(id).await?;
        }
        Ok(view)
    }

    async fn get_position(&self, id: Uuid) -> Result<Option<Position>, StorageError> {
        let sql = format!("SELECT {POSITION_COLUMNS} FROM positions p WHERE p.id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(position_from_row).transpose()?)
    }

    async fn list_related(
        &self,
        scope: CategoryScope,
        exclude: &[Uuid],
        limit: u32,
    ) -> Result<Vec<PositionView>, StorageError> {
        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {POSITION_COLUMNS} FROM positions p"));
        select.push(" WHERE p.status = 'open' AND p.lifecycle = 'active'");
        match scope {
            CategoryScope::Any => {}
            CategoryScope::Within(id) => {
                select.push(" AND p.category_id = ").push_bind(id);
            }
            CategoryScope::Outside(id) => {
                select
                    .push(" AND p.category_id IS DISTINCT FROM ")
                    .push_bind(id);
            }
        }
        if !exclude.is_empty() {
            select
                .push(" AND NOT (p.id = ANY(")
                .push_bind(exclude.to_vec())
                .push("))");
        }
        select
            .push(format!(" ORDER BY {}", SortKey::Newest.order_by_sql()))
            .push(" LIMIT ")
            .push_bind(i64::from(limit));

        let rows = select.build().fetch_all(&self.pool).await?;
        let positions = rows
            .iter()
            .map(position_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        self.hydrate(positions).await
    }

    async fn insert_position(&self, position: &Position) -> Result<(), StorageError> {
        sqlx::query(&format!(
            "INSERT INTO positions ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, \
             $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25)",
            POSITION_COLUMNS.replace("p.", "")
        ))
        .bind(position.id)
        .bind(&position.title)
        .bind(&position.slug)
        .bind(&position.summary)
        .bind(&position.description)
        .bind(&position.requirements)
        .bind(&position.benefits)
        .bind(position.category_id)
        .bind(position.location_id)
        .bind(position.type_id)
        .bind(position.level_id)
        .bind(position.salary_min)
        .bind(position.salary_max)
        .bind(&position.salary_currency)
        .bind(position.remote_allowed)
        .bind(position.status.as_str())
        .bind(position.lifecycle.as_str())
        .bind(position.is_featured)
        .bind(position.is_urgent)
        .bind(position.views_count)
        .bind(position.applications_count)
        .bind(position.application_deadline)
        .bind(position.published_at)
        .bind(position.created_at)
        .bind(position.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_position(&self, position: &Position) -> Result<(), StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE positions
               SET title = $2,
                   slug = $3,
                   summary = $4,
                   description = $5,
                   requirements = $6,
                   benefits = $7,
                   category_id = $8,
                   location_id = $9,
                   type_id = $10,
                   level_id = $11,
                   salary_min = $12,
                   salary_max = $13,
                   salary_currency = $14,
                   remote_allowed = $15,
                   status = $16,
                   lifecycle = $17,
                   is_featured = $18,
                   is_urgent = $19,
                   application_deadline = $20,
                   published_at = $21,
                   updated_at = $22
             WHERE id = $1
            "#,
        )
        .bind(position.id)
        .bind(&position.title)
        .bind(&position.slug)
        .bind(&position.summary)
        .bind(&position.description)
        .bind(&position.requirements)
        .bind(&position.benefits)
        .bind(position.category_id)
        .bind(position.location_id)
        .bind(position.type_id)
        .bind(position.level_id)
        .bind(position.salary_min)
        .bind(position.salary_max)
        .bind(&position.salary_currency)
        .bind(position.remote_allowed)
        .bind(position.status.as_str())
        .bind(position.lifecycle.as_str())
        .bind(position.is_featured)
        .bind(position.is_urgent)
        .bind(position.application_deadline)
        .bind(position.published_at)
        .bind(position.updated_at)
        .execute(&self.pool)
        .await?;
        not_found("position", position.id, result.rows_affected())
    }

    async fn set_views_count(&self, id: Uuid, views_count: i64) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE positions SET views_count = $2 WHERE id = $1")
            .bind(id)
            .bind(views_count)
            .execute(&self.pool)
            .await?;
        not_found("position", id, result.rows_affected())
    }

    async fn set_applications_count(&self, id: Uuid, count: i64) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE positions SET applications_count = $2 WHERE id = $1")
            .bind(id)
            .bind(count)
            .execute(&self.pool)
            .await?;
        not_found("position", id, result.rows_affected())
    }

    async fn replace_position_skills(
        &self,
        position_id: Uuid,
        skills: &[PositionSkillLink],
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM positions WHERE id = $1")
            .bind(position_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StorageError::NotFound {
                entity: "position",
                id: position_id,
            });
        }

        sqlx::query("DELETE FROM position_skills WHERE position_id = $1")
            .bind(position_id)
            .execute(&mut *tx)
            .await?;
        if !skills.is_empty() {
            let mut insert = QueryBuilder::<Postgres>::new(
                "INSERT INTO position_skills (position_id, skill_id, requirement, proficiency) ",
            );
            insert.push_values(skills, |mut b, link| {
                b.push_bind(position_id)
                    .push_bind(link.skill_id)
                    .push_bind(link.requirement.as_str())
                    .push_bind(link.proficiency.map(|p| p.as_str()));
            });
            insert.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn insert_application(
        &self,
        application: &Application,
        created: &ApplicationActivity,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!(
            "INSERT INTO applications ({APPLICATION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
        ))
        .bind(application.id)
        .bind(application.position_id)
        .bind(&application.first_name)
        .bind(&application.last_name)
        .bind(&application.email)
        .bind(&application.phone)
        .bind(&application.linkedin_url)
        .bind(&application.portfolio_url)
        .bind(&application.resume_url)
        .bind(&application.cover_letter)
        .bind(Json(application.documents.clone()))
        .bind(&application.source)
        .bind(application.status.as_str())
        .bind(application.applied_at)
        .bind(application.last_activity_at)
        .execute(&mut *tx)
        .await?;
        append_activity(&mut tx, created).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(application_from_row).transpose()?)
    }

    async fn list_applications(
        &self,
        position_id: Option<Uuid>,
    ) -> Result<Vec<Application>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications \
              WHERE ($1::uuid IS NULL OR position_id = $1) \
              ORDER BY applied_at DESC, id ASC"
        ))
        .bind(position_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(application_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn apply_status_change(&self, change: &StatusChange) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE applications
               SET status = $2,
                   last_activity_at = GREATEST(last_activity_at, $3)
             WHERE id = $1
            "#,
        )
        .bind(change.application_id)
        .bind(change.to.as_str())
        .bind(change.at)
        .execute(&mut *tx)
        .await?;
        not_found("application", change.application_id, result.rows_affected())?;
        append_activity(&mut tx, &change.activity).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_application(&self, id: Uuid) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        not_found("application", id, result.rows_affected())
    }

    async fn list_activities(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<ApplicationActivity>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM application_activities \
              WHERE application_id = $1 \
              ORDER BY created_at ASC, seq ASC"
        ))
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(activity_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}
