//! # Postgres Store
//!
//! sqlx-backed implementations of the store contracts. The lead table is
//! owned by this crate (see `migrations/`); the agent, channel-partner,
//! status, and project tables belong to the surrounding CRM services and are
//! only read here.
//!
//! List queries are composed with `QueryBuilder` and must stay behaviorally
//! equivalent to [`LeadQuery::matches`], which the in-memory store and the
//! unit tests use as the reference predicate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::{
    AcceptOutcome, AssigneeDirectory, LeadQuery, LeadScope, LeadStore, ProjectDirectory,
    StatusCatalog,
};
use crate::error::{LeadError, Result};
use crate::models::{
    ActorRole, Assignee, AssigneeKind, FollowUp, Interest, Lead, StatusEntry, StatusHistoryEntry,
};

/// Apply the schema migrations for the lead table.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| LeadError::internal(format!("migration failure: {e}")))
}

/// Raw row shape of `leadflow_leads`. Kept separate from [`Lead`] so the
/// domain type stays free of storage encodings (JSONB wrappers, stringly
/// enums, split interest columns).
#[derive(Debug, FromRow, Serialize, Deserialize)]
struct LeadRow {
    lead_id: Uuid,
    name: String,
    email: String,
    phone_number: String,
    source: String,
    intake_date: String,
    address: Option<String>,
    property_type: Option<String>,
    requirement_type: Option<String>,
    budget: Option<String>,
    remark: Option<String>,
    interest_project: Option<Uuid>,
    interest_text: Option<String>,
    status: String,
    status_ref: Option<Uuid>,
    status_history: Json<Vec<StatusHistoryEntry>>,
    follow_ups: Json<Vec<FollowUp>>,
    assigned_to: Option<Uuid>,
    assigned_to_kind: Option<String>,
    assigned_to_name: Option<String>,
    created_by_role: String,
    created_by_id: Uuid,
    created_by_name: String,
    is_broadcasted: bool,
    broadcasted_to: Vec<Uuid>,
    declined_by: Vec<Uuid>,
    accepted_by: Option<Uuid>,
    accepted_by_name: Option<String>,
    accepted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LeadRow> for Lead {
    type Error = LeadError;

    fn try_from(row: LeadRow) -> Result<Lead> {
        let interest = match (row.interest_project, row.interest_text) {
            (Some(id), None) => Interest::Project(id),
            (None, Some(text)) => Interest::FreeText(text),
            _ => {
                return Err(LeadError::internal(format!(
                    "lead {} has a corrupt interest column pair",
                    row.lead_id
                )))
            }
        };

        let created_by_role: ActorRole = row
            .created_by_role
            .parse()
            .map_err(|e: String| LeadError::internal(e))?;

        let assigned_to_kind: Option<AssigneeKind> = row
            .assigned_to_kind
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|e: String| LeadError::internal(e))?;

        Ok(Lead {
            lead_id: row.lead_id,
            name: row.name,
            email: row.email,
            phone_number: row.phone_number,
            source: row.source,
            date: row.intake_date,
            address: row.address,
            property_type: row.property_type,
            requirement_type: row.requirement_type,
            budget: row.budget,
            remark: row.remark,
            interest,
            status: row.status,
            status_ref: row.status_ref,
            status_history: row.status_history.0,
            follow_ups: row.follow_ups.0,
            assigned_to: row.assigned_to,
            assigned_to_kind,
            assigned_to_name: row.assigned_to_name,
            created_by_role,
            created_by_id: row.created_by_id,
            created_by_name: row.created_by_name,
            is_broadcasted: row.is_broadcasted,
            broadcasted_to: row.broadcasted_to,
            declined_by: row.declined_by,
            accepted_by: row.accepted_by,
            accepted_by_name: row.accepted_by_name,
            accepted_at: row.accepted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const LEAD_COLUMNS: &str = "lead_id, name, email, phone_number, source, intake_date, address, \
     property_type, requirement_type, budget, remark, interest_project, interest_text, status, \
     status_ref, status_history, follow_ups, assigned_to, assigned_to_kind, assigned_to_name, \
     created_by_role, created_by_id, created_by_name, is_broadcasted, broadcasted_to, \
     declined_by, accepted_by, accepted_by_name, accepted_at, created_at, updated_at";

/// Lead store over `leadflow_leads`.
#[derive(Clone)]
pub struct PgLeadStore {
    pool: PgPool,
}

impl PgLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_scope(builder: &mut QueryBuilder<'_, Postgres>, scope: &LeadScope, first: &mut bool) {
        let mut push_where = |builder: &mut QueryBuilder<'_, Postgres>| {
            if *first {
                builder.push(" WHERE ");
                *first = false;
            } else {
                builder.push(" AND ");
            }
        };

        match scope {
            LeadScope::All => {}
            LeadScope::Broadcasted => {
                push_where(builder);
                builder.push("is_broadcasted");
            }
            LeadScope::VisibleToChannelPartner(id) => {
                push_where(builder);
                builder.push("(created_by_id = ");
                builder.push_bind(*id);
                builder.push(" OR assigned_to = ");
                builder.push_bind(*id);
                builder.push(")");
            }
            LeadScope::VisibleToAgent(id) => {
                push_where(builder);
                builder.push("((created_by_id = ");
                builder.push_bind(*id);
                builder.push(" OR assigned_to = ");
                builder.push_bind(*id);
                builder.push(" OR ");
                builder.push_bind(*id);
                builder.push(" = ANY(declined_by)) AND (is_broadcasted = FALSE OR accepted_by = ");
                builder.push_bind(*id);
                builder.push("))");
            }
            LeadScope::AssignedAgent(id) => {
                push_where(builder);
                builder.push("(assigned_to = ");
                builder.push_bind(*id);
                builder.push(" AND assigned_to_kind = 'agent')");
            }
            LeadScope::AcceptedBroadcastBy(id) => {
                push_where(builder);
                builder.push("(is_broadcasted = FALSE AND accepted_by = ");
                builder.push_bind(*id);
                builder.push(")");
            }
            LeadScope::FollowUpAuthor(id) => {
                push_where(builder);
                builder.push("follow_ups @> ");
                builder.push_bind(serde_json::json!([{ "added_by": { "id": id } }]));
            }
        }
    }

    fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &LeadQuery) {
        let mut first = true;
        Self::push_scope(builder, &query.scope, &mut first);

        if let Some(status) = &query.status {
            builder.push(if first { " WHERE " } else { " AND " });
            first = false;
            builder.push("status = ");
            builder.push_bind(status.clone());
        }

        if let Some(q) = &query.q {
            builder.push(if first { " WHERE " } else { " AND " });
            let pattern = format!("%{q}%");
            let columns = [
                "name",
                "email",
                "phone_number",
                "interest_text",
                "CAST(interest_project AS TEXT)",
                "source",
                "status",
                "address",
                "property_type",
                "requirement_type",
                "budget",
                "remark",
                "assigned_to_name",
                "created_by_name",
            ];
            builder.push("(");
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                builder.push(*column);
                builder.push(" ILIKE ");
                builder.push_bind(pattern.clone());
            }
            builder.push(")");
        }
    }
}

#[async_trait]
impl LeadStore for PgLeadStore {
    async fn insert(&self, lead: Lead) -> Result<Lead> {
        let sql = format!(
            "INSERT INTO leadflow_leads ({LEAD_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, \
              $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31) \
             RETURNING {LEAD_COLUMNS}"
        );
        let row: LeadRow = sqlx::query_as(&sql)
            .bind(lead.lead_id)
            .bind(&lead.name)
            .bind(&lead.email)
            .bind(&lead.phone_number)
            .bind(&lead.source)
            .bind(&lead.date)
            .bind(&lead.address)
            .bind(&lead.property_type)
            .bind(&lead.requirement_type)
            .bind(&lead.budget)
            .bind(&lead.remark)
            .bind(lead.interest.project_id())
            .bind(match &lead.interest {
                Interest::FreeText(text) => Some(text.clone()),
                Interest::Project(_) => None,
            })
            .bind(&lead.status)
            .bind(lead.status_ref)
            .bind(Json(&lead.status_history))
            .bind(Json(&lead.follow_ups))
            .bind(lead.assigned_to)
            .bind(lead.assigned_to_kind.map(|k| k.to_string()))
            .bind(&lead.assigned_to_name)
            .bind(lead.created_by_role.to_string())
            .bind(lead.created_by_id)
            .bind(&lead.created_by_name)
            .bind(lead.is_broadcasted)
            .bind(&lead.broadcasted_to)
            .bind(&lead.declined_by)
            .bind(lead.accepted_by)
            .bind(&lead.accepted_by_name)
            .bind(lead.accepted_at)
            .bind(lead.created_at)
            .bind(lead.updated_at)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn save(&self, lead: &Lead) -> Result<Lead> {
        let sql = format!(
            "UPDATE leadflow_leads SET \
             name = $2, email = $3, phone_number = $4, source = $5, intake_date = $6, \
             address = $7, property_type = $8, requirement_type = $9, budget = $10, \
             remark = $11, interest_project = $12, interest_text = $13, status = $14, \
             status_ref = $15, status_history = $16, follow_ups = $17, assigned_to = $18, \
             assigned_to_kind = $19, assigned_to_name = $20, is_broadcasted = $21, \
             broadcasted_to = $22, declined_by = $23, accepted_by = $24, \
             accepted_by_name = $25, accepted_at = $26, updated_at = NOW() \
             WHERE lead_id = $1 RETURNING {LEAD_COLUMNS}"
        );
        let row: Option<LeadRow> = sqlx::query_as(&sql)
            .bind(lead.lead_id)
            .bind(&lead.name)
            .bind(&lead.email)
            .bind(&lead.phone_number)
            .bind(&lead.source)
            .bind(&lead.date)
            .bind(&lead.address)
            .bind(&lead.property_type)
            .bind(&lead.requirement_type)
            .bind(&lead.budget)
            .bind(&lead.remark)
            .bind(lead.interest.project_id())
            .bind(match &lead.interest {
                Interest::FreeText(text) => Some(text.clone()),
                Interest::Project(_) => None,
            })
            .bind(&lead.status)
            .bind(lead.status_ref)
            .bind(Json(&lead.status_history))
            .bind(Json(&lead.follow_ups))
            .bind(lead.assigned_to)
            .bind(lead.assigned_to_kind.map(|k| k.to_string()))
            .bind(&lead.assigned_to_name)
            .bind(lead.is_broadcasted)
            .bind(&lead.broadcasted_to)
            .bind(&lead.declined_by)
            .bind(lead.accepted_by)
            .bind(&lead.accepted_by_name)
            .bind(lead.accepted_at)
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or_else(|| LeadError::not_found("Lead not found"))?
            .try_into()
    }

    async fn find_by_id(&self, lead_id: Uuid) -> Result<Option<Lead>> {
        let sql = format!("SELECT {LEAD_COLUMNS} FROM leadflow_leads WHERE lead_id = $1");
        let row: Option<LeadRow> = sqlx::query_as(&sql)
            .bind(lead_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Lead::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Lead>> {
        let sql = format!("SELECT {LEAD_COLUMNS} FROM leadflow_leads WHERE LOWER(email) = LOWER($1)");
        let row: Option<LeadRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Lead::try_from).transpose()
    }

    async fn list(&self, query: &LeadQuery) -> Result<Vec<Lead>> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {LEAD_COLUMNS} FROM leadflow_leads"));
        Self::push_filters(&mut builder, query);
        builder.push(" ORDER BY created_at DESC, lead_id ASC");
        if let Some(page) = query.page {
            builder.push(" LIMIT ");
            builder.push_bind(i64::from(page.per_page));
            builder.push(" OFFSET ");
            builder.push_bind(page.offset() as i64);
        }

        let rows: Vec<LeadRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(Lead::try_from).collect()
    }

    async fn count(&self, query: &LeadQuery) -> Result<u64> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM leadflow_leads");
        Self::push_filters(&mut builder, query);

        let row = builder.build().fetch_one(&self.pool).await?;
        let count: i64 = row.try_get(0).map_err(LeadError::from)?;
        Ok(count as u64)
    }

    async fn try_accept(&self, lead_id: Uuid, agent: &Assignee) -> Result<AcceptOutcome> {
        // The WHERE guard is the synchronization point: concurrent accepts
        // race on this single conditional statement, not on application
        // reads.
        let sql = format!(
            "UPDATE leadflow_leads SET \
             accepted_by = $2, accepted_by_name = $3, accepted_at = NOW(), \
             assigned_to = $2, assigned_to_kind = $4, assigned_to_name = $3, \
             is_broadcasted = FALSE, broadcasted_to = '{{}}', updated_at = NOW() \
             WHERE lead_id = $1 AND is_broadcasted AND accepted_by IS NULL \
             RETURNING {LEAD_COLUMNS}"
        );
        let row: Option<LeadRow> = sqlx::query_as(&sql)
            .bind(lead_id)
            .bind(agent.id)
            .bind(&agent.name)
            .bind(agent.kind.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(AcceptOutcome::Accepted(row.try_into()?)),
            None => match self.find_by_id(lead_id).await? {
                Some(current) => Ok(AcceptOutcome::AlreadyTaken(current)),
                None => Err(LeadError::not_found("Lead not found")),
            },
        }
    }

    async fn append_decline(&self, lead_id: Uuid, agent_id: Uuid) -> Result<Lead> {
        let sql = format!(
            "UPDATE leadflow_leads SET \
             declined_by = CASE WHEN $2 = ANY(declined_by) THEN declined_by \
                                ELSE array_append(declined_by, $2) END, \
             broadcasted_to = array_remove(broadcasted_to, $2), \
             updated_at = NOW() \
             WHERE lead_id = $1 RETURNING {LEAD_COLUMNS}"
        );
        let row: Option<LeadRow> = sqlx::query_as(&sql)
            .bind(lead_id)
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or_else(|| LeadError::not_found("Lead not found"))?
            .try_into()
    }
}

#[derive(Debug, FromRow)]
struct AssigneeRow {
    id: Uuid,
    name: String,
}

/// Directory over the externally-owned agent and channel-partner tables.
#[derive(Clone)]
pub struct PgAssigneeDirectory {
    pool: PgPool,
}

impl PgAssigneeDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssigneeDirectory for PgAssigneeDirectory {
    async fn find_active_agents(&self) -> Result<Vec<Assignee>> {
        let rows: Vec<AssigneeRow> = sqlx::query_as(
            "SELECT id, name FROM leadflow_agents \
             WHERE status = 'active' AND deleted = FALSE ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| Assignee::agent(row.id, row.name))
            .collect())
    }

    async fn find_assignable(&self, id: Uuid) -> Result<Option<Assignee>> {
        let agent: Option<AssigneeRow> = sqlx::query_as(
            "SELECT id, name FROM leadflow_agents \
             WHERE id = $1 AND status = 'active' AND deleted = FALSE",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(row) = agent {
            return Ok(Some(Assignee::agent(row.id, row.name)));
        }

        let partner: Option<AssigneeRow> = sqlx::query_as(
            "SELECT id, name FROM leadflow_channel_partners \
             WHERE id = $1 AND status = 'active' AND deleted = FALSE",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(partner.map(|row| Assignee::channel_partner(row.id, row.name)))
    }
}

#[derive(Debug, FromRow)]
struct StatusRow {
    id: Uuid,
    name: String,
}

/// Catalog reader over the externally-owned status table.
#[derive(Clone)]
pub struct PgStatusCatalog {
    pool: PgPool,
}

impl PgStatusCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusCatalog for PgStatusCatalog {
    async fn find_active(&self, id: Uuid) -> Result<Option<StatusEntry>> {
        let row: Option<StatusRow> = sqlx::query_as(
            "SELECT id, name FROM leadflow_statuses WHERE id = $1 AND deleted = FALSE",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| StatusEntry::new(row.id, row.name)))
    }

    async fn list_active(&self) -> Result<Vec<StatusEntry>> {
        let rows: Vec<StatusRow> = sqlx::query_as(
            "SELECT id, name FROM leadflow_statuses WHERE deleted = FALSE ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| StatusEntry::new(row.id, row.name))
            .collect())
    }
}

/// Project reference resolver over the externally-owned project table.
#[derive(Clone)]
pub struct PgProjectDirectory {
    pool: PgPool,
}

impl PgProjectDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectDirectory for PgProjectDirectory {
    async fn exists(&self, id: Uuid) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM leadflow_projects WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        let exists: bool = row.try_get(0).map_err(LeadError::from)?;
        Ok(exists)
    }

    async fn title(&self, id: Uuid) -> Result<Option<String>> {
        let row = sqlx::query("SELECT project_title FROM leadflow_projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| row.try_get(0).map_err(LeadError::from))
            .transpose()
    }
}
