use crate::db::models::{
    DbLighthouseReport, DbLighthouseSummary, DbPwa, DbTask, IndexStamp, PwaListQuery, PwaPage,
};
use crate::db::patch::{
    DbPatchable, LighthouseReportCreate, PwaPatchEnvelope, PwaUpsert, UpsertOutcome,
};
use crate::db::schema::SQLITE_INIT;
use crate::error::DirectoryError;
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::{str::FromStr, time::Duration};
use tracing::info;

const PWA_COLUMNS: &str = "id, manifest_url, start_url, name, short_name, description, \
    background_color, theme_color, icon_url, manifest_json, lighthouse_score, user_id, \
    user_email, visible, created_at, updated_at";

type Reply<T> = RpcReplyPort<Result<T, DirectoryError>>;

#[derive(Debug)]
pub enum DbActorMessage {
    /// Insert or refresh a PWA by manifest URL. Visibility is left alone on update.
    UpsertPwa(PwaUpsert, Reply<UpsertOutcome>),

    /// Patch visibility of a PWA by id.
    PatchPwa(PwaPatchEnvelope, Reply<()>),

    GetPwa(i64, Reply<Option<DbPwa>>),

    /// One page of visible PWAs plus the visible total.
    ListPwas(PwaListQuery, Reply<PwaPage>),

    /// Every visible PWA, used to (re)build the search index.
    ListVisiblePwas(Reply<Vec<DbPwa>>),

    /// `(max(updated_at), count)` over visible PWAs.
    IndexStamp(Reply<IndexStamp>),

    /// Delete a PWA (and, by cascade, its reports, favorites and task). `false` if absent.
    DeletePwa(i64, Reply<bool>),

    /// Append a report and copy its score onto the PWA.
    InsertLighthouseReport(LighthouseReportCreate, Reply<i64>),

    ListLighthouseReports(i64, Reply<Vec<DbLighthouseSummary>>),

    LatestLighthouseReport(i64, Reply<Option<DbLighthouseReport>>),

    AddFavorite {
        user_id: String,
        pwa_id: i64,
        reply: Reply<()>,
    },

    RemoveFavorite {
        user_id: String,
        pwa_id: i64,
        reply: Reply<bool>,
    },

    ListFavorites(String, Reply<Vec<DbPwa>>),

    /// Queue a PWA for re-validation (moves an existing task to the back). `false` if the PWA is unknown.
    PushTask(i64, Reply<bool>),

    /// Put a failed task back with one more attempt, unless a fresh one exists.
    RequeueTask(DbTask, Reply<()>),

    /// Remove and return up to N oldest tasks.
    PopTasks(i64, Reply<Vec<DbTask>>),

    CountTasks(Reply<i64>),

    /// Queue every PWA that has no pending task; returns the number queued.
    EnqueueAll(Reply<u64>),
}

#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

fn rpc_err(op: &str, e: impl std::fmt::Display) -> DirectoryError {
    DirectoryError::RactorError(format!("DbActor {op} RPC failed: {e}"))
}

impl DbActorHandle {
    pub async fn upsert_pwa(&self, upsert: PwaUpsert) -> Result<UpsertOutcome, DirectoryError> {
        ractor::call!(self.actor, DbActorMessage::UpsertPwa, upsert)
            .map_err(|e| rpc_err("UpsertPwa", e))?
    }

    pub async fn patch_pwa(&self, patch: PwaPatchEnvelope) -> Result<(), DirectoryError> {
        ractor::call!(self.actor, DbActorMessage::PatchPwa, patch)
            .map_err(|e| rpc_err("PatchPwa", e))?
    }

    pub async fn get_pwa(&self, id: i64) -> Result<Option<DbPwa>, DirectoryError> {
        ractor::call!(self.actor, DbActorMessage::GetPwa, id).map_err(|e| rpc_err("GetPwa", e))?
    }

    pub async fn list_pwas(&self, query: PwaListQuery) -> Result<PwaPage, DirectoryError> {
        ractor::call!(self.actor, DbActorMessage::ListPwas, query)
            .map_err(|e| rpc_err("ListPwas", e))?
    }

    pub async fn list_visible_pwas(&self) -> Result<Vec<DbPwa>, DirectoryError> {
        ractor::call!(self.actor, DbActorMessage::ListVisiblePwas)
            .map_err(|e| rpc_err("ListVisiblePwas", e))?
    }

    pub async fn index_stamp(&self) -> Result<IndexStamp, DirectoryError> {
        ractor::call!(self.actor, DbActorMessage::IndexStamp)
            .map_err(|e| rpc_err("IndexStamp", e))?
    }

    pub async fn delete_pwa(&self, id: i64) -> Result<bool, DirectoryError> {
        ractor::call!(self.actor, DbActorMessage::DeletePwa, id)
            .map_err(|e| rpc_err("DeletePwa", e))?
    }

    pub async fn insert_lighthouse_report(
        &self,
        report: LighthouseReportCreate,
    ) -> Result<i64, DirectoryError> {
        ractor::call!(self.actor, DbActorMessage::InsertLighthouseReport, report)
            .map_err(|e| rpc_err("InsertLighthouseReport", e))?
    }

    pub async fn list_lighthouse_reports(
        &self,
        pwa_id: i64,
    ) -> Result<Vec<DbLighthouseSummary>, DirectoryError> {
        ractor::call!(self.actor, DbActorMessage::ListLighthouseReports, pwa_id)
            .map_err(|e| rpc_err("ListLighthouseReports", e))?
    }

    pub async fn latest_lighthouse_report(
        &self,
        pwa_id: i64,
    ) -> Result<Option<DbLighthouseReport>, DirectoryError> {
        ractor::call!(self.actor, DbActorMessage::LatestLighthouseReport, pwa_id)
            .map_err(|e| rpc_err("LatestLighthouseReport", e))?
    }

    pub async fn add_favorite(&self, user_id: &str, pwa_id: i64) -> Result<(), DirectoryError> {
        let user_id = user_id.to_string();
        ractor::call!(self.actor, |reply| DbActorMessage::AddFavorite {
            user_id,
            pwa_id,
            reply
        })
        .map_err(|e| rpc_err("AddFavorite", e))?
    }

    pub async fn remove_favorite(&self, user_id: &str, pwa_id: i64) -> Result<bool, DirectoryError> {
        let user_id = user_id.to_string();
        ractor::call!(self.actor, |reply| DbActorMessage::RemoveFavorite {
            user_id,
            pwa_id,
            reply
        })
        .map_err(|e| rpc_err("RemoveFavorite", e))?
    }

    pub async fn list_favorites(&self, user_id: &str) -> Result<Vec<DbPwa>, DirectoryError> {
        ractor::call!(
            self.actor,
            DbActorMessage::ListFavorites,
            user_id.to_string()
        )
        .map_err(|e| rpc_err("ListFavorites", e))?
    }

    pub async fn push_task(&self, pwa_id: i64) -> Result<bool, DirectoryError> {
        ractor::call!(self.actor, DbActorMessage::PushTask, pwa_id)
            .map_err(|e| rpc_err("PushTask", e))?
    }

    pub async fn requeue_task(&self, task: DbTask) -> Result<(), DirectoryError> {
        ractor::call!(self.actor, DbActorMessage::RequeueTask, task)
            .map_err(|e| rpc_err("RequeueTask", e))?
    }

    pub async fn pop_tasks(&self, limit: i64) -> Result<Vec<DbTask>, DirectoryError> {
        ractor::call!(self.actor, DbActorMessage::PopTasks, limit)
            .map_err(|e| rpc_err("PopTasks", e))?
    }

    pub async fn count_tasks(&self) -> Result<i64, DirectoryError> {
        ractor::call!(self.actor, DbActorMessage::CountTasks)
            .map_err(|e| rpc_err("CountTasks", e))?
    }

    pub async fn enqueue_all(&self) -> Result<u64, DirectoryError> {
        ractor::call!(self.actor, DbActorMessage::EnqueueAll)
            .map_err(|e| rpc_err("EnqueueAll", e))?
    }
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!("DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let pool = &state.pool;
        match message {
            DbActorMessage::UpsertPwa(upsert, reply) => {
                let _ = reply.send(upsert_pwa(pool, upsert).await);
            }
            DbActorMessage::PatchPwa(patch, reply) => {
                let _ = reply.send(patch.apply_patch(pool).await);
            }
            DbActorMessage::GetPwa(id, reply) => {
                let _ = reply.send(get_pwa(pool, id).await);
            }
            DbActorMessage::ListPwas(query, reply) => {
                let _ = reply.send(list_pwas(pool, query).await);
            }
            DbActorMessage::ListVisiblePwas(reply) => {
                let _ = reply.send(list_visible_pwas(pool).await);
            }
            DbActorMessage::IndexStamp(reply) => {
                let _ = reply.send(index_stamp(pool).await);
            }
            DbActorMessage::DeletePwa(id, reply) => {
                let _ = reply.send(delete_pwa(pool, id).await);
            }
            DbActorMessage::InsertLighthouseReport(report, reply) => {
                let _ = reply.send(insert_lighthouse_report(pool, report).await);
            }
            DbActorMessage::ListLighthouseReports(pwa_id, reply) => {
                let _ = reply.send(list_lighthouse_reports(pool, pwa_id).await);
            }
            DbActorMessage::LatestLighthouseReport(pwa_id, reply) => {
                let _ = reply.send(latest_lighthouse_report(pool, pwa_id).await);
            }
            DbActorMessage::AddFavorite {
                user_id,
                pwa_id,
                reply,
            } => {
                let _ = reply.send(add_favorite(pool, &user_id, pwa_id).await);
            }
            DbActorMessage::RemoveFavorite {
                user_id,
                pwa_id,
                reply,
            } => {
                let _ = reply.send(remove_favorite(pool, &user_id, pwa_id).await);
            }
            DbActorMessage::ListFavorites(user_id, reply) => {
                let _ = reply.send(list_favorites(pool, &user_id).await);
            }
            DbActorMessage::PushTask(pwa_id, reply) => {
                let _ = reply.send(push_task(pool, pwa_id).await);
            }
            DbActorMessage::RequeueTask(task, reply) => {
                let _ = reply.send(requeue_task(pool, task).await);
            }
            DbActorMessage::PopTasks(limit, reply) => {
                let _ = reply.send(pop_tasks(pool, limit).await);
            }
            DbActorMessage::CountTasks(reply) => {
                let res = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM task")
                    .fetch_one(pool)
                    .await
                    .map_err(DirectoryError::from);
                let _ = reply.send(res);
            }
            DbActorMessage::EnqueueAll(reply) => {
                let _ = reply.send(enqueue_all(pool).await);
            }
        }
        Ok(())
    }
}

async fn upsert_pwa(pool: &SqlitePool, u: PwaUpsert) -> Result<UpsertOutcome, DirectoryError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM pwa WHERE manifest_url = ?")
        .bind(&u.manifest_url)
        .fetch_optional(&mut *tx)
        .await?;

    let outcome = match existing {
        Some(id) => {
            sqlx::query(
                r#"
            UPDATE pwa
            SET
                start_url = ?,
                name = ?,
                short_name = ?,
                description = ?,
                background_color = ?,
                theme_color = ?,
                icon_url = ?,
                manifest_json = ?,
                updated_at = ?
            WHERE id = ?
            "#,
            )
            .bind(u.start_url)
            .bind(u.name)
            .bind(u.short_name)
            .bind(u.description)
            .bind(u.background_color)
            .bind(u.theme_color)
            .bind(u.icon_url)
            .bind(u.manifest_json)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
            UpsertOutcome { id, created: false }
        }
        None => {
            let id: i64 = sqlx::query_scalar(
                r#"
            INSERT INTO pwa (
                manifest_url, start_url, name, short_name, description, background_color,
                theme_color, icon_url, manifest_json, lighthouse_score, user_id, user_email,
                visible, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?, 1, ?, ?)
            RETURNING id
            "#,
            )
            .bind(u.manifest_url)
            .bind(u.start_url)
            .bind(u.name)
            .bind(u.short_name)
            .bind(u.description)
            .bind(u.background_color)
            .bind(u.theme_color)
            .bind(u.icon_url)
            .bind(u.manifest_json)
            .bind(u.user_id)
            .bind(u.user_email)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            UpsertOutcome { id, created: true }
        }
    };

    tx.commit().await?;
    Ok(outcome)
}

async fn get_pwa(pool: &SqlitePool, id: i64) -> Result<Option<DbPwa>, DirectoryError> {
    let row = sqlx::query_as::<_, DbPwa>(&format!("SELECT {PWA_COLUMNS} FROM pwa WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

async fn list_pwas(pool: &SqlitePool, query: PwaListQuery) -> Result<PwaPage, DirectoryError> {
    let sql = format!(
        "SELECT {PWA_COLUMNS} FROM pwa WHERE visible = 1 ORDER BY {} LIMIT ? OFFSET ?",
        query.sort.order_clause()
    );
    let items = sqlx::query_as::<_, DbPwa>(&sql)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(pool)
        .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pwa WHERE visible = 1")
        .fetch_one(pool)
        .await?;

    Ok(PwaPage { items, total })
}

async fn list_visible_pwas(pool: &SqlitePool) -> Result<Vec<DbPwa>, DirectoryError> {
    let rows = sqlx::query_as::<_, DbPwa>(&format!(
        "SELECT {PWA_COLUMNS} FROM pwa WHERE visible = 1 ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn index_stamp(pool: &SqlitePool) -> Result<IndexStamp, DirectoryError> {
    let stamp: IndexStamp =
        sqlx::query_as("SELECT MAX(updated_at), COUNT(*) FROM pwa WHERE visible = 1")
            .fetch_one(pool)
            .await?;
    Ok(stamp)
}

async fn delete_pwa(pool: &SqlitePool, id: i64) -> Result<bool, DirectoryError> {
    let res = sqlx::query("DELETE FROM pwa WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

async fn insert_lighthouse_report(
    pool: &SqlitePool,
    report: LighthouseReportCreate,
) -> Result<i64, DirectoryError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let affected = sqlx::query("UPDATE pwa SET lighthouse_score = ?, updated_at = ? WHERE id = ?")
        .bind(report.score)
        .bind(now)
        .bind(report.pwa_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if affected == 0 {
        return Err(DirectoryError::not_found(format!("PWA {}", report.pwa_id)));
    }

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO lighthouse_report (pwa_id, score, report_json, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(report.pwa_id)
    .bind(report.score)
    .bind(report.report_json)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(id)
}

async fn list_lighthouse_reports(
    pool: &SqlitePool,
    pwa_id: i64,
) -> Result<Vec<DbLighthouseSummary>, DirectoryError> {
    let rows = sqlx::query_as::<_, DbLighthouseSummary>(
        r#"
        SELECT id, pwa_id, score, created_at
        FROM lighthouse_report
        WHERE pwa_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(pwa_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn latest_lighthouse_report(
    pool: &SqlitePool,
    pwa_id: i64,
) -> Result<Option<DbLighthouseReport>, DirectoryError> {
    let row = sqlx::query_as::<_, DbLighthouseReport>(
        r#"
        SELECT id, pwa_id, score, report_json, created_at
        FROM lighthouse_report
        WHERE pwa_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(pwa_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

async fn add_favorite(pool: &SqlitePool, user_id: &str, pwa_id: i64) -> Result<(), DirectoryError> {
    sqlx::query(
        r#"
        INSERT INTO favorite_pwa (user_id, pwa_id, created_at)
        VALUES (?, ?, ?)
        ON CONFLICT(user_id, pwa_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(pwa_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

async fn remove_favorite(
    pool: &SqlitePool,
    user_id: &str,
    pwa_id: i64,
) -> Result<bool, DirectoryError> {
    let res = sqlx::query("DELETE FROM favorite_pwa WHERE user_id = ? AND pwa_id = ?")
        .bind(user_id)
        .bind(pwa_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

async fn list_favorites(pool: &SqlitePool, user_id: &str) -> Result<Vec<DbPwa>, DirectoryError> {
    let rows = sqlx::query_as::<_, DbPwa>(
        r#"
        SELECT p.id, p.manifest_url, p.start_url, p.name, p.short_name, p.description,
               p.background_color, p.theme_color, p.icon_url, p.manifest_json,
               p.lighthouse_score, p.user_id, p.user_email, p.visible, p.created_at, p.updated_at
        FROM favorite_pwa f
        JOIN pwa p ON p.id = f.pwa_id
        WHERE f.user_id = ?
        ORDER BY f.created_at DESC, p.id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn push_task(pool: &SqlitePool, pwa_id: i64) -> Result<bool, DirectoryError> {
    let res = sqlx::query(
        r#"
        INSERT INTO task (pwa_id, attempts, created_at)
        SELECT ?, 0, ? WHERE EXISTS (SELECT 1 FROM pwa WHERE id = ?)
        ON CONFLICT(pwa_id) DO UPDATE SET
            attempts = 0,
            created_at = excluded.created_at
        "#,
    )
    .bind(pwa_id)
    .bind(Utc::now())
    .bind(pwa_id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() > 0)
}

async fn requeue_task(pool: &SqlitePool, task: DbTask) -> Result<(), DirectoryError> {
    sqlx::query(
        r#"
        INSERT INTO task (pwa_id, attempts, created_at)
        SELECT ?, ?, ? WHERE EXISTS (SELECT 1 FROM pwa WHERE id = ?)
        ON CONFLICT(pwa_id) DO NOTHING
        "#,
    )
    .bind(task.pwa_id)
    .bind(task.attempts + 1)
    .bind(Utc::now())
    .bind(task.pwa_id)
    .execute(pool)
    .await?;
    Ok(())
}

async fn pop_tasks(pool: &SqlitePool, limit: i64) -> Result<Vec<DbTask>, DirectoryError> {
    let mut rows = sqlx::query_as::<_, DbTask>(
        r#"
        DELETE FROM task
        WHERE id IN (SELECT id FROM task ORDER BY created_at, id LIMIT ?)
        RETURNING id, pwa_id, attempts, created_at
        "#,
    )
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?;

    // RETURNING order is unspecified.
    rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    Ok(rows)
}

async fn enqueue_all(pool: &SqlitePool) -> Result<u64, DirectoryError> {
    let res = sqlx::query(
        r#"
        INSERT INTO task (pwa_id, attempts, created_at)
        SELECT id, 0, ? FROM pwa WHERE true
        ON CONFLICT(pwa_id) DO NOTHING
        "#,
    )
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

/// Spawn the database actor and return a cloneable handle.
pub async fn spawn(database_url: &str) -> DbActorHandle {
    let (actor, _jh) = ractor::Actor::spawn(None, DbActor, database_url.to_string())
        .await
        .expect("failed to spawn DbActor");

    DbActorHandle { actor }
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), DirectoryError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
