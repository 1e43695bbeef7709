use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use crate::pipeline::select::Selection;
use crate::util::time::kst_now_iso;

/// Write-side store for daily briefings. The web frontend reads the same
/// file independently; this side only replaces one day at a time.
#[derive(Debug, Clone)]
pub struct BriefingDao {
    pool: SqlitePool,
}

impl BriefingDao {
    /// Opens (and creates, if needed) the database file without touching it
    /// until the first write.
    pub fn connect_lazy(path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create database directory {parent:?}"))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_lazy_with(options);
        Ok(Self { pool })
    }

    /// In-memory database, used by tests.
    pub fn in_memory() -> Self {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_lazy_with(options);
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS daily_briefings (
                date        TEXT PRIMARY KEY,
                analysis    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .context("failed to create daily_briefings table")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS articles (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                date            TEXT NOT NULL,
                category        TEXT,
                title           TEXT NOT NULL,
                title_original  TEXT,
                url             TEXT NOT NULL,
                summary         TEXT,
                insight         TEXT,
                detected_date   TEXT,
                created_at      TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .context("failed to create articles table")?;

        Ok(())
    }

    /// Replaces the stored briefing for `date` atomically: prior rows for
    /// the same date are removed so reruns cannot duplicate a day.
    pub async fn replace_briefing(
        &self,
        date: &str,
        selections: &[Selection],
        analysis: &str,
    ) -> Result<()> {
        self.ensure_schema().await?;
        let created_at = kst_now_iso();

        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin briefing transaction")?;

        sqlx::query("DELETE FROM daily_briefings WHERE date = ?")
            .bind(date)
            .execute(&mut *tx)
            .await
            .context("failed to clear prior briefing")?;
        sqlx::query("DELETE FROM articles WHERE date = ?")
            .bind(date)
            .execute(&mut *tx)
            .await
            .context("failed to clear prior articles")?;

        if !analysis.is_empty() {
            sqlx::query(
                "INSERT INTO daily_briefings (date, analysis, created_at) VALUES (?, ?, ?)",
            )
            .bind(date)
            .bind(analysis)
            .bind(&created_at)
            .execute(&mut *tx)
            .await
            .context("failed to insert briefing analysis")?;
        }

        for selection in selections {
            sqlx::query(
                "INSERT INTO articles
                    (date, category, title, title_original, url, summary, insight, detected_date, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(date)
            .bind(selection.category.wire_tag())
            .bind(&selection.title)
            .bind(selection.title_original.as_deref().unwrap_or_default())
            .bind(&selection.url)
            .bind(&selection.summary)
            .bind("")
            .bind(selection.detected_date.as_deref().unwrap_or_default())
            .bind(&created_at)
            .execute(&mut *tx)
            .await
            .context("failed to insert selected article")?;
        }

        tx.commit()
            .await
            .context("failed to commit briefing transaction")?;

        info!(
            date,
            articles = selections.len(),
            with_analysis = !analysis.is_empty(),
            "briefing persisted"
        );
        Ok(())
    }
}
