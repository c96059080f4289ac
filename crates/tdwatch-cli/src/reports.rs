//! Read-only rating, party, and run reports.

use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum RatingsCommands {
    /// Current ratings, highest overall first
    Status {
        /// Filter to one party
        #[arg(long)]
        party: Option<String>,

        #[arg(long, default_value_t = 25)]
        limit: i64,
    },
    /// Recent rating changes for one politician
    History {
        #[arg(long)]
        politician: String,

        #[arg(long, default_value_t = 30)]
        limit: i64,
    },
}

fn rank_label(rank: Option<i32>) -> String {
    rank.map_or_else(|| "-".to_string(), |r| r.to_string())
}

pub(crate) async fn run_ratings(
    pool: &sqlx::PgPool,
    command: RatingsCommands,
) -> anyhow::Result<()> {
    match command {
        RatingsCommands::Status { party, limit } => {
            run_ratings_status(pool, party.as_deref(), limit).await
        }
        RatingsCommands::History { politician, limit } => {
            run_ratings_history(pool, &politician, limit).await
        }
    }
}

async fn run_ratings_status(
    pool: &sqlx::PgPool,
    party: Option<&str>,
    limit: i64,
) -> anyhow::Result<()> {
    let politicians = tdwatch_db::list_politicians(pool, party, limit).await?;
    if politicians.is_empty() {
        println!(
            "no politicians found{}; run `db seed` first",
            party.map(|p| format!(" in party '{p}'")).unwrap_or_default()
        );
        return Ok(());
    }

    println!(
        "{:<6}{:<28}{:<20}{:>9}{:>9}{:>9}{:>9}{:>9}",
        "RANK", "NAME", "PARTY", "OVERALL", "TRANSP", "EFFECT", "INTEG", "STORIES"
    );
    for p in &politicians {
        println!(
            "{:<6}{:<28}{:<20}{:>9.1}{:>9.1}{:>9.1}{:>9.1}{:>9}",
            rank_label(p.national_rank),
            p.name,
            p.party,
            p.overall_elo,
            p.transparency_elo,
            p.effectiveness_elo,
            p.integrity_elo,
            p.total_stories
        );
    }
    Ok(())
}

async fn run_ratings_history(pool: &sqlx::PgPool, name: &str, limit: i64) -> anyhow::Result<()> {
    let politician = match tdwatch_db::get_politician_by_name(pool, name).await {
        Ok(row) => row,
        Err(tdwatch_db::DbError::NotFound) => anyhow::bail!("politician '{name}' not found"),
        Err(e) => return Err(e.into()),
    };
    let history = tdwatch_db::list_rating_history(pool, politician.id, limit).await?;
    if history.is_empty() {
        println!("no rating history for {}", politician.name);
        return Ok(());
    }

    println!("{} ({}, {})", politician.name, politician.party, politician.constituency);
    println!(
        "{:<18}{:<22}{:>9}{:>9}{:>8}  ARTICLE",
        "WHEN", "DIMENSION", "OLD", "NEW", "DELTA"
    );
    for h in &history {
        println!(
            "{:<18}{:<22}{:>9.1}{:>9.1}{:>+8.1}  {}",
            h.created_at.format("%Y-%m-%d %H:%M"),
            h.dimension,
            h.old_value,
            h.new_value,
            h.delta,
            h.article_id.map_or_else(|| "-".to_string(), |id| id.to_string())
        );
    }
    Ok(())
}

pub(crate) async fn run_parties(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let parties = tdwatch_db::list_party_aggregates(pool).await?;
    if parties.is_empty() {
        println!("no party aggregates yet; they are computed after a pipeline run");
        return Ok(());
    }

    println!("{:<28}{:>8}{:>9}{:>9}{:>9}", "PARTY", "MEMBERS", "OVERALL", "TRANSP", "INTEG");
    for p in &parties {
        println!(
            "{:<28}{:>8}{:>9.1}{:>9.1}{:>9.1}",
            p.party, p.member_count, p.overall_elo, p.transparency_elo, p.integrity_elo
        );
    }
    Ok(())
}

pub(crate) async fn run_runs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = tdwatch_db::list_processing_runs(pool, limit).await?;
    if runs.is_empty() {
        println!("no processing runs recorded");
        return Ok(());
    }

    println!(
        "{:<8}{:<8}{:<11}{:<11}{:<18}{:>9}  ERROR",
        "ID", "TYPE", "TRIGGER", "STATUS", "STARTED", "RECORDS"
    );
    for run in &runs {
        println!(
            "{:<8}{:<8}{:<11}{:<11}{:<18}{:>9}  {}",
            run.id,
            run.run_type,
            run.trigger_source,
            run.status,
            run.started_at
                .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string()),
            run.records_processed,
            run.error_message.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
