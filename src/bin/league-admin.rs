//! League Administration CLI
//!
//! Operator tasks that should not go through the HTTP API: bootstrapping the
//! first platform admin, granting organization admin rights, housekeeping for
//! sessions and a quick look at recent AI imports.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use uuid::Uuid;

use league_service::{
    config::AppConfig,
    database::{run_migrations, DatabaseConfig, Pagination},
    models::import::ImportStatus,
    service::{ImportService, JwtService, OrganizationService, UserService},
};

/// League service administration CLI
#[derive(Parser)]
#[command(name = "league-admin", about = "League service administration CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create a platform admin account
    CreateAdmin(CreateAdminArgs),
    /// Grant or revoke platform admin on an existing account
    SetPlatformAdmin(SetPlatformAdminArgs),
    /// Make an existing user an admin of an organization
    GrantOrgAdmin(GrantOrgAdminArgs),
    /// List organizations
    ListOrgs(ListOrgsArgs),
    /// Sign a user out everywhere by deleting all of their sessions
    RevokeSessions(RevokeSessionsArgs),
    /// Delete expired refresh sessions
    CleanupSessions,
    /// Show recent import jobs across all organizations
    ListImports(ListImportsArgs),
}

#[derive(Args)]
struct CreateAdminArgs {
    /// Display name
    #[arg(short, long)]
    name: String,

    /// Login email
    #[arg(short, long)]
    email: String,

    /// Initial password
    #[arg(short, long, env = "LEAGUE_ADMIN_PASSWORD")]
    password: String,
}

#[derive(Args)]
struct SetPlatformAdminArgs {
    /// Account email
    #[arg(short, long)]
    email: String,

    /// Remove the flag instead of setting it
    #[arg(long)]
    revoke: bool,
}

#[derive(Args)]
struct RevokeSessionsArgs {
    /// Account email
    #[arg(short, long)]
    email: String,
}

#[derive(Args)]
struct GrantOrgAdminArgs {
    /// Organization slug
    #[arg(short, long)]
    org: String,

    /// Email of an existing account
    #[arg(short, long)]
    email: String,
}

#[derive(Args)]
struct ListOrgsArgs {
    #[arg(long, default_value = "1")]
    page: u32,

    #[arg(long, default_value = "50")]
    per_page: u32,
}

#[derive(Args)]
struct ListImportsArgs {
    /// pending, processing, completed or failed
    #[arg(short, long)]
    status: Option<String>,

    #[arg(short, long, default_value = "20")]
    limit: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    let database_pool = DatabaseConfig::from(&config.database)
        .create_pool()
        .await
        .context("failed to connect to the database")?;

    // Every command expects an up-to-date schema
    run_migrations(&database_pool)
        .await
        .context("failed to run migrations")?;

    match cli.command {
        Commands::Migrate => println!("✅ Migrations applied"),
        Commands::CreateAdmin(args) => {
            create_admin(&UserService::new(database_pool), args).await?
        }
        Commands::SetPlatformAdmin(args) => {
            set_platform_admin(&UserService::new(database_pool), args).await?
        }
        Commands::GrantOrgAdmin(args) => {
            grant_org_admin(&OrganizationService::new(database_pool), args).await?
        }
        Commands::ListOrgs(args) => {
            list_organizations(&OrganizationService::new(database_pool), args).await?
        }
        Commands::RevokeSessions(args) => {
            let user_service = UserService::new(database_pool.clone());
            let jwt_service = JwtService::from_config(database_pool, &config.jwt);
            revoke_sessions(&user_service, &jwt_service, args).await?
        }
        Commands::CleanupSessions => {
            let jwt_service = JwtService::from_config(database_pool, &config.jwt);
            let removed = jwt_service.cleanup_expired_sessions().await?;
            println!("🧹 Removed {} expired session(s)", removed);
        }
        Commands::ListImports(args) => {
            let import_service = ImportService::new(database_pool, config.import.clone(), None)?;
            list_imports(&import_service, args).await?
        }
    }

    Ok(())
}

async fn create_admin(service: &UserService, args: CreateAdminArgs) -> Result<()> {
    let user = service
        .create_platform_admin(&args.name, &args.email, &args.password)
        .await
        .context("failed to create platform admin")?;

    println!("✅ Platform admin created");
    println!("  ID:    {}", user.id);
    println!("  Name:  {}", user.name);
    println!("  Email: {}", user.email);

    Ok(())
}

async fn set_platform_admin(service: &UserService, args: SetPlatformAdminArgs) -> Result<()> {
    let user = service
        .set_platform_admin(&args.email, !args.revoke)
        .await
        .with_context(|| format!("failed to update {}", args.email))?;

    if user.is_platform_admin {
        println!("✅ {} is now a platform admin", user.email);
    } else {
        println!("✅ {} is no longer a platform admin", user.email);
    }

    Ok(())
}

async fn revoke_sessions(
    user_service: &UserService,
    jwt_service: &JwtService,
    args: RevokeSessionsArgs,
) -> Result<()> {
    let user = user_service
        .get_user_by_email(&args.email)
        .await
        .with_context(|| format!("no account for {}", args.email))?;

    let removed = jwt_service.revoke_all_user_sessions(user.id).await?;
    println!("✅ Revoked {} session(s) for {}", removed, user.email);

    Ok(())
}

async fn grant_org_admin(service: &OrganizationService, args: GrantOrgAdminArgs) -> Result<()> {
    let organization = service
        .find_by_slug(&args.org)
        .await
        .with_context(|| format!("organization '{}' not found", args.org))?;

    let member = service.grant_admin(organization.id, &args.email).await?;

    println!(
        "✅ {} <{}> is now {} of {}",
        member.name,
        member.email,
        member.role.as_str(),
        organization.name
    );

    Ok(())
}

async fn list_organizations(service: &OrganizationService, args: ListOrgsArgs) -> Result<()> {
    let organizations = service
        .list_for_user(Uuid::nil(), true, Pagination::new(args.page, args.per_page))
        .await?;

    if organizations.is_empty() {
        println!("No organizations found.");
        return Ok(());
    }

    println!("{:<38} {:<30} {:<24} Created", "ID", "Name", "Slug");
    println!("{}", "-".repeat(110));
    for organization in organizations {
        println!(
            "{:<38} {:<30} {:<24} {}",
            organization.id,
            truncate_string(&organization.name, 28),
            truncate_string(&organization.slug, 22),
            organization.created_at.format("%Y-%m-%d")
        );
    }

    Ok(())
}

async fn list_imports(service: &ImportService, args: ListImportsArgs) -> Result<()> {
    if args.limit < 1 {
        bail!("--limit must be at least 1");
    }

    let status = args
        .status
        .as_deref()
        .map(str::parse::<ImportStatus>)
        .transpose()?;

    let jobs = service.list_recent(status, args.limit).await?;

    if jobs.is_empty() {
        println!("No import jobs found.");
        return Ok(());
    }

    println!(
        "{:<38} {:<38} {:<8} {:<11} {:<24} Created",
        "Job", "Organization", "Mode", "Status", "File"
    );
    println!("{}", "-".repeat(140));
    for job in jobs {
        println!(
            "{:<38} {:<38} {:<8} {:<11} {:<24} {}",
            job.id,
            job.organization_id,
            job.mode.as_str(),
            job.status.as_str(),
            truncate_string(&job.file_name, 22),
            job.created_at.format("%Y-%m-%d %H:%M")
        );
        if let Some(error) = &job.error {
            println!("    error: {}", truncate_string(error, 100));
        }
        if let Some(summary) = &job.summary {
            println!(
                "    competitions {} new / {} matched, events {} new / {} matched, warnings {}",
                summary.competitions.created,
                summary.competitions.matched,
                summary.events.created,
                summary.events.matched,
                summary.warnings.len()
            );
        }
    }

    Ok(())
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
