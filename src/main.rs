//! nutriplan CLI entry point

use clap::{Parser, Subcommand};
use nutriplan::{
    commands::{
        cmd_check_region, cmd_delete_plan, cmd_generate_plan, cmd_init, cmd_ingest,
        cmd_list_documents, cmd_query, cmd_region_stats, cmd_remove_document, cmd_set_plan_status,
        cmd_set_profile, cmd_show_plan, cmd_show_profile, cmd_status, print_documents,
        print_ingest_outcome, print_plan, print_profile, print_query_results,
        print_region_coverage, print_region_stats, print_status, IngestArgs, ProfileUpdate,
        QueryOptions,
    },
    config::Config,
    embed::shared_embedder,
    error::Result,
    progress::LogWriterFactory,
    registry::{PlanStatus, PlanType, Registry},
    store::VectorStore,
};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "nutriplan")]
#[command(version, about = "RAG-backed diabetes diet and exercise planning", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize nutriplan configuration and databases
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Ingest a guideline document (PDF, DOCX or plain text)
    Ingest {
        /// Path to the document
        path: PathBuf,

        /// Document title
        #[arg(short, long)]
        title: String,

        /// Publishing source (e.g. WHO, ADA, ICMR)
        #[arg(short, long)]
        source: String,

        /// Region the document covers (e.g. India, Global)
        #[arg(long)]
        country: String,

        /// Document type: guideline, research_paper, diet_chart,
        /// exercise_recommendation, clinical_material or other
        #[arg(long)]
        doc_type: String,

        /// Document version
        #[arg(long, default_value = "1.0")]
        doc_version: String,

        /// Who performed the ingestion
        #[arg(long)]
        by: Option<String>,

        /// Re-ingest even if this exact file was ingested before
        #[arg(long)]
        force: bool,
    },

    /// Query the guideline index
    Query {
        /// The search query
        query: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Minimum similarity score (0-1)
        #[arg(short, long)]
        min_score: Option<f32>,

        /// Filter by region
        #[arg(long)]
        country: Option<String>,

        /// Filter by document type
        #[arg(long)]
        doc_type: Option<String>,
    },

    /// Generate and manage daily plans
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },

    /// List or remove ingested documents
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Region coverage statistics
    Regions {
        /// Restrict to one document type
        #[arg(long)]
        doc_type: Option<String>,

        /// Show coverage detail for one region
        #[arg(long)]
        check: Option<String>,
    },

    /// Show system status
    Status,

    /// Manage user profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Manage the Qdrant vector database
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum PlanAction {
    /// Generate a plan for a user and date
    Generate {
        /// User identifier
        user_id: String,

        /// Target date (YYYY-MM-DD)
        date: String,

        /// Plan type: diet or exercise
        #[arg(long, default_value = "diet")]
        plan_type: String,
    },

    /// Show a stored plan
    Show {
        user_id: String,
        date: String,
        #[arg(long, default_value = "diet")]
        plan_type: String,
    },

    /// Update a plan's status (pending, active, completed, skipped)
    SetStatus {
        user_id: String,
        date: String,
        status: String,
        #[arg(long, default_value = "diet")]
        plan_type: String,
    },

    /// Delete a stored plan
    Delete {
        user_id: String,
        date: String,
        #[arg(long, default_value = "diet")]
        plan_type: String,
    },
}

#[derive(Subcommand)]
enum DocsAction {
    /// List ingested documents
    List {
        /// Filter by document type
        #[arg(long)]
        doc_type: Option<String>,

        /// Filter by region
        #[arg(long)]
        country: Option<String>,
    },

    /// Remove a document and all its derived data
    Remove {
        /// Document ID (see 'nutriplan docs list')
        document_id: String,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Create or update a profile
    Set {
        user_id: String,

        #[arg(long)]
        gender: Option<String>,

        /// Birth date (YYYY-MM-DD)
        #[arg(long)]
        birth_date: Option<String>,

        #[arg(long)]
        weight_kg: Option<f64>,

        #[arg(long)]
        height_cm: Option<f64>,

        /// sedentary, light, moderate, active or very_active
        #[arg(long)]
        activity_level: Option<String>,

        #[arg(long)]
        country: Option<String>,

        /// e.g. "Type 1" or "Type 2"
        #[arg(long)]
        diabetes_type: Option<String>,

        /// Comma-separated medication list
        #[arg(long)]
        medications: Option<String>,

        #[arg(long)]
        dietary_preference: Option<String>,

        /// maintain, lose or gain
        #[arg(long)]
        weight_goal: Option<String>,
    },

    /// Show a stored profile
    Show { user_id: String },
}

/// Database management actions
#[derive(Subcommand)]
enum DbAction {
    /// Initialize/create the Qdrant collection
    Init,

    /// Show Qdrant collection status
    Status,

    /// Reset the collection (delete all vectors and recreate)
    Reset {
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e.user_message(verbose));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Init does not need an existing config
    if matches!(cli.command, Commands::Init { .. }) {
        return handle_init(cli).await;
    }

    let config = load_config(cli.config.as_deref())?;
    let registry = Registry::new(&config.paths.db_file).await?;
    let store = VectorStore::connect(&config).await?;

    match cli.command {
        Commands::Init { .. } => unreachable!(),

        Commands::Ingest {
            path,
            title,
            source,
            country,
            doc_type,
            doc_version,
            by,
            force,
        } => {
            let embedder = shared_embedder(&config.embedding).await?;
            let outcome = cmd_ingest(
                &config,
                &registry,
                &store,
                embedder,
                &path,
                IngestArgs {
                    title,
                    source,
                    country,
                    doc_type: doc_type.parse()?,
                    version: doc_version,
                    ingested_by: by,
                    force,
                },
            )
            .await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome.document)?);
            } else {
                print_ingest_outcome(&outcome);
            }
        }

        Commands::Query {
            query,
            limit,
            min_score,
            country,
            doc_type,
        } => {
            let embedder = shared_embedder(&config.embedding).await?;
            let result = cmd_query(
                &config,
                &registry,
                &store,
                embedder.as_ref(),
                &query,
                QueryOptions {
                    k: limit,
                    min_score,
                    country,
                    doc_type,
                },
            )
            .await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_query_results(&result);
            }
        }

        Commands::Plan { action } => {
            handle_plan_action(&config, &registry, &store, action, cli.json).await?;
        }

        Commands::Docs { action } => match action {
            DocsAction::List { doc_type, country } => {
                let doc_type = doc_type.map(|t| t.parse()).transpose()?;
                let documents =
                    cmd_list_documents(&registry, doc_type, country.as_deref()).await?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&documents)?);
                } else {
                    print_documents(&documents);
                }
            }
            DocsAction::Remove { document_id } => {
                cmd_remove_document(&registry, &store, &document_id).await?;
                println!("✓ Document '{}' removed", document_id);
            }
        },

        Commands::Regions { doc_type, check } => {
            let doc_type = doc_type.map(|t| t.parse()).transpose()?;
            if let Some(region_name) = check {
                let coverage = cmd_check_region(
                    &registry,
                    &region_name,
                    doc_type.unwrap_or(nutriplan::registry::DocType::DietChart),
                )
                .await?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&coverage)?);
                } else {
                    print_region_coverage(&coverage);
                }
            } else {
                let stats = cmd_region_stats(&registry, doc_type).await?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                } else {
                    print_region_stats(&stats, doc_type);
                }
            }
        }

        Commands::Status => {
            let status = cmd_status(&config, &registry, &store).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }

        Commands::Profile { action } => match action {
            ProfileAction::Set {
                user_id,
                gender,
                birth_date,
                weight_kg,
                height_cm,
                activity_level,
                country,
                diabetes_type,
                medications,
                dietary_preference,
                weight_goal,
            } => {
                let medications = medications.map(|m| {
                    m.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                });
                let profile = cmd_set_profile(
                    &registry,
                    &user_id,
                    ProfileUpdate {
                        gender,
                        birth_date,
                        weight_kg,
                        height_cm,
                        activity_level,
                        country,
                        diabetes_type,
                        medications,
                        dietary_preference,
                        weight_goal,
                    },
                )
                .await?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&profile)?);
                } else {
                    print_profile(&profile);
                }
            }
            ProfileAction::Show { user_id } => {
                let profile = cmd_show_profile(&registry, &user_id).await?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&profile)?);
                } else {
                    print_profile(&profile);
                }
            }
        },

        Commands::Db { action } => {
            handle_db_action(&store, action, cli.json).await?;
        }
    }

    Ok(())
}

async fn handle_init(cli: Cli) -> Result<()> {
    let Commands::Init { force } = cli.command else {
        unreachable!()
    };

    // A --config pointing at a .toml file means "use its parent directory"
    let base_dir = cli.config.as_deref().map(|p| {
        if p.extension().map_or(false, |e| e == "toml") {
            p.parent().map(PathBuf::from).unwrap_or_else(|| p.to_path_buf())
        } else {
            p.to_path_buf()
        }
    });

    let config = cmd_init(base_dir, force).await?;
    println!("✓ nutriplan initialized successfully");
    println!("  Config: {}", config.paths.config_file.display());
    println!("\nNext steps:");
    println!("  1. Start Qdrant: docker run -p 6333:6333 -p 6334:6334 qdrant/qdrant");
    println!("  2. Ingest guidelines: nutriplan ingest <file> --title ... --country ...");
    println!("  3. Set up a profile: nutriplan profile set <user-id> ...");
    Ok(())
}

async fn handle_plan_action(
    config: &Config,
    registry: &Registry,
    store: &VectorStore,
    action: PlanAction,
    json: bool,
) -> Result<()> {
    match action {
        PlanAction::Generate {
            user_id,
            date,
            plan_type,
        } => {
            let plan_type: PlanType = plan_type.parse()?;
            let embedder = shared_embedder(&config.embedding).await?;
            let generated =
                cmd_generate_plan(config, registry, store, embedder, &user_id, &date, plan_type)
                    .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&generated.record)?);
            } else {
                println!(
                    "✓ Plan generated (region {}, coverage {})",
                    generated.coverage.region, generated.coverage.tier
                );
                print_plan(&generated.record);
            }
        }
        PlanAction::Show {
            user_id,
            date,
            plan_type,
        } => {
            let plan = cmd_show_plan(registry, &user_id, &date, plan_type.parse()?).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print_plan(&plan);
            }
        }
        PlanAction::SetStatus {
            user_id,
            date,
            status,
            plan_type,
        } => {
            let status: PlanStatus = status.parse()?;
            let plan =
                cmd_set_plan_status(registry, &user_id, &date, plan_type.parse()?, status).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("✓ Plan {} marked {}", plan.id, plan.status);
            }
        }
        PlanAction::Delete {
            user_id,
            date,
            plan_type,
        } => {
            cmd_delete_plan(registry, &user_id, &date, plan_type.parse()?).await?;
            println!("✓ Plan deleted");
        }
    }
    Ok(())
}

async fn handle_db_action(store: &VectorStore, action: DbAction, json: bool) -> Result<()> {
    match action {
        DbAction::Init => {
            store.ensure_collection().await?;
            if json {
                println!(r#"{{"status": "ok", "message": "Collection initialized"}}"#);
            } else {
                println!("✓ Qdrant collection initialized");
            }
        }
        DbAction::Status => match store.get_collection_info().await? {
            Some(info) => {
                if json {
                    println!(
                        r#"{{"exists": true, "points_count": {}, "indexed_vectors_count": {}, "status": "{}"}}"#,
                        info.points_count, info.indexed_vectors_count, info.status
                    );
                } else {
                    println!("Qdrant Collection Status:");
                    println!("  Status: {}", info.status);
                    println!("  Points: {}", info.points_count);
                    println!("  Indexed Vectors: {}", info.indexed_vectors_count);
                }
            }
            None => {
                if json {
                    println!(r#"{{"exists": false}}"#);
                } else {
                    println!("Collection does not exist. Run 'nutriplan db init' to create it.");
                }
            }
        },
        DbAction::Reset { yes } => {
            if !yes {
                eprintln!("⚠️  This will delete ALL indexed vectors!");
                eprintln!("Run with --yes to confirm.");
                std::process::exit(1);
            }
            store.reset_collection().await?;
            if json {
                println!(r#"{{"status": "ok", "message": "Collection reset"}}"#);
            } else {
                println!("✓ Qdrant collection reset (all data deleted and collection recreated)");
            }
        }
    }
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_config_path);

    if !config_path.exists() {
        eprintln!(
            "Config file not found: {}\nRun 'nutriplan init' first.",
            config_path.display()
        );
        std::process::exit(1);
    }

    Config::load(&config_path)
}
