use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

mod columns;
mod curriculum;
mod db;
mod error;
mod grading;
mod icons;
mod mock;
mod models;
mod report;
mod server;
mod source;

use mock::MockConfig;
use models::StudentGrades;
use source::RowSource;

#[derive(Parser)]
#[command(name = "gradebook")]
#[command(about = "Unit and lesson gradebook for the project-based math curriculum", long_about = None)]
struct Cli {
    /// Postgres connection string for the gradebook schema
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SourceKind {
    /// Generated students
    Mock,
    /// A `{"rowData": [...]}` JSON file
    File,
    /// Grade entries stored in Postgres
    Db,
}

#[derive(Args, Clone, Debug)]
struct SourceArgs {
    #[arg(long, value_enum, default_value_t = SourceKind::Mock)]
    source: SourceKind,
    #[arg(long)]
    file: Option<PathBuf>,
    #[arg(long, default_value_t = 80)]
    students: usize,
    #[arg(long)]
    seed: Option<u64>,
}

impl SourceArgs {
    fn mock_config(&self) -> MockConfig {
        MockConfig {
            student_count: self.students,
            seed: self.seed,
        }
    }

    fn row_source(&self) -> anyhow::Result<RowSource> {
        Ok(match self.source {
            SourceKind::Mock => RowSource::Mock(self.mock_config()),
            SourceKind::File => match &self.file {
                Some(path) => RowSource::File(path.clone()),
                None => bail!("--source file needs --file <path>"),
            },
            SourceKind::Db => RowSource::Database,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo course with generated students and grades
    Seed {
        #[arg(long, default_value_t = 80)]
        students: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Import grade entries from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print students with enrollments, periods and courses as JSON
    Students,
    /// Print course and unit grades per student
    Grades {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Print the grid column tree as JSON
    Columns,
    /// Write generated rows to a mock data file
    Export {
        #[arg(long, default_value_t = 80)]
        students: usize,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = "mock_data.json")]
        out: PathBuf,
    },
    /// Serve the grid API
    Serve {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, env = "GRADEBOOK_ADDR", default_value = "127.0.0.1:5173")]
        addr: SocketAddr,
    },
}

async fn connect(database_url: Option<&str>) -> anyhow::Result<PgPool> {
    let database_url =
        database_url.context("DATABASE_URL must be set to a production Postgres instance")?;
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

/// Only `--source db` needs a pool.
async fn optional_pool(
    database_url: Option<&str>,
    source: &RowSource,
) -> anyhow::Result<Option<PgPool>> {
    match source {
        RowSource::Database => Ok(Some(connect(database_url).await?)),
        _ => Ok(None),
    }
}

async fn load_grades(
    database_url: Option<&str>,
    source: &RowSource,
) -> anyhow::Result<Vec<StudentGrades>> {
    let pool = optional_pool(database_url, source).await?;
    let records = source.load(pool.as_ref()).await?;
    Ok(records.iter().map(StudentGrades::from_record).collect())
}

fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let database_url = cli.database_url.as_deref();

    match cli.command {
        Commands::InitDb => {
            let pool = connect(database_url).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed { students, seed } => {
            let pool = connect(database_url).await?;
            let config = MockConfig {
                student_count: students,
                seed: Some(seed),
            };
            let written = db::seed(&pool, &config).await?;
            println!("Seeded {written} students.");
        }
        Commands::Import { csv } => {
            let pool = connect(database_url).await?;
            let written = db::import_csv(&pool, &csv).await?;
            println!("Wrote {written} grade entries from {}.", csv.display());
        }
        Commands::Students => {
            let pool = connect(database_url).await?;
            let students = db::fetch_students(&pool).await?;
            println!("{}", serde_json::to_string_pretty(&students)?);
        }
        Commands::Grades { source, limit } => {
            let source = source.row_source()?;
            let students = load_grades(database_url, &source).await?;

            if students.is_empty() {
                println!("No students found in {}.", source.label());
                return Ok(());
            }

            println!("Course grades from {}:", source.label());
            for summary in grading::summarize_students(&students).iter().take(limit) {
                let units: Vec<String> = summary
                    .unit_grades
                    .iter()
                    .map(|grade| report::format_grade(*grade))
                    .collect();
                println!(
                    "- {}: {} across {} lessons [{}]",
                    summary.student_name,
                    report::format_grade(summary.course_grade),
                    summary.lessons_graded,
                    units.join(", ")
                );
            }
        }
        Commands::Report { source, out } => {
            let source = source.row_source()?;
            let students = load_grades(database_url, &source).await?;
            let report = report::build_report(
                &source.label(),
                chrono::Local::now().date_naive(),
                &students,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Columns => {
            println!("{}", serde_json::to_string_pretty(&columns::build_column_defs())?);
        }
        Commands::Export {
            students,
            seed,
            out,
        } => {
            let records = mock::generate_records(&MockConfig {
                student_count: students,
                seed,
            });
            let count = records.len();
            mock::write_document(&out, records)?;
            println!("Wrote {count} students to {}.", out.display());
        }
        Commands::Serve { source, addr } => {
            let source = source.row_source()?;
            // A lazy pool lets the service start without the backend; failed
            // reads surface per request.
            let pool = match database_url {
                Some(url) => Some(
                    PgPoolOptions::new()
                        .max_connections(5)
                        .connect_lazy(url)
                        .context("invalid DATABASE_URL")?,
                ),
                None => None,
            };
            server::serve(addr, server::AppState::new(pool, source)).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn rust_log_overrides_the_info_default() {
        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(
            log_filter(Some("debug")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
        assert_eq!(
            log_filter(Some("math_gradebook=trace")).max_level_hint(),
            Some(LevelFilter::TRACE)
        );
    }
}
