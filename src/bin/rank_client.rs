use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use classi_rank::adapters::csv_export::write_rankings_csv;
use classi_rank::core::engine::RankedCourse;
use classi_rank::domain::model::{ItemId, OwnerId};
use classi_rank::utils::logger;
use classi_rank::{Preference, RankClient, RankError};
use std::fs::File;
use std::io::BufWriter;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

#[derive(Parser)]
#[command(name = "rank-client")]
#[command(about = "Command line client for the classi-rank server")]
struct Args {
    /// Base URL of the ranking server
    #[arg(short, long, default_value = "http://127.0.0.1:3001")]
    server: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a new user
    AddUser { name: String, email: String },
    /// Add a course to the catalogue
    AddCourse { code: String, title: String },
    /// List courses, optionally filtered by code or title
    Courses {
        #[arg(short = 'q', long)]
        search: Option<String>,
    },
    /// Show a user's ranking
    Rankings { user: OwnerId },
    /// Place a course in a user's ranking by answering pairwise comparisons
    Rank { user: OwnerId, course: ItemId },
    /// Export a user's ranking as CSV
    Export {
        user: OwnerId,
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    let client = RankClient::new(&args.server)
        .with_context(|| format!("invalid server url '{}'", args.server))?;
    tracing::debug!("🔗 Using server {}", args.server);

    match args.command {
        Command::AddUser { name, email } => {
            let user = client.create_user(&name, &email).await?;
            println!("✅ Created user {} ({})", user.name, user.id);
        }
        Command::AddCourse { code, title } => {
            let course = client.create_course(&title, &code).await?;
            println!("✅ Created course {} {} ({})", course.code, course.title, course.id);
        }
        Command::Courses { search } => {
            let courses = match search.as_deref() {
                Some(query) => client.search_courses(query).await?,
                None => client.courses().await?,
            };
            if courses.is_empty() {
                match search {
                    Some(query) => println!("No courses match '{}'", query),
                    None => println!("No courses yet"),
                }
            }
            for course in courses {
                println!("{:<10} {:<40} {}", course.code, course.title, course.id);
            }
        }
        Command::Rankings { user } => {
            let rankings = client.rankings(user).await?;
            print_rankings(&rankings);
        }
        Command::Rank { user, course } => {
            rank_interactively(&client, user, course).await?;
        }
        Command::Export { user, output } => {
            let rankings = client.rankings(user).await?;
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("cannot create '{}'", path))?;
                    write_rankings_csv(BufWriter::new(file), &rankings)?;
                    tracing::info!("📤 Exported {} rankings to {}", rankings.len(), path);
                }
                None => write_rankings_csv(std::io::stdout().lock(), &rankings)?,
            }
        }
    }

    Ok(())
}

fn print_rankings(rankings: &[RankedCourse]) {
    if rankings.is_empty() {
        println!("No courses ranked yet");
        return;
    }
    for ranked in rankings {
        println!(
            "{:>3}. {:<10} {}",
            ranked.rank + 1,
            ranked.course.code,
            ranked.course.title
        );
    }
}

async fn rank_interactively(
    client: &RankClient,
    user: OwnerId,
    course_id: ItemId,
) -> anyhow::Result<()> {
    let course = client.course(course_id).await?;
    let mut session = client.start_session(user, course_id).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some((existing_id, _)) = session.candidate() {
        let existing = client.course(existing_id).await?;
        println!();
        println!("Which course do you prefer?");
        println!("  [1] {} {}", course.code, course.title);
        println!("  [2] {} {}", existing.code, existing.title);

        let preference = match prompt_preference(&mut lines).await? {
            Some(preference) => preference,
            None => {
                // 取消時不寫入任何資料
                println!("Cancelled, ranking unchanged");
                return Ok(());
            }
        };
        session = client.answer(session, preference).await.map_err(explain_conflict)?;
    }

    let comparisons = session.comparisons;
    let receipt = client.commit(session).await.map_err(explain_conflict)?;
    println!(
        "✅ {} placed at #{} after {} comparisons",
        course.code,
        receipt.new_rank + 1,
        comparisons
    );
    for achievement in &receipt.achievements {
        println!("🏆 {}: {}", achievement.name, achievement.description);
    }

    print_rankings(&client.rankings(user).await?);
    Ok(())
}

// 只有版本衝突才代表排名被別人改過, 其他 409 照原樣回報
fn explain_conflict(e: RankError) -> anyhow::Error {
    if e.remote_code() == Some("VERSION_CONFLICT") {
        anyhow!("ranking changed while you were comparing, please start again ({})", e)
    } else {
        e.into()
    }
}

/// Reads until the user picks a side. `None` means the user quit.
async fn prompt_preference(
    lines: &mut Lines<BufReader<Stdin>>,
) -> anyhow::Result<Option<Preference>> {
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"Choose 1 or 2 (q to cancel): ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        match line.trim() {
            "1" => return Ok(Some(Preference::New)),
            "2" => return Ok(Some(Preference::Existing)),
            "q" | "Q" => return Ok(None),
            other => println!("Unrecognised answer '{}'", other),
        }
    }
}
