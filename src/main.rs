use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use preset_studio_lib::commands::{self, StudioState};
use preset_studio_lib::models::UserQuotaRecord;
use preset_studio_lib::modules::{self, SubmitOutcome};
use preset_studio_lib::{FileRecordStore, GeminiClient, RecordStore};

/// Compose prompts from presets and generate images within a daily quota
#[derive(Parser, Debug)]
#[command(name = "preset-studio", version)]
struct Args {
    /// User whose quota record backs this session
    user_id: String,

    /// Model override (defaults to the configured model)
    #[arg(long)]
    model: Option<String>,

    /// Data directory (defaults to ~/.preset_studio)
    #[arg(long, env = "PRESET_STUDIO_DIR")]
    data_dir: Option<PathBuf>,

    /// Daily quota for a user seen for the first time
    #[arg(long, default_value_t = 10)]
    daily_quota: u32,
}

const HELP: &str = "\
commands:
  presets            list presets
  preset <id>        toggle a preset
  text <detail>      set the free text (empty to clear)
  submit             generate an image
  export             save the current image
  status             show the session
  quit               end the session";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let data_dir = match args.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            dir
        }
        None => modules::config::get_data_dir()?,
    };
    modules::logger::init_logger(&data_dir);

    let mut config = modules::config::load_app_config_from(&data_dir)?;
    if let Some(model) = args.model {
        config.model = model;
    }

    let store = Arc::new(FileRecordStore::new(data_dir.join("users"))?);
    if store.get(&args.user_id).await?.is_none() {
        tracing::info!("Creating quota record for {}", args.user_id);
        store
            .put(UserQuotaRecord::new(&args.user_id, args.daily_quota))
            .await?;
    }

    let generator = Arc::new(GeminiClient::new(&config));
    let state = StudioState::new(config, data_dir, store, generator);

    let snapshot = commands::start_session(&state, &args.user_id).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let result = match command {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                println!("{}", HELP);
                Ok(())
            }
            "presets" => {
                for p in commands::list_presets(&state).await {
                    println!("[{}] {:<22} {}", p.category_label, p.id, p.label);
                }
                Ok(())
            }
            "preset" => commands::toggle_preset(&state, rest.trim())
                .await
                .map(|s| println!("selected: {}", s.selected_preset.unwrap_or("none"))),
            "text" => commands::set_free_text(&state, rest.to_string())
                .await
                .map(|_| ()),
            "submit" => {
                println!("generating...");
                commands::submit_generation(&state).await.map(|r| {
                    match r.outcome {
                        SubmitOutcome::Succeeded { .. } => println!("image ready"),
                        SubmitOutcome::Busy => println!("a generation is already running"),
                        SubmitOutcome::Failed(_) => {}
                    }
                    if let Some(message) = &r.snapshot.message {
                        println!("error: {}", message);
                    }
                    if let Some(notice) = &r.snapshot.notice {
                        println!("note: {}", notice);
                    }
                })
            }
            "export" => commands::export_image(&state).await.map(|path| match path {
                Some(path) => println!("saved {}", path.display()),
                None => println!("no image to export"),
            }),
            "status" => commands::get_session_snapshot(&state)
                .await
                .map(|s| println!("{}", serde_json::to_string_pretty(&s).unwrap_or_default())),
            other => {
                println!("unknown command: {} (try help)", other);
                Ok(())
            }
        };

        if let Err(e) = result {
            eprintln!("{}", e);
        }
    }

    commands::end_session(&state).await?;
    Ok(())
}
