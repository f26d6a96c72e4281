//! `jigsaw-server` command line.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use jigsaw::prelude::*;
use jigsaw_replay::{ReplaySession, reconstruct};
use jigsaw_room::GameRegistry;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "jigsaw-server", version, about = "Collaborative jigsaw puzzle server")]
struct Cli {
    /// Where games and logs are kept.
    #[arg(long, env = "JIGSAW_DATA_DIR", default_value = "data", global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Accept WebSocket connections.
    Serve {
        #[arg(long, env = "JIGSAW_BIND", default_value = "127.0.0.1:8080")]
        bind: String,

        /// Seconds between saves of a changed game.
        #[arg(long, default_value_t = 5)]
        save_interval: u64,

        /// Seconds a game without sockets stays loaded.
        #[arg(long, default_value_t = 300)]
        idle_unload: u64,

        /// Seconds after the finish during which inputs are still logged.
        #[arg(long, default_value_t = 0)]
        post_finish_log: u64,
    },

    /// Create a game and print its id.
    Create {
        #[arg(long)]
        pieces: u32,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// Stable reference to the image (URL or path).
        #[arg(long)]
        image: String,
        #[arg(long, default_value = "final")]
        score: ScoreMode,
        #[arg(long, default_value = "normal")]
        shape: ShapeMode,
        #[arg(long, default_value = "normal")]
        snap: SnapMode,
        #[arg(long)]
        private: bool,
    },

    /// Rebuild a game from its log and print a summary.
    Replay {
        #[arg(long)]
        game: String,

        #[arg(long, default_value_t = 1000)]
        page_size: usize,

        /// Play the log back in (sped up) real time instead of all at once.
        #[arg(long)]
        follow: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), JigsawError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = ServerConfig {
        data_dir: cli.data_dir,
        ..ServerConfig::default()
    };

    match cli.command {
        Command::Serve {
            bind,
            save_interval,
            idle_unload,
            post_finish_log,
        } => {
            config.bind_addr = bind;
            config.room.save_interval = Duration::from_secs(save_interval);
            config.room.idle_unload_after = Duration::from_secs(idle_unload);
            config.room.post_finish_log_window = Duration::from_secs(post_finish_log);

            let server = JigsawServerBuilder::from_config(config).build_with_files().await?;
            server
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!(error = %e, "failed to listen for ctrl-c");
                        std::future::pending::<()>().await;
                    }
                })
                .await
        }

        Command::Create {
            pieces,
            width,
            height,
            image,
            score,
            shape,
            snap,
            private,
        } => {
            let storage = FileStorage::open(config.games_dir()).await?;
            let log = FileReplayStore::open(config.logs_dir()).await?;
            let mut registry =
                GameRegistry::new(Arc::new(storage), Arc::new(log), config.room, config.limits);

            let mut params = GameParams::new(
                pieces,
                ImageInfo {
                    width,
                    height,
                    stable_ref: image,
                },
            );
            params.score_mode = score;
            params.shape_mode = shape;
            params.snap_mode = snap;
            params.private = private;

            let game_id = registry.create_game(params, jigsaw_room::now_ms()).await?;
            registry.shutdown_all().await;
            println!("{game_id}");
            Ok(())
        }

        Command::Replay {
            game,
            page_size,
            follow,
        } => {
            let log = FileReplayStore::open(config.logs_dir()).await?;
            let game_id = GameId::new(game);
            let game = if follow {
                follow_replay(log, game_id, config.limits, page_size).await?
            } else {
                reconstruct(&log, &game_id, config.limits, page_size).await?
            };
            print_summary(&game);
            Ok(())
        }
    }
}

/// Plays the log back against the wall clock at 10×, skipping idle gaps.
async fn follow_replay(
    log: FileReplayStore,
    game_id: GameId,
    limits: PuzzleLimits,
    page_size: usize,
) -> Result<Game, JigsawError> {
    let mut session = ReplaySession::start(Arc::new(log), game_id, limits, page_size).await?;
    while session.clock().speed() < 10.0 {
        session.speed_up();
    }
    while !session.is_finished() {
        let changes = session.advance().await?;
        if !changes.is_empty() {
            if let Some(game) = session.game() {
                println!(
                    "t={} finished {}/{}",
                    session.clock().now(),
                    game.finished_piece_count(),
                    game.piece_count()
                );
            }
        }
        if let Some(wait) = session.next_wakeup() {
            tokio::time::sleep(wait).await;
        }
    }
    Ok(session.run_to_end().await?.clone())
}

fn print_summary(game: &Game) {
    println!("game      {}", game.id);
    println!("created   {}", game.created);
    println!(
        "pieces    {}/{} finished",
        game.finished_piece_count(),
        game.piece_count()
    );
    if game.is_finished() {
        println!("finished  {}", game.puzzle.data.finished);
    }
    let mut players: Vec<_> = game.players.iter().collect();
    players.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.id.cmp(&b.id)));
    for player in players {
        let name = player.name.as_deref().unwrap_or("-");
        println!("player    {} {} {} points", player.id, name, player.points);
    }
}
