//! chessduel - terminal client
//!
//! Moves are typed in UCI notation (`e2e4`, `e7e8q`). `hints <square>` lists
//! legal destinations, `board` reprints the position, `new` restarts a game
//! against the engine, `quit` leaves.

mod cli;

use anyhow::{Context, Result};
use chessduel::core::{init_logging, load_settings, save_settings, GameSettings};
use chessduel::game::{ChessMove, GameController, GameSnapshot, PlayerColor};
use chessduel::networking::SessionUpdate;
use clap::Parser;
use cli::{Cli, Command};
use shakmaty::Square;
use shared::RoomCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let mut settings = load_settings();
    if let Some(server) = cli.server {
        settings.server_url = server;
    }

    match cli.command {
        Command::Bot {
            color,
            difficulty,
            preset,
            engine,
            no_eval,
        } => {
            if let Some(level) = preset.map(|p| p.level()).or(difficulty) {
                settings.difficulty = level;
            }
            if let Some(color) = color {
                settings.player_color = color;
            }
            if let Some(path) = engine {
                settings.engine.path = path;
            }
            if no_eval {
                settings.show_evaluation = false;
            }
            persist(&settings, cli.save);
            run_bot(settings).await
        }
        Command::Host => {
            persist(&settings, cli.save);
            let room = RoomCode::generate();
            println!("Room code: {}", room);
            run_multiplayer(settings, room, PlayerColor::White).await
        }
        Command::Join { code } => {
            persist(&settings, cli.save);
            let room = RoomCode::parse(&code).context("cannot join room")?;
            run_multiplayer(settings, room, PlayerColor::Black).await
        }
    }
}

fn persist(settings: &GameSettings, save: bool) {
    if !save {
        return;
    }
    match save_settings(settings) {
        Ok(()) => println!("Settings saved"),
        Err(e) => warn!("Could not save settings: {}", e),
    }
}

async fn run_bot(settings: GameSettings) -> Result<()> {
    info!(
        "Starting game vs engine at level {} as {}",
        settings.difficulty, settings.player_color
    );
    let mut controller = GameController::new_single_player(
        settings.player_color,
        settings.difficulty,
        settings.engine.clone(),
    );
    controller.set_show_evaluation(settings.show_evaluation);
    controller.open_engine();

    if let Some(reply) = controller.start().await {
        println!("Engine plays {}", reply);
    }
    print_snapshot(&controller.snapshot());

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = input.next_line().await? {
        match parse_input(&line) {
            Prompt::Quit => break,
            Prompt::Empty => {}
            Prompt::Board => {
                controller.poll_analysis();
                print_snapshot(&controller.snapshot());
            }
            Prompt::Hints(square) => print_hints(&controller, square),
            Prompt::NewGame => match controller.new_game() {
                Ok(()) => {
                    if let Some(reply) = controller.start().await {
                        println!("Engine plays {}", reply);
                    }
                    print_snapshot(&controller.snapshot());
                }
                Err(e) => println!("{}", e),
            },
            Prompt::Move(m) => match controller.submit_move(m).await {
                Ok(outcome) => {
                    if let Some(reply) = outcome.reply {
                        println!("Engine plays {}", reply);
                    }
                    controller.poll_analysis();
                    print_snapshot(&controller.snapshot());
                }
                Err(e) => println!("{}", e),
            },
            Prompt::Invalid(message) => println!("{}", message),
        }
        if controller.status().is_over() {
            println!("Type 'new' to play again or 'quit' to leave");
        }
    }

    controller.close().await;
    Ok(())
}

async fn run_multiplayer(settings: GameSettings, room: RoomCode, color: PlayerColor) -> Result<()> {
    info!("Joining room {} as {}", room, color);
    let mut controller = GameController::new_multiplayer(room, color);
    controller
        .connect(&settings.server_url, settings.reconnect)
        .context("cannot reach relay server")?;

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    print_snapshot(&controller.snapshot());

    loop {
        tokio::select! {
            updates = controller.next_session_updates() => {
                let Some(updates) = updates else {
                    warn!("Relay link closed");
                    break;
                };
                for update in &updates {
                    describe_update(update);
                }
                if !updates.is_empty() {
                    print_snapshot(&controller.snapshot());
                }
            }
            line = input.next_line() => {
                let Some(line) = line? else { break };
                match parse_input(&line) {
                    Prompt::Quit => break,
                    Prompt::Empty => {}
                    Prompt::Board => print_snapshot(&controller.snapshot()),
                    Prompt::Hints(square) => print_hints(&controller, square),
                    Prompt::NewGame => println!("Only games against the engine can be restarted"),
                    Prompt::Move(m) => match controller.apply_local_move(m) {
                        Ok(_) => print_snapshot(&controller.snapshot()),
                        Err(e) => println!("{}", e),
                    },
                    Prompt::Invalid(message) => println!("{}", message),
                }
            }
        }
        if controller.status().is_over() {
            break;
        }
    }

    controller.close().await;
    Ok(())
}

enum Prompt {
    Quit,
    Empty,
    Board,
    Hints(Square),
    NewGame,
    Move(ChessMove),
    Invalid(String),
}

fn parse_input(line: &str) -> Prompt {
    let mut words = line.split_whitespace();
    match (words.next(), words.next()) {
        (None, _) => Prompt::Empty,
        (Some("quit" | "exit"), _) => Prompt::Quit,
        (Some("board"), _) => Prompt::Board,
        (Some("new"), _) => Prompt::NewGame,
        (Some("hints"), Some(square)) => match square.parse::<Square>() {
            Ok(square) => Prompt::Hints(square),
            Err(_) => Prompt::Invalid(format!("'{}' is not a square", square)),
        },
        (Some(token), _) => match ChessMove::from_uci(token) {
            Ok(m) => Prompt::Move(m),
            Err(e) => Prompt::Invalid(e.to_string()),
        },
    }
}

fn describe_update(update: &SessionUpdate) {
    match update {
        SessionUpdate::ConnectionChanged(state) => println!("Connection: {:?}", state),
        SessionUpdate::NoRoom => println!("No room code to join"),
        SessionUpdate::GameStarted => println!("Opponent joined, game on"),
        SessionUpdate::RemoteMoveApplied(m) => println!("Opponent plays {}", m),
        SessionUpdate::RemoteMoveRejected { reason, .. } => {
            println!("Ignored opponent move: {}", reason)
        }
        SessionUpdate::OpponentDisconnected => println!("Opponent disconnected"),
        SessionUpdate::ServerError(message) => println!("Server: {}", message),
    }
}

fn print_hints(controller: &GameController, square: Square) {
    let targets: Vec<String> = controller
        .legal_destinations(square)
        .iter()
        .map(ToString::to_string)
        .collect();
    if targets.is_empty() {
        println!("No moves from {}", square);
    } else {
        println!("{} -> {}", square, targets.join(" "));
    }
}

fn print_snapshot(snapshot: &GameSnapshot) {
    let placement = snapshot.fen.split(' ').next().unwrap_or_default();
    println!();
    for (i, rank) in placement.split('/').enumerate() {
        let mut row = String::new();
        for c in rank.chars() {
            match c.to_digit(10) {
                Some(empty) => (0..empty).for_each(|_| row.push_str(". ")),
                None => {
                    row.push(c);
                    row.push(' ');
                }
            }
        }
        println!("{} | {}", 8 - i, row.trim_end());
    }
    println!("    a b c d e f g h");
    println!();

    let mut line = format!("{:?}, {} to move", snapshot.status, snapshot.turn);
    if let Some(last) = &snapshot.last_move {
        line.push_str(&format!(", last {}", last));
    }
    if let Some(eval) = &snapshot.evaluation {
        line.push_str(&format!(", eval {}", eval));
    }
    println!("{}", line);
    if !snapshot.pgn.is_empty() {
        println!("{}", snapshot.pgn);
    }
}
