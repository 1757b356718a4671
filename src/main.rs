use std::error::Error;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use mcts::arena::play_matches;
use mcts::game_controller::GameController;
use mcts::game_wrapper::{GameKind, GameWrapper};
use mcts::policy::RolloutPolicy;
use mcts::{GameStatus, MctsPlayer, Player, SearchConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum GameArg {
    Connect4,
    Gobang,
    Reversi,
}

impl From<GameArg> for GameKind {
    fn from(arg: GameArg) -> Self {
        match arg {
            GameArg::Connect4 => GameKind::Connect4,
            GameArg::Gobang => GameKind::Gobang,
            GameArg::Reversi => GameKind::Reversi,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Policy-guided MCTS self-play and arena", long_about = None)]
struct Args {
    #[arg(short, long, value_enum, default_value_t = GameArg::Connect4)]
    game: GameArg,

    /// Board width (Connect 4 uses width - 1 rows). Defaults per game.
    #[arg(short, long)]
    board_size: Option<usize>,

    /// Playouts per move
    #[arg(short, long, default_value_t = 300)]
    playouts: usize,

    #[arg(short = 'c', long, default_value_t = 5.0)]
    c_puct: f32,

    /// Visit-count temperature when choosing moves
    #[arg(short, long, default_value_t = 1e-3)]
    temperature: f32,

    /// Number of games; more than one runs the arena
    #[arg(long, default_value_t = 1)]
    games: usize,

    /// Arena worker threads
    #[arg(long, default_value_t = num_cpus::get())]
    threads: usize,

    /// Leaves evaluated together per search step (defaults to 1, or 8 with --self-play)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Dirichlet concentration for self-play noise
    #[arg(long, default_value_t = 0.3)]
    dirichlet_alpha: f64,

    /// Share of the self-play sampling distribution taken by the noise
    #[arg(long, default_value_t = 0.25)]
    dirichlet_epsilon: f64,

    /// Score a game as a draw after this many moves
    #[arg(long)]
    max_moves: Option<usize>,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// One player plays both sides and reports the training samples
    #[arg(long, action = clap::ArgAction::SetTrue)]
    self_play: bool,

    /// Fallback filter when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn render(board: &GameWrapper) -> String {
    board
        .to_string()
        .chars()
        .map(|ch| match ch {
            'X' => "X".red().bold().to_string(),
            'O' => "O".yellow().bold().to_string(),
            other => other.to_string(),
        })
        .collect()
}

fn describe(status: GameStatus) -> String {
    match status {
        GameStatus::Win(p) => format!("{} wins", p).green().bold().to_string(),
        GameStatus::Draw => "Draw".cyan().bold().to_string(),
        GameStatus::InProgress => "Unfinished".normal().to_string(),
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let kind = GameKind::from(args.game);
    let size = args.board_size.unwrap_or_else(|| kind.default_size());
    let board = GameWrapper::build(kind, size)?;
    let preset = if args.self_play {
        SearchConfig::for_self_play().with_dirichlet(args.dirichlet_alpha, args.dirichlet_epsilon)
    } else {
        SearchConfig::for_play()
    };
    let batch_size = args.batch_size.unwrap_or(preset.batch_size);
    let config = preset
        .with_playouts(args.playouts)
        .with_c_puct(args.c_puct)
        .with_batch_size(batch_size);

    println!("{} ({}x{})", kind.to_string().bold(), board.width(), board.height());
    println!(
        "Playouts: {}  c_puct: {}  Batch: {}  Temperature: {}",
        config.n_playout, config.c_puct, config.batch_size, args.temperature
    );

    let start = Instant::now();
    if args.self_play {
        let mut player = MctsPlayer::self_play(RolloutPolicy::new(args.seed), config, args.seed);
        let mut controller = GameController::new(board).with_max_moves(args.max_moves);
        let (status, samples) = controller.start_self_play(&mut player, args.temperature)?;
        println!("{}", render(controller.board()));
        println!("{} after {} moves, {} training samples", describe(status), controller.move_count(), samples.len());
    } else if args.games > 1 {
        let seed = args.seed;
        let tally = play_matches(
            args.games,
            args.threads,
            args.max_moves,
            || board.clone(),
            |i| {
                let s1 = seed.wrapping_add(2 * i as u64);
                let s2 = s1.wrapping_add(1);
                (
                    MctsPlayer::new(RolloutPolicy::new(s1), config.clone(), s1),
                    MctsPlayer::new(RolloutPolicy::new(s2), config.clone(), s2),
                )
            },
        )?;
        println!("Games: {}", tally.games());
        println!("{}: {} wins", Player::One, tally.wins[0]);
        println!("{}: {} wins", Player::Two, tally.wins[1]);
        println!("Draws: {}", tally.draws);
    } else {
        let mut player1 = MctsPlayer::new(RolloutPolicy::new(args.seed), config.clone(), args.seed);
        let mut player2 = MctsPlayer::new(
            RolloutPolicy::new(args.seed.wrapping_add(1)),
            config,
            args.seed.wrapping_add(1),
        );
        let mut controller = GameController::new(board)
            .with_temperature(args.temperature)
            .with_max_moves(args.max_moves);
        println!("{}", render(controller.board()));
        let status = controller.start_play_with(&mut player1, &mut player2, Player::One, |b, record| {
            println!("Move {}: {} plays {}", record.move_number, record.player, record.action);
            println!("{}", render(b));
        })?;
        println!("{} after {} moves", describe(status), controller.move_count());
    }
    println!("Elapsed: {:.2?}", start.elapsed());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
