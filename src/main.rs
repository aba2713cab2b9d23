use std::io;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use rodio::{source::SineWave, OutputStream, Sink, Source};
use tui_dispatch::{
    EffectContext, EffectStoreLike, EffectStoreWithMiddleware, EventOutcome, RenderContext, TaskKey,
};
use tui_dispatch_debug::debug::DebugLayer;
use tui_dispatch_debug::{
    DebugCliArgs, DebugRunOutput, DebugSession, DebugSessionError, ReplayItem,
};

use pokearena::action::Action;
use pokearena::api;
use pokearena::effect::Effect;
use pokearena::persist;
use pokearena::reducer::reducer;
use pokearena::sprite;
use pokearena::state::AppState;
use pokearena::ui;

#[derive(Parser, Debug)]
#[command(name = "pokearena")]
#[command(about = "Pokemon collection and battle arena TUI")]
struct Args {
    /// Trainer name for the profile and leaderboard
    #[arg(long)]
    trainer: Option<String>,

    /// How many Pokemon the Pokedex lists
    #[arg(long, default_value = "151", value_parser = clap::value_parser!(u16).range(1..=1025))]
    limit: u16,

    #[command(flatten)]
    debug: DebugCliArgs,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let Args {
        trainer,
        limit,
        debug: debug_args,
    } = Args::parse();
    let debug = DebugSession::new(debug_args);

    let state = debug
        .load_state_or_else_async(move || async move {
            let mut state = AppState::new();
            state.catalog_limit = limit;
            state.trainer_override = trainer;
            Ok::<AppState, io::Error>(state)
        })
        .await
        .map_err(debug_error)?;
    let replay_actions = debug.load_replay_items().map_err(debug_error)?;
    let (middleware, recorder) = debug.middleware_with_recorder();
    let store = EffectStoreWithMiddleware::new(state, reducer, middleware);

    let use_alt_screen = debug.use_alt_screen();
    let mut stdout = io::stdout();
    if use_alt_screen {
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &debug, store, replay_actions).await;

    if use_alt_screen {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
    }

    let run_output = result?;
    run_output.write_render_output()?;
    debug.save_actions(recorder.as_ref()).map_err(debug_error)?;
    Ok(())
}

fn debug_error(error: DebugSessionError) -> io::Error {
    io::Error::other(format!("debug session error: {error}"))
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    debug: &DebugSession,
    store: impl EffectStoreLike<AppState, Action, Effect>,
    replay_actions: Vec<ReplayItem<Action>>,
) -> io::Result<DebugRunOutput<AppState>> {
    debug
        .run_effect_app(
            terminal,
            store,
            DebugLayer::simple(),
            replay_actions,
            Some(Action::Init),
            Some(Action::Quit),
            |runtime| {
                if debug.render_once() {
                    return;
                }
                runtime
                    .subscriptions()
                    .interval("tick", Duration::from_millis(150), || Action::Tick);
            },
            |frame, area, state, render_ctx: RenderContext| {
                ui::render(frame, area, state, render_ctx);
            },
            |event, state| -> EventOutcome<Action> { ui::handle_event(event, state) },
            |action| matches!(action, Action::Quit),
            handle_effect,
        )
        .await
}

fn handle_effect(effect: Effect, ctx: &mut EffectContext<Action>) {
    match effect {
        Effect::LoadStores => {
            ctx.tasks().spawn(TaskKey::new("stores"), async move {
                match persist::load_stores().await {
                    Ok((profile, favorites)) => Action::StoresDidLoad { profile, favorites },
                    Err(error) => Action::StoresDidError(error),
                }
            });
        }
        Effect::LoadCatalog { limit } => {
            ctx.tasks().spawn(TaskKey::new("catalog"), async move {
                match api::fetch_catalog(limit).await {
                    Ok(entries) => Action::CatalogDidLoad(entries),
                    Err(error) => Action::CatalogDidError(error),
                }
            });
        }
        Effect::LoadPokemon { name } => {
            let key = format!("pokemon_{}", name);
            ctx.tasks().spawn(TaskKey::new(key), async move {
                match api::fetch_pokemon(&name).await {
                    Ok(summary) => Action::PokemonDidLoad(summary),
                    Err(error) => Action::PokemonDidError { name, error },
                }
            });
        }
        Effect::LoadSprite { name, url } => {
            let key = format!("sprite_{}", name);
            ctx.tasks().spawn(TaskKey::new(key), async move {
                match api::fetch_bytes(&url).await {
                    Ok(bytes) => match sprite::decode_sprite(&bytes) {
                        Ok(sprite) => Action::SpriteDidLoad { url, sprite },
                        Err(error) => Action::SpriteDidError { url, error },
                    },
                    Err(error) => Action::SpriteDidError { url, error },
                }
            });
        }
        Effect::LoadRoster { count } => {
            ctx.tasks().spawn(TaskKey::new("roster"), async move {
                match api::fetch_roster(count).await {
                    Ok(roster) => Action::RosterDidLoad(roster),
                    Err(error) => Action::RosterDidError(error),
                }
            });
        }
        Effect::LoadLeaderboard => {
            ctx.tasks().spawn(TaskKey::new("leaderboard"), async move {
                match persist::load_leaderboard().await {
                    Ok(entries) => Action::LeaderboardDidLoad(entries),
                    Err(error) => Action::LeaderboardDidError(error),
                }
            });
        }
        Effect::LoadRecentBattles { limit } => {
            ctx.tasks().spawn(TaskKey::new("recent_battles"), async move {
                match persist::load_recent_battles(limit).await {
                    Ok(records) => Action::RecentBattlesDidLoad(records),
                    Err(error) => Action::RecentBattlesDidError(error),
                }
            });
        }
        Effect::ScheduleCounterAttack { delay_ms } => {
            // One pending counter-attack at most; re-arming replaces it
            // and CancelCounterAttack kills it by key.
            ctx.tasks().spawn(TaskKey::new("counter_attack"), async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Action::CounterAttackDue
            });
        }
        Effect::CancelCounterAttack => {
            ctx.tasks().cancel(&TaskKey::new("counter_attack"));
        }
        Effect::SaveBattleRecord { record, profile } => {
            ctx.tasks().spawn(TaskKey::new("save_record"), async move {
                match persist::save_battle_result(&record, &profile).await {
                    Ok(()) => Action::RecordDidSave,
                    Err(error) => Action::RecordDidError(error),
                }
            });
        }
        Effect::SaveFavorites { favorites } => {
            ctx.tasks().spawn(TaskKey::new("save_favorites"), async move {
                match persist::save_favorites(&favorites).await {
                    Ok(()) => Action::FavoritesDidSave,
                    Err(error) => Action::FavoritesDidError(error),
                }
            });
        }
        Effect::ExportFavoritesCsv { rows } => {
            ctx.tasks().spawn(TaskKey::new("export_csv"), async move {
                match persist::export_favorites_csv(&rows).await {
                    Ok(path) => Action::ExportDidFinish(path.display().to_string()),
                    Err(error) => Action::ExportDidError(error),
                }
            });
        }
        Effect::SaveProfile { profile } => {
            ctx.tasks().spawn(TaskKey::new("save_profile"), async move {
                match persist::save_trainer(&profile).await {
                    Ok(()) => Action::ProfileDidSave,
                    Err(error) => Action::ProfileDidError(error),
                }
            });
        }
        Effect::PlayAttackSound => play_tone(640.0, 140),
        Effect::PlayFaintSound => play_tone(220.0, 360),
    }
}

fn play_tone(frequency: f32, millis: u64) {
    std::thread::spawn(move || {
        let Ok((stream, handle)) = OutputStream::try_default() else {
            return;
        };
        let Ok(sink) = Sink::try_new(&handle) else {
            return;
        };
        let source = SineWave::new(frequency)
            .take_duration(Duration::from_millis(millis))
            .amplify(0.18);
        sink.append(source);
        sink.sleep_until_end();
        drop(stream);
    });
}
