/// Entry point and terminal game loop.

use std::io;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crossterm::event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags};
use crossterm::{execute, terminal};

use brotherstack::config::GameConfig;
use brotherstack::domain::physics::PhysicsPort;
use brotherstack::sim::arena::Arena;
use brotherstack::sim::event::GameEvent;
use brotherstack::sim::save::FileScoreStore;
use brotherstack::sim::Game;
use brotherstack::ui::hud::{self, Scene};
use brotherstack::ui::input::{Action, InputState};
use brotherstack::ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);
/// Longest step handed to the core after a stall (seconds).
const MAX_DT: f32 = 0.05;

fn main() {
    let config = match GameConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("brotherstack: {e}");
            std::process::exit(2);
        }
    };

    let seed = config.driver.seed.unwrap_or_else(clock_seed);
    let physics = Arena::from_config(&config.physics);
    let mut game = Game::new(config, physics, Box::new(FileScoreStore::new()), seed);

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    // Release events make held-key aiming precise; without them holds expire.
    let enhanced = matches!(terminal::supports_keyboard_enhancement(), Ok(true))
        && execute!(
            io::stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )
        .is_ok();

    let result = game_loop(&mut game, &mut renderer, enhanced);

    if enhanced {
        let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
    }
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Brother Stack!");
    println!("Score: {}  Best: {}", game.score(), game.best_score());
}

fn game_loop<P: PhysicsPort>(
    game: &mut Game<P>,
    renderer: &mut Renderer,
    enhanced: bool,
) -> io::Result<()> {
    let mut input = InputState::new();
    input.honor_release = enhanced;
    let tick_rate = Duration::from_millis(game.config().driver.tick_rate_ms.max(1));
    let aim_speed = game.config().driver.aim_speed;
    let mut last_tick = Instant::now();

    // One-shot presses land between ticks; hold them until the next step.
    let mut pending_release = false;
    let mut new_record = false;

    game.start();

    loop {
        input.drain_events();
        if input.quit_requested() {
            break;
        }
        if input.action_pressed(Action::Restart) {
            game.restart();
            pending_release = false;
            new_record = false;
            last_tick = Instant::now();
        }
        if input.action_pressed(Action::Release) {
            pending_release = true;
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= tick_rate {
            let dt = elapsed.as_secs_f32().min(MAX_DT);
            let mut frame = input.frame_input(game.world().aim_x, aim_speed, dt);
            frame.release = std::mem::take(&mut pending_release);
            for event in game.step(frame, dt) {
                if let GameEvent::GameOver { new_record: record, .. } = event {
                    new_record = record;
                }
            }
            last_tick = Instant::now();
        }

        renderer.render(|buf| {
            let mut scene = Scene::capture(game);
            scene.new_record = new_record;
            hud::compose(&scene, buf);
        })?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5eed)
}
