//! Terminal front-end: draws the board, turns keys and clicks into moves and
//! shows hint cues. All puzzle logic lives in the library.

use anyhow::Result;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use std::io::{self, Write};
use std::time::{Duration, Instant};

use slider_puzzle_engine::config::GameConfig;
use slider_puzzle_engine::hint::{HintEvent, HintOutcome};
use slider_puzzle_engine::puzzle::Direction;
use slider_puzzle_engine::round::{GameEvent, Round, RoundStatus};
use slider_puzzle_engine::shuffle::Shuffler;
use slider_puzzle_engine::worker::BackgroundSolver;

const BOARD_X: u16 = 2;
const BOARD_Y: u16 = 3;
const CELL_WIDTH: u16 = 5;
const TICK: Duration = Duration::from_millis(50);

enum Action {
    Continue,
    Quit,
}

struct App {
    round: Round<BackgroundSolver>,
    message: String,
}

pub fn run(config: &GameConfig, shuffler: &mut Shuffler) -> Result<()> {
    let solver = BackgroundSolver::spawn(config.solver)?;
    let round = Round::start(config, shuffler, solver, Instant::now())?;
    let mut app = App {
        round,
        message: String::from(
            "Arrows/WASD or click to slide, h for a hint, n for a new board, q to quit",
        ),
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, Hide)?;

    let result = run_loop(&mut stdout, &mut app, shuffler);

    disable_raw_mode()?;
    execute!(stdout, Show, LeaveAlternateScreen, DisableMouseCapture)?;
    result
}

fn run_loop(stdout: &mut io::Stdout, app: &mut App, shuffler: &mut Shuffler) -> Result<()> {
    loop {
        let now = Instant::now();
        app.round.tick(now);
        app.absorb_events();
        render(stdout, app, now)?;

        if event::poll(TICK)? {
            let action = match event::read()? {
                Event::Key(key) => app.handle_key(key, shuffler)?,
                Event::Mouse(mouse) => {
                    app.handle_mouse(mouse);
                    Action::Continue
                }
                _ => Action::Continue,
            };
            if let Action::Quit = action {
                break;
            }
        }
    }
    Ok(())
}

impl App {
    fn handle_key(&mut self, key: KeyEvent, shuffler: &mut Shuffler) -> Result<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(Action::Quit);
        }

        let now = Instant::now();
        let direction = match key.code {
            KeyCode::Up | KeyCode::Char('w') => Some(Direction::Up),
            KeyCode::Down | KeyCode::Char('s') => Some(Direction::Down),
            KeyCode::Left | KeyCode::Char('a') => Some(Direction::Left),
            KeyCode::Right | KeyCode::Char('d') => Some(Direction::Right),
            _ => None,
        };
        if let Some(direction) = direction {
            self.round.slide(direction, now);
            return Ok(Action::Continue);
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(Action::Quit),
            KeyCode::Char('h') => self.request_hint(now),
            KeyCode::Char('n') => {
                self.round.restart(shuffler, now)?;
                self.message = String::from("New board");
            }
            _ => {}
        }
        Ok(Action::Continue)
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let size = self.round.state().size() as u16;
        if mouse.column < BOARD_X || mouse.row < BOARD_Y {
            return;
        }
        let col = (mouse.column - BOARD_X) / CELL_WIDTH;
        let row = mouse.row - BOARD_Y;
        if col < size && row < size {
            let position = (row * size + col) as usize;
            self.round.click(position, Instant::now());
        }
    }

    fn request_hint(&mut self, now: Instant) {
        self.message = match self.round.request_hint(now) {
            HintOutcome::Shown(_) | HintOutcome::Failed => return,
            HintOutcome::Pending => String::from("Computing a hint..."),
            HintOutcome::Refused => String::from("No hints left"),
            HintOutcome::AlreadySolved => String::from("Already solved"),
        };
    }

    fn absorb_events(&mut self) {
        for event in self.round.drain_events() {
            match event {
                GameEvent::Moved { .. } => {}
                GameEvent::Hint(HintEvent::Ready(hint)) => {
                    self.message = match hint.solution_length {
                        Some(len) => format!(
                            "Slide the highlighted tile {} ({len} moves to solve)",
                            hint.direction
                        ),
                        None => format!("Slide the highlighted tile {}", hint.direction),
                    };
                }
                GameEvent::Hint(HintEvent::Failed(reason)) => {
                    self.message = format!("Hint unavailable: {reason}");
                }
                GameEvent::Hint(HintEvent::Followed(progress)) => {
                    self.message = format!("Good move ({}/{})", progress.current, progress.total);
                }
                GameEvent::Hint(HintEvent::Invalidated) => {
                    self.message = String::from("Hint cleared");
                }
                GameEvent::Hint(HintEvent::Expired) => {}
                GameEvent::Won { moves, elapsed } => {
                    self.message = format!(
                        "Solved in {moves} moves and {:.1}s! Press n for a new board",
                        elapsed.as_secs_f32()
                    );
                }
                GameEvent::TimeUp => {
                    self.message = String::from("Time is up! Press n for a new board");
                }
            }
        }
    }
}

fn render(stdout: &mut io::Stdout, app: &App, now: Instant) -> Result<()> {
    let round = &app.round;
    let state = round.state();
    let size = state.size();
    let blank = state.blank_id();
    let cue = round.hints().visible_hint().map(|h| h.tile_position);

    queue!(stdout, Clear(ClearType::All), MoveTo(BOARD_X, 0))?;
    let mut status = format!(
        "Moves: {}   Hints: {}",
        round.moves(),
        round.hints().hints_remaining()
    );
    if let Some(left) = round.time_left(now) {
        status.push_str(&format!("   Time: {}s", left.as_secs()));
    }
    if round.hints().is_computing() {
        status.push_str("   ...");
    }
    queue!(stdout, Print(status))?;

    for row in 0..size {
        queue!(stdout, MoveTo(BOARD_X, BOARD_Y + row as u16))?;
        for col in 0..size {
            let position = row * size + col;
            let id = state.id_at(position).unwrap_or(blank);
            if id == blank {
                queue!(stdout, ResetColor, Print(" ".repeat(CELL_WIDTH as usize)))?;
                continue;
            }

            let (bg, fg) = if cue == Some(position) {
                (Color::Yellow, Color::Black)
            } else if id == position {
                (Color::DarkGreen, Color::White)
            } else {
                (Color::DarkBlue, Color::White)
            };
            queue!(
                stdout,
                SetBackgroundColor(bg),
                SetForegroundColor(fg),
                Print(format!(" {:>3}", id + 1)),
                ResetColor,
                Print(" ")
            )?;
        }
    }

    let footer = BOARD_Y + size as u16 + 1;
    queue!(stdout, MoveTo(BOARD_X, footer), Print(&app.message))?;
    if round.status() != RoundStatus::Playing {
        queue!(stdout, MoveTo(BOARD_X, footer + 1), Print("(round over)"))?;
    }
    stdout.flush()?;
    Ok(())
}
