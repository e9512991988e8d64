//! REPL – the frame loop of the headless front end.
//!
//! Supported slash-commands:
//!   /up /down /left /right [n] – move the emitter n steps (default 1)
//!   /turn <steps>              – rotate by turn increments (negative = counter-clockwise)
//!   /scan                      – cast one cone and record it in the trail
//!   /wait <secs>               – advance the simulated clock
//!   /blind                     – toggle wall visibility
//!   /show                      – draw the current frame
//!   /status                    – pose and trail summary
//!   /help                      – show this list
//!   /quit | /exit              – leave
//!
//! Time is simulated: it only moves on `/wait`, so a session replays
//! identically from the same commands.

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use sweep_perception::{ConeScanner, GridMap, TrailDecayManager};
use sweep_types::SweepError;
use tracing::info;

use crate::config::Config;
use crate::emitter::{Direction, Emitter};
use crate::render::{Frame, RenderSettings, render_frame};

// ─────────────────────────────────────────────────────────────────────────────
// Simulated clock
// ─────────────────────────────────────────────────────────────────────────────

/// Monotonic clock that advances only when told to.
#[derive(Debug, Clone, Copy)]
pub struct SimClock {
    base: Instant,
    offset: Duration,
}

impl SimClock {
    pub fn starting_at(base: Instant) -> Self {
        Self {
            base,
            offset: Duration::ZERO,
        }
    }

    pub fn now(&self) -> Instant {
        self.base + self.offset
    }

    pub fn elapsed(&self) -> Duration {
        self.offset
    }

    pub fn advance(&mut self, by: Duration) {
        self.offset += by;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Move(Direction, u32),
    Turn(f64),
    Scan,
    Wait(Duration),
    Blind,
    Show,
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let head = parts.next().ok_or_else(|| "empty command".to_string())?;
        let arg = parts.next();
        if parts.next().is_some() {
            return Err(format!("too many arguments for {head}"));
        }

        let direction = match head {
            "/up" => Some(Direction::Up),
            "/down" => Some(Direction::Down),
            "/left" => Some(Direction::Left),
            "/right" => Some(Direction::Right),
            _ => None,
        };
        if let Some(direction) = direction {
            let count = match arg {
                None => 1,
                Some(n) => n
                    .parse::<u32>()
                    .map_err(|_| format!("'{n}' is not a step count"))?,
            };
            return Ok(Command::Move(direction, count));
        }

        let cmd = match (head, arg) {
            ("/turn", Some(s)) => Command::Turn(
                s.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| format!("'{s}' is not a number of turn steps"))?,
            ),
            ("/turn", None) => return Err("usage: /turn <steps>".to_string()),
            ("/wait", Some(s)) => Command::Wait(
                s.parse::<f64>()
                    .ok()
                    .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                    .ok_or_else(|| format!("'{s}' is not a non-negative number of seconds"))?,
            ),
            ("/wait", None) => return Err("usage: /wait <secs>".to_string()),
            ("/scan", None) => Command::Scan,
            ("/blind", None) => Command::Blind,
            ("/show", None) => Command::Show,
            ("/status", None) => Command::Status,
            ("/help", None) => Command::Help,
            ("/quit" | "/exit", None) => Command::Quit,
            (other, _) => return Err(format!("unknown command '{other}'")),
        };
        Ok(cmd)
    }
}

/// Result of executing one command.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Message(String),
    Frame(Frame),
    Help,
    Quit,
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Everything one frame loop owns: the map, the emitter, the scanner, the
/// trail, display settings and the clock.
pub struct Session {
    grid: GridMap,
    emitter: Emitter,
    scanner: ConeScanner,
    trail: TrailDecayManager,
    render: RenderSettings,
    clock: SimClock,
}

impl Session {
    pub fn new(grid: GridMap, emitter: Emitter, scanner: ConeScanner, trail: TrailDecayManager) -> Self {
        Self {
            grid,
            emitter,
            scanner,
            trail,
            render: RenderSettings::default(),
            clock: SimClock::starting_at(Instant::now()),
        }
    }

    /// Build a session from configuration, validating every section.
    pub fn from_config(cfg: &Config) -> Result<Self, SweepError> {
        let grid = cfg.build_grid()?;
        let scanner = ConeScanner::new(cfg.cone_config())?.with_hit_search(cfg.hit_search())?;
        let trail = TrailDecayManager::new(cfg.fade_window()?)?;
        let emitter = Emitter::new(
            cfg.start_pose(),
            cfg.emitter.move_speed,
            cfg.emitter.turn_step_deg,
        )?;
        info!(
            width = cfg.grid.width,
            height = cfg.grid.height,
            rays = scanner.ray_count(),
            hit_search = %cfg.scan.hit_search,
            fade_window_secs = cfg.trail.fade_window_secs,
            "Session ready"
        );
        Ok(Self::new(grid, emitter, scanner, trail))
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    pub fn trail(&self) -> &TrailDecayManager {
        &self.trail
    }

    pub fn render_settings(&self) -> &RenderSettings {
        &self.render
    }

    pub fn execute(&mut self, cmd: Command) -> Reply {
        match cmd {
            Command::Move(direction, count) => {
                let taken = self.emitter.walk(direction, count, &self.grid);
                let p = self.emitter.pose().position;
                if taken < count {
                    Reply::Message(format!(
                        "Moved {taken}/{count} step(s) to ({:.1}, {:.1}); blocked by a wall.",
                        p.x, p.y
                    ))
                } else {
                    Reply::Message(format!("Moved to ({:.1}, {:.1}).", p.x, p.y))
                }
            }
            Command::Turn(steps) => {
                self.emitter.turn(steps);
                Reply::Message(format!("Heading {:.1}°.", self.emitter.pose().heading_deg))
            }
            Command::Scan => {
                let scan = self
                    .scanner
                    .scan_at(self.emitter.pose(), &self.grid, self.clock.now());
                let rays = scan.samples.len();
                let hits = scan.hit_count();
                let sequence = self.trail.record(scan);
                info!(sequence, rays, hits, "Scan recorded");
                Reply::Message(format!("Scan #{sequence}: {rays} ray(s), {hits} hit(s)."))
            }
            Command::Wait(by) => {
                self.clock.advance(by);
                Reply::Message(format!("Clock at {:.3}s.", self.clock.elapsed().as_secs_f64()))
            }
            Command::Blind => {
                let blind = self.render.toggle_blind();
                Reply::Message(format!("Walls {}.", if blind { "hidden" } else { "visible" }))
            }
            Command::Show => {
                let samples = self.trail.query(self.clock.now());
                Reply::Frame(render_frame(
                    &self.grid,
                    self.emitter.pose(),
                    &samples,
                    &self.render,
                ))
            }
            Command::Status => {
                let pose = self.emitter.pose();
                Reply::Message(format!(
                    "Emitter ({:.1}, {:.1}) heading {:.1}° | trail: {} scan(s), {} sample(s) | clock {:.3}s",
                    pose.position.x,
                    pose.position.y,
                    pose.heading_deg,
                    self.trail.len(),
                    self.trail.sample_count(),
                    self.clock.elapsed().as_secs_f64()
                ))
            }
            Command::Help => Reply::Help,
            Command::Quit => Reply::Quit,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loop
// ─────────────────────────────────────────────────────────────────────────────

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(mut session: Session, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "sweep>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let cmd = match input.parse::<Command>() {
            Ok(cmd) => cmd,
            Err(e) => {
                println!(
                    "{} {}. Type {} for available commands.",
                    "Error:".red(),
                    e.yellow(),
                    "/help".bold()
                );
                continue;
            }
        };

        match session.execute(cmd) {
            Reply::Message(msg) => println!("  {msg}"),
            Reply::Frame(frame) => frame.print(),
            Reply::Help => print_help(),
            Reply::Quit => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
        }
    }
}

fn print_help() {
    println!();
    println!("{}", "Sweep Commands".bold().underline());
    println!("  {} – move the emitter n steps", "/up /down /left /right [n]".bold().cyan());
    println!("  {}              – rotate by turn increments", "/turn <steps>".bold().cyan());
    println!("  {}                      – cast one cone", "/scan".bold().cyan());
    println!("  {}               – advance the clock", "/wait <secs>".bold().cyan());
    println!("  {}                     – toggle wall visibility", "/blind".bold().cyan());
    println!("  {}                      – draw the current frame", "/show".bold().cyan());
    println!("  {}                    – pose and trail summary", "/status".bold().cyan());
    println!("  {}               – exit", "/quit  /exit".bold().cyan());
    println!();
}
