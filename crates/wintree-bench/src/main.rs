use std::cell::Cell;
use std::io;
use std::rc::Rc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use wintree::graphics::NullGraphics;
use wintree::{
    Color, CompositorConfig, PaintContext, Rect, WindowHandler, WindowId, WindowSystem,
};

const SCREEN_W: i32 = 640;
const SCREEN_H: i32 = 480;

#[derive(Parser, Debug)]
#[command(
    name = "wintree-bench",
    version = env!("CARGO_PKG_VERSION"),
    about = "Moves windows around a random tree and measures damage tracking and repaint"
)]
struct BenchCli {
    /// Number of windows in the tree.
    #[arg(short = 'w', long = "windows", value_name = "COUNT", default_value_t = 200)]
    windows: usize,

    /// Number of frames to simulate.
    #[arg(short = 'f', long = "frames", value_name = "FRAMES", default_value_t = 1_000)]
    frames: u64,

    /// Seed for the window layout and movement. Defaults to the clock.
    #[arg(short = 's', long = "seed", value_name = "SEED")]
    seed: Option<u64>,
}

struct BenchConfig {
    windows: usize,
    frames: u64,
    seed: u64,
}

impl TryFrom<&BenchCli> for BenchConfig {
    type Error = String;

    fn try_from(cli: &BenchCli) -> Result<Self, Self::Error> {
        if !(1..=100_000).contains(&cli.windows) {
            return Err("windows must be between 1 and 100000".to_string());
        }
        if !(1..=10_000_000).contains(&cli.frames) {
            return Err("frames must be between 1 and 10000000".to_string());
        }
        let seed = cli.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
                ^ 0xA5A5_A5A5_1234_5678
        });
        Ok(Self {
            windows: cli.windows,
            frames: cli.frames,
            seed,
        })
    }
}

fn main() -> io::Result<()> {
    let args = BenchCli::parse();
    let config = BenchConfig::try_from(&args)
        .map_err(|msg| io::Error::new(io::ErrorKind::InvalidInput, msg))?;

    let stats = run_benchmark(&config).map_err(|err| io::Error::other(err.to_string()))?;
    println!("{}", stats.final_report(&config));
    Ok(())
}

/// Counts paint callbacks and fills the damaged area.
struct Painter {
    color: Color,
    paints: Rc<Cell<u64>>,
}

impl WindowHandler for Painter {
    fn on_paint(&mut self, ctx: &mut PaintContext<'_>) -> bool {
        self.paints.set(self.paints.get() + 1);
        ctx.clear(self.color);
        true
    }
}

fn run_benchmark(config: &BenchConfig) -> wintree::Result<BenchStats> {
    let mut rng = Lcg::new(config.seed);
    let paints = Rc::new(Cell::new(0));
    let mut sys = WindowSystem::builder(CompositorConfig::default())
        .graphics(NullGraphics::new())
        .build();

    let root = sys.create_window(None, Rect::new(0, 0, SCREEN_W, SCREEN_H))?;
    sys.set_handler(
        root,
        Painter {
            color: Color::BLACK,
            paints: Rc::clone(&paints),
        },
    )?;
    let mut windows: Vec<WindowId> = vec![root];
    for _ in 1..config.windows {
        let parent = windows[rng.below(windows.len() as u32) as usize];
        let area = sys.rect(parent)?;
        let rect = rng.rect_within(area.w(), area.h());
        let id = sys.create_window(Some(parent), rect)?;
        sys.set_handler(
            id,
            Painter {
                color: Color::rgb(rng.next() as u8, rng.next() as u8, rng.next() as u8),
                paints: Rc::clone(&paints),
            },
        )?;
        windows.push(id);
    }
    sys.update();
    paints.set(0);

    let mut stats = BenchStats::new();
    for _ in 0..config.frames {
        let frame_start = Instant::now();
        let moved = if windows.len() > 1 {
            windows[1 + rng.below(windows.len() as u32 - 1) as usize]
        } else {
            root
        };
        let parent = sys.parent(moved)?.unwrap_or(root);
        let area = sys.rect(parent)?;
        sys.set_rect(moved, rng.rect_within(area.w(), area.h()))?;
        if rng.below(8) == 0 {
            sys.raise_top(moved)?;
        }
        let damage = sys.damage().len() as u64;
        let before = paints.get();
        sys.update();
        stats.record_frame(damage, paints.get() - before, frame_start.elapsed());
    }
    stats.mark_completed();
    Ok(stats)
}

struct BenchStats {
    start: Instant,
    completed_at: Option<Instant>,
    frame_count: u64,
    damage_rects: u64,
    paint_calls: u64,
    total_frame_time: Duration,
    fastest_frame: Duration,
    slowest_frame: Duration,
}

impl BenchStats {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            completed_at: None,
            frame_count: 0,
            damage_rects: 0,
            paint_calls: 0,
            total_frame_time: Duration::ZERO,
            fastest_frame: Duration::MAX,
            slowest_frame: Duration::ZERO,
        }
    }

    fn elapsed(&self) -> Duration {
        match self.completed_at {
            Some(done) => done.duration_since(self.start),
            None => self.start.elapsed(),
        }
    }

    fn mark_completed(&mut self) {
        self.completed_at = Some(Instant::now());
    }

    fn record_frame(&mut self, damage: u64, paints: u64, frame_time: Duration) {
        self.frame_count = self.frame_count.saturating_add(1);
        self.damage_rects = self.damage_rects.saturating_add(damage);
        self.paint_calls = self.paint_calls.saturating_add(paints);
        self.total_frame_time += frame_time;
        if frame_time < self.fastest_frame {
            self.fastest_frame = frame_time;
        }
        if frame_time > self.slowest_frame {
            self.slowest_frame = frame_time;
        }
    }

    fn average_frame_us(&self) -> f64 {
        if self.frame_count == 0 {
            return 0.0;
        }
        (self.total_frame_time.as_secs_f64() / self.frame_count as f64) * 1_000_000.0
    }

    fn fastest_frame_us(&self) -> f64 {
        if self.frame_count == 0 {
            return 0.0;
        }
        self.fastest_frame.as_secs_f64() * 1_000_000.0
    }

    fn slowest_frame_us(&self) -> f64 {
        if self.frame_count == 0 {
            return 0.0;
        }
        self.slowest_frame.as_secs_f64() * 1_000_000.0
    }

    fn final_report(&self, config: &BenchConfig) -> String {
        let frames = self.frame_count.max(1) as f64;
        indoc::formatdoc!(
            r#"
            Repaint bench: {windows} windows, seed {seed:#x}.
            Duration: {elapsed:.3}s for {frames} frames
            Damage rects: {damage} total ({damage_avg:.2}/frame)
            Paint calls: {paints} total ({paints_avg:.2}/frame)
            Avg frame: {avg:.1} us | Best: {best:.1} us | Worst: {worst:.1} us
            "#,
            windows = config.windows,
            seed = config.seed,
            elapsed = self.elapsed().as_secs_f64(),
            frames = self.frame_count,
            damage = self.damage_rects,
            damage_avg = self.damage_rects as f64 / frames,
            paints = self.paint_calls,
            paints_avg = self.paint_calls as f64 / frames,
            avg = self.average_frame_us(),
            best = self.fastest_frame_us(),
            worst = self.slowest_frame_us(),
        )
    }
}

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }

    fn below(&mut self, bound: u32) -> u32 {
        if bound == 0 { 0 } else { self.next() % bound }
    }

    fn rect_within(&mut self, w: i32, h: i32) -> Rect {
        let w = w.max(1) as u32;
        let h = h.max(1) as u32;
        let rw = 1 + self.below(w.div_ceil(2));
        let rh = 1 + self.below(h.div_ceil(2));
        let x = self.below(w - rw + 1);
        let y = self.below(h - rh + 1);
        Rect::new(x as i32, y as i32, rw as i32, rh as i32)
    }
}
