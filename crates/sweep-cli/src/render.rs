//! Terminal renderer: rasterises the grid, the emitter and the fading rays
//! into one character per cell. Each ray is drawn as a beam over the cells
//! between the emitter and its endpoint, capped by an endpoint glyph.
//!
//! Rasterising is pure and returns a [`Frame`]; colour is applied only when
//! the frame is printed.

use colored::Colorize;
use sweep_perception::GridMap;
use sweep_types::{DecayedSample, Pose};

/// Display options owned by the front end. The core never reads these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderSettings {
    /// Hide walls so only ray hits reveal them.
    pub blind: bool,
}

impl RenderSettings {
    pub fn toggle_blind(&mut self) -> bool {
        self.blind = !self.blind;
        self.blind
    }
}

/// What a single cell shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Glyph {
    Empty,
    /// Ray passing through, faded past half intensity.
    BeamFaint,
    Beam,
    Wall,
    /// Ray that ran out of range in this cell.
    Miss,
    HitDim,
    HitMid,
    HitBright,
    Emitter,
}

impl Glyph {
    pub fn as_char(self) -> char {
        match self {
            Glyph::Empty => ' ',
            Glyph::BeamFaint => ',',
            Glyph::Beam => ':',
            Glyph::Wall => '#',
            Glyph::Miss => '\'',
            Glyph::HitDim => '.',
            Glyph::HitMid => '+',
            Glyph::HitBright => '*',
            Glyph::Emitter => '@',
        }
    }

    fn for_beam(sample: &DecayedSample) -> Glyph {
        if sample.intensity > 0.5 {
            Glyph::Beam
        } else {
            Glyph::BeamFaint
        }
    }

    fn for_sample(sample: &DecayedSample) -> Glyph {
        if !sample.sample.hit {
            Glyph::Miss
        } else if sample.intensity > 2.0 / 3.0 {
            Glyph::HitBright
        } else if sample.intensity > 1.0 / 3.0 {
            Glyph::HitMid
        } else {
            Glyph::HitDim
        }
    }
}

/// A rasterised view of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: usize,
    height: usize,
    cells: Vec<Glyph>,
}

impl Frame {
    /// Glyph at `(column, row)`, or `None` off-frame.
    pub fn glyph(&self, column: usize, row: usize) -> Option<Glyph> {
        (column < self.width && row < self.height).then(|| self.cells[row * self.width + column])
    }

    /// Plain-text rows, top to bottom.
    pub fn rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.width)
            .map(|row| row.iter().map(|g| g.as_char()).collect())
            .collect()
    }

    /// Raise the glyph at `(column, row)` to `glyph` if it outranks the
    /// current one. Off-frame cells are ignored.
    fn put(&mut self, column: i64, row: i64, glyph: Glyph) {
        if column < 0 || row < 0 {
            return;
        }
        let (c, r) = (column as usize, row as usize);
        if c < self.width && r < self.height {
            let cell = &mut self.cells[r * self.width + c];
            *cell = (*cell).max(glyph);
        }
    }

    /// Print the frame with a border, colouring each glyph.
    pub fn print(&self) {
        let border = format!("+{}+", "-".repeat(self.width));
        println!("{}", border.dimmed());
        for row in self.cells.chunks(self.width) {
            let line: String = row.iter().map(|g| paint(*g)).collect();
            println!("{}{}{}", "|".dimmed(), line, "|".dimmed());
        }
        println!("{}", border.dimmed());
    }
}

fn paint(glyph: Glyph) -> String {
    let s = glyph.as_char().to_string();
    match glyph {
        Glyph::Empty => s,
        Glyph::BeamFaint => s.dimmed().to_string(),
        Glyph::Beam => s.green().dimmed().to_string(),
        Glyph::Wall => s.red().to_string(),
        Glyph::Miss => s.green().dimmed().to_string(),
        Glyph::HitDim => s.green().dimmed().to_string(),
        Glyph::HitMid => s.green().to_string(),
        Glyph::HitBright => s.bright_green().bold().to_string(),
        Glyph::Emitter => s.blue().bold().to_string(),
    }
}

/// Rasterise one display refresh.
///
/// A cell keeps its strongest glyph. Layering, lowest first: beams along
/// `origin → endpoint`, walls (hidden when `settings.blind`), ray
/// endpoints, then the emitter.
pub fn render_frame(
    grid: &GridMap,
    emitter: &Pose,
    samples: &[DecayedSample],
    settings: &RenderSettings,
) -> Frame {
    let (width, height) = grid.dimensions();
    let mut frame = Frame {
        width,
        height,
        cells: vec![Glyph::Empty; width * height],
    };

    if !settings.blind {
        for (column, row) in grid.occupied_cells() {
            frame.put(column, row, Glyph::Wall);
        }
    }

    for sample in samples {
        let beam = Glyph::for_beam(sample);
        for cell in grid.cells_along(sample.origin, sample.sample.endpoint) {
            frame.put(cell.column, cell.row, beam);
        }
        let (column, row) = grid.cell_of(sample.sample.endpoint);
        frame.put(column, row, Glyph::for_sample(sample));
    }

    let (column, row) = grid.cell_of(emitter.position);
    frame.put(column, row, Glyph::Emitter);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweep_types::{Point2, RaySample};

    fn grid() -> GridMap {
        GridMap::from_occupied(4, 3, 10.0, [(1, 1), (3, 0)]).unwrap()
    }

    fn decayed(x: f64, y: f64, hit: bool, intensity: f64) -> DecayedSample {
        DecayedSample {
            origin: Point2::new(5.0, 25.0),
            sample: RaySample {
                angle_offset_deg: 0.0,
                endpoint: Point2::new(x, y),
                hit,
            },
            intensity,
        }
    }

    fn pose() -> Pose {
        Pose::new(Point2::new(5.0, 25.0), 0.0)
    }

    #[test]
    fn walls_and_emitter_drawn() {
        let frame = render_frame(&grid(), &pose(), &[], &RenderSettings::default());
        assert_eq!(frame.rows(), vec!["   #", " #  ", "@   "]);
    }

    #[test]
    fn blind_hides_walls_but_not_hits() {
        let settings = RenderSettings { blind: true };
        let samples = [decayed(15.0, 15.0, true, 0.9)];
        let frame = render_frame(&grid(), &pose(), &samples, &settings);
        assert_eq!(frame.rows(), vec!["    ", ":*  ", "@   "]);
    }

    #[test]
    fn hit_shade_follows_intensity() {
        let g = grid();
        let shade = |intensity| {
            render_frame(&g, &pose(), &[decayed(15.0, 15.0, true, intensity)], &RenderSettings::default())
                .glyph(1, 1)
                .unwrap()
        };
        assert_eq!(shade(1.0), Glyph::HitBright);
        assert_eq!(shade(0.5), Glyph::HitMid);
        assert_eq!(shade(0.1), Glyph::HitDim);
    }

    #[test]
    fn strongest_glyph_wins_within_a_cell() {
        let samples = [
            decayed(25.0, 5.0, false, 1.0),
            decayed(26.0, 6.0, true, 0.2),
            decayed(27.0, 7.0, false, 1.0),
        ];
        let frame = render_frame(&grid(), &pose(), &samples, &RenderSettings::default());
        assert_eq!(frame.glyph(2, 0), Some(Glyph::HitDim));
    }

    #[test]
    fn off_map_endpoints_keep_their_in_map_beams() {
        let samples = [decayed(-5.0, 5.0, false, 1.0), decayed(500.0, 5.0, false, 1.0)];
        let frame = render_frame(&grid(), &pose(), &samples, &RenderSettings::default());
        assert_eq!(frame.rows(), vec!["   #", ":#  ", "@:::"]);
    }

    #[test]
    fn beam_shades_cells_between_emitter_and_hit() {
        let g = grid();
        let settings = RenderSettings::default();

        let bright = render_frame(&g, &pose(), &[decayed(35.0, 25.0, true, 1.0)], &settings);
        assert_eq!(bright.rows()[2], "@::*");

        let faded = render_frame(&g, &pose(), &[decayed(35.0, 25.0, true, 0.4)], &settings);
        assert_eq!(faded.rows()[2], "@,,+");
    }

    #[test]
    fn beams_never_cover_walls() {
        // From the emitter up through the wall at (1, 1) to the top row.
        let samples = [decayed(15.0, 5.0, false, 1.0)];
        let frame = render_frame(&grid(), &pose(), &samples, &RenderSettings::default());
        assert_eq!(frame.glyph(1, 1), Some(Glyph::Wall));
        assert_eq!(frame.glyph(1, 0), Some(Glyph::Miss));
    }

    #[test]
    fn toggle_blind_flips() {
        let mut settings = RenderSettings::default();
        assert!(settings.toggle_blind());
        assert!(!settings.toggle_blind());
    }
}
