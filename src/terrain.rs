use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Terrain category of a grid cell. The discriminant order matters: the
/// smoothing pass breaks majority-vote ties toward the lowest index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Biome {
    Ocean = 0,
    Beach = 1,
    Grass = 2,
    Forest = 3,
    Swamp = 4,
    RockyHills = 5,
    Mountain = 6,
}

impl Biome {
    pub fn is_water(self) -> bool {
        self == Self::Ocean
    }

    pub fn is_mountainous(self) -> bool {
        matches!(self, Self::RockyHills | Self::Mountain)
    }

    const ALL: [Self; 7] = [
        Self::Ocean,
        Self::Beach,
        Self::Grass,
        Self::Forest,
        Self::Swamp,
        Self::RockyHills,
        Self::Mountain,
    ];
}

/// Water classification for a cell; `None` for land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaterKind {
    None,
    ShallowOcean,
    Ocean,
    DeepOcean,
    Lake,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub biome: Biome,
    pub elevation: f32,
    pub moisture: f32,
    pub water: WaterKind,
    pub depth: f32,
    pub snow: bool,
}

/// Returned for any out-of-bounds query: plain dry grassland.
pub const DEFAULT_CELL: Cell = Cell {
    biome: Biome::Grass,
    elevation: 0.0,
    moisture: 0.0,
    water: WaterKind::None,
    depth: 0.0,
    snow: false,
};

const BASE_FREQUENCY: f32 = 0.08;
const WARP_FREQUENCY: f32 = 0.16;
const WARP_STRENGTH: f32 = 6.0;
const OCTAVES: u32 = 4;

const OCEAN_ELEVATION: f32 = 0.35;
const BEACH_ELEVATION: f32 = 0.38;
const HIGHLAND_ELEVATION: f32 = 0.80;
const FOREST_MOISTURE: f32 = 0.7;
const GRASS_MOISTURE: f32 = 0.45;
const PEAK_MOISTURE: f32 = 0.5;
const SWAMP_CENTER_DISTANCE: f32 = 0.25;
const SNOW_ELEVATION: f32 = 0.90;

const LAKE_CHANCE: f32 = 0.01;
const LAKE_MIN_MOISTURE: f32 = 0.65;
const LAKE_MAX_ELEVATION: f32 = 0.55;
const LAKE_DEPTH: f32 = 0.4;
const ENCLOSED_LAKE_MOISTURE: f32 = 0.6;

const DEEP_OCEAN_DISTANCE: u32 = 10;
const OPEN_OCEAN_DISTANCE: u32 = 5;
const DEPTH_FALLOFF: f32 = 15.0;

/// Classified world grid. Immutable once generated; all queries are total
/// (out-of-bounds lookups return [`DEFAULT_CELL`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainGrid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl TerrainGrid {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Cell at (x, y); out-of-bounds coordinates yield [`DEFAULT_CELL`].
    pub fn cell(&self, x: i64, y: i64) -> Cell {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return DEFAULT_CELL;
        }
        self.cells[y as usize * self.width + x as usize]
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }
}

/// Congruential mixer used to derive per-field angles and phases from the
/// world seed.
struct SeedMix {
    state: u64,
}

impl SeedMix {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.state
    }

    fn next_f32(&mut self) -> f32 {
        ((self.next() >> 40) as f32) / ((1u64 << 24) as f32)
    }
}

struct Octave {
    cos_a: f32,
    sin_a: f32,
    frequency: f32,
    phase_u: f32,
    phase_v: f32,
    amplitude: f32,
}

/// Fractal field built from rotated sinusoidal basis waves: amplitude
/// halves and frequency doubles per octave, output normalized to [0, 1].
struct NoiseField {
    octaves: Vec<Octave>,
}

impl NoiseField {
    fn new(seed: u64, base_frequency: f32, octave_count: u32) -> Self {
        let mut mix = SeedMix::new(seed);
        let mut octaves = Vec::with_capacity(octave_count as usize);
        let mut amplitude = 1.0;
        let mut frequency = base_frequency;
        for _ in 0..octave_count {
            let angle = mix.next_f32() * std::f32::consts::TAU;
            octaves.push(Octave {
                cos_a: angle.cos(),
                sin_a: angle.sin(),
                frequency,
                phase_u: mix.next_f32() * std::f32::consts::TAU,
                phase_v: mix.next_f32() * std::f32::consts::TAU,
                amplitude,
            });
            amplitude *= 0.5;
            frequency *= 2.0;
        }
        Self { octaves }
    }

    fn sample(&self, x: f32, y: f32) -> f32 {
        let mut value = 0.0;
        let mut max_value = 0.0;
        for octave in &self.octaves {
            let u = x * octave.cos_a + y * octave.sin_a;
            let v = -x * octave.sin_a + y * octave.cos_a;
            let wave = (u * octave.frequency + octave.phase_u).sin()
                * (v * octave.frequency + octave.phase_v).sin();
            value += wave * octave.amplitude;
            max_value += octave.amplitude;
        }
        (value / max_value + 1.0) * 0.5
    }
}

/// Generate a classified grid. Identical (width, height, seed) triples
/// produce bit-identical grids.
pub fn generate(width: usize, height: usize, seed: u64) -> TerrainGrid {
    let elevation_field = NoiseField::new(seed, BASE_FREQUENCY, OCTAVES);
    let moisture_field = NoiseField::new(seed.wrapping_add(1_000), BASE_FREQUENCY, OCTAVES);
    let warp_x_field = NoiseField::new(seed.wrapping_add(2_000), WARP_FREQUENCY, OCTAVES);
    let warp_y_field = NoiseField::new(seed.wrapping_add(3_000), WARP_FREQUENCY, OCTAVES);

    let mut grid = TerrainGrid {
        width,
        height,
        cells: Vec::with_capacity(width * height),
    };

    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let half_diagonal = (center_x * center_x + center_y * center_y).sqrt().max(1.0);

    for y in 0..height {
        for x in 0..width {
            let fx = x as f32;
            let fy = y as f32;
            let warp_x = (warp_x_field.sample(fx, fy) * 2.0 - 1.0) * WARP_STRENGTH;
            let warp_y = (warp_y_field.sample(fx, fy) * 2.0 - 1.0) * WARP_STRENGTH;
            let raw_elevation = elevation_field.sample(fx + warp_x, fy + warp_y);

            let dx = fx - center_x;
            let dy = fy - center_y;
            let center_distance = (dx * dx + dy * dy).sqrt() / half_diagonal;
            let continental = 1.0 - center_distance.min(1.0);

            let elevation = (raw_elevation * 0.6 + continental * 0.4).clamp(0.0, 1.0);
            let moisture = moisture_field.sample(fx, fy);
            let biome = classify(elevation, moisture, center_distance);

            grid.cells.push(Cell {
                biome,
                elevation,
                moisture,
                water: WaterKind::None,
                depth: 0.0,
                snow: false,
            });
        }
    }

    carve_lakes(&mut grid, seed);
    apply_coastal_cliffs(&mut grid);
    smooth(&mut grid);
    // Smoothing can recreate beach/mountain contact; re-run the cliff pass
    // so the adjacency invariant holds on the finished grid.
    apply_coastal_cliffs(&mut grid);
    classify_water(&mut grid);

    for cell in &mut grid.cells {
        cell.snow = cell.biome.is_mountainous() && cell.elevation > SNOW_ELEVATION;
    }

    grid
}

fn classify(elevation: f32, moisture: f32, center_distance: f32) -> Biome {
    if elevation < OCEAN_ELEVATION {
        Biome::Ocean
    } else if elevation < BEACH_ELEVATION {
        Biome::Beach
    } else if elevation > HIGHLAND_ELEVATION {
        if moisture > PEAK_MOISTURE {
            Biome::Mountain
        } else {
            Biome::RockyHills
        }
    } else if moisture > FOREST_MOISTURE {
        if center_distance < SWAMP_CENTER_DISTANCE {
            Biome::Swamp
        } else {
            Biome::Forest
        }
    } else if moisture > GRASS_MOISTURE {
        Biome::Grass
    } else {
        Biome::RockyHills
    }
}

/// Stamp circular freshwater blobs onto low, wet interior land. Mountains
/// are never overwritten.
fn carve_lakes(grid: &mut TerrainGrid, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x9E37_79B9_7F4A_7C15);
    let width = grid.width as i64;
    let height = grid.height as i64;
    for y in 0..height {
        for x in 0..width {
            let cell = grid.cell(x, y);
            if cell.biome.is_water()
                || cell.elevation >= LAKE_MAX_ELEVATION
                || cell.moisture <= LAKE_MIN_MOISTURE
            {
                continue;
            }
            if rng.gen::<f32>() >= LAKE_CHANCE {
                continue;
            }
            let radius = rng.gen_range(2..=4i64);
            for by in (y - radius)..=(y + radius) {
                for bx in (x - radius)..=(x + radius) {
                    if bx < 0 || by < 0 || bx >= width || by >= height {
                        continue;
                    }
                    let dx = bx - x;
                    let dy = by - y;
                    if dx * dx + dy * dy > radius * radius {
                        continue;
                    }
                    let index = grid.index(bx as usize, by as usize);
                    if !grid.cells[index].biome.is_mountainous() {
                        grid.cells[index].biome = Biome::Ocean;
                    }
                }
            }
        }
    }
}

/// Beach cells bordering a mountain become rocky hills. Applied both
/// before and after smoothing so no mountain is ever adjacent to a beach
/// in the finished grid.
fn apply_coastal_cliffs(grid: &mut TerrainGrid) {
    let width = grid.width as i64;
    let height = grid.height as i64;
    let mut converted = Vec::new();
    for y in 0..height {
        for x in 0..width {
            if grid.cell(x, y).biome != Biome::Beach {
                continue;
            }
            let mut next_to_mountain = false;
            for ny in (y - 1)..=(y + 1) {
                for nx in (x - 1)..=(x + 1) {
                    if nx < 0 || ny < 0 || nx >= width || ny >= height {
                        continue;
                    }
                    if grid.cell(nx, ny).biome == Biome::Mountain {
                        next_to_mountain = true;
                    }
                }
            }
            if next_to_mountain {
                converted.push(grid.index(x as usize, y as usize));
            }
        }
    }
    for index in converted {
        grid.cells[index].biome = Biome::RockyHills;
    }
}

/// One 3x3 majority-vote pass with wrap-around neighbor lookup; ties
/// break toward the lowest biome index.
fn smooth(grid: &mut TerrainGrid) {
    let width = grid.width as i64;
    let height = grid.height as i64;
    let mut smoothed = Vec::with_capacity(grid.cells.len());
    for y in 0..height {
        for x in 0..width {
            let mut counts = [0u8; Biome::ALL.len()];
            for dy in -1..=1i64 {
                for dx in -1..=1i64 {
                    let nx = (x + dx).rem_euclid(width) as usize;
                    let ny = (y + dy).rem_euclid(height) as usize;
                    counts[grid.cells[grid.index(nx, ny)].biome as usize] += 1;
                }
            }
            let mut winner = Biome::Ocean;
            let mut best = 0u8;
            for biome in Biome::ALL {
                let count = counts[biome as usize];
                if count > best {
                    best = count;
                    winner = biome;
                }
            }
            smoothed.push(winner);
        }
    }
    for (cell, biome) in grid.cells.iter_mut().zip(smoothed) {
        cell.biome = biome;
    }
}

/// Classify every water cell by BFS distance to the nearest land cell, and
/// reclassify moist water pockets with no path to the grid boundary as
/// freshwater lakes at a fixed depth.
fn classify_water(grid: &mut TerrainGrid) {
    let width = grid.width;
    let height = grid.height;
    let cell_count = width * height;
    let unreached = u32::MAX;
    let mut distance = vec![unreached; cell_count];
    let mut queue = VecDeque::new();

    for index in 0..cell_count {
        if !grid.cells[index].biome.is_water() {
            distance[index] = 0;
            queue.push_back(index);
        }
    }
    while let Some(index) = queue.pop_front() {
        let x = index % width;
        let y = index / width;
        let next = distance[index] + 1;
        let mut visit = |nx: usize, ny: usize, queue: &mut VecDeque<usize>| {
            let ni = ny * width + nx;
            if grid.cells[ni].biome.is_water() && distance[ni] == unreached {
                distance[ni] = next;
                queue.push_back(ni);
            }
        };
        if x > 0 {
            visit(x - 1, y, &mut queue);
        }
        if x + 1 < width {
            visit(x + 1, y, &mut queue);
        }
        if y > 0 {
            visit(x, y - 1, &mut queue);
        }
        if y + 1 < height {
            visit(x, y + 1, &mut queue);
        }
    }

    // Water connected to the grid boundary is open sea; the rest is
    // enclosed and may qualify as a lake.
    let mut open = vec![false; cell_count];
    let mut flood = VecDeque::new();
    for x in 0..width {
        for y in [0, height.saturating_sub(1)] {
            let index = y * width + x;
            if grid.cells[index].biome.is_water() && !open[index] {
                open[index] = true;
                flood.push_back(index);
            }
        }
    }
    for y in 0..height {
        for x in [0, width.saturating_sub(1)] {
            let index = y * width + x;
            if grid.cells[index].biome.is_water() && !open[index] {
                open[index] = true;
                flood.push_back(index);
            }
        }
    }
    while let Some(index) = flood.pop_front() {
        let x = index % width;
        let y = index / width;
        let mut visit = |nx: usize, ny: usize, flood: &mut VecDeque<usize>| {
            let ni = ny * width + nx;
            if grid.cells[ni].biome.is_water() && !open[ni] {
                open[ni] = true;
                flood.push_back(ni);
            }
        };
        if x > 0 {
            visit(x - 1, y, &mut flood);
        }
        if x + 1 < width {
            visit(x + 1, y, &mut flood);
        }
        if y > 0 {
            visit(x, y - 1, &mut flood);
        }
        if y + 1 < height {
            visit(x, y + 1, &mut flood);
        }
    }

    for index in 0..cell_count {
        let cell = &mut grid.cells[index];
        if !cell.biome.is_water() {
            cell.water = WaterKind::None;
            cell.depth = 0.0;
            continue;
        }
        let steps = if distance[index] == unreached {
            // No land anywhere on the grid.
            (width + height) as u32
        } else {
            distance[index]
        };
        if !open[index] && cell.moisture > ENCLOSED_LAKE_MOISTURE {
            cell.water = WaterKind::Lake;
            cell.depth = LAKE_DEPTH;
        } else {
            cell.water = if steps > DEEP_OCEAN_DISTANCE {
                WaterKind::DeepOcean
            } else if steps > OPEN_OCEAN_DISTANCE {
                WaterKind::Ocean
            } else {
                WaterKind::ShallowOcean
            };
            cell.depth = (steps as f32 / DEPTH_FALLOFF).clamp(0.0, 1.0);
        }
    }
}
