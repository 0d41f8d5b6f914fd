//! The fixed-size tile grid: positions, facings, terrain, and resource
//! deposits.
//!
//! Tiles are stored row-major. Row-major iteration order (`y` outer, `x`
//! inner) is the deterministic order in which the engine visits buildings.

use crate::id::{BuildingId, ItemTypeId};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Positions and facings
// ---------------------------------------------------------------------------

/// A position on the 2D grid. `(0, 0)` is the top-left tile; `y` grows south.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The adjacent position one step in `direction`. May lie off the grid.
    pub fn neighbor(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cardinal directions. Rotation cycles North -> East -> South -> West.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All four cardinal directions, in clockwise order.
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }

    /// Offset for this direction.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    /// Rotate 90 degrees clockwise.
    pub fn rotate_cw(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    /// Rotate 90 degrees counter-clockwise.
    pub fn rotate_ccw(self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::East => Direction::North,
            Direction::South => Direction::East,
            Direction::West => Direction::South,
        }
    }

    pub(crate) fn index(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Terrain and deposits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    #[default]
    Ground,
    Water,
}

/// A resource deposit under a tile.
///
/// `remaining == None` is an inexhaustible deposit; `Some(n)` yields exactly
/// `n` more units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub item_type: ItemTypeId,
    pub remaining: Option<u32>,
}

impl Deposit {
    pub fn infinite(item_type: ItemTypeId) -> Self {
        Self {
            item_type,
            remaining: None,
        }
    }

    pub fn finite(item_type: ItemTypeId, amount: u32) -> Self {
        Self {
            item_type,
            remaining: Some(amount),
        }
    }

    /// Whether at least one more unit can be extracted.
    pub fn can_yield(&self) -> bool {
        self.remaining != Some(0)
    }

    /// Extract one unit. Returns `None` once a finite deposit is exhausted.
    pub fn extract(&mut self) -> Option<ItemTypeId> {
        match &mut self.remaining {
            None => Some(self.item_type),
            Some(0) => None,
            Some(n) => {
                *n -= 1;
                Some(self.item_type)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tiles and the grid
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tile {
    pub terrain: Terrain,
    pub deposit: Option<Deposit>,
    /// The building occupying this tile, if any.
    pub building: Option<BuildingId>,
}

/// A fixed-size 2D array of tiles, created once at world initialization.
#[derive(Debug, Clone)]
pub struct Grid {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl Grid {
    /// Create an all-ground grid with no deposits.
    pub fn new(width: u32, height: u32) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            tiles: vec![Tile::default(); count],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether `pos` lies on the grid.
    pub fn contains(&self, pos: GridPosition) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    fn index(&self, pos: GridPosition) -> Option<usize> {
        if self.contains(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    pub fn tile(&self, pos: GridPosition) -> Option<&Tile> {
        self.index(pos).map(|i| &self.tiles[i])
    }

    pub fn tile_mut(&mut self, pos: GridPosition) -> Option<&mut Tile> {
        self.index(pos).map(move |i| &mut self.tiles[i])
    }

    /// The building on `pos`, if the tile exists and is occupied.
    pub fn building_at(&self, pos: GridPosition) -> Option<BuildingId> {
        self.tile(pos).and_then(|t| t.building)
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = GridPosition> + use<> {
        let (w, h) = (self.width as i32, self.height as i32);
        (0..h).flat_map(move |y| (0..w).map(move |x| GridPosition::new(x, y)))
    }

    /// Occupied tiles in row-major order.
    pub fn occupied(&self) -> impl Iterator<Item = (GridPosition, BuildingId)> + '_ {
        self.positions()
            .zip(self.tiles.iter())
            .filter_map(|(pos, tile)| tile.building.map(|id| (pos, id)))
    }
}
