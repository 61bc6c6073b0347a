//! The 5x5 cloud board: tile ids, tile sets and the per-tile render record.
//!
//! Tiles are numbered row-major from 0 (top-left) to 24 (bottom-right). The
//! board never changes shape; what changes between levels is which tiles are
//! safe and which have already fallen.

pub mod levels;
pub mod sampling;

/// Board edge length in tiles.
pub const BOARD_SIDE: u8 = 5;
/// Total tiles on the board.
pub const BOARD_TILES: usize = (BOARD_SIDE as usize) * (BOARD_SIDE as usize);

/// Tile index, 0..BOARD_TILES.
pub type TileId = u8;

/// Compact set of tile ids backed by a bit mask (bit `i` = tile `i`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TileSet(u32);

impl TileSet {
    const FULL_MASK: u32 = (1u32 << BOARD_TILES) - 1;

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every tile on the board.
    pub const fn full() -> Self {
        Self(Self::FULL_MASK)
    }

    pub fn contains(&self, id: TileId) -> bool {
        is_valid_tile(id) && self.0 & (1 << id) != 0
    }

    /// Adds `id`; ids outside the board are ignored.
    pub fn insert(&mut self, id: TileId) {
        if is_valid_tile(id) {
            self.0 |= 1 << id;
        }
    }

    pub fn remove(&mut self, id: TileId) {
        if is_valid_tile(id) {
            self.0 &= !(1 << id);
        }
    }

    pub fn union(&self, other: &TileSet) -> TileSet {
        TileSet(self.0 | other.0)
    }

    pub fn difference(&self, other: &TileSet) -> TileSet {
        TileSet(self.0 & !other.0)
    }

    pub fn intersection(&self, other: &TileSet) -> TileSet {
        TileSet(self.0 & other.0)
    }

    pub fn is_disjoint(&self, other: &TileSet) -> bool {
        self.0 & other.0 == 0
    }

    pub fn is_subset(&self, other: &TileSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = TileId> + '_ {
        let bits = self.0;
        (0..BOARD_TILES as TileId).filter(move |i| bits & (1 << i) != 0)
    }

    pub fn to_vec(&self) -> Vec<TileId> {
        self.iter().collect()
    }
}

impl FromIterator<TileId> for TileSet {
    fn from_iter<I: IntoIterator<Item = TileId>>(iter: I) -> Self {
        let mut set = TileSet::empty();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

pub fn is_valid_tile(id: TileId) -> bool {
    (id as usize) < BOARD_TILES
}

/// What the display needs to draw one tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileView {
    pub id: TileId,
    pub is_fallen: bool,
    pub has_player: bool,
}

/// Snapshot of the whole board in id order.
pub fn board_view(fallen: &TileSet, player: Option<TileId>) -> [TileView; BOARD_TILES] {
    let mut tiles = [TileView::default(); BOARD_TILES];
    for (idx, tile) in tiles.iter_mut().enumerate() {
        let id = idx as TileId;
        *tile = TileView {
            id,
            is_fallen: fallen.contains(id),
            has_player: player == Some(id),
        };
    }
    tiles
}
