use castflow_grid::{Block, Crucible, FluidId, FluidStack, Grid, MoldItem, MoldTable, Position};

pub fn copper() -> FluidId {
    FluidId::new("tfc:metal/copper")
}

pub fn crucible(amount: u32) -> Block {
    Block::Crucible(Crucible::new(Some(FluidStack::new(copper(), amount)), true, 1200.0))
}

pub fn mold_table(capacity: u32) -> Block {
    Block::MoldTable(MoldTable::new(Some(MoldItem {
        capacity,
        accepts: vec![],
        result: "tfc:metal/ingot/copper".to_string(),
        contents: None,
        temperature: 0.0,
    })))
}

pub fn pos(x: i32, y: i32, z: i32) -> Position {
    Position::new(x, y, z)
}

/// Crucible at the origin, channels at x = 1..=3, mold table at x = 4.
pub fn straight_line() -> Grid {
    let mut grid = Grid::new();
    grid.set(pos(0, 0, 0), crucible(100));
    for x in 1..=3 {
        grid.place_channel(pos(x, 0, 0));
    }
    grid.set(pos(4, 0, 0), mold_table(100));
    grid
}

/// Crucible at the origin feeding a T: channels (1..=3, 0, 0) with branches
/// at z = ±1 off (3, 0, 0), each ending in a mold table.
pub fn tee() -> Grid {
    let mut grid = Grid::new();
    grid.set(pos(0, 0, 0), crucible(100));
    for x in 1..=3 {
        grid.place_channel(pos(x, 0, 0));
    }
    grid.place_channel(pos(3, 0, 1));
    grid.place_channel(pos(3, 0, -1));
    grid.set(pos(3, 0, 2), mold_table(100));
    grid.set(pos(3, 0, -2), mold_table(100));
    grid
}
