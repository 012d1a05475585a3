//! Uniform grid broad phase.
//!
//! Cells are stored as one flat index list sorted by cell (counting sort), so a
//! rebuild is two linear sweeps and never allocates once the buffers have grown
//! to the particle count. Indices inside a cell keep ascending particle order.

/// Forward-only neighbour stencil as `(d_row, d_col)`: self, right,
/// bottom-left, bottom, bottom-right. Every unordered pair of adjacent cells
/// is reached from exactly one side.
pub const FORWARD_STENCIL: [(isize, isize); 5] = [(0, 0), (0, 1), (1, -1), (1, 0), (1, 1)];

/// Upper bound on cells per grid. Finer requests get coarser cells.
pub const MAX_CELLS: usize = 1 << 20;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridDims {
    pub cols: usize,
    pub rows: usize,
    pub cell_size: f32,
}

impl GridDims {
    /// `cols = max(1, floor(width / cell_size))`, same for rows. A degenerate
    /// cell size collapses the grid to a single cell. The cell size doubles
    /// until the grid fits in `MAX_CELLS`.
    pub fn new(width: f32, height: f32, cell_size: f32) -> Self {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Self { cols: 1, rows: 1, cell_size: f32::INFINITY };
        }
        let mut cell_size = cell_size;
        loop {
            let dims = Self {
                cols: axis_cells(width, cell_size),
                rows: axis_cells(height, cell_size),
                cell_size,
            };
            if dims.cell_count() <= MAX_CELLS {
                return dims;
            }
            cell_size *= 2.0;
        }
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cols.saturating_mul(self.rows)
    }

    #[inline]
    pub fn col_of(&self, x: f32) -> usize {
        clamp_axis(x, self.cell_size, self.cols)
    }

    #[inline]
    pub fn row_of(&self, y: f32) -> usize {
        clamp_axis(y, self.cell_size, self.rows)
    }

    /// Flat cell index of a position, clamped into the grid.
    #[inline]
    pub fn cell_of(&self, x: f32, y: f32) -> usize {
        self.row_of(y) * self.cols + self.col_of(x)
    }

    /// Neighbour `(row, col)` at stencil offset, or `None` outside the grid.
    #[inline]
    pub fn offset(&self, row: usize, col: usize, d_row: isize, d_col: isize) -> Option<(usize, usize)> {
        let r = row.checked_add_signed(d_row)?;
        let c = col.checked_add_signed(d_col)?;
        (r < self.rows && c < self.cols).then_some((r, c))
    }
}

#[inline]
fn axis_cells(extent: f32, cell_size: f32) -> usize {
    let n = (extent / cell_size).floor();
    if n.is_finite() && n >= 1.0 { n as usize } else { 1 }
}

/// `floor(coord / cell)` clamped to `[0, n-1]`. NaN lands in cell 0.
#[inline]
fn clamp_axis(coord: f32, cell_size: f32, n: usize) -> usize {
    let c = (coord / cell_size).floor();
    if c >= (n - 1) as f32 {
        n - 1
    } else if c > 0.0 {
        c as usize
    } else {
        0
    }
}

/// Cell buckets for one pass.
#[derive(Debug, Default)]
pub struct CellGrid {
    dims: Option<GridDims>,
    /// `starts[c]..starts[c + 1]` is the slice of `entries` for cell `c`.
    starts: Vec<u32>,
    entries: Vec<u32>,
    home: Vec<u32>,
    cursor: Vec<u32>,
}

impl CellGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket `count` bodies, reading each position through `pos`.
    pub fn rebuild(&mut self, dims: GridDims, count: usize, pos: impl Fn(usize) -> (f32, f32)) {
        let cells = dims.cell_count();
        self.dims = Some(dims);
        self.starts.clear();
        self.starts.resize(cells + 1, 0);
        self.home.clear();
        self.home.reserve(count);

        for i in 0..count {
            let (x, y) = pos(i);
            let c = dims.cell_of(x, y);
            self.home.push(c as u32);
            self.starts[c + 1] += 1;
        }
        for c in 0..cells {
            self.starts[c + 1] += self.starts[c];
        }

        self.entries.clear();
        self.entries.resize(count, 0);
        self.cursor.clear();
        self.cursor.extend_from_slice(&self.starts[..cells]);
        for (i, &c) in self.home.iter().enumerate() {
            let at = &mut self.cursor[c as usize];
            self.entries[*at as usize] = i as u32;
            *at += 1;
        }
    }

    pub fn dims(&self) -> Option<GridDims> {
        self.dims
    }

    /// Particle indices bucketed in `(row, col)`, ascending.
    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> &[u32] {
        let Some(dims) = self.dims else { return &[] };
        let c = row * dims.cols + col;
        match (self.starts.get(c), self.starts.get(c + 1)) {
            (Some(&a), Some(&b)) => &self.entries[a as usize..b as usize],
            _ => &[],
        }
    }

    /// Flat cell index each body was bucketed into.
    #[inline]
    pub fn home_cell(&self, i: usize) -> Option<usize> {
        self.home.get(i).map(|&c| c as usize)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
