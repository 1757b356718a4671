#![cfg_attr(not(test), no_std)]

/// Outcome of scanning every line on a grid for `line_size` consecutive marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineScan {
    /// Owner of the first qualifying run found, in scan order.
    pub winner: Option<i32>,
    /// True when runs owned by two different players were found.
    pub contradictory: bool,
}

/// Line orientations: horizontal, vertical, diagonal (up-right), anti-diagonal (down-right).
const ORIENTATIONS: [(i32, i32); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// Scans a grid-based game board (Connect4, Gobang, etc.) for winning runs.
///
/// Cells are stored row-major with row 0 first; `0` marks an empty cell and
/// any other value is a player id. Every line in each orientation is walked
/// exactly once, tracking the current run of identical non-empty marks.
///
/// The scan stops early as soon as a second, different winner shows up.
///
/// # Arguments
/// * `board` - The board data as a flat slice
/// * `width` - Board width
/// * `height` - Board height
/// * `line_size` - Number of consecutive pieces needed to win
pub fn scan_lines(board: &[i32], width: usize, height: usize, line_size: usize) -> LineScan {
    let w = width as i32;
    let h = height as i32;
    let n = line_size as i32;
    let mut scan = LineScan::default();

    let get_cell = |x: i32, y: i32| -> i32 {
        let idx = (y * w + x) as usize;
        if idx < board.len() {
            board[idx]
        } else {
            0
        }
    };
    let inside = |x: i32, y: i32| x >= 0 && y >= 0 && x < w && y < h;

    for &(dx, dy) in ORIENTATIONS.iter() {
        for y in 0..h {
            for x in 0..w {
                // Only start walking from the first cell of each line.
                if inside(x - dx, y - dy) {
                    continue;
                }
                let (mut cx, mut cy) = (x, y);
                let mut run_player = 0;
                let mut run_len = 0;
                while inside(cx, cy) {
                    let cell = get_cell(cx, cy);
                    if cell == 0 {
                        run_player = 0;
                        run_len = 0;
                    } else if cell == run_player {
                        run_len += 1;
                    } else {
                        run_player = cell;
                        run_len = 1;
                    }
                    if run_len >= n {
                        match scan.winner {
                            Some(first) if first != run_player => {
                                scan.contradictory = true;
                                return scan;
                            }
                            Some(_) => {}
                            None => scan.winner = Some(run_player),
                        }
                    }
                    cx += dx;
                    cy += dy;
                }
            }
        }
    }

    scan
}
