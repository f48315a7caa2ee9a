//! The assignment solver: an optimal one-to-one port↔signal assignment
//! minimizing a composite [`MatchCost`], solved by a greedy pass with an
//! LP fallback for the rare case the greedy pass collides.

use std::collections::HashSet;

use good_lp::solvers::clarabel::clarabel;
use good_lp::{constraint, variable, variables, Expression, Solution, SolverModel};

use crate::config::EngineConfig;
use crate::model::{jaccard_distance, BusSignal, Direction, MatchCost, Port};

/// `nc` = token Jaccard distance between `words(port) \ dup_tokens` and
/// `words(signal)`; `wc` = 1 iff widths disagree and both are known; `dc` =
/// 1 iff directions disagree.
pub fn match_cost(port: &Port, signal: &BusSignal, dup_tokens: &HashSet<String>) -> MatchCost {
    let port_words: HashSet<String> = port.words().into_iter().filter(|t| !dup_tokens.contains(t)).collect();
    let signal_words: HashSet<String> = signal.words().into_iter().collect();
    let nc = jaccard_distance(&port_words, &signal_words);
    let wc = match (port.width, signal.width) {
        (Some(a), Some(b)) if a != b => 1,
        _ => 0,
    };
    let dc = if port.direction != signal.direction { 1 } else { 0 };
    MatchCost::new(nc, wc, dc)
}

/// The result of solving an assignment problem between a physical port
/// list and a bus-signal list.
#[derive(Debug, Clone)]
pub struct SolvedAssignment {
    /// Matched (port, signal) pairs, sorted by port name for determinism.
    /// Ports not present here were left unmatched by the assignment
    /// (always possible when there are more ports than signals).
    pub mapping: Vec<(Port, BusSignal)>,
    pub used_lp_fallback: bool,
    /// Set only in the theoretically-unreachable case the LP relaxation
    /// itself fails; the greedy (possibly colliding) result is returned
    /// unchanged per the degenerate-cost fallback in the spec.
    pub degenerate: bool,
}

/// Solve the assignment problem for `ports` against `signals`, minimizing
/// the sum of [`match_cost`] values under `cfg`'s weights.
pub fn solve_assignment(
    ports: &[Port],
    signals: &[BusSignal],
    dup_tokens: &HashSet<String>,
    cfg: &EngineConfig,
) -> SolvedAssignment {
    if ports.is_empty() || signals.is_empty() {
        return SolvedAssignment { mapping: Vec::new(), used_lp_fallback: false, degenerate: false };
    }

    // Ensure more columns than rows by transposing if necessary.
    let transpose = ports.len() > signals.len();
    let (rows_len, cols_len) = if transpose { (signals.len(), ports.len()) } else { (ports.len(), signals.len()) };

    let cost_at = |row: usize, col: usize| -> MatchCost {
        let (port, signal) = if transpose { (&ports[col], &signals[row]) } else { (&ports[row], &signals[col]) };
        match_cost(port, signal, dup_tokens)
    };
    let mut matrix = vec![vec![0.0f64; cols_len]; rows_len];
    for row in 0..rows_len {
        for col in 0..cols_len {
            matrix[row][col] = cost_at(row, col).value(cfg);
        }
    }

    let greedy = greedy_assignment(&matrix);
    let (assignment, used_lp_fallback, degenerate) = if is_collision_free(&greedy, cols_len) {
        (greedy, false, false)
    } else {
        match lp_assignment(&matrix) {
            Some(lp) => (lp, true, false),
            None => (greedy, true, true),
        }
    };

    let mut mapping = Vec::new();
    for (row, col_opt) in assignment.into_iter().enumerate() {
        let Some(col) = col_opt else { continue };
        let (port, signal) = if transpose { (ports[col].clone(), signals[row].clone()) } else { (ports[row].clone(), signals[col].clone()) };
        mapping.push((port, signal));
    }
    mapping.sort_by(|a, b| a.0.name.cmp(&b.0.name));

    SolvedAssignment { mapping, used_lp_fallback, degenerate }
}

/// Each row picks its lowest-cost column, ties broken by column index.
fn greedy_assignment(matrix: &[Vec<f64>]) -> Vec<Option<usize>> {
    matrix
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .min_by(|(ai, a), (bi, b)| a.partial_cmp(b).unwrap().then(ai.cmp(bi)))
                .map(|(idx, _)| idx)
        })
        .collect()
}

fn is_collision_free(assignment: &[Option<usize>], cols_len: usize) -> bool {
    let mut used = vec![0u32; cols_len];
    for col in assignment.iter().flatten() {
        used[*col] += 1;
        if used[*col] > 1 {
            return false;
        }
    }
    assignment.iter().all(Option::is_some)
}

/// Solve the continuous relaxation `min c·x s.t. row-sums = 1, col-sums ≤
/// 1, 0 ≤ x ≤ 1` and threshold at 0.01. The relaxation's extreme points are
/// integral for this bipartite structure, so an integer assignment always
/// results; `None` only if the solver itself errors.
fn lp_assignment(matrix: &[Vec<f64>]) -> Option<Vec<Option<usize>>> {
    let rows_len = matrix.len();
    let cols_len = matrix[0].len();

    let mut vars = variables!();
    let mut x = vec![Vec::with_capacity(cols_len); rows_len];
    for row in x.iter_mut() {
        for _ in 0..cols_len {
            row.push(vars.add(variable().min(0.0).max(1.0)));
        }
    }

    let mut objective = Expression::from(0.0);
    for i in 0..rows_len {
        for j in 0..cols_len {
            objective = objective + x[i][j] * matrix[i][j];
        }
    }

    let mut model = vars.minimise(objective).using(clarabel);
    for row in x.iter() {
        let mut row_sum = Expression::from(0.0);
        for &v in row.iter() {
            row_sum = row_sum + v * 1.0;
        }
        model = model.with(constraint!(row_sum == 1.0));
    }
    for col in 0..cols_len {
        let mut col_sum = Expression::from(0.0);
        for row in x.iter() {
            col_sum = col_sum + row[col] * 1.0;
        }
        model = model.with(constraint!(col_sum <= 1.0));
    }

    let solution = model.solve().ok()?;

    let mut assignment = Vec::with_capacity(rows_len);
    for row in x.iter() {
        let mut chosen = None;
        for (j, &var) in row.iter().enumerate() {
            if solution.value(var) >= 0.01 {
                chosen = Some(j);
                break;
            }
        }
        assignment.push(chosen);
    }
    Some(assignment)
}
