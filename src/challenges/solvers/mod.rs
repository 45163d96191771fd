//! Challenge solver registry.
//!
//! Two strategies answer arithmetic verification challenges: the digit path
//! evaluates symbolic expressions such as `12 + 30`, the word path reads
//! spelled-out and obfuscated number words. The digit path always runs first.

pub mod digits;
pub mod words;

pub use digits::{ExpressionError, evaluate, find_expression, solve_digit_expression};
pub use words::{
    Operation, compute, detect_operation, extract_numbers, lightly_normalize, normalize_challenge,
};

/// Common solver interface.
pub trait ChallengeSolver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Answer formatted with two decimals, or `None` when the text is not solvable.
    fn solve(&self, text: &str) -> Option<String>;
}

/// Symbolic arithmetic (`2 + 3 * 4`).
#[derive(Debug, Default, Clone, Copy)]
pub struct DigitExpressionSolver;

impl ChallengeSolver for DigitExpressionSolver {
    fn name(&self) -> &'static str {
        "digit_expression"
    }

    fn solve(&self, text: &str) -> Option<String> {
        solve_digit_expression(text)
    }
}

/// Spelled-out number words combined by a keyword-detected operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordArithmeticSolver;

impl ChallengeSolver for WordArithmeticSolver {
    fn name(&self) -> &'static str {
        "word_arithmetic"
    }

    fn solve(&self, text: &str) -> Option<String> {
        let numbers = extract_numbers(&normalize_challenge(text));
        if numbers.len() < 2 {
            return None;
        }
        let op = detect_operation(&lightly_normalize(text));
        compute(&numbers, op).and_then(format_answer)
    }
}

static SOLVERS: &[&dyn ChallengeSolver] = &[&DigitExpressionSolver, &WordArithmeticSolver];

/// Try the digit path, then the word path.
pub fn solve_challenge(text: &str) -> Option<String> {
    SOLVERS.iter().find_map(|solver| {
        let answer = solver.solve(text);
        if let Some(ref value) = answer {
            log::debug!("challenge solved by {} -> {}", solver.name(), value);
        }
        answer
    })
}

/// Two-decimal rendering used for every answer; non-finite values are rejected.
pub fn format_answer(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    let value = if value == 0.0 { 0.0 } else { value };
    let rendered = format!("{value:.2}");
    Some(if rendered == "-0.00" {
        "0.00".to_string()
    } else {
        rendered
    })
}
