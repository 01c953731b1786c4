//! Equation generation for game rounds.
//!
//! Expressions are built locally from the round's difficulty tier; the answer
//! comes from the remote evaluation service when available, with the local
//! precedence-correct evaluator as fallback.

/// Local arithmetic evaluator used as the remote fallback.
pub mod evaluator;
/// Remote expression-evaluation client.
pub mod remote;

use rand::Rng;
use thiserror::Error;

pub use self::remote::MathJsClient;

use self::evaluator::EvalError;

/// Difficulty tier of a round's equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    /// Two small operands, `+` or `-`.
    Easy,
    /// Three operands mixing `+`, `-` and `*`.
    Medium,
    /// `(base + add) * mult`.
    Hard,
}

/// A generated equation together with its expected answer.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedEquation {
    /// Expression presented to players.
    pub text: String,
    /// Value the expression evaluates to under standard precedence.
    pub answer: f64,
}

/// Error raised when an equation's answer cannot be computed at all.
///
/// Fatal: surfaced to the caller, never retried.
#[derive(Debug, Error)]
pub enum EquationError {
    #[error("expression `{expression}` could not be evaluated: {source}")]
    Evaluation {
        expression: String,
        #[source]
        source: EvalError,
    },
}

/// Difficulty tier for a round number: 1-3 easy, 4-7 medium, 8+ hard.
pub fn difficulty_for_round(round_number: u32) -> Difficulty {
    if round_number <= 3 {
        Difficulty::Easy
    } else if round_number <= 7 {
        Difficulty::Medium
    } else {
        Difficulty::Hard
    }
}

/// Generate an equation of the given difficulty and compute its answer.
pub async fn generate(
    client: &MathJsClient,
    difficulty: Difficulty,
) -> Result<GeneratedEquation, EquationError> {
    let text = build_expression(difficulty);
    let answer = client.evaluate(&text).await?;
    Ok(GeneratedEquation { text, answer })
}

fn build_expression(difficulty: Difficulty) -> String {
    let mut rng = rand::rng();
    match difficulty {
        Difficulty::Easy => {
            let a = rng.random_range(1..=20);
            let b = rng.random_range(1..=20);
            let op = ["+", "-"][rng.random_range(0..2)];
            format!("{a} {op} {b}")
        }
        Difficulty::Medium => {
            let ops = ["+", "-", "*"];
            let op1 = ops[rng.random_range(0..3)];
            let op2 = ops[rng.random_range(0..3)];
            let x = rng.random_range(2..=12);
            let y = rng.random_range(2..=12);
            let z = rng.random_range(2..=12);
            format!("{x} {op1} {y} {op2} {z}")
        }
        Difficulty::Hard => {
            let base = rng.random_range(2..=10);
            let add = rng.random_range(1..=15);
            let mult = rng.random_range(2..=9);
            format!("({base} + {add}) * {mult}")
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::EvaluatorConfig;

    use super::*;

    fn offline_client() -> MathJsClient {
        let config = EvaluatorConfig {
            remote_enabled: false,
            ..EvaluatorConfig::default()
        };
        MathJsClient::new(&config).expect("build client")
    }

    #[test]
    fn difficulty_scales_with_round_number() {
        assert_eq!(difficulty_for_round(1), Difficulty::Easy);
        assert_eq!(difficulty_for_round(3), Difficulty::Easy);
        assert_eq!(difficulty_for_round(4), Difficulty::Medium);
        assert_eq!(difficulty_for_round(7), Difficulty::Medium);
        assert_eq!(difficulty_for_round(8), Difficulty::Hard);
        assert_eq!(difficulty_for_round(20), Difficulty::Hard);
    }

    #[test]
    fn easy_expressions_use_two_small_operands() {
        for _ in 0..50 {
            let text = build_expression(Difficulty::Easy);
            let parts: Vec<&str> = text.split_whitespace().collect();
            assert_eq!(parts.len(), 3, "unexpected shape: {text}");
            let a: i64 = parts[0].parse().unwrap();
            let b: i64 = parts[2].parse().unwrap();
            assert!((1..=20).contains(&a));
            assert!((1..=20).contains(&b));
            assert!(parts[1] == "+" || parts[1] == "-");
        }
    }

    #[test]
    fn hard_expressions_follow_the_parenthesised_shape() {
        for _ in 0..50 {
            let text = build_expression(Difficulty::Hard);
            assert!(text.starts_with('('), "unexpected shape: {text}");
            assert!(text.contains(") *"), "unexpected shape: {text}");
        }
    }

    /// Round-trip property: the generated text, evaluated with standard
    /// precedence, matches the advertised answer for every tier.
    #[tokio::test]
    async fn generated_answer_matches_local_evaluation() {
        let client = offline_client();
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            for _ in 0..50 {
                let equation = generate(&client, difficulty).await.expect("generate");
                let evaluated = evaluator::evaluate(&equation.text).expect("evaluate");
                assert_eq!(
                    equation.answer, evaluated,
                    "mismatch for `{}`",
                    equation.text
                );
            }
        }
    }
}
