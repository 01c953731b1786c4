//! Submission scoring.

/// Points awarded for an answered round.
///
/// Incorrect answers score 0 regardless of the other inputs. Correct answers
/// earn a base of 100, plus 25 when the answer was the round's first correct
/// one, plus a speed bonus of `50 - floor(time_taken_ms / 200)` clamped at 0
/// when the client reported an answering time. The maximum is therefore 175.
pub fn calculate_score(is_correct: bool, is_first_correct: bool, time_taken_ms: Option<u32>) -> u32 {
    if !is_correct {
        return 0;
    }

    let mut score = 100;

    if is_first_correct {
        score += 25;
    }

    if let Some(ms) = time_taken_ms {
        score += 50u32.saturating_sub(ms / 200);
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incorrect_answers_score_zero() {
        assert_eq!(calculate_score(false, false, Some(500)), 0);
        assert_eq!(calculate_score(false, true, Some(100)), 0);
        assert_eq!(calculate_score(false, true, None), 0);
    }

    #[test]
    fn correct_answer_without_time_scores_base() {
        assert_eq!(calculate_score(true, false, None), 100);
    }

    #[test]
    fn first_correct_bonus_adds_25() {
        assert_eq!(calculate_score(true, true, None), 125);
    }

    #[test]
    fn speed_bonus_is_50_minus_floored_time() {
        assert_eq!(calculate_score(true, false, Some(1_000)), 145);
    }

    #[test]
    fn speed_bonus_maxes_out_at_zero_milliseconds() {
        assert_eq!(calculate_score(true, false, Some(0)), 150);
    }

    #[test]
    fn speed_bonus_reaches_zero_at_ten_seconds() {
        assert_eq!(calculate_score(true, false, Some(10_000)), 100);
    }

    #[test]
    fn speed_bonus_is_clamped_for_slow_answers() {
        assert_eq!(calculate_score(true, false, Some(20_000)), 100);
    }

    #[test]
    fn all_bonuses_combine() {
        assert_eq!(calculate_score(true, true, Some(400)), 173);
    }
}
