//! Rank-weighted score computation for a finished question.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::model::{
    entities::{AnswerRecordEntity, ParticipantEntity},
    question::Question,
};

/// Total points shared by the correct answers to one question.
const POINT_POOL: f64 = 1000.0;

/// Compute the per-participant payout for one question.
///
/// Correct answers are ranked by how fast they came in and split the
/// pool with linearly decreasing weights (first gets `N`, last gets
/// `1`, each share rounded to the nearest point). Every participant on
/// the roster receives an entry, zero when their answer was wrong or
/// missing, so downstream aggregation never has to guess whether a
/// question has been settled for a given participant.
pub fn compute_scores(
    question: &Question,
    roster: &BTreeMap<Uuid, ParticipantEntity>,
    answers: &BTreeMap<Uuid, AnswerRecordEntity>,
) -> BTreeMap<Uuid, u32> {
    let mut correct: Vec<(&Uuid, &AnswerRecordEntity)> = answers
        .iter()
        .filter(|(_, record)| question.accepts(&record.answer))
        .collect();
    correct.sort_by(|(left_id, left), (right_id, right)| {
        left.elapsed
            .cmp(&right.elapsed)
            .then_with(|| left.answered_at.cmp(&right.answered_at))
            .then_with(|| left_id.cmp(right_id))
    });

    let mut scores: BTreeMap<Uuid, u32> = roster.keys().map(|id| (*id, 0)).collect();

    let ranked = correct.len() as u64;
    if ranked == 0 {
        return scores;
    }
    let weight_sum = (ranked * (ranked + 1) / 2) as f64;
    for (rank, (id, _)) in correct.iter().enumerate() {
        let weight = (ranked - rank as u64) as f64;
        let points = (POINT_POOL * weight / weight_sum).round() as u32;
        scores.insert(**id, points);
    }

    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::question::QuestionSpec;

    fn single_choice() -> Question {
        Question {
            prompt: "Capital of France?".to_owned(),
            image: None,
            spec: QuestionSpec::SingleChoice {
                options: vec!["Paris".to_owned(), "Lyon".to_owned()],
                correct: "Paris".to_owned(),
            },
        }
    }

    fn record(answer: &str, elapsed: u64, answered_at: u64) -> AnswerRecordEntity {
        AnswerRecordEntity {
            answer: answer.to_owned(),
            answered_at,
            elapsed,
        }
    }

    fn roster_of(ids: &[Uuid]) -> BTreeMap<Uuid, ParticipantEntity> {
        ids.iter()
            .enumerate()
            .map(|(index, id)| {
                (
                    *id,
                    ParticipantEntity {
                        name: format!("player-{index}"),
                        joined_at: index as u64,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn three_correct_answers_split_the_pool() {
        let ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let roster = roster_of(&ids);
        let answers = BTreeMap::from([
            (ids[0], record("Paris", 9, 9_000)),
            (ids[1], record("Paris", 2, 2_000)),
            (ids[2], record("Paris", 5, 5_000)),
        ]);

        let scores = compute_scores(&single_choice(), &roster, &answers);

        assert_eq!(scores[&ids[1]], 500);
        assert_eq!(scores[&ids[2]], 333);
        assert_eq!(scores[&ids[0]], 167);
    }

    #[test]
    fn a_lone_correct_answer_takes_the_full_pool() {
        let ids = [Uuid::new_v4(), Uuid::new_v4()];
        let roster = roster_of(&ids);
        let answers = BTreeMap::from([(ids[0], record("Paris", 3, 3_000))]);

        let scores = compute_scores(&single_choice(), &roster, &answers);

        assert_eq!(scores[&ids[0]], 1000);
        assert_eq!(scores[&ids[1]], 0);
    }

    #[test]
    fn wrong_answers_score_zero() {
        let ids = [Uuid::new_v4(), Uuid::new_v4()];
        let roster = roster_of(&ids);
        let answers = BTreeMap::from([
            (ids[0], record("Lyon", 1, 1_000)),
            (ids[1], record("Paris", 8, 8_000)),
        ]);

        let scores = compute_scores(&single_choice(), &roster, &answers);

        assert_eq!(scores[&ids[0]], 0);
        assert_eq!(scores[&ids[1]], 1000);
    }

    #[test]
    fn no_correct_answers_still_writes_every_zero() {
        let ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let roster = roster_of(&ids);

        let scores = compute_scores(&single_choice(), &roster, &BTreeMap::new());

        assert_eq!(scores.len(), 3);
        assert!(scores.values().all(|points| *points == 0));
    }

    #[test]
    fn ties_break_on_submission_time_then_id() {
        let mut ids = [Uuid::new_v4(), Uuid::new_v4()];
        ids.sort();
        let roster = roster_of(&ids);

        // Same elapsed second, distinct wall-clock instants.
        let answers = BTreeMap::from([
            (ids[0], record("Paris", 4, 4_500)),
            (ids[1], record("Paris", 4, 4_100)),
        ]);
        let scores = compute_scores(&single_choice(), &roster, &answers);
        assert_eq!(scores[&ids[1]], 667);
        assert_eq!(scores[&ids[0]], 333);

        // Fully tied records fall back to the id ordering.
        let answers = BTreeMap::from([
            (ids[0], record("Paris", 4, 4_100)),
            (ids[1], record("Paris", 4, 4_100)),
        ]);
        let scores = compute_scores(&single_choice(), &roster, &answers);
        assert_eq!(scores[&ids[0]], 667);
        assert_eq!(scores[&ids[1]], 333);
    }

    #[test]
    fn payouts_never_increase_down_the_ranking() {
        for count in 1..=10usize {
            let ids: Vec<Uuid> = (0..count).map(|_| Uuid::new_v4()).collect();
            let roster = roster_of(&ids);
            let answers: BTreeMap<Uuid, AnswerRecordEntity> = ids
                .iter()
                .enumerate()
                .map(|(index, id)| (*id, record("Paris", index as u64, index as u64 * 1_000)))
                .collect();

            let scores = compute_scores(&single_choice(), &roster, &answers);

            let mut ranked: Vec<u32> = ids.iter().map(|id| scores[id]).collect();
            let total: u32 = ranked.iter().sum();
            assert!(total <= 1000, "pool overflows for {count} answers: {total}");
            let sorted = {
                let mut copy = ranked.clone();
                copy.sort_unstable_by(|a, b| b.cmp(a));
                copy
            };
            assert_eq!(ranked, sorted, "faster answers must never earn less");
            ranked.dedup();
            assert_eq!(ranked.len(), count, "distinct ranks must earn distinct payouts");
        }
    }
}
