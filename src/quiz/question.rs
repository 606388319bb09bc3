use std::collections::HashSet;

use rand::{seq::SliceRandom, Rng};
use uuid::Uuid;

use crate::database::vocabulary::SavedWord;

pub const DISTRACTORS: usize = 3;

/// One multiple-choice question: the word being asked about and the shuffled
/// options, one of which is `correct` itself.
#[derive(Debug, Clone)]
pub struct Question {
    correct: SavedWord,
    options: Vec<SavedWord>,
    correct_index: usize,
}

impl Question {
    pub fn correct(&self) -> &SavedWord {
        &self.correct
    }

    pub fn options(&self) -> &[SavedWord] {
        &self.options
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    pub fn option_texts(&self) -> Vec<String> {
        self.options
            .iter()
            .map(|word| word.translation().to_owned())
            .collect()
    }
}

/// Picks the next question from `pool`.
///
/// The correct word comes from the words not yet in `used`; once every word
/// has been asked, `used` is cleared and the whole pool is eligible again.
/// Distractors are drawn from the rest of the pool, so a pool smaller than
/// four yields fewer options.
pub fn pick_question<R: Rng + ?Sized>(
    pool: &[SavedWord],
    used: &mut HashSet<Uuid>,
    rng: &mut R,
) -> Option<Question> {
    let mut unused: Vec<&SavedWord> = pool
        .iter()
        .filter(|word| !used.contains(word.uuid()))
        .collect();

    if unused.is_empty() {
        used.clear();
        unused = pool.iter().collect();
    }

    let correct = (*unused.choose(rng)?).clone();
    used.insert(*correct.uuid());

    let others: Vec<&SavedWord> = pool
        .iter()
        .filter(|word| word.uuid() != correct.uuid())
        .collect();

    let mut options: Vec<SavedWord> = Vec::with_capacity(DISTRACTORS + 1);
    options.push(correct.clone());
    options.extend(others.choose_multiple(rng, DISTRACTORS).map(|word| (*word).clone()));
    options.shuffle(rng);

    let correct_index = options
        .iter()
        .position(|word| word.uuid() == correct.uuid())?;

    Some(Question {
        correct,
        options,
        correct_index,
    })
}
