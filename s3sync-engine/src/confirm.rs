//! Yes/no confirmation capability.

use std::cell::RefCell;
use std::collections::VecDeque;

/// Asks the user a yes/no question.
///
/// Implementations return `false` when no answer can be obtained
/// (end of input, interrupt, no terminal).
pub trait Confirm {
    fn confirm(&self, question: &str) -> bool;
}

/// Replays prepared answers and records every question asked.
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answers: RefCell<VecDeque<bool>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: RefCell::new(answers.into_iter().collect()),
            asked: RefCell::new(Vec::new()),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, question: &str) -> bool {
        self.asked.borrow_mut().push(question.to_string());
        self.answers.borrow_mut().pop_front().unwrap_or(false)
    }
}
