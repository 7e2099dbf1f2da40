//! Question bank loading and seeding.

use std::path::Path;

use indexmap::IndexMap;
use tracing::info;

use crate::{
    dto::validation::validate_question_id,
    error::ServiceError,
    model::{
        entities::to_tree_value,
        question::{Question, QuestionBank},
    },
    state::SharedState,
    store::{path, retry::with_backoff},
};

/// Load the question bank and seed it into the state tree.
///
/// The bank comes from the configured question file when one is set,
/// otherwise from the built-in set. Each question is written under
/// `questions/{id}` so clients reading the tree directly see the same
/// documents the server plays from.
pub async fn install_bank(state: &SharedState) -> Result<usize, ServiceError> {
    let bank = match state.config().question_file() {
        Some(file) => load_bank(file)?,
        None => QuestionBank::builtin(),
    };

    let tree = state.tree();
    for (id, question) in bank.iter() {
        let document = to_tree_value(question);
        with_backoff("question write", || {
            tree.write(path::question(id), document.clone())
        })
        .await?;
    }

    let count = bank.len();
    {
        let mut slot = state.question_bank().write().await;
        *slot = bank;
    }

    info!(questions = count, "question bank installed");
    Ok(count)
}

fn load_bank(file: &Path) -> Result<QuestionBank, ServiceError> {
    let raw = std::fs::read_to_string(file).map_err(|error| {
        ServiceError::InvalidInput(format!(
            "cannot read question file `{}`: {error}",
            file.display()
        ))
    })?;
    let questions: IndexMap<String, Question> = serde_json::from_str(&raw).map_err(|error| {
        ServiceError::InvalidInput(format!(
            "cannot parse question file `{}`: {error}",
            file.display()
        ))
    })?;

    if questions.is_empty() {
        return Err(ServiceError::InvalidInput(format!(
            "question file `{}` contains no questions",
            file.display()
        )));
    }
    for id in questions.keys() {
        if validate_question_id(id).is_err() {
            return Err(ServiceError::InvalidInput(format!(
                "question id `{id}` is not usable as a tree path segment"
            )));
        }
    }

    Ok(QuestionBank::from_questions(questions))
}
