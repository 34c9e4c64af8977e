use rocket::serde::json::Value;
use rocket::serde::{Deserialize, Serialize};

use crate::external::Record;

/// One submitted match result between two players.
///
/// All four fields must be present. Their values are handed to the external
/// store as they arrive; ids and scores may be numbers or strings.
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(crate = "rocket::serde")]
pub struct ScoreEntry {
    pub player1_id: Value,
    pub player2_id: Value,
    pub score1: Value,
    pub score2: Value,
}

impl ScoreEntry {
    #[cfg(test)]
    pub fn new(
        player1_id: impl Into<Value>,
        player2_id: impl Into<Value>,
        score1: impl Into<Value>,
        score2: impl Into<Value>,
    ) -> Self {
        Self {
            player1_id: player1_id.into(),
            player2_id: player2_id.into(),
            score1: score1.into(),
            score2: score2.into(),
        }
    }

    /// Converts the entry into the row shape written to the scores table.
    pub fn into_record(self) -> Record {
        let mut record = Record::new();
        record.insert("player1_id".to_owned(), self.player1_id);
        record.insert("player2_id".to_owned(), self.player2_id);
        record.insert("score1".to_owned(), self.score1);
        record.insert("score2".to_owned(), self.score2);
        record
    }
}
