use super::*;

use rand::{distributions::Alphanumeric, thread_rng, Rng};

impl SessionId {
    pub const LENGTH: usize = 32;

    pub fn generate() -> Self {
        let rng = thread_rng();

        let id: String = rng
            .sample_iter(Alphanumeric)
            .take(Self::LENGTH)
            .map(char::from)
            .collect();

        Self(id)
    }
}
