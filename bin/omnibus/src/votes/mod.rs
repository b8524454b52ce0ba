//! Known vote scripts

mod vote_2025_11_17;
mod vote_2025_12_19;

use lido_host::VoteScript;

use vote_2025_11_17::Vote20251117;
use vote_2025_12_19::Vote20251219;

pub const SCRIPTS: &[&dyn VoteScript] = &[&Vote20251117, &Vote20251219];

pub fn find(name: &str) -> Option<&'static dyn VoteScript> {
    SCRIPTS.iter().copied().find(|script| script.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find() {
        assert_eq!(find("vote_2025_12_19").map(|s| s.name()), Some("vote_2025_12_19"));
        assert!(find("vote_1970_01_01").is_none());
    }
}
